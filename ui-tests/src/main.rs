//! Scenarios are standard `#[tokio::test]`s, ignored by default because
//! they need the application and geckodriver:
//!
//! ```shell
//! cargo test -p ui-tests -- --ignored
//! ```
//!
//! For human-in-the-loop debugging, `main` logs in as a role and opens a
//! headed browser for manual inspection:
//!
//! ```shell
//! cargo run -p ui-tests -- superadmin super.requests
//! ```

use anyhow::Result;
use harness::{TestEnvironment, navigation, telemetry};
use tracing::info;

#[cfg(test)]
mod reports;
#[cfg(test)]
mod requests;
#[cfg(test)]
mod search;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = telemetry::get_subscriber("info".into());
    telemetry::init_subscriber(subscriber);

    let mut args = std::env::args().skip(1);
    let role = args.next().unwrap_or_else(|| "superadmin".to_string());
    let destination = args.next();

    info!("🔧 Setting up environment with headed browser");
    let env = TestEnvironment::setup_headed()?;
    env.ensure_app_reachable().await?;

    let session = env.login(&role).await?;
    let result = async {
        if let Some(destination) = &destination {
            navigation::go_to(&session, destination).await?;
        }

        info!("📋 Session summary:");
        info!("   👤 Logged in as: {role}");
        info!("   🌐 Browser is now open at: {}", session.page().current_url().await?);
        info!("👋 Press Ctrl+C to exit and close the browser");

        tokio::signal::ctrl_c().await?;
        info!("📝 Received keyboard interrupt, shutting down...");
        anyhow::Ok(())
    }
    .await;

    info!("🧹 Cleaning up and closing browser");
    session.close_after(result).await
}
