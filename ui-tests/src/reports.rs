use anyhow::Result;
use harness::artifacts::{run_scenario, wait_for_download};
use harness::{LocatorChain, Selector, navigation};
use tracing::info;

use crate::common::environment;

/// Exporting the community report. Only the file's existence is checked.
///
/// Steps:
/// - Log in as superadmin and open the report page
/// - Click export
/// - `report.xlsx` shows up in the download directory
#[tokio::test]
#[ignore = "requires a running application and geckodriver"]
async fn test_export_report() -> Result<()> {
    let env = environment().await?;
    let session = env.login("superadmin").await?;

    let result = run_scenario(&session, "export community report", async {
        navigation::go_to(&session, "super.reports").await?;
        let export = LocatorChain::new("export report")
            .or(Selector::button("ส่งออก"))
            .or(Selector::button("ดาวน์โหลด"))
            .or(Selector::css("[data-testid='export']"));
        let target = export.resolve(session.page()).await?;
        session.page().click(&target, 0).await?;

        let path =
            wait_for_download(&session, "report.xlsx", session.config().timeouts.navigation)
                .await?;
        info!("✅ Report downloaded to {}", path.display());
        anyhow::Ok(())
    })
    .await;
    session.close_after(result).await
}
