use std::time::Duration;

use anyhow::{Context, Result};
use harness::artifacts::run_scenario;
use harness::submit::{self, Decision, SubmitControls, SubmitOutcome};
use harness::table::Table;
use harness::{Selector, navigation};
use tracing::info;

use crate::common::environment;

fn approve() -> Selector {
    Selector::button("อนุมัติ")
}

/// Name of the first pending request, taken from its first column.
async fn first_pending(session: &harness::Session, table: &Table) -> Result<String> {
    let rows = table.rows(session.page()).await?;
    rows.iter()
        .find(|row| !row.text.contains(&table.no_data))
        .and_then(|row| row.cells.first())
        .map(|name| name.trim().to_string())
        .context("No pending request to work on")
}

/// Approving a pending community request.
///
/// Steps:
/// - Log in as superadmin and open the request list
/// - Capture the name of the first pending request
/// - Click its approve action: the dialog offers both confirm and cancel
/// - Confirm: the success dialog shows and the row is gone within 10 seconds
#[tokio::test]
#[ignore = "requires a running application and geckodriver"]
async fn test_approve_request() -> Result<()> {
    let env = environment().await?;
    let session = env.login("superadmin").await?;
    let result = run_scenario(&session, "approve pending request", async {
        navigation::go_to(&session, "super.requests").await?;
        let table = Table::default();
        let controls = SubmitControls::default();

        let name = first_pending(&session, &table).await?;
        info!("📝 Approving request '{name}'");
        let target = table.row_action(session.page(), &name, &approve()).await?;
        let outcome = submit::submit_via(&session, &controls, &target, Decision::Confirm).await?;
        outcome.expect_success()?;
        submit::acknowledge(&session, &controls).await?;

        table
            .wait_row_gone(session.page(), &name, Duration::from_secs(10))
            .await?;
        info!("✅ Request '{name}' left the pending list");
        anyhow::Ok(())
    })
    .await;
    session.close_after(result).await
}

/// Cancelling the confirmation leaves the request pending.
///
/// Steps:
/// - Log in as superadmin and open the request list
/// - Click approve on the first pending request, then cancel
/// - The row is still listed
#[tokio::test]
#[ignore = "requires a running application and geckodriver"]
async fn test_cancel_approve_request() -> Result<()> {
    let env = environment().await?;
    let session = env.login("superadmin").await?;
    let result = run_scenario(&session, "cancel request approval", async {
        navigation::go_to(&session, "super.requests").await?;
        let table = Table::default();
        let controls = SubmitControls::default();

        let name = first_pending(&session, &table).await?;
        let target = table.row_action(session.page(), &name, &approve()).await?;
        let outcome = submit::submit_via(&session, &controls, &target, Decision::Cancel).await?;

        assert_eq!(outcome, SubmitOutcome::Cancelled);
        table.find_row(session.page(), &name).await?;
        info!("✅ Request '{name}' is still pending");
        anyhow::Ok(())
    })
    .await;
    session.close_after(result).await
}
