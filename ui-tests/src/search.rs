use anyhow::Result;
use harness::artifacts::run_scenario;
use harness::navigation;
use harness::table::Table;
use tracing::info;

use crate::common::{environment, eventually, search, unique_name};

/// Search on the super-admin community list.
///
/// Steps:
/// - Log in as superadmin and open the community list
/// - Search for "ทำ": every remaining row mentions it in some column
/// - Search for a term nobody uses: a single "no data" row remains
#[tokio::test]
#[ignore = "requires a running application and geckodriver"]
async fn test_search_communities() -> Result<()> {
    let env = environment().await?;
    let session = env.login("superadmin").await?;
    let result = run_scenario(&session, "search communities", async {
        navigation::go_to(&session, "super.communities").await?;
        let table = Table::default();

        info!("🔍 Searching communities for 'ทำ'");
        search(&session, "ทำ").await?;
        let matched = eventually(&session, "rows containing 'ทำ'", || {
            table.verify_contains_term(session.page(), "ทำ")
        })
        .await?;
        info!("✅ {matched} row(s) contain 'ทำ'");

        let nonsense = unique_name("ไม่มีชุมชนนี้");
        info!("🔍 Searching communities for '{nonsense}'");
        search(&session, &nonsense).await?;
        eventually(&session, "no data row", || table.verify_no_data(session.page())).await?;
        info!("✅ Only the no-data row is shown");
        anyhow::Ok(())
    })
    .await;
    session.close_after(result).await
}

/// Search on the admin store list, same contract as the community list.
#[tokio::test]
#[ignore = "requires a running application and geckodriver"]
async fn test_search_stores() -> Result<()> {
    let env = environment().await?;
    let session = env.login("admin").await?;
    let result = run_scenario(&session, "search stores", async {
        navigation::go_to(&session, "admin.stores").await?;
        let table = Table::default();

        info!("🔍 Searching stores for 'ทำ'");
        search(&session, "ทำ").await?;
        eventually(&session, "rows containing 'ทำ'", || {
            table.verify_contains_term(session.page(), "ทำ")
        })
        .await?;

        search(&session, &unique_name("ไม่มีร้านนี้")).await?;
        eventually(&session, "no data row", || table.verify_no_data(session.page())).await?;
        anyhow::Ok(())
    })
    .await;
    session.close_after(result).await
}
