use harness::serial::SerialSuite;
use harness::{HarnessError, RoleId};
use test_helpers::spawn_app;

#[tokio::test(start_paused = true)]
async fn steps_share_one_session() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("superadmin").await?;
    let mut suite = SerialSuite::new("block and unblock", session);

    suite
        .step("open accounts", |session| {
            Box::pin(async move {
                session.goto_path("/super/accounts").await?;
                anyhow::Ok(())
            })
        })
        .await?;
    suite
        .step("switch to admin", |session| {
            Box::pin(async move {
                session.logout().await?;
                session.authenticate(&RoleId::from("admin")).await?;
                anyhow::Ok(())
            })
        })
        .await?;

    assert_eq!(suite.completed(), ["open accounts", "switch to admin"]);
    assert_eq!(suite.session().role(), Some(&RoleId::from("admin")));
    let session = suite.finish()?;
    session.close().await?;
    assert!(app.page.dom().closed);
    assert_eq!(app.launches(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_step_poisons_the_rest() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("superadmin").await?;
    let mut suite = SerialSuite::new("block and unblock", session);

    suite
        .step("block account", |_| Box::pin(async { anyhow::Ok(()) }))
        .await?;
    let failed = suite
        .step("login as blocked account", |_| {
            Box::pin(async { Err::<(), _>(anyhow::anyhow!("blocked account logged in")) })
        })
        .await;
    assert!(failed.is_err());

    let mut ran = false;
    let skipped = suite
        .step("unblock account", |_| {
            ran = true;
            Box::pin(async { anyhow::Ok(()) })
        })
        .await;

    assert!(!ran);
    match skipped.unwrap_err().downcast::<HarnessError>() {
        Ok(HarnessError::SerialSuitePoisoned { failed_step }) => {
            assert_eq!(failed_step, "login as blocked account");
        }
        other => panic!("Expected SerialSuitePoisoned, got {other:?}"),
    }
    assert_eq!(suite.completed(), ["block account"]);
    assert!(matches!(
        suite.finish(),
        Err(HarnessError::SerialSuitePoisoned { .. })
    ));
    Ok(())
}
