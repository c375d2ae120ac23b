use harness::artifacts::{self, screenshot_path};
use test_helpers::{spawn_app, spawn_app_with};

#[tokio::test]
async fn failing_scenario_leaves_a_screenshot() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let title = "TS-CA-01.02: create community (missing name)";

    let result: anyhow::Result<()> = artifacts::run_scenario(&session, title, async {
        anyhow::bail!("save button never enabled")
    })
    .await;

    let error = result.unwrap_err();
    assert!(format!("{error:#}").contains("save button never enabled"));
    assert!(format!("{error}").contains(title));
    let path = screenshot_path(&app.config.screenshot_dir, title);
    assert!(path.ends_with("TS-CA-01_02_create_community_missing_name.png"));
    assert!(tokio::fs::try_exists(&path).await?);
    Ok(())
}

#[tokio::test]
async fn passing_scenario_has_no_screenshot_by_default() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;

    let value = artifacts::run_scenario(&session, "search stores", async { Ok(7) }).await?;

    assert_eq!(value, 7);
    let path = screenshot_path(&app.config.screenshot_dir, "search stores");
    assert!(!tokio::fs::try_exists(&path).await?);
    Ok(())
}

#[tokio::test]
async fn screenshot_always_captures_passing_scenarios() -> anyhow::Result<()> {
    let app = spawn_app_with(|config| config.screenshot_always = true).await;
    let session = app.sessions.login("admin").await?;

    artifacts::run_scenario(&session, "ค้นหา ร้านค้า", async { Ok(()) }).await?;

    let path = app.config.screenshot_dir.join("ค้นหา_ร้านค้า.png");
    assert_eq!(tokio::fs::read(&path).await?, b"\x89PNG\r\n\x1a\nmock");
    Ok(())
}

#[tokio::test]
async fn download_is_found_once_written() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("superadmin").await?;
    let dir = app.config.download_dir.clone();
    tokio::fs::create_dir_all(&dir).await?;

    let writer = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        tokio::fs::write(dir.join("report.xlsx"), b"xlsx").await
    });
    let path = artifacts::wait_for_download(
        &session,
        "report.xlsx",
        std::time::Duration::from_secs(2),
    )
    .await?;
    writer.await??;

    assert!(path.ends_with("report.xlsx"));
    let missing = artifacts::wait_for_download(
        &session,
        "other.pdf",
        std::time::Duration::from_millis(300),
    )
    .await;
    assert!(missing.is_err());
    Ok(())
}
