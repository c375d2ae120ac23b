use harness::navigation::{self, UrlPattern};
use harness::{HarnessError, Selector};
use test_helpers::{MockPage, spawn_app, url};

/// Menu entry that opens `path` one poll after it is clicked.
fn script_menu(page: &MockPage, entry: Selector, path: &'static str) {
    page.dom().show(&entry, "ร้านค้า");
    page.on_click(&entry, move |dom, _| {
        dom.after(1, move |dom| dom.url = url(path));
    });
}

#[tokio::test(start_paused = true)]
async fn go_to_reaches_destination() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    script_menu(&app.page, Selector::LinkText("ร้านค้า".into()), "/admin/stores");

    navigation::go_to(&session, "admin.stores").await?;

    assert_eq!(session.page().current_url().await?, "http://app.test/admin/stores");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn go_to_twice_ends_on_the_same_page() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    script_menu(&app.page, Selector::LinkText("ร้านค้า".into()), "/admin/stores");

    navigation::go_to(&session, "admin.stores").await?;
    let first = session.page().current_url().await?;
    navigation::go_to(&session, "admin.stores").await?;
    let second = session.page().current_url().await?;

    assert_eq!(first, second);
    let clicks = app
        .page
        .actions()
        .iter()
        .filter(|a| a.starts_with("click link"))
        .count();
    assert_eq!(clicks, 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn menu_falls_back_to_visible_text() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    // No link or menuitem role, only the label text.
    script_menu(&app.page, Selector::text("ร้านค้า"), "/admin/stores");

    navigation::go_to(&session, "admin.stores").await?;

    assert!(
        UrlPattern::new("/admin/stores")
            .matches(&session.page().current_url().await?)
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unreached_destination_reports_current_url() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    // Clicking the menu does nothing.
    app.page
        .dom()
        .show(&Selector::LinkText("ร้านค้า".into()), "ร้านค้า");

    let result = navigation::go_to(&session, "admin.stores").await;

    match result {
        Err(HarnessError::NavigationTimeout {
            destination,
            expected,
            actual,
        }) => {
            assert_eq!(destination, "admin.stores");
            assert_eq!(expected, "/admin/stores");
            assert_eq!(actual, "http://app.test/admin/community/own");
        }
        other => panic!("Expected NavigationTimeout, got {other:?}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unknown_destination_is_a_configuration_error() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;

    let result = navigation::go_to(&session, "admin.nowhere").await;

    assert!(matches!(result, Err(HarnessError::Configuration(_))));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn missing_menu_entry_is_element_not_found() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("superadmin").await?;

    let result = navigation::go_to(&session, "super.tags").await;

    match result {
        Err(HarnessError::ElementNotFound { chain }) => {
            assert_eq!(chain.name, "แท็ก");
            assert_eq!(chain.strategies.len(), 4);
        }
        other => panic!("Expected ElementNotFound, got {other:?}"),
    }
    Ok(())
}
