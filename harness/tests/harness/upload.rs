use harness::upload::{self, UploadWidget};
use harness::{HarnessError, Selector};
use test_helpers::{FIXTURES, MockPage, spawn_app};

fn gallery() -> UploadWidget {
    UploadWidget::new(
        "gallery",
        Selector::css("input[type='file']"),
        Selector::css(".upload-list .delete"),
    )
}

/// Every uploaded file adds `per_file` delete controls, two polls later.
fn script_widget(page: &MockPage, widget: &UploadWidget, per_file: usize) {
    let delete = widget.delete_control.clone();
    page.on_upload(&widget.input, move |dom, _| {
        let delete = delete.clone();
        dom.after(2, move |dom| {
            for _ in 0..per_file {
                dom.push(&delete, "ลบ");
            }
        });
    });
    let delete = widget.delete_control.clone();
    page.on_click(&widget.delete_control, move |dom, nth| {
        dom.remove_nth(&delete, nth);
    });
}

#[tokio::test(start_paused = true)]
async fn each_upload_adds_exactly_one_slot() -> anyhow::Result<()> {
    for n in 0..=3 {
        let app = spawn_app().await;
        let session = app.sessions.login("admin").await?;
        let widget = gallery();
        script_widget(&app.page, &widget, 1);

        let slots = upload::upload_files(&session, &widget, &FIXTURES[..n]).await?;

        assert_eq!(slots.len(), n);
        assert_eq!(
            slots.iter().map(|s| s.index).collect::<Vec<_>>(),
            (0..n).collect::<Vec<_>>()
        );
        assert_eq!(app.page.dom().count(&widget.delete_control), n);
        assert_eq!(app.page.dom().uploads.len(), n);
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn slots_continue_after_existing_uploads() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let widget = gallery();
    script_widget(&app.page, &widget, 1);
    app.page.dom().push(&widget.delete_control, "ลบ");

    let slots =
        upload::upload_files(&session, &widget, &["community-1.jpg", "community-2.jpg"])
            .await?;

    assert_eq!(slots[0].index, 1);
    assert_eq!(slots[1].index, 2);
    assert!(slots[1].file.ends_with("community-2.jpg"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn duplicated_slot_is_a_count_mismatch() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let widget = gallery();
    script_widget(&app.page, &widget, 2);

    let result = upload::upload_files(&session, &widget, &["community-1.jpg"]).await;

    match result {
        Err(HarnessError::UploadCountMismatch {
            file,
            expected,
            actual,
        }) => {
            assert!(file.ends_with("community-1.jpg"));
            assert_eq!(expected, 1);
            assert_eq!(actual, 2);
        }
        other => panic!("Expected UploadCountMismatch, got {other:?}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn slot_that_never_appears_is_a_count_mismatch() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let widget = gallery();
    script_widget(&app.page, &widget, 0);

    let result = upload::upload_files(&session, &widget, &["banner.png"]).await;

    assert!(matches!(
        result,
        Err(HarnessError::UploadCountMismatch {
            expected: 1,
            actual: 0,
            ..
        })
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn missing_fixture_fails_before_any_upload() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let widget = gallery();
    script_widget(&app.page, &widget, 1);

    let result =
        upload::upload_files(&session, &widget, &["community-1.jpg", "missing.jpg"]).await;

    match result {
        Err(HarnessError::MissingFixture(path)) => {
            assert!(path.ends_with("missing.jpg"));
        }
        other => panic!("Expected MissingFixture, got {other:?}"),
    }
    assert!(app.page.dom().uploads.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn removing_a_slot_drops_the_count() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let widget = gallery();
    script_widget(&app.page, &widget, 1);
    upload::upload_files(&session, &widget, &FIXTURES[..3]).await?;

    upload::remove_slot(&session, &widget, 1).await?;

    assert_eq!(app.page.dom().count(&widget.delete_control), 2);
    let result = upload::remove_slot(&session, &widget, 5).await;
    assert!(matches!(result, Err(HarnessError::AssertionFailed(_))));
    Ok(())
}
