use std::sync::{Arc, Mutex};

use harness::form::{self, AddressCascade, Combobox, DateFields, FormField};
use harness::geo::{self, GeoInput, LatLng, LocationFields};
use harness::{HarnessError, Selector};
use jiff::civil::date;
use test_helpers::{MockPage, spawn_app};

/// Comboboxes sharing one option list, like an ant-design select popup.
/// Picking an option writes it into the open combobox. With `resets`, the
/// levels after it are cleared one poll later.
fn script_comboboxes(
    page: &MockPage,
    levels: &[(&Combobox, &[&'static str])],
    resets: bool,
    postcode: Option<Selector>,
) {
    let open = Arc::new(Mutex::new(None::<usize>));
    let triggers: Vec<Selector> = levels
        .iter()
        .map(|(combobox, _)| combobox.trigger.strategies[0].clone())
        .collect();
    let options = levels[0].0.options.clone();

    for (i, (_, choices)) in levels.iter().enumerate() {
        page.dom().show(&triggers[i], "");
        let open = Arc::clone(&open);
        let options = options.clone();
        let choices = choices.to_vec();
        page.on_click(&triggers[i], move |dom, _| {
            if let Ok(mut open) = open.lock() {
                *open = Some(i);
            }
            dom.set(&options, &choices);
        });
    }

    let last = levels.len() - 1;
    let shown = options.clone();
    page.on_click(&options, move |dom, nth| {
        let Some(i) = open.lock().ok().and_then(|open| *open) else {
            return;
        };
        let picked = dom.texts(&shown)[nth].clone();
        dom.set_value(&triggers[i], &picked);
        dom.hide(&shown);
        if resets {
            let below = triggers[i + 1..].to_vec();
            dom.after(1, move |dom| {
                for trigger in &below {
                    dom.set_value(trigger, "");
                }
            });
        }
        if let (true, Some(postcode)) = (i == last, postcode.clone()) {
            dom.after(2, move |dom| dom.set_value(&postcode, "50200"));
        }
    });
}

fn address(page: &MockPage, cascade: &AddressCascade, resets: bool) {
    script_comboboxes(
        page,
        &[
            (&cascade.levels[0], &["เชียงใหม่", "ลำพูน"][..]),
            (&cascade.levels[1], &["เมืองเชียงใหม่", "สารภี"][..]),
            (&cascade.levels[2], &["ศรีภูมิ", "ช้างม่อย"][..]),
        ],
        resets,
        cascade.postcode.clone(),
    );
}

fn value_of(page: &MockPage, combobox: &Combobox) -> String {
    page.dom().value(&combobox.trigger.strategies[0])
}

#[tokio::test(start_paused = true)]
async fn address_cascade_fills_every_level_and_postcode() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let cascade = AddressCascade::thai();
    address(&app.page, &cascade, true);

    form::fill_address(&session, &cascade, &["เชียงใหม่", "เมืองเชียงใหม่", "ศรีภูมิ"])
        .await?;

    assert_eq!(value_of(&app.page, &cascade.levels[0]), "เชียงใหม่");
    assert_eq!(value_of(&app.page, &cascade.levels[1]), "เมืองเชียงใหม่");
    assert_eq!(value_of(&app.page, &cascade.levels[2]), "ศรีภูมิ");
    let postcode = cascade.postcode.as_ref().unwrap();
    assert_eq!(app.page.dom().value(postcode), "50200");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn changing_province_waits_for_dependents_to_reset() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let cascade = AddressCascade::thai();
    address(&app.page, &cascade, true);
    form::fill_address(&session, &cascade, &["เชียงใหม่", "เมืองเชียงใหม่", "ศรีภูมิ"])
        .await?;

    form::fill_address(&session, &cascade, &["ลำพูน"]).await?;

    assert_eq!(value_of(&app.page, &cascade.levels[0]), "ลำพูน");
    assert_eq!(value_of(&app.page, &cascade.levels[1]), "");
    assert_eq!(value_of(&app.page, &cascade.levels[2]), "");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn dependent_that_keeps_its_value_is_stale() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let cascade = AddressCascade::thai();
    address(&app.page, &cascade, false);
    form::fill_address(&session, &cascade, &["เชียงใหม่", "เมืองเชียงใหม่"]).await?;

    let result = form::fill_address(&session, &cascade, &["ลำพูน"]).await;

    match result {
        Err(HarnessError::StaleDependentField { field, value }) => {
            assert_eq!(field, "อำเภอ");
            assert_eq!(value, "เมืองเชียงใหม่");
        }
        other => panic!("Expected StaleDependentField, got {other:?}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn too_many_address_values_are_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let cascade = AddressCascade::thai();

    let result = form::fill_address(&session, &cascade, &["a", "b", "c", "d"]).await;

    assert!(matches!(result, Err(HarnessError::Configuration(_))));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn thai_date_picks_buddhist_year() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let fields = DateFields::thai(
        Combobox::labelled("วัน"),
        Combobox::labelled("เดือน"),
        Combobox::labelled("ปี"),
    );
    script_comboboxes(
        &app.page,
        &[
            (&fields.day, &["8", "9", "19", "29"][..]),
            (&fields.month, &["มกราคม", "กุมภาพันธ์", "มีนาคม"][..]),
            (&fields.year, &["2566", "2567", "2568"][..]),
        ],
        false,
        None,
    );

    form::fill_date(&session, &fields, date(2024, 2, 9)).await?;

    assert_eq!(value_of(&app.page, &fields.day), "9");
    assert_eq!(value_of(&app.page, &fields.month), "กุมภาพันธ์");
    assert_eq!(value_of(&app.page, &fields.year), "2567");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn option_that_never_shows_times_out() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let category = Combobox::labelled("ประเภท");
    script_comboboxes(&app.page, &[(&category, &["อาหาร", "ของฝาก"][..])], false, None);

    let result = form::select_option(&session, &category, "ผ้า", "ผ้าทอ").await;

    assert!(matches!(result, Err(HarnessError::Timeout { .. })));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn fill_form_fills_fields_in_order() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let name = Selector::label("ชื่อร้านค้า");
    app.page.dom().show(&name, "");
    let category = Combobox::labelled("ประเภท");
    script_comboboxes(&app.page, &[(&category, &["อาหาร", "ของฝาก"][..])], false, None);

    form::fill_form(
        &session,
        &[
            FormField::text("ชื่อร้านค้า", "ร้านของฝากบ้านเรา"),
            FormField::choice("ประเภท", "ของฝาก"),
        ],
    )
    .await?;

    assert_eq!(app.page.dom().value(&name), "ร้านของฝากบ้านเรา");
    assert_eq!(value_of(&app.page, &category), "ของฝาก");
    let actions = app.page.actions();
    let name_at = actions.iter().position(|a| a.contains("ร้านของฝากบ้านเรา"));
    let choice_at = actions.iter().position(|a| a.contains("= ของฝาก"));
    assert!(name_at < choice_at);
    Ok(())
}

fn location_fields(page: &MockPage) -> LocationFields {
    let fields = LocationFields::default();
    let mut dom = page.dom();
    dom.show(&fields.search, "");
    dom.show(&fields.map, "");
    dom.show(&fields.latitude, "");
    dom.show(&fields.longitude, "");
    fields
}

#[tokio::test(start_paused = true)]
async fn map_click_waits_for_coordinates() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let fields = location_fields(&app.page);
    let (lat, lng) = (fields.latitude.clone(), fields.longitude.clone());
    app.page.on_click(&fields.map, move |dom, _| {
        let (lat, lng) = (lat.clone(), lng.clone());
        dom.after(2, move |dom| {
            dom.set_value(&lat, "18.7883");
            dom.set_value(&lng, "98.9853");
        });
    });

    let position =
        geo::set_location(&session, &fields, &GeoInput::MapClick { x: 120, y: 80 }).await?;

    assert_eq!(
        position,
        LatLng {
            lat: 18.7883,
            lng: 98.9853
        }
    );
    assert!(
        app.page
            .actions()
            .iter()
            .any(|a| a.ends_with("at (120, 80)"))
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn search_takes_first_result() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let fields = location_fields(&app.page);
    let results = fields.results.clone();
    app.page.on_fill(&fields.search, move |dom, query| {
        let results = results.clone();
        let query = query.to_string();
        dom.after(1, move |dom| dom.set(&results, &[query.as_str(), "อื่น ๆ"]));
    });
    let (lat, lng) = (fields.latitude.clone(), fields.longitude.clone());
    app.page.on_click(&fields.results, move |dom, _| {
        dom.set_value(&lat, "18.7953");
        dom.set_value(&lng, "98.9986");
    });

    let position = geo::set_location(
        &session,
        &fields,
        &GeoInput::Search {
            query: "ดอยสุเทพ".into(),
        },
    )
    .await?;

    assert_eq!(position.lat, 18.7953);
    assert_eq!(position.lng, 98.9986);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn typed_coordinates_are_read_back() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let session = app.sessions.login("admin").await?;
    let fields = location_fields(&app.page);

    let position = geo::set_location(
        &session,
        &fields,
        &GeoInput::Coordinates {
            lat: 13.7563,
            lng: 100.5018,
        },
    )
    .await?;

    assert_eq!(
        position,
        LatLng {
            lat: 13.7563,
            lng: 100.5018
        }
    );
    Ok(())
}
