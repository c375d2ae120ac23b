//! Geocoded location pickers: place search, typed coordinates, or a click
//! on the map canvas.

use tracing::info;

use crate::error::{HarnessError, HarnessResult};
use crate::locator::Selector;
use crate::page::Page;
use crate::session::Session;
use crate::wait::{DEFAULT_POLL_INTERVAL, poll_until, wait_for};

#[derive(Debug, Clone)]
pub struct LocationFields {
    pub search: Selector,
    pub results: Selector,
    pub latitude: Selector,
    pub longitude: Selector,
    pub map: Selector,
}

impl Default for LocationFields {
    fn default() -> Self {
        LocationFields {
            search: Selector::placeholder("ค้นหาสถานที่"),
            results: Selector::css(".pac-item, [role='listbox'] [role='option']"),
            latitude: Selector::label("ละติจูด"),
            longitude: Selector::label("ลองจิจูด"),
            map: Selector::css(".leaflet-container, .gm-style, canvas"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeoInput {
    /// Type a place name and take the first result.
    Search { query: String },
    /// Type into the latitude and longitude spin controls.
    Coordinates { lat: f64, lng: f64 },
    /// Click the map at an offset from its top-left corner.
    MapClick { x: i64, y: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

async fn raw_values(
    page: &dyn Page,
    fields: &LocationFields,
) -> HarnessResult<(String, String)> {
    Ok((
        page.value(&fields.latitude).await?,
        page.value(&fields.longitude).await?,
    ))
}

fn parse(lat: &str, lng: &str) -> HarnessResult<LatLng> {
    let number = |raw: &str| {
        raw.trim().parse::<f64>().map_err(|_| {
            HarnessError::UnexpectedState(format!("'{raw}' is not a coordinate"))
        })
    };
    Ok(LatLng {
        lat: number(lat)?,
        lng: number(lng)?,
    })
}

/// Set the location and return the coordinates the form ends up holding.
pub async fn set_location(
    session: &Session,
    fields: &LocationFields,
    input: &GeoInput,
) -> HarnessResult<LatLng> {
    let page = session.page();
    let timeout = session.config().timeouts.action;
    match input {
        GeoInput::Search { query } => {
            page.fill(&fields.search, query).await?;
            let results = &fields.results;
            wait_for(&format!("results for '{query}'"), timeout, || async move {
                Ok(page.count(results).await? > 0)
            })
            .await?;
            page.click(results, 0).await?;
            poll_until("coordinates from search", timeout, DEFAULT_POLL_INTERVAL, || async move {
                let (lat, lng) = raw_values(page, fields).await?;
                Ok(parse(&lat, &lng).ok())
            })
            .await?;
        }
        GeoInput::Coordinates { lat, lng } => {
            page.fill(&fields.latitude, &lat.to_string()).await?;
            page.fill(&fields.longitude, &lng.to_string()).await?;
        }
        GeoInput::MapClick { x, y } => {
            let before = raw_values(page, fields).await?;
            page.click_at(&fields.map, *x, *y).await?;
            // The map handler writes the fields asynchronously and nothing
            // else on the page signals it, so watch the values themselves.
            let before = &before;
            wait_for("coordinates to change after map click", timeout, || async move {
                Ok(raw_values(page, fields).await? != *before)
            })
            .await?;
        }
    }
    let (lat, lng) = raw_values(page, fields).await?;
    let position = parse(&lat, &lng)?;
    info!("📍 Location set to {}, {}", position.lat, position.lng);
    Ok(position)
}
