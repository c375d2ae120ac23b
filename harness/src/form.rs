//! Filling forms field by field.
//!
//! Four archetypes live here or next door: plain inputs and searchable
//! comboboxes (this module, including date triads and address cascades),
//! upload widgets ([`crate::upload`]) and geocoded locations
//! ([`crate::geo`]). [`fill_form`] takes a declarative list of
//! [`FormField`]s and dispatches each one.

use std::collections::HashMap;

use jiff::civil::Date;
use tracing::{debug, info};

use crate::error::{HarnessError, HarnessResult};
use crate::geo::{GeoInput, LocationFields, set_location};
use crate::locator::{LocatorChain, Selector};
use crate::page::Page;
use crate::session::Session;
use crate::upload::{UploadWidget, upload_files};
use crate::wait::{DEFAULT_POLL_INTERVAL, poll_until, wait_for};

pub const THAI_MONTHS: [&str; 12] = [
    "มกราคม",
    "กุมภาพันธ์",
    "มีนาคม",
    "เมษายน",
    "พฤษภาคม",
    "มิถุนายน",
    "กรกฎาคม",
    "สิงหาคม",
    "กันยายน",
    "ตุลาคม",
    "พฤศจิกายน",
    "ธันวาคม",
];

/// Offset between the Gregorian and the Thai Buddhist calendar.
const BUDDHIST_ERA_OFFSET: i16 = 543;

/// A searchable select: click to open, type to filter, click an option.
#[derive(Debug, Clone)]
pub struct Combobox {
    pub name: String,
    pub trigger: LocatorChain,
    /// Separate filter input inside the popup. When absent the filter text
    /// is typed into the trigger itself.
    pub search: Option<Selector>,
    pub options: Selector,
}

impl Combobox {
    /// Combobox found by its label, with options rendered as ARIA options.
    pub fn labelled(label: &str) -> Self {
        Combobox {
            name: label.to_string(),
            trigger: LocatorChain::new(label)
                .or(Selector::label(label))
                .or(Selector::role("combobox", label)),
            search: None,
            options: Selector::any_role("option"),
        }
    }

    pub fn with_search(mut self, search: Selector) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_options(mut self, options: Selector) -> Self {
        self.options = options;
        self
    }
}

/// Fill a text or number input, replacing what was there.
pub async fn fill_text(
    session: &Session,
    target: &Selector,
    value: &str,
) -> HarnessResult<()> {
    debug!("fill {target} with '{value}'");
    session.page().fill(target, value).await
}

/// Open `combobox`, filter by `query` and click the first option whose text
/// contains `option`.
pub async fn select_option(
    session: &Session,
    combobox: &Combobox,
    query: &str,
    option: &str,
) -> HarnessResult<()> {
    let page = session.page();
    let trigger = combobox.trigger.resolve(page).await?;
    page.click(&trigger, 0).await?;
    match &combobox.search {
        Some(search) => page.fill(search, query).await?,
        None => page.fill(&trigger, query).await?,
    }

    let options = &combobox.options;
    let index = poll_until(
        &format!("option '{option}' in {}", combobox.name),
        session.config().timeouts.action,
        DEFAULT_POLL_INTERVAL,
        || async move {
            let texts = page.texts(options).await?;
            Ok(texts.iter().position(|text| text.contains(option)))
        },
    )
    .await?;
    page.click(options, index).await?;
    debug!("{} = {option}", combobox.name);
    Ok(())
}

/// Value of a control, `None` when it is not rendered or empty.
async fn current_value(
    page: &dyn Page,
    chain: &LocatorChain,
) -> HarnessResult<Option<String>> {
    let target = match chain.resolve(page).await {
        Ok(target) => target,
        Err(HarnessError::ElementNotFound { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };
    let value = page.value(&target).await?;
    Ok((!value.trim().is_empty()).then_some(value))
}

/// Day, month and year comboboxes.
#[derive(Debug, Clone)]
pub struct DateFields {
    pub day: Combobox,
    pub month: Combobox,
    pub year: Combobox,
    pub month_names: Vec<String>,
    pub buddhist_era: bool,
}

impl DateFields {
    pub fn thai(day: Combobox, month: Combobox, year: Combobox) -> Self {
        DateFields {
            day,
            month,
            year,
            month_names: THAI_MONTHS.iter().map(|m| m.to_string()).collect(),
            buddhist_era: true,
        }
    }

    /// Option texts for `date`: (day, month, year).
    pub fn option_texts(&self, date: Date) -> HarnessResult<(String, String, String)> {
        let month = self
            .month_names
            .get(usize::try_from(date.month() - 1).unwrap_or(usize::MAX))
            .ok_or_else(|| {
                HarnessError::Configuration(format!(
                    "no month name for month {}",
                    date.month()
                ))
            })?;
        let year = if self.buddhist_era {
            date.year() + BUDDHIST_ERA_OFFSET
        } else {
            date.year()
        };
        Ok((date.day().to_string(), month.clone(), year.to_string()))
    }
}

pub async fn fill_date(
    session: &Session,
    fields: &DateFields,
    date: Date,
) -> HarnessResult<()> {
    let (day, month, year) = fields.option_texts(date)?;
    select_option(session, &fields.day, &day, &day).await?;
    select_option(session, &fields.month, &month, &month).await?;
    select_option(session, &fields.year, &year, &year).await?;
    Ok(())
}

/// Chain of dependent comboboxes, parent first: province, district,
/// subdistrict. Changing a level resets every level below it.
#[derive(Debug, Clone)]
pub struct AddressCascade {
    pub levels: Vec<Combobox>,
    /// Postcode field filled in by the application once the last level is
    /// chosen.
    pub postcode: Option<Selector>,
}

impl AddressCascade {
    pub fn thai() -> Self {
        AddressCascade {
            levels: vec![
                Combobox::labelled("จังหวัด"),
                Combobox::labelled("อำเภอ"),
                Combobox::labelled("ตำบล"),
            ],
            postcode: Some(Selector::label("รหัสไปรษณีย์")),
        }
    }
}

/// Select `values` level by level. After every selection the dependent
/// levels are re-read: any of them that held a value must lose it before
/// the next level is chosen, otherwise the form would carry a child that is
/// inconsistent with its new parent.
pub async fn fill_address(
    session: &Session,
    cascade: &AddressCascade,
    values: &[&str],
) -> HarnessResult<()> {
    if values.len() > cascade.levels.len() {
        return Err(HarnessError::Configuration(format!(
            "{} address values for {} levels",
            values.len(),
            cascade.levels.len()
        )));
    }
    let page = session.page();
    for (depth, value) in values.iter().enumerate() {
        let dependents = &cascade.levels[depth + 1..];
        let mut before = Vec::with_capacity(dependents.len());
        for child in dependents {
            before.push(current_value(page, &child.trigger).await?);
        }

        select_option(session, &cascade.levels[depth], value, value).await?;

        for (child, stale) in dependents.iter().zip(before) {
            let Some(stale) = stale else { continue };
            let reset = wait_for(
                &format!("{} to reset", child.name),
                session.config().timeouts.cascade,
                || {
                    let stale = stale.clone();
                    async move {
                        Ok(current_value(page, &child.trigger).await?.as_deref()
                            != Some(stale.as_str()))
                    }
                },
            )
            .await;
            if let Err(HarnessError::Timeout { .. }) = reset {
                return Err(HarnessError::StaleDependentField {
                    field: child.name.clone(),
                    value: stale,
                });
            }
            reset?;
        }
    }

    if values.len() == cascade.levels.len() {
        if let Some(postcode) = &cascade.postcode {
            wait_for("postcode", session.config().timeouts.action, || async move {
                Ok(page.count(postcode).await? > 0
                    && !page.value(postcode).await?.is_empty())
            })
            .await?;
        }
    }
    info!("🏠 Address set to {}", values.join(" / "));
    Ok(())
}

/// Whether an entity type refuses to save without an image. Kept as data
/// because the application does not treat every entity alike.
#[derive(Debug, Clone)]
pub struct ImagePolicy {
    required: HashMap<String, bool>,
    default_required: bool,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        let mut required = HashMap::new();
        for entity in ["community", "store", "homestay", "package", "banner"] {
            required.insert(entity.to_string(), true);
        }
        required.insert("tag".to_string(), false);
        required.insert("account".to_string(), false);
        ImagePolicy {
            required,
            default_required: false,
        }
    }
}

impl ImagePolicy {
    pub fn requires_image(&self, entity: &str) -> bool {
        self.required
            .get(entity)
            .copied()
            .unwrap_or(self.default_required)
    }

    pub fn set(&mut self, entity: impl Into<String>, required: bool) {
        self.required.insert(entity.into(), required);
    }
}

/// One field to fill.
#[derive(Debug, Clone)]
pub enum FormField {
    Text {
        target: Selector,
        value: String,
    },
    Choice {
        combobox: Combobox,
        query: String,
        option: String,
    },
    Date {
        fields: DateFields,
        date: Date,
    },
    Address {
        cascade: AddressCascade,
        values: Vec<String>,
    },
    Files {
        widget: UploadWidget,
        files: Vec<String>,
    },
    Location {
        fields: LocationFields,
        input: GeoInput,
    },
}

impl FormField {
    pub fn text(label: &str, value: impl Into<String>) -> Self {
        FormField::Text {
            target: Selector::label(label),
            value: value.into(),
        }
    }

    pub fn choice(label: &str, option: impl Into<String>) -> Self {
        let option = option.into();
        FormField::Choice {
            combobox: Combobox::labelled(label),
            query: option.clone(),
            option,
        }
    }
}

pub async fn fill_field(session: &Session, field: &FormField) -> HarnessResult<()> {
    match field {
        FormField::Text { target, value } => fill_text(session, target, value).await,
        FormField::Choice {
            combobox,
            query,
            option,
        } => select_option(session, combobox, query, option).await,
        FormField::Date { fields, date } => fill_date(session, fields, *date).await,
        FormField::Address { cascade, values } => {
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            fill_address(session, cascade, &values).await
        }
        FormField::Files { widget, files } => {
            upload_files(session, widget, files).await.map(|_| ())
        }
        FormField::Location { fields, input } => {
            set_location(session, fields, input).await.map(|_| ())
        }
    }
}

pub async fn fill_form(session: &Session, fields: &[FormField]) -> HarnessResult<()> {
    for field in fields {
        fill_field(session, field).await?;
    }
    Ok(())
}
