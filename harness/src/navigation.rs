//! "Go to page X" with a URL postcondition.
//!
//! A destination is a click path (menu, then item) and the URL pattern that
//! must hold afterwards. The click path is always issued, even when the
//! session already sits on the destination; repeating `go_to` is harmless
//! because the postcondition is what gets checked.

use std::fmt;

use tracing::info;
use url::Url;

use crate::error::{HarnessError, HarnessResult};
use crate::locator::{LocatorChain, Selector};
use crate::session::Session;
use crate::wait::wait_for;

/// A path pattern such as `/super/community/:id/edit`.
///
/// `:name` matches exactly one non-empty segment and a trailing `*` matches
/// any remainder, including nothing. Query string, fragment and a trailing
/// slash are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern(String);

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl UrlPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        UrlPattern(pattern.into())
    }

    /// Match either a full URL or a bare path.
    pub fn matches(&self, url: &str) -> bool {
        let path = match Url::parse(url) {
            Ok(url) => url.path().to_string(),
            Err(_) => url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        let actual = segments(&path);
        let expected = segments(&self.0);

        for (i, pattern) in expected.iter().enumerate() {
            if *pattern == "*" && i + 1 == expected.len() {
                return true;
            }
            let Some(segment) = actual.get(i) else {
                return false;
            };
            let matched = match pattern.strip_prefix(':') {
                Some(_) => !segment.is_empty(),
                None => pattern == segment,
            };
            if !matched {
                return false;
            }
        }
        actual.len() == expected.len()
    }

    /// Values bound to the `:name` segments, in order.
    pub fn captures(&self, url: &str) -> Option<Vec<(String, String)>> {
        if !self.matches(url) {
            return None;
        }
        let path = Url::parse(url)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| url.to_string());
        let actual = segments(&path);
        Some(
            segments(&self.0)
                .iter()
                .zip(actual)
                .filter_map(|(pattern, value)| {
                    pattern
                        .strip_prefix(':')
                        .map(|name| (name.to_string(), value.to_string()))
                })
                .collect(),
        )
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[derive(Debug, Clone)]
pub struct Destination {
    pub key: String,
    /// Clicked in order, each resolved through its own fallback chain.
    pub clicks: Vec<LocatorChain>,
    pub expect: UrlPattern,
}

impl Destination {
    pub fn new(key: impl Into<String>, expect: UrlPattern) -> Self {
        Destination {
            key: key.into(),
            clicks: Vec::new(),
            expect,
        }
    }

    pub fn via(mut self, step: impl Into<LocatorChain>) -> Self {
        self.clicks.push(step.into());
        self
    }
}

/// Every destination a scenario may ask for, by key.
#[derive(Debug, Clone)]
pub struct Destinations {
    entries: Vec<Destination>,
}

fn menu(label: &str) -> LocatorChain {
    LocatorChain::new(label)
        .or(Selector::LinkText(label.to_string()))
        .or(Selector::role("link", label))
        .or(Selector::role("menuitem", label))
        .or(Selector::text(label))
}

impl Default for Destinations {
    fn default() -> Self {
        let mut table = Destinations {
            entries: Vec::new(),
        };
        table.insert(
            Destination::new("admin.community", UrlPattern::new("/admin/community/own"))
                .via(menu("ข้อมูลวิสาหกิจ")),
        );
        table.insert(
            Destination::new("admin.stores", UrlPattern::new("/admin/stores"))
                .via(menu("ร้านค้า")),
        );
        table.insert(
            Destination::new("admin.homestays", UrlPattern::new("/admin/homestays"))
                .via(menu("ที่พัก")),
        );
        table.insert(
            Destination::new("admin.packages", UrlPattern::new("/admin/packages"))
                .via(menu("แพ็กเกจ")),
        );
        table.insert(
            Destination::new("admin.members", UrlPattern::new("/admin/members"))
                .via(menu("สมาชิก")),
        );
        table.insert(
            Destination::new("super.communities", UrlPattern::new("/super/communities"))
                .via(menu("วิสาหกิจชุมชน")),
        );
        table.insert(
            Destination::new("super.accounts", UrlPattern::new("/super/accounts"))
                .via(menu("บัญชีผู้ใช้")),
        );
        table.insert(
            Destination::new("super.tags", UrlPattern::new("/super/tags"))
                .via(menu("แท็ก")),
        );
        table.insert(
            Destination::new("super.banners", UrlPattern::new("/super/banners"))
                .via(menu("แบนเนอร์")),
        );
        table.insert(
            Destination::new("super.reports", UrlPattern::new("/super/reports"))
                .via(menu("รายงาน")),
        );
        table.insert(
            Destination::new("super.requests", UrlPattern::new("/super/requests"))
                .via(menu("คำขอ")),
        );
        table
    }
}

impl Destinations {
    pub fn empty() -> Self {
        Destinations {
            entries: Vec::new(),
        }
    }

    /// Register a destination, replacing one with the same key.
    pub fn insert(&mut self, destination: Destination) {
        self.entries.retain(|d| d.key != destination.key);
        self.entries.push(destination);
    }

    pub fn get(&self, key: &str) -> HarnessResult<&Destination> {
        self.entries.iter().find(|d| d.key == key).ok_or_else(|| {
            HarnessError::Configuration(format!("unknown destination '{key}'"))
        })
    }
}

/// Click through to `key` and wait for its URL pattern.
pub async fn go_to(session: &Session, key: &str) -> HarnessResult<()> {
    let destination = session.config().destinations.get(key)?;
    go_to_destination(session, destination).await
}

pub async fn go_to_destination(
    session: &Session,
    destination: &Destination,
) -> HarnessResult<()> {
    info!("🧭 Navigating to {}", destination.key);
    let page = session.page();
    for step in &destination.clicks {
        let target = step.resolve(page).await?;
        page.click(&target, 0).await?;
    }
    expect_url(session, &destination.key, &destination.expect).await
}

/// Wait for the current URL to match `pattern`, reporting a
/// [`HarnessError::NavigationTimeout`] otherwise.
pub async fn expect_url(
    session: &Session,
    label: &str,
    pattern: &UrlPattern,
) -> HarnessResult<()> {
    let page = session.page();
    let reached = wait_for(
        &format!("url {pattern}"),
        session.config().timeouts.navigation,
        || async move { Ok(pattern.matches(&page.current_url().await?)) },
    )
    .await;
    match reached {
        Err(HarnessError::Timeout { .. }) => Err(HarnessError::NavigationTimeout {
            destination: label.to_string(),
            expected: pattern.to_string(),
            actual: page.current_url().await?,
        }),
        other => other,
    }
}
