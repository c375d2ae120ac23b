//! Files the harness leaves behind: screenshots keyed by scenario title,
//! and downloaded reports checked for existence.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use crate::error::HarnessResult;
use crate::session::Session;
use crate::wait::wait_for;

/// File-system safe form of a scenario title. Letters and digits of any
/// script are kept, every other run of characters becomes one `_`.
pub fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_separator = false;
    for c in title.chars() {
        // Thai vowel and tone marks are combining characters, not letters.
        if c.is_alphanumeric() || is_combining_mark(c) || c == '-' {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(c);
        } else {
            pending_separator = true;
        }
    }
    if out.is_empty() {
        out.push_str("untitled");
    }
    out
}

fn is_combining_mark(c: char) -> bool {
    matches!(c,
        '\u{0E31}' | '\u{0E34}'..='\u{0E3A}' | '\u{0E47}'..='\u{0E4E}'
        | '\u{0300}'..='\u{036F}')
}

pub fn screenshot_path(dir: &Path, title: &str) -> PathBuf {
    dir.join(format!("{}.png", sanitize_title(title)))
}

/// Write a full-page screenshot for `title` and return its path.
pub async fn capture_screenshot(session: &Session, title: &str) -> HarnessResult<PathBuf> {
    let dir = &session.config().screenshot_dir;
    tokio::fs::create_dir_all(dir).await?;
    let path = screenshot_path(dir, title);
    let png = session.page().screenshot().await?;
    tokio::fs::write(&path, png).await?;
    info!("📸 Screenshot saved to {}", path.display());
    Ok(path)
}

/// Run one scenario body. On failure a screenshot is captured before the
/// error is returned; with `screenshot_always` it is captured regardless.
/// A failing capture is logged and never hides the scenario's own error.
pub async fn run_scenario<T, Fut>(
    session: &Session,
    title: &str,
    body: Fut,
) -> anyhow::Result<T>
where
    Fut: Future<Output = anyhow::Result<T>>,
{
    info!("▶️ {title}");
    let result = body.await;
    if result.is_err() || session.config().screenshot_always {
        if let Err(e) = capture_screenshot(session, title).await {
            warn!("Could not capture screenshot for '{title}': {e}");
        }
    }
    match &result {
        Ok(_) => info!("✅ {title}"),
        Err(e) => warn!("❌ {title}: {e:#}"),
    }
    result.with_context(|| format!("scenario '{title}' failed"))
}

/// Wait until `name` exists in the download directory and return its path.
/// Only existence is checked.
pub async fn wait_for_download(
    session: &Session,
    name: &str,
    timeout: Duration,
) -> HarnessResult<PathBuf> {
    let path = session.config().download_dir.join(name);
    let target = &path;
    wait_for(&format!("download {}", path.display()), timeout, || async move {
        Ok(tokio::fs::try_exists(target).await?)
    })
    .await?;
    Ok(path)
}
