//! Multi-file upload widgets with a delete control per uploaded slot.
//!
//! The file inputs in these widgets do not take a batch reliably, so files
//! go in one at a time. After each file the harness waits until the number
//! of delete controls has grown by exactly one; a batch is never assumed
//! complete from a single wait.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::locator::Selector;
use crate::session::Session;
use crate::wait::{DEFAULT_POLL_INTERVAL, poll_until, wait_for};

#[derive(Debug, Clone)]
pub struct UploadWidget {
    pub name: String,
    /// The `<input type="file">`, usually hidden.
    pub input: Selector,
    /// One per occupied slot.
    pub delete_control: Selector,
}

impl UploadWidget {
    pub fn new(
        name: impl Into<String>,
        input: Selector,
        delete_control: Selector,
    ) -> Self {
        UploadWidget {
            name: name.into(),
            input,
            delete_control,
        }
    }
}

/// One occupied position in a widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSlot {
    pub index: usize,
    pub file: PathBuf,
}

/// Absolute path of a fixture under the asset directory. Absolute paths are
/// taken as they are.
pub fn resolve_fixture(config: &HarnessConfig, name: impl AsRef<Path>) -> HarnessResult<PathBuf> {
    let name = name.as_ref();
    let path = if name.is_absolute() {
        name.to_path_buf()
    } else {
        config.asset_dir.join(name)
    };
    if !path.is_file() {
        return Err(HarnessError::MissingFixture(path));
    }
    Ok(path.canonicalize()?)
}

/// Upload `files` in order, holding a barrier on the delete-control count
/// after each one. Returns the slots that were filled.
pub async fn upload_files<P: AsRef<Path>>(
    session: &Session,
    widget: &UploadWidget,
    files: &[P],
) -> HarnessResult<Vec<UploadSlot>> {
    let page = session.page();
    let paths = files
        .iter()
        .map(|file| resolve_fixture(session.config(), file))
        .collect::<HarnessResult<Vec<_>>>()?;

    let before = page.count(&widget.delete_control).await?;
    let mut slots = Vec::with_capacity(paths.len());
    for (i, path) in paths.into_iter().enumerate() {
        let expected = before + i + 1;
        page.upload(&widget.input, &path).await?;

        let delete_control = &widget.delete_control;
        let settled = poll_until(
            &format!("{} delete controls in {}", expected, widget.name),
            session.config().timeouts.upload,
            DEFAULT_POLL_INTERVAL,
            || async move {
                let count = page.count(delete_control).await?;
                Ok((count >= expected).then_some(count))
            },
        )
        .await;
        let actual = match settled {
            Ok(count) => count,
            Err(HarnessError::Timeout { .. }) => {
                page.count(&widget.delete_control).await?
            }
            Err(e) => return Err(e),
        };
        if actual != expected {
            return Err(HarnessError::UploadCountMismatch {
                file: path.display().to_string(),
                expected,
                actual,
            });
        }
        debug!("{} slot {} <- {}", widget.name, expected - 1, path.display());
        slots.push(UploadSlot {
            index: expected - 1,
            file: path,
        });
    }
    info!("📎 Uploaded {} file(s) into {}", slots.len(), widget.name);
    Ok(slots)
}

/// Click the delete control of slot `index` and wait for the count to drop
/// by one.
pub async fn remove_slot(
    session: &Session,
    widget: &UploadWidget,
    index: usize,
) -> HarnessResult<()> {
    let page = session.page();
    let before = page.count(&widget.delete_control).await?;
    if index >= before {
        return Err(HarnessError::AssertionFailed(format!(
            "{} has {before} slot(s), cannot remove #{index}",
            widget.name
        )));
    }
    page.click(&widget.delete_control, index).await?;
    let delete_control = &widget.delete_control;
    wait_for(
        &format!("{} to drop to {} slot(s)", widget.name, before - 1),
        session.config().timeouts.action,
        || async move { Ok(page.count(delete_control).await? == before - 1) },
    )
    .await
}
