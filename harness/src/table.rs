//! Assertions over list pages: filtered rows, "no data" sentinels,
//! pagination and row actions.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::{HarnessError, HarnessResult};
use crate::locator::Selector;
use crate::page::{Page, Target};
use crate::session::Session;
use crate::wait::wait_for;

#[derive(Debug, Clone)]
pub struct Table {
    pub rows: Selector,
    /// Cells, relative to one row.
    pub cells: Selector,
    pub headers: Selector,
    /// Text of the single placeholder row rendered for an empty result.
    pub no_data: String,
    /// Element showing e.g. "1-10 of 42".
    pub pagination: Option<Selector>,
}

impl Default for Table {
    fn default() -> Self {
        Table {
            rows: Selector::css("table tbody tr"),
            cells: Selector::css("td"),
            headers: Selector::css("table thead th"),
            no_data: "ไม่พบข้อมูล".into(),
            pagination: Some(Selector::css(".ant-pagination, nav[aria-label='pagination']")),
        }
    }
}

/// One body row: its full text and each cell's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub text: String,
    pub cells: Vec<String>,
}

impl Row {
    pub fn contains_ignore_case(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.cells
            .iter()
            .chain(std::iter::once(&self.text))
            .any(|cell| cell.to_lowercase().contains(&term))
    }
}

impl Table {
    /// Visible body rows. Hidden rows (measure rows, collapsed details) are
    /// skipped, and every index used by this type counts visible rows only.
    pub async fn rows(&self, page: &dyn Page) -> HarnessResult<Vec<Row>> {
        let texts = page.texts(&self.rows).await?;
        let mut rows = Vec::with_capacity(texts.len());
        for (i, text) in texts.into_iter().enumerate() {
            let cells = page.texts_within(&self.rows, i, &self.cells).await?;
            rows.push(Row { text, cells });
        }
        Ok(rows)
    }

    fn is_sentinel(&self, rows: &[Row]) -> bool {
        rows.len() == 1 && rows[0].text.contains(&self.no_data)
    }

    /// Every row satisfies `predicate`. An empty table, or one showing only
    /// the "no data" row, fails: use [`Table::verify_no_data`] when nothing
    /// is expected.
    pub async fn verify_filtered<F>(
        &self,
        page: &dyn Page,
        description: &str,
        predicate: F,
    ) -> HarnessResult<usize>
    where
        F: Fn(&Row) -> bool,
    {
        let rows = self.rows(page).await?;
        if rows.is_empty() || self.is_sentinel(&rows) {
            return Err(HarnessError::AssertionFailed(format!(
                "no rows left to check for {description}"
            )));
        }
        if let Some(row) = rows.iter().find(|row| !predicate(row)) {
            return Err(HarnessError::AssertionFailed(format!(
                "row '{}' does not satisfy {description}",
                row.text
            )));
        }
        debug!("{} row(s) satisfy {description}", rows.len());
        Ok(rows.len())
    }

    /// Every row mentions `term` in some column, ignoring case.
    pub async fn verify_contains_term(&self, page: &dyn Page, term: &str) -> HarnessResult<usize> {
        self.verify_filtered(page, &format!("containing '{term}'"), |row| {
            row.contains_ignore_case(term)
        })
        .await
    }

    /// Column `column` (0-based) of every row equals `value`.
    pub async fn verify_column_equals(
        &self,
        page: &dyn Page,
        column: usize,
        value: &str,
    ) -> HarnessResult<usize> {
        self.verify_filtered(page, &format!("column {column} == '{value}'"), |row| {
            row.cells.get(column).map(|cell| cell.trim()) == Some(value)
        })
        .await
    }

    /// Exactly one row, and it is the "no data" placeholder.
    pub async fn verify_no_data(&self, page: &dyn Page) -> HarnessResult<()> {
        let rows = self.rows(page).await?;
        if self.is_sentinel(&rows) {
            return Ok(());
        }
        Err(HarnessError::AssertionFailed(format!(
            "expected a single '{}' row, found {} row(s)",
            self.no_data,
            rows.len()
        )))
    }

    /// Headers are shown, the page holds at most `rows_per_page` rows and
    /// the pager is present whenever the page is full.
    pub async fn verify_pagination(&self, page: &dyn Page, rows_per_page: usize) -> HarnessResult<usize> {
        if page.count(&self.headers).await? == 0 {
            return Err(HarnessError::AssertionFailed("table header missing".into()));
        }
        let count = page.count(&self.rows).await?;
        if count > rows_per_page {
            return Err(HarnessError::AssertionFailed(format!(
                "{count} rows exceed {rows_per_page} per page"
            )));
        }
        if let Some(pager) = &self.pagination {
            if count == rows_per_page && page.count(pager).await? == 0 {
                return Err(HarnessError::AssertionFailed(
                    "full page without a pager".into(),
                ));
            }
        }
        Ok(count)
    }

    /// Index of the first row whose text contains `needle`.
    pub async fn find_row(&self, page: &dyn Page, needle: &str) -> HarnessResult<usize> {
        let texts = page.texts(&self.rows).await?;
        texts
            .iter()
            .position(|text| text.contains(needle))
            .ok_or_else(|| {
                HarnessError::AssertionFailed(format!("no row contains '{needle}'"))
            })
    }

    /// `action` inside the first row containing `needle`.
    pub async fn row_action(
        &self,
        page: &dyn Page,
        needle: &str,
        action: &Selector,
    ) -> HarnessResult<Target> {
        let nth = self.find_row(page, needle).await?;
        Ok(Target::Within {
            scope: self.rows.clone(),
            nth,
            selector: action.clone(),
        })
    }

    /// Click `action` inside the first row containing `needle`.
    pub async fn click_row_action(
        &self,
        page: &dyn Page,
        needle: &str,
        action: &Selector,
    ) -> HarnessResult<()> {
        let target = self.row_action(page, needle, action).await?;
        info!("👆 {action} on row '{needle}'");
        target.click(page).await
    }

    /// Wait until no row contains `needle`.
    pub async fn wait_row_gone(
        &self,
        page: &dyn Page,
        needle: &str,
        timeout: Duration,
    ) -> HarnessResult<()> {
        let rows = &self.rows;
        wait_for(&format!("row '{needle}' to disappear"), timeout, || async move {
            let texts = page.texts(rows).await?;
            Ok(!texts.iter().any(|text| text.contains(needle)))
        })
        .await
    }
}

/// `selector` becomes visible within the action timeout.
pub async fn expect_visible(session: &Session, selector: &Selector) -> HarnessResult<()> {
    let page = session.page();
    wait_for(&format!("{selector} to be visible"), session.config().timeouts.action, || async move {
        Ok(page.count(selector).await? > 0)
    })
    .await
    .map_err(|e| match e {
        HarnessError::Timeout { .. } => {
            HarnessError::AssertionFailed(format!("{selector} never became visible"))
        }
        other => other,
    })
}

/// `selector` is hidden (or detached) within the action timeout.
pub async fn expect_hidden(session: &Session, selector: &Selector) -> HarnessResult<()> {
    let page = session.page();
    wait_for(&format!("{selector} to be hidden"), session.config().timeouts.action, || async move {
        Ok(page.count(selector).await? == 0)
    })
    .await
    .map_err(|e| match e {
        HarnessError::Timeout { .. } => {
            HarnessError::AssertionFailed(format!("{selector} is still visible"))
        }
        other => other,
    })
}

/// Some visible element contains `text`.
pub async fn expect_text(session: &Session, text: &str) -> HarnessResult<()> {
    expect_visible(session, &Selector::text(text)).await
}
