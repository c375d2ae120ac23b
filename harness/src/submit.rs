//! The Save / Confirm / Cancel protocol shared by every editable entity.
//!
//! ```text
//! Idle -> Submitting -> ConfirmPending -> Success
//!                  \                  \-> ValidationError
//!                   \-> ValidationError \-> Cancelled
//! ```
//!
//! The three terminal states are mutually exclusive; the only way out of
//! one is a new Save.

use tracing::{debug, info};

use crate::error::{HarnessError, HarnessResult};
use crate::locator::{LocatorChain, Selector};
use crate::page::{Page, Target};
use crate::session::Session;
use crate::wait::{DEFAULT_POLL_INTERVAL, poll_until, wait_for};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Submitting,
    ConfirmPending,
    Success,
    ValidationError,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitEvent {
    Save,
    ModalShown,
    /// Client-side validation stopped the form before any modal.
    InlineErrorShown,
    Confirm,
    Cancel,
    SuccessShown,
    ErrorShown,
}

impl SubmitState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SubmitState::Success | SubmitState::ValidationError | SubmitState::Cancelled
        )
    }

    pub fn advance(self, event: SubmitEvent) -> HarnessResult<SubmitState> {
        use SubmitEvent as E;
        use SubmitState as S;
        let next = match (self, event) {
            (S::Idle, E::Save) => S::Submitting,
            (s, E::Save) if s.is_terminal() => S::Submitting,
            (S::Submitting, E::ModalShown) => S::ConfirmPending,
            (S::Submitting, E::InlineErrorShown) => S::ValidationError,
            (S::ConfirmPending, E::Cancel) => S::Cancelled,
            // Confirm keeps the machine pending until a result is observed.
            (S::ConfirmPending, E::Confirm) => S::ConfirmPending,
            (S::ConfirmPending, E::SuccessShown) => S::Success,
            (S::ConfirmPending, E::ErrorShown | E::InlineErrorShown) => {
                S::ValidationError
            }
            (state, event) => {
                return Err(HarnessError::UnexpectedState(format!(
                    "{event:?} while {state:?}"
                )));
            }
        };
        debug!("submit {self:?} --{event:?}--> {next:?}");
        Ok(next)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Success,
    /// The application rejected the data, either in a dialog or inline.
    ValidationError { messages: Vec<String> },
    Cancelled,
}

impl SubmitOutcome {
    pub fn expect_success(&self) -> HarnessResult<()> {
        match self {
            SubmitOutcome::Success => Ok(()),
            other => Err(HarnessError::AssertionFailed(format!(
                "expected success, got {other:?}"
            ))),
        }
    }

    /// The validation messages, failing if the submission did not end in a
    /// validation error.
    pub fn expect_validation_error(&self) -> HarnessResult<&[String]> {
        match self {
            SubmitOutcome::ValidationError { messages } => Ok(messages),
            other => Err(HarnessError::AssertionFailed(format!(
                "expected a validation error, got {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Cancel,
}

/// Where the controls of the protocol live.
#[derive(Debug, Clone)]
pub struct SubmitControls {
    pub save: LocatorChain,
    pub confirm: Selector,
    pub cancel: Selector,
    pub success: Selector,
    pub error_dialog: Selector,
    /// Field-level validation messages. Page-wide alerts and toasts are not
    /// inline errors.
    pub inline_error: Selector,
    /// Closes a result dialog.
    pub acknowledge: Selector,
}

impl Default for SubmitControls {
    fn default() -> Self {
        let dialog = Selector::any_role("dialog");
        SubmitControls {
            save: LocatorChain::new("save")
                .or(Selector::button("บันทึก"))
                .or(Selector::css("button[type='submit']")),
            confirm: Selector::button("ยืนยัน").within(dialog.clone()),
            cancel: Selector::button("ยกเลิก").within(dialog.clone()),
            success: Selector::text("สำเร็จ").within(dialog.clone()),
            error_dialog: Selector::text("ผิดพลาด").within(dialog.clone()),
            inline_error: Selector::css(
                ".ant-form-item-explain-error, .invalid-feedback, .field-error",
            ),
            acknowledge: Selector::button("ตกลง").within(dialog),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Observed {
    modal: bool,
    success: bool,
    error_dialog: bool,
    /// Inline errors not already on the page before the last click.
    new_errors: Vec<String>,
}

/// `current` minus one occurrence of every text in `before`.
fn new_messages(current: Vec<String>, before: &[String]) -> Vec<String> {
    let mut old = before.to_vec();
    current
        .into_iter()
        .filter(|text| match old.iter().position(|seen| seen == text) {
            Some(i) => {
                old.swap_remove(i);
                false
            }
            None => true,
        })
        .collect()
}

async fn observe(
    page: &dyn Page,
    controls: &SubmitControls,
    before: &[String],
) -> HarnessResult<Observed> {
    Ok(Observed {
        modal: page.count(&controls.confirm).await? > 0
            && page.count(&controls.cancel).await? > 0,
        success: page.count(&controls.success).await? > 0,
        error_dialog: page.count(&controls.error_dialog).await? > 0,
        new_errors: new_messages(page.texts(&controls.inline_error).await?, before),
    })
}

/// Click Save, then answer the confirmation modal with `decision`.
pub async fn submit(
    session: &Session,
    controls: &SubmitControls,
    decision: Decision,
) -> HarnessResult<SubmitOutcome> {
    let save = controls.save.resolve(session.page()).await?;
    submit_via(session, controls, &Target::from(save), decision).await
}

/// Same protocol with another trigger than Save, e.g. an approve or block
/// action in a table row.
///
/// Inline errors already showing when a button is clicked are left over
/// from an earlier attempt and only count if nothing else happens: a Save
/// that neither opens the modal nor adds an error, while old errors stay
/// on the page, reports those errors.
pub async fn submit_via(
    session: &Session,
    controls: &SubmitControls,
    trigger: &Target,
    decision: Decision,
) -> HarnessResult<SubmitOutcome> {
    let page = session.page();
    let timeouts = &session.config().timeouts;

    let mut state = SubmitState::Idle.advance(SubmitEvent::Save)?;
    let before = &page.texts(&controls.inline_error).await?;
    trigger.click(page).await?;

    let first = poll_until(
        "confirmation modal",
        timeouts.action,
        DEFAULT_POLL_INTERVAL,
        || async move {
            let seen = observe(page, controls, before).await?;
            Ok((seen.modal || !seen.new_errors.is_empty()).then_some(seen))
        },
    )
    .await;
    let first = match first {
        Ok(seen) => seen,
        Err(timeout @ HarnessError::Timeout { .. }) => {
            let messages = page.texts(&controls.inline_error).await?;
            if messages.is_empty() {
                return Err(timeout);
            }
            state = state.advance(SubmitEvent::InlineErrorShown)?;
            debug!("ended in {state:?}, earlier errors still shown");
            return Ok(SubmitOutcome::ValidationError { messages });
        }
        Err(e) => return Err(e),
    };
    if !first.modal {
        state = state.advance(SubmitEvent::InlineErrorShown)?;
        debug!("ended in {state:?} before any modal");
        return Ok(SubmitOutcome::ValidationError {
            messages: first.new_errors,
        });
    }
    state = state.advance(SubmitEvent::ModalShown)?;

    match decision {
        Decision::Cancel => {
            page.click(&controls.cancel, 0).await?;
            state = state.advance(SubmitEvent::Cancel)?;
            wait_for("confirmation modal to close", timeouts.action, || async move {
                Ok(page.count(&controls.confirm).await? == 0)
            })
            .await?;
            let after = observe(page, controls, before).await?;
            if after.success || after.error_dialog {
                return Err(HarnessError::AmbiguousOutcome(
                    "result dialog shown after cancel".into(),
                ));
            }
            info!("↩️ Submission cancelled");
            debug!("ended in {state:?}");
            Ok(SubmitOutcome::Cancelled)
        }
        Decision::Confirm => {
            let before = &page.texts(&controls.inline_error).await?;
            page.click(&controls.confirm, 0).await?;
            state = state.advance(SubmitEvent::Confirm)?;
            let seen = poll_until(
                "submission result",
                timeouts.dialog,
                DEFAULT_POLL_INTERVAL,
                || async move {
                    let seen = observe(page, controls, before).await?;
                    let any = seen.success || seen.error_dialog || !seen.new_errors.is_empty();
                    Ok(any.then_some(seen))
                },
            )
            .await?;

            let kinds = [seen.success, seen.error_dialog, !seen.new_errors.is_empty()]
                .iter()
                .filter(|shown| **shown)
                .count();
            if kinds > 1 {
                return Err(HarnessError::AmbiguousOutcome(format!("{seen:?}")));
            }
            if seen.success {
                state = state.advance(SubmitEvent::SuccessShown)?;
                info!("✅ Submission succeeded");
                debug!("ended in {state:?}");
                return Ok(SubmitOutcome::Success);
            }
            let (event, messages) = if seen.error_dialog {
                (
                    SubmitEvent::ErrorShown,
                    page.texts(&controls.error_dialog).await?,
                )
            } else {
                (SubmitEvent::InlineErrorShown, seen.new_errors)
            };
            state = state.advance(event)?;
            info!("⚠️ Submission rejected: {}", messages.join("; "));
            debug!("ended in {state:?}");
            Ok(SubmitOutcome::ValidationError { messages })
        }
    }
}

/// Close a result dialog and wait until it is gone.
pub async fn acknowledge(session: &Session, controls: &SubmitControls) -> HarnessResult<()> {
    let page = session.page();
    page.click(&controls.acknowledge, 0).await?;
    wait_for(
        "result dialog to close",
        session.config().timeouts.action,
        || async move {
            Ok(page.count(&controls.success).await? == 0
                && page.count(&controls.error_dialog).await? == 0)
        },
    )
    .await
}
