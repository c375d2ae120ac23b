//! Serial suites: ordered steps sharing one session.
//!
//! Some business flows only make sense in order (block an account, then
//! try to log in as it). Such a suite owns a single session and runs its
//! steps one after the other. Once a step fails the shared page is in an
//! unknown state, so every later step is refused instead of run.

use futures::future::BoxFuture;
use tracing::{error, info};

use crate::error::{HarnessError, HarnessResult};
use crate::session::Session;

pub struct SerialSuite {
    name: String,
    session: Session,
    completed: Vec<String>,
    failed: Option<String>,
}

impl SerialSuite {
    pub fn new(name: impl Into<String>, session: Session) -> Self {
        SerialSuite {
            name: name.into(),
            session,
            completed: Vec::new(),
            failed: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Names of the steps that passed, in order.
    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    /// Run the next step. `body` gets the shared session mutably, so it can
    /// log out and back in as another role.
    pub async fn step<F>(&mut self, name: &str, body: F) -> anyhow::Result<()>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, anyhow::Result<()>>,
    {
        if let Some(failed_step) = &self.failed {
            return Err(HarnessError::SerialSuitePoisoned {
                failed_step: failed_step.clone(),
            }
            .into());
        }
        info!("🔗 {} / {name}", self.name);
        match body(&mut self.session).await {
            Ok(()) => {
                self.completed.push(name.to_string());
                Ok(())
            }
            Err(e) => {
                error!("{} / {name} failed: {e:#}", self.name);
                self.failed = Some(name.to_string());
                Err(e)
            }
        }
    }

    /// End the suite and hand the session back for teardown.
    pub fn finish(self) -> HarnessResult<Session> {
        match self.failed {
            Some(failed_step) => Err(HarnessError::SerialSuitePoisoned { failed_step }),
            None => Ok(self.session),
        }
    }

    /// Hand the session back regardless of failures.
    pub fn into_session(self) -> Session {
        self.session
    }
}
