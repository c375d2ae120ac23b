//! Browser harness for the admin and super-admin consoles.
//!
//! Every scenario is one linear pass:
//!
//! ```text
//! SessionProvider::login(role)      -> Session past the login page
//! navigation::go_to(session, key)   -> known starting page
//! form::fill_form / upload / geo    -> zero or more fields
//! submit::submit(.., Decision)      -> Success | ValidationError | Cancelled
//! table / expect_* assertions       -> resulting UI state
//! ```
//!
//! Helpers only talk to the [`page::Page`] seam, so they run unchanged
//! against a real browser ([`page::WebDriverPage`]) and against the scripted
//! page in `test-helpers`.

pub mod artifacts;
pub mod config;
pub mod environment;
pub mod error;
pub mod form;
pub mod geo;
pub mod locator;
pub mod navigation;
pub mod page;
pub mod serial;
pub mod session;
pub mod submit;
pub mod table;
pub mod telemetry;
pub mod upload;
pub mod wait;

pub use config::{HarnessConfig, Timeouts};
pub use environment::TestEnvironment;
pub use error::{HarnessError, HarnessResult};
pub use locator::{LocatorChain, Selector};
pub use page::{Page, Target};
pub use session::{Launcher, RoleId, Session, SessionProvider};
