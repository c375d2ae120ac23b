//! A scripted stand-in for the admin application, so the harness can be
//! tested without a browser.
//!
//! [`spawn_app`] builds a configuration with short timeouts and fixture
//! files in a temporary directory, plus a [`SessionProvider`] whose
//! launcher hands out clones of one [`MockPage`]. The page already knows
//! how to log accounts in and out; everything else is scripted per test.

pub mod mock;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use harness::config::Timeouts;
use harness::error::HarnessResult;
use harness::session::{Credentials, Launcher};
use harness::telemetry;
use harness::{HarnessConfig, Page, RoleId, Selector, SessionProvider};
use secrecy::SecretString;
use tempfile::TempDir;
use url::Url;

pub use mock::{MockDom, MockElement, MockPage};

pub const BASE_URL: &str = "http://app.test/";

/// Fixture files created in every app's asset directory.
pub const FIXTURES: &[&str] = &[
    "community-1.jpg",
    "community-2.jpg",
    "community-3.jpg",
    "banner.png",
    "intro.mp4",
];

/// An account the scripted login page accepts.
#[derive(Debug, Clone)]
pub struct MockAccount {
    pub username: String,
    pub password: String,
    /// Path the application redirects to after login.
    pub landing: String,
}

pub struct TestApp {
    pub page: MockPage,
    pub config: Arc<HarnessConfig>,
    pub sessions: SessionProvider,
    launches: Arc<AtomicUsize>,
    accounts: Arc<Mutex<Vec<MockAccount>>>,
    _dir: TempDir,
}

impl TestApp {
    /// How many pages the launcher has handed out.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn add_account(&self, account: MockAccount) {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.push(account);
        }
    }

    /// Put the page on `path` without going through navigation.
    pub fn set_path(&self, path: &str) {
        self.page.dom().url = url(path);
    }
}

struct MockLauncher {
    page: MockPage,
    launches: Arc<AtomicUsize>,
}

#[async_trait]
impl Launcher for MockLauncher {
    async fn launch(&self) -> HarnessResult<Box<dyn Page>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.page.clone()))
    }
}

/// Absolute URL of `path` on the scripted application.
pub fn url(path: &str) -> String {
    format!("{}{}", BASE_URL.trim_end_matches('/'), path)
}

pub fn admin_account() -> MockAccount {
    MockAccount {
        username: "admin@app.test".into(),
        password: "admin-password".into(),
        landing: "/admin/community/own".into(),
    }
}

pub fn superadmin_account() -> MockAccount {
    MockAccount {
        username: "super@app.test".into(),
        password: "super-password".into(),
        landing: "/super/communities".into(),
    }
}

pub fn credentials(account: &MockAccount) -> Credentials {
    Credentials {
        username: account.username.clone(),
        password: SecretString::from(account.password.clone()),
    }
}

pub fn short_timeouts() -> Timeouts {
    let ms = Duration::from_millis(500);
    Timeouts {
        action: ms,
        login: ms,
        navigation: ms,
        upload: ms,
        dialog: ms,
        cascade: ms,
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Like [`spawn_app`], with a chance to adjust the configuration before it
/// is frozen into the session provider.
pub async fn spawn_app_with(customize: impl FnOnce(&mut HarnessConfig)) -> TestApp {
    telemetry::init_test_logging();

    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    tokio::fs::create_dir_all(&assets).await.unwrap();
    for name in FIXTURES {
        tokio::fs::write(assets.join(name), b"fixture").await.unwrap();
    }

    let mut config = HarnessConfig::new(Url::parse(BASE_URL).unwrap());
    config.asset_dir = assets;
    config.download_dir = dir.path().join("downloads");
    config.screenshot_dir = dir.path().join("screenshots");
    config.timeouts = short_timeouts();
    let admin = admin_account();
    let superadmin = superadmin_account();
    config
        .roles
        .set_credentials(&RoleId::from("admin"), credentials(&admin));
    config
        .roles
        .set_credentials(&RoleId::from("superadmin"), credentials(&superadmin));
    customize(&mut config);
    let config = Arc::new(config);

    let page = MockPage::new();
    let accounts = Arc::new(Mutex::new(vec![admin, superadmin]));
    script_login(&page, &config, Arc::clone(&accounts));

    let launches = Arc::new(AtomicUsize::new(0));
    let launcher = MockLauncher {
        page: page.clone(),
        launches: Arc::clone(&launches),
    };
    TestApp {
        sessions: SessionProvider::new(Arc::clone(&config), Box::new(launcher)),
        page,
        config,
        launches,
        accounts,
        _dir: dir,
    }
}

pub fn login_error() -> Selector {
    Selector::css(".login-error")
}

/// Login form that redirects known accounts to their landing page a couple
/// of polls after submit, and a logout button that returns to the login
/// page.
fn script_login(
    page: &MockPage,
    config: &HarnessConfig,
    accounts: Arc<Mutex<Vec<MockAccount>>>,
) {
    let form = &config.login_form;
    let username = form.username.strategies[0].clone();
    let password = form.password.strategies[0].clone();
    let submit = form.submit.strategies[0].clone();
    let logout = form.logout.strategies[0].clone();
    let login_url = url(&config.login_path);

    {
        let mut dom = page.dom();
        dom.show(&username, "");
        dom.show(&password, "");
        dom.show(&submit, "เข้าสู่ระบบ");
    }

    let logout_selector = logout.clone();
    page.on_click(&submit, move |dom, _| {
        let entered = (dom.value(&username), dom.value(&password));
        let account = accounts.lock().ok().and_then(|accounts| {
            accounts
                .iter()
                .find(|a| a.username == entered.0 && a.password == entered.1)
                .cloned()
        });
        match account {
            Some(account) => {
                let logout = logout_selector.clone();
                dom.after(2, move |dom| {
                    dom.url = url(&account.landing);
                    dom.show(&logout, "ออกจากระบบ");
                });
            }
            None => dom.show(&login_error(), "อีเมลหรือรหัสผ่านไม่ถูกต้อง"),
        }
    });

    let shown_logout = logout.clone();
    page.on_click(&logout, move |dom, _| {
        dom.url = login_url.clone();
        dom.hide(&shown_logout);
    });
}
