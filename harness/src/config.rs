use std::env::var;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::{HarnessError, HarnessResult};
use crate::form::ImagePolicy;
use crate::navigation::{Destinations, UrlPattern};
use crate::session::{Credentials, LoginForm, RoleId, RoleTable};

/// Bounded waits used across the harness.
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Elements appearing or disappearing after a click.
    pub action: Duration,
    pub login: Duration,
    pub navigation: Duration,
    /// Per file, for the delete-control count to catch up.
    pub upload: Duration,
    /// Result dialogs after a confirmed submission.
    pub dialog: Duration,
    /// Dependent combobox reset after its parent changed.
    pub cascade: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            action: Duration::from_secs(5),
            login: Duration::from_secs(10),
            navigation: Duration::from_secs(10),
            upload: Duration::from_secs(15),
            dialog: Duration::from_secs(10),
            cascade: Duration::from_secs(5),
        }
    }
}

pub struct HarnessConfig {
    pub base_url: Url,
    pub login_path: String,
    pub login_form: LoginForm,
    /// Use an already running WebDriver endpoint instead of spawning
    /// geckodriver.
    pub webdriver_url: Option<String>,
    /// Lowest port tried when spawning geckodriver; each attempt picks a
    /// random port at most 100 above it.
    pub geckodriver_port: u16,
    pub geckodriver_attempts: u32,
    pub headless: bool,
    /// Fixture images and videos handed to upload widgets.
    pub asset_dir: PathBuf,
    pub download_dir: PathBuf,
    pub screenshot_dir: PathBuf,
    /// Capture a screenshot after every scenario, not only failing ones.
    pub screenshot_always: bool,
    pub timeouts: Timeouts,
    pub roles: RoleTable,
    pub destinations: Destinations,
    pub images: ImagePolicy,
}

impl HarnessConfig {
    /// Defaults pointing at `base_url`, with the built-in role and
    /// destination tables and no credentials.
    pub fn new(base_url: Url) -> Self {
        HarnessConfig {
            base_url,
            login_path: "/login".into(),
            login_form: LoginForm::default(),
            webdriver_url: None,
            geckodriver_port: 4444,
            geckodriver_attempts: 5,
            headless: true,
            asset_dir: PathBuf::from("assets"),
            download_dir: PathBuf::from("downloads"),
            screenshot_dir: PathBuf::from("screenshots"),
            screenshot_always: false,
            timeouts: Timeouts::default(),
            roles: RoleTable::default(),
            destinations: Destinations::default(),
            images: ImagePolicy::default(),
        }
    }

    /// Read configuration from the environment, loading `.env` first if
    /// present.
    ///
    /// Credentials are looked up per known role as `<ROLE>_USERNAME` and
    /// `<ROLE>_PASSWORD`; `<ROLE>_LANDING` overrides the landing pattern.
    pub fn from_env() -> HarnessResult<Self> {
        dotenvy::dotenv().ok();

        let base_url = var("BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let base_url = Url::parse(&base_url).map_err(|e| {
            HarnessError::Configuration(format!("BASE_URL '{base_url}': {e}"))
        })?;
        let mut config = HarnessConfig::new(base_url);

        if let Ok(path) = var("LOGIN_PATH") {
            config.login_path = path;
        }
        config.webdriver_url = var("WEBDRIVER_URL").ok();
        if let Some(port) = number("GECKODRIVER_PORT")? {
            config.geckodriver_port = port;
        }
        if let Some(attempts) = number("GECKODRIVER_ATTEMPTS")? {
            config.geckodriver_attempts = attempts;
        }
        config.headless = flag("HEADLESS")?.unwrap_or(true);
        config.screenshot_always = flag("SCREENSHOT_ALWAYS")?.unwrap_or(false);
        if let Ok(dir) = var("ASSET_DIR") {
            config.asset_dir = dir.into();
        }
        if let Ok(dir) = var("DOWNLOAD_DIR") {
            config.download_dir = dir.into();
        }
        if let Ok(dir) = var("SCREENSHOT_DIR") {
            config.screenshot_dir = dir.into();
        }

        let timeouts = &mut config.timeouts;
        for (name, slot) in [
            ("ACTION_TIMEOUT_MS", &mut timeouts.action),
            ("LOGIN_TIMEOUT_MS", &mut timeouts.login),
            ("NAVIGATION_TIMEOUT_MS", &mut timeouts.navigation),
            ("UPLOAD_TIMEOUT_MS", &mut timeouts.upload),
            ("DIALOG_TIMEOUT_MS", &mut timeouts.dialog),
            ("CASCADE_TIMEOUT_MS", &mut timeouts.cascade),
        ] {
            if let Some(ms) = millis(name)? {
                *slot = ms;
            }
        }

        let ids: Vec<RoleId> = config.roles.ids().cloned().collect();
        for id in ids {
            let prefix = env_prefix(&id);
            if let Ok(landing) = var(format!("{prefix}_LANDING")) {
                config.roles.set_landing(&id, UrlPattern::new(landing));
            }
            let username = var(format!("{prefix}_USERNAME")).ok();
            let password = var(format!("{prefix}_PASSWORD")).ok();
            if let (Some(username), Some(password)) = (username, password) {
                config.roles.set_credentials(
                    &id,
                    Credentials {
                        username,
                        password: SecretString::from(password),
                    },
                );
            }
        }

        Ok(config)
    }

    pub fn url(&self, path: &str) -> HarnessResult<String> {
        self.base_url
            .join(path)
            .map(String::from)
            .map_err(|e| {
                HarnessError::Configuration(format!("bad path '{path}': {e}"))
            })
    }
}

/// `thanakorn` -> `THANAKORN`, `super-admin` -> `SUPER_ADMIN`.
pub fn env_prefix(role: &RoleId) -> String {
    role.as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn flag(name: &str) -> HarnessResult<Option<bool>> {
    match var(name) {
        Ok(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            _ => Err(HarnessError::Configuration(format!(
                "{name} must be a boolean, got '{value}'"
            ))),
        },
        Err(_) => Ok(None),
    }
}

fn millis(name: &str) -> HarnessResult<Option<Duration>> {
    Ok(number(name)?.map(Duration::from_millis))
}

fn number<T>(name: &str) -> HarnessResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match var(name) {
        Ok(value) => parse_number(name, &value).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_number<T>(name: &str, value: &str) -> HarnessResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| HarnessError::Configuration(format!("{name} '{value}': {e}")))
}
