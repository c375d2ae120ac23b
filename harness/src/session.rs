//! Role-based sessions.
//!
//! A [`Session`] is one browser page plus the configuration it runs under.
//! [`SessionProvider::login`] is the precondition of every scenario: it
//! checks the role table, launches a page and authenticates, failing fast
//! if the role's landing page is not reached.

use std::sync::Arc;

use async_trait::async_trait;
use derive_more::Display;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::locator::{LocatorChain, Selector};
use crate::navigation::UrlPattern;
use crate::page::Page;
use crate::wait::wait_for;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct RoleId(String);

impl RoleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoleId {
    fn from(id: &str) -> Self {
        RoleId(id.to_string())
    }
}

impl From<String> for RoleId {
    fn from(id: String) -> Self {
        RoleId(id)
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

#[derive(Debug)]
pub struct Role {
    pub id: RoleId,
    pub credentials: Option<Credentials>,
    /// Where a successful login lands.
    pub landing: UrlPattern,
}

/// Every known role, each resolving to at most one credential set.
#[derive(Debug)]
pub struct RoleTable {
    roles: Vec<Role>,
}

impl Default for RoleTable {
    fn default() -> Self {
        let mut table = RoleTable { roles: Vec::new() };
        table.insert("admin", UrlPattern::new("/admin/community/own"));
        table.insert("superadmin", UrlPattern::new("/super/communities"));
        table.insert("thanakorn", UrlPattern::new("/admin/community/own"));
        table
    }
}

impl RoleTable {
    pub fn empty() -> Self {
        RoleTable { roles: Vec::new() }
    }

    /// Register a role, replacing an existing one with the same id.
    pub fn insert(&mut self, id: impl Into<RoleId>, landing: UrlPattern) {
        let id = id.into();
        self.roles.retain(|role| role.id != id);
        self.roles.push(Role {
            id,
            credentials: None,
            landing,
        });
    }

    pub fn ids(&self) -> impl Iterator<Item = &RoleId> {
        self.roles.iter().map(|role| &role.id)
    }

    pub fn get(&self, id: &RoleId) -> HarnessResult<&Role> {
        self.roles.iter().find(|role| &role.id == id).ok_or_else(|| {
            HarnessError::Configuration(format!("unknown role '{id}'"))
        })
    }

    pub fn set_credentials(&mut self, id: &RoleId, credentials: Credentials) {
        if let Some(role) = self.roles.iter_mut().find(|role| &role.id == id) {
            role.credentials = Some(credentials);
        }
    }

    pub fn set_landing(&mut self, id: &RoleId, landing: UrlPattern) {
        if let Some(role) = self.roles.iter_mut().find(|role| &role.id == id) {
            role.landing = landing;
        }
    }

    /// The role and its credentials, or a configuration error if either is
    /// missing.
    pub fn resolve(&self, id: &RoleId) -> HarnessResult<(&Role, &Credentials)> {
        let role = self.get(id)?;
        let credentials = role.credentials.as_ref().ok_or_else(|| {
            HarnessError::Configuration(format!(
                "no credentials configured for role '{id}'"
            ))
        })?;
        Ok((role, credentials))
    }
}

/// Where the login form and the logout control live.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub username: LocatorChain,
    pub password: LocatorChain,
    pub submit: LocatorChain,
    pub logout: LocatorChain,
}

impl Default for LoginForm {
    fn default() -> Self {
        LoginForm {
            username: LocatorChain::new("username")
                .or(Selector::css("input[name='username']"))
                .or(Selector::css("input[type='email']"))
                .or(Selector::placeholder("อีเมล")),
            password: LocatorChain::new("password")
                .or(Selector::css("input[type='password']")),
            submit: LocatorChain::new("login submit")
                .or(Selector::css("button[type='submit']"))
                .or(Selector::button("เข้าสู่ระบบ")),
            logout: LocatorChain::new("logout")
                .or(Selector::button("ออกจากระบบ"))
                .or(Selector::text("ออกจากระบบ"))
                .or(Selector::css("[data-testid='logout']")),
        }
    }
}

/// Launches fresh browser pages.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self) -> HarnessResult<Box<dyn Page>>;
}

pub struct Session {
    page: Box<dyn Page>,
    config: Arc<HarnessConfig>,
    role: Option<RoleId>,
}

impl Session {
    pub fn new(page: Box<dyn Page>, config: Arc<HarnessConfig>) -> Self {
        Session {
            page,
            config,
            role: None,
        }
    }

    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn role(&self) -> Option<&RoleId> {
        self.role.as_ref()
    }

    pub async fn goto_path(&self, path: &str) -> HarnessResult<()> {
        let url = self.config.url(path)?;
        self.page.goto(&url).await
    }

    /// Log in on the current page. Fails with
    /// [`HarnessError::Authentication`] if the landing pattern is not
    /// reached within the login timeout. Not retried.
    pub async fn authenticate(&mut self, id: &RoleId) -> HarnessResult<()> {
        let config = Arc::clone(&self.config);
        let (role, credentials) = config.roles.resolve(id)?;
        info!("🔐 Logging in as {id}");

        self.goto_path(&config.login_path).await?;
        let page = self.page.as_ref();
        let form = &config.login_form;
        let username = form.username.resolve(page).await?;
        page.fill(&username, &credentials.username).await?;
        let password = form.password.resolve(page).await?;
        page.fill(&password, credentials.password.expose_secret())
            .await?;
        let submit = form.submit.resolve(page).await?;
        page.click(&submit, 0).await?;

        let landed = wait_for(
            &format!("landing page of {id}"),
            config.timeouts.login,
            || async move {
                Ok(role.landing.matches(&page.current_url().await?))
            },
        )
        .await;
        if let Err(HarnessError::Timeout { .. }) = landed {
            return Err(HarnessError::Authentication {
                role: id.clone(),
                expected: role.landing.to_string(),
                actual: page.current_url().await?,
            });
        }
        landed?;

        self.role = Some(id.clone());
        info!("✅ Logged in as {id}");
        Ok(())
    }

    /// Log out and wait until the login page is shown again.
    pub async fn logout(&mut self) -> HarnessResult<()> {
        let config = Arc::clone(&self.config);
        let page = self.page.as_ref();
        let logout = config.login_form.logout.resolve(page).await?;
        page.click(&logout, 0).await?;
        let login = &UrlPattern::new(config.login_path.clone());
        wait_for("login page after logout", config.timeouts.navigation, || async move {
            Ok(login.matches(&page.current_url().await?))
        })
        .await?;
        debug!("logged out from {:?}", self.role);
        self.role = None;
        Ok(())
    }

    pub async fn close(self) -> HarnessResult<()> {
        self.page.close().await
    }

    /// End the browser session whatever `result` is, then hand `result`
    /// back. A failed close only surfaces when `result` itself succeeded.
    pub async fn close_after<T>(self, result: anyhow::Result<T>) -> anyhow::Result<T> {
        let closed = self.close().await;
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), closed) => {
                if let Err(close) = closed {
                    warn!("Could not close browser session: {close}");
                }
                Err(e)
            }
        }
    }

    /// Close after a failed setup step and return its error.
    async fn abandon(self, error: HarnessError) -> HarnessError {
        if let Err(close) = self.close().await {
            warn!("Could not close browser session: {close}");
        }
        error
    }
}

/// Hands out sessions already past the login page.
pub struct SessionProvider {
    config: Arc<HarnessConfig>,
    launcher: Box<dyn Launcher>,
}

impl SessionProvider {
    pub fn new(config: Arc<HarnessConfig>, launcher: Box<dyn Launcher>) -> Self {
        SessionProvider { config, launcher }
    }

    pub fn config(&self) -> &Arc<HarnessConfig> {
        &self.config
    }

    /// Session authenticated as `role`. Unknown roles and roles without
    /// credentials are rejected before any browser is launched.
    pub async fn login(&self, role: impl Into<RoleId>) -> HarnessResult<Session> {
        let role = role.into();
        self.config.roles.resolve(&role)?;
        let page = self.launcher.launch().await?;
        let mut session = Session::new(page, Arc::clone(&self.config));
        match session.authenticate(&role).await {
            Ok(()) => Ok(session),
            Err(e) => Err(session.abandon(e).await),
        }
    }

    /// Session on the login page, not authenticated. Used by scenarios that
    /// exercise login itself.
    pub async fn anonymous(&self) -> HarnessResult<Session> {
        let page = self.launcher.launch().await?;
        let session = Session::new(page, Arc::clone(&self.config));
        match session.goto_path(&self.config.login_path).await {
            Ok(()) => Ok(session),
            Err(e) => Err(session.abandon(e).await),
        }
    }
}
