//! Login workflow run before a session starts scraping.
//!
//! ```text
//! NavigateLogin -> AutoFill -> [NavigatePasswordPage -> FillPassword] -> NavigateTarget -> Done
//!       \              \                  \                  \
//!        +--------------+------------------+------------------+--> ManualWait -> NavigateTarget
//! ```
//!
//! Any failure on the automated path degrades to a manual wait during which a human
//! finishes the login in the (visible) browser. Only the final navigation to the target
//! can fail the workflow.

use crate::config::schema::LoginTiming;
use crate::page::{Page, PageError, SelectorState};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Where and how to log in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginConfig {
    pub login_url: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email_selector: Option<String>,
    #[serde(default)]
    pub password_selector: Option<String>,
    #[serde(default)]
    pub submit_selector: Option<String>,
    /// Second page of an email-first login flow, where the password is entered.
    #[serde(default)]
    pub password_page_url: Option<String>,
}

struct AutoLogin<'a> {
    email: &'a str,
    password: &'a str,
    email_selector: &'a str,
    password_selector: &'a str,
    submit_selector: &'a str,
}

impl LoginConfig {
    fn auto_login(&self) -> Option<AutoLogin<'_>> {
        Some(AutoLogin {
            email: non_blank(&self.email)?,
            password: non_blank(&self.password)?,
            email_selector: non_blank(&self.email_selector)?,
            password_selector: non_blank(&self.password_selector)?,
            submit_selector: non_blank(&self.submit_selector)?,
        })
    }

    /// True when enough is configured to attempt the automated path.
    pub fn can_auto_fill(&self) -> bool {
        self.auto_login().is_some()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    NavigateLogin,
    AutoFill,
    ManualWait,
    NavigatePasswordPage,
    FillPassword,
    NavigateTarget,
    Done,
}

pub struct LoginWorkflow<'a> {
    page: &'a dyn Page,
    config: &'a LoginConfig,
    timing: &'a LoginTiming,
    target_url: &'a str,
}

impl<'a> LoginWorkflow<'a> {
    pub fn new(
        page: &'a dyn Page,
        config: &'a LoginConfig,
        timing: &'a LoginTiming,
        target_url: &'a str,
    ) -> Self {
        Self {
            page,
            config,
            timing,
            target_url,
        }
    }

    /// Drive the workflow to `Done`, returning the states visited in order.
    ///
    /// Errors only when the target page cannot be reached afterwards.
    pub async fn run(self) -> Result<Vec<LoginState>, PageError> {
        let mut visited = Vec::new();
        let mut state = LoginState::NavigateLogin;
        loop {
            visited.push(state);
            if state == LoginState::Done {
                return Ok(visited);
            }
            state = self.next(state).await?;
        }
    }

    async fn next(&self, state: LoginState) -> Result<LoginState, PageError> {
        let next = match state {
            LoginState::NavigateLogin => {
                info!("Opening login page: {}", self.config.login_url);
                match self.page.navigate(&self.config.login_url).await {
                    Err(e) => self.degrade("open login page", &e),
                    Ok(()) if self.config.can_auto_fill() => LoginState::AutoFill,
                    Ok(()) => {
                        info!("Login selectors not fully configured, waiting for manual login");
                        LoginState::ManualWait
                    }
                }
            }
            LoginState::AutoFill => match self.auto_fill().await {
                Ok(()) if self.config.password_page_url.is_some() => {
                    LoginState::NavigatePasswordPage
                }
                Ok(()) => LoginState::NavigateTarget,
                Err(e) => self.degrade("fill login form", &e),
            },
            LoginState::NavigatePasswordPage => {
                let url = self.config.password_page_url.as_deref().unwrap_or_default();
                match self.page.navigate(url).await {
                    Ok(()) => LoginState::FillPassword,
                    Err(e) => self.degrade("open password page", &e),
                }
            }
            LoginState::FillPassword => match self.fill_password_page().await {
                Ok(()) => LoginState::NavigateTarget,
                Err(e) => self.degrade("fill password page", &e),
            },
            LoginState::ManualWait => {
                info!(
                    "Complete the login in the browser window ({}ms)",
                    self.timing.manual_wait_ms
                );
                if let Err(e) = self.page.wait(self.timing.manual_wait()).await {
                    warn!("Manual login wait interrupted: {}", e);
                }
                LoginState::NavigateTarget
            }
            LoginState::NavigateTarget => {
                self.page.navigate(self.target_url).await?;
                info!("Login finished, on target page: {}", self.target_url);
                LoginState::Done
            }
            LoginState::Done => LoginState::Done,
        };
        Ok(next)
    }

    fn degrade(&self, step: &str, error: &PageError) -> LoginState {
        warn!(
            "Automated login failed to {}: {}. Falling back to manual login",
            step, error
        );
        LoginState::ManualWait
    }

    async fn auto_fill(&self) -> Result<(), PageError> {
        let Some(login) = self.config.auto_login() else {
            return Err(PageError::Other("login form not configured".into()));
        };

        self.page.fill(login.email_selector, login.email).await?;
        if self.page.query_all(login.password_selector).await?.is_empty() {
            info!("No password field on the login page, expecting a separate password step");
        } else {
            self.page.fill(login.password_selector, login.password).await?;
        }
        self.page.click(login.submit_selector).await?;
        self.page.wait(self.timing.settle()).await
    }

    async fn fill_password_page(&self) -> Result<(), PageError> {
        let Some(login) = self.config.auto_login() else {
            return Err(PageError::Other("login form not configured".into()));
        };

        self.page
            .wait_for_selector(
                login.password_selector,
                self.timing.password_field_timeout(),
                SelectorState::Attached,
            )
            .await?;
        self.page.fill(login.password_selector, login.password).await?;
        self.page.click(login.submit_selector).await?;
        self.page.wait(self.timing.settle()).await
    }
}
