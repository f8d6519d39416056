use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrawlConfig {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub login: LoginTiming,
    #[serde(default)]
    pub single_shot: SingleShotConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Show the browser window so a human can step in (e.g. to finish a login).
    #[serde(default = "default_visible")]
    pub visible: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            visible: default_visible(),
        }
    }
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_container_timeout_ms")]
    pub container_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            container_timeout_ms: default_container_timeout_ms(),
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn container_timeout(&self) -> Duration {
        Duration::from_millis(self.container_timeout_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_container_timeout_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginTiming {
    /// Pause after each submit click.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// How long a human gets to finish the login by hand.
    #[serde(default = "default_manual_wait_ms")]
    pub manual_wait_ms: u64,
    #[serde(default = "default_password_field_timeout_ms")]
    pub password_field_timeout_ms: u64,
}

impl Default for LoginTiming {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            manual_wait_ms: default_manual_wait_ms(),
            password_field_timeout_ms: default_password_field_timeout_ms(),
        }
    }
}

impl LoginTiming {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn manual_wait(&self) -> Duration {
        Duration::from_millis(self.manual_wait_ms)
    }

    pub fn password_field_timeout(&self) -> Duration {
        Duration::from_millis(self.password_field_timeout_ms)
    }
}

fn default_settle_ms() -> u64 {
    3000
}

fn default_manual_wait_ms() -> u64 {
    60000
}

fn default_password_field_timeout_ms() -> u64 {
    10000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleShotConfig {
    #[serde(default = "default_single_shot_timeout_ms")]
    pub container_timeout_ms: u64,
}

impl Default for SingleShotConfig {
    fn default() -> Self {
        Self {
            container_timeout_ms: default_single_shot_timeout_ms(),
        }
    }
}

fn default_single_shot_timeout_ms() -> u64 {
    10000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("static").join("scraped_data.json")
}
