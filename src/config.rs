//! Suite configuration.
//!
//! Loaded from a YAML or TOML file, then overridden from `TESTSUITE_*`
//! environment variables, then validated before any browser or cluster
//! work starts.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::wait::WaitConfig;

/// Environment variable naming the config file used by the binary.
pub const CONFIG_PATH_ENV: &str = "TESTSUITE_CONFIG";

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

/// Admin portal access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Base URL of the admin portal.
    pub url: String,
    /// Login name.
    #[serde(default = "default_username")]
    pub username: String,
    /// Login password.
    #[serde(default)]
    pub password: Option<String>,
}

fn default_username() -> String {
    "admin".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            username: default_username(),
            password: None,
        }
    }
}

/// Browser driver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver endpoint (chromedriver, geckodriver, selenium).
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    /// Browser requested in the session capabilities.
    #[serde(default = "default_browser_name")]
    pub browser_name: String,
    /// Upper bound for every widget and navigation wait, in milliseconds.
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
    /// First polling interval, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_browser_name() -> String {
    "chrome".to_string()
}

fn default_wait_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            browser_name: default_browser_name(),
            wait_timeout_ms: default_wait_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl BrowserConfig {
    /// Returns the wait limits widgets and navigation use.
    pub fn wait(&self) -> WaitConfig {
        let initial_poll = Duration::from_millis(self.poll_interval_ms);
        WaitConfig {
            timeout: Duration::from_millis(self.wait_timeout_ms),
            initial_poll,
            max_poll: initial_poll.max(Duration::from_millis(500)),
        }
    }
}

/// Mail-capture service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailhogConfig {
    /// Name of the cluster service whose route exposes the mail API.
    #[serde(default = "default_mailhog_service")]
    pub service_name: String,
    /// Explicit base URL; skips route lookup when set.
    #[serde(default)]
    pub url: Option<String>,
}

fn default_mailhog_service() -> String {
    "mailhog".to_string()
}

impl Default for MailhogConfig {
    fn default() -> Self {
        Self {
            service_name: default_mailhog_service(),
            url: None,
        }
    }
}

/// Cluster CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// CLI binary used for cluster operations.
    #[serde(default = "default_cli")]
    pub cli: String,
    /// Project (namespace) to operate in; CLI default when unset.
    #[serde(default)]
    pub project: Option<String>,
    /// How long to wait for a deployment rollout, in seconds.
    #[serde(default = "default_deployment_timeout")]
    pub deployment_timeout: u64,
}

fn default_cli() -> String {
    "oc".to_string()
}

fn default_deployment_timeout() -> u64 {
    300
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cli: default_cli(),
            project: None,
            deployment_timeout: default_deployment_timeout(),
        }
    }
}

impl ClusterConfig {
    /// Returns the rollout timeout as a Duration.
    pub fn deployment_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.deployment_timeout)
    }
}

/// Complete configuration of a test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Admin portal.
    #[serde(default)]
    pub admin: AdminConfig,
    /// Browser driver.
    #[serde(default)]
    pub browser: BrowserConfig,
    /// Mail-capture service.
    #[serde(default)]
    pub mailhog: MailhogConfig,
    /// Cluster CLI.
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Maximum concurrent provisioning workers.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_max_workers() -> usize {
    8
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            admin: AdminConfig::default(),
            browser: BrowserConfig::default(),
            mailhog: MailhogConfig::default(),
            cluster: ClusterConfig::default(),
            max_workers: default_max_workers(),
        }
    }
}

impl SuiteConfig {
    /// Loads a config file; `.yaml`/`.yml` and `.toml` are supported.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e))),
            Some("toml") => toml::from_str(&content)
                .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e))),
            _ => Err(Error::Config(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    /// Loads the file named by `TESTSUITE_CONFIG` (defaults when unset),
    /// applies environment overrides and validates.
    pub fn from_env() -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Same as [`SuiteConfig::from_env`] with variables resolved through `lookup`.
    pub fn resolve<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(&lookup);

        for warning in config.validate().into_result()? {
            tracing::warn!(warning = %warning, "suite configuration");
        }
        Ok(config)
    }

    /// Overrides fields from `TESTSUITE_*` variables resolved through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TESTSUITE_ADMIN_URL") {
            self.admin.url = url;
        }
        if let Some(password) = lookup("TESTSUITE_ADMIN_PASSWORD") {
            self.admin.password = Some(password);
        }
        if let Some(url) = lookup("TESTSUITE_WEBDRIVER_URL") {
            self.browser.webdriver_url = url;
        }
        if let Some(url) = lookup("TESTSUITE_MAILHOG_URL") {
            self.mailhog.url = Some(url);
        }
        if let Some(workers) = lookup("TESTSUITE_WORKERS") {
            match workers.parse() {
                Ok(n) => self.max_workers = n,
                Err(_) => {
                    tracing::warn!(value = %workers, "ignoring non-numeric TESTSUITE_WORKERS")
                }
            }
        }
    }

    /// Sets the admin portal URL.
    pub fn with_admin_url(mut self, url: impl Into<String>) -> Self {
        self.admin.url = url.into();
        self
    }

    /// Sets the worker pool bound.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }
}

fn check_url(result: &mut ValidationResult, field: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => result.add_error(format!(
            "{} must be http or https, got scheme '{}'",
            field,
            parsed.scheme()
        )),
        Err(e) => result.add_error(format!("{} '{}' is not a valid URL: {}", field, value, e)),
    }
}

impl Validate for SuiteConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        check_url(&mut result, "admin.url", &self.admin.url);
        check_url(&mut result, "browser.webdriver_url", &self.browser.webdriver_url);
        if let Some(url) = &self.mailhog.url {
            check_url(&mut result, "mailhog.url", url);
        }

        if self.max_workers == 0 {
            result.add_error("max_workers must be at least 1");
        } else if self.max_workers > 64 {
            result.add_warning(format!(
                "max_workers {} may overload the platform API",
                self.max_workers
            ));
        }

        if self.browser.wait_timeout_ms < 1000 {
            result.add_warning("wait_timeout_ms under 1 second will make UI waits flaky");
        }
        if self.browser.poll_interval_ms == 0 {
            result.add_error("poll_interval_ms must be positive");
        }

        if self.admin.password.is_none() {
            result.add_warning("admin.password not set; login steps will fail");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn valid_config() -> SuiteConfig {
        let mut config = SuiteConfig::default().with_admin_url("https://admin.example.com");
        config.admin.password = Some("secret".to_string());
        config
    }

    #[test]
    fn default_config_is_valid() {
        let result = valid_config().validate();
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn built_in_defaults_pass_validation() {
        let result = SuiteConfig::default().validate();
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(!result.errors.iter().any(|e| e.contains("max_workers")));
        assert_eq!(SuiteConfig::default().max_workers, 8);
    }

    #[test]
    fn resolve_without_config_file_uses_defaults() {
        let config = SuiteConfig::resolve(|key| {
            (key == "TESTSUITE_ADMIN_PASSWORD").then(|| "secret".to_string())
        })
        .unwrap();

        assert_eq!(config.max_workers, 8);
        assert_eq!(config.admin.password.as_deref(), Some("secret"));
        assert_eq!(config.cluster.deployment_timeout_duration(), Duration::from_secs(300));
    }

    #[test]
    fn resolve_reads_the_named_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("suite.yml");
        std::fs::write(&path, "max_workers: 3\n").unwrap();
        let path = path.to_string_lossy().to_string();

        let config = SuiteConfig::resolve(|key| (key == CONFIG_PATH_ENV).then(|| path.clone())).unwrap();

        assert_eq!(config.max_workers, 3);
    }

    #[test]
    fn yaml_config_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("suite.yaml");
        std::fs::write(
            &path,
            r#"
admin:
  url: "https://3scale-admin.apps.example.com"
mailhog:
  url: "http://mailhog.apps.example.com"
max_workers: 4
"#,
        )
        .unwrap();

        let config = SuiteConfig::load(&path).unwrap();
        assert_eq!(config.admin.url, "https://3scale-admin.apps.example.com");
        assert_eq!(config.admin.username, "admin");
        assert_eq!(config.mailhog.service_name, "mailhog");
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.browser.wait_timeout_ms, 10_000);
    }

    #[test]
    fn toml_config_parses() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("suite.toml");
        std::fs::write(
            &path,
            r#"
[admin]
url = "https://admin.example.com"
username = "root"

[cluster]
project = "e2e"
deployment_timeout = 60
"#,
        )
        .unwrap();

        let config = SuiteConfig::load(&path).unwrap();
        assert_eq!(config.admin.username, "root");
        assert_eq!(config.cluster.project.as_deref(), Some("e2e"));
        assert_eq!(
            config.cluster.deployment_timeout_duration(),
            Duration::from_secs(60)
        );
        assert_eq!(config.max_workers, 8);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("suite.ini");
        std::fs::write(&path, "x=1").unwrap();

        let err = SuiteConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn overrides_replace_fields() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TESTSUITE_ADMIN_URL", "https://other.example.com"),
            ("TESTSUITE_MAILHOG_URL", "http://mail.example.com"),
            ("TESTSUITE_WORKERS", "16"),
        ]);
        let mut config = valid_config();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.admin.url, "https://other.example.com");
        assert_eq!(config.mailhog.url.as_deref(), Some("http://mail.example.com"));
        assert_eq!(config.max_workers, 16);
    }

    #[test]
    fn non_numeric_workers_override_is_ignored() {
        let mut config = valid_config();
        config.apply_overrides(|key| (key == "TESTSUITE_WORKERS").then(|| "many".to_string()));
        assert_eq!(config.max_workers, 8);
    }

    #[test]
    fn zero_workers_fails() {
        let config = valid_config().with_max_workers(0);
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("max_workers")));
    }

    #[test]
    fn bad_admin_url_fails() {
        let config = valid_config().with_admin_url("ftp://admin.example.com");
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.contains("admin.url")));
        assert!(result.into_result().is_err());
    }

    #[test]
    fn short_wait_warns() {
        let mut config = valid_config();
        config.browser.wait_timeout_ms = 200;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("wait_timeout_ms")));
    }

    #[test]
    fn browser_wait_uses_configured_limits() {
        let wait = BrowserConfig::default().wait();
        assert_eq!(wait.timeout, Duration::from_secs(10));
        assert_eq!(wait.initial_poll, Duration::from_millis(100));
        assert_eq!(wait.max_poll, Duration::from_millis(500));
    }
}
