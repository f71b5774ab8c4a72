//! fitcoach configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::image::{Credentials, GenerationRequest, PollPolicy, ServiceRoute};

/// Main fitcoach configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Plan generation (LLM) configuration
    pub plan: PlanConfig,

    /// Image generation configuration
    pub image: ImageConfig,

    /// Local persistence configuration
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .fitcoach.yml
        let local_config = PathBuf::from(".fitcoach.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/fitcoach/fitcoach.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("fitcoach").join("fitcoach.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialised
    ///
    /// Any failure yields `None`; the full load reports it later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".fitcoach.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    paths.push(config_dir.join("fitcoach").join("fitcoach.yml"));
                }
                paths
            }
        };

        candidates
            .iter()
            .find(|p| p.exists())
            .and_then(|p| Self::load_from_file(p).ok())
            .and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration for plan generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Output token ceiling for a plan
    #[serde(rename = "max-output-tokens")]
    pub max_output_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-exp".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            max_output_tokens: 10_000,
            timeout_ms: 120_000,
        }
    }
}

impl PlanConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                eyre::eyre!(
                    "Plan API key not configured. Set the {} environment variable.",
                    self.api_key_env
                )
            })
    }
}

/// Image generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Which endpoint jobs are sent to
    pub route: ServiceRoute,

    /// Provider prediction endpoint used by the direct route
    #[serde(rename = "direct-url")]
    pub direct_url: String,

    /// Same-contract proxy endpoint used by the proxied route
    #[serde(rename = "proxy-url")]
    pub proxy_url: String,

    /// Model identifier sent with every job
    pub model: String,

    /// Environment variable containing the bearer token
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    pub width: u32,

    pub height: u32,

    #[serde(rename = "num-inference-steps")]
    pub num_inference_steps: u32,

    /// Delay between status polls in milliseconds
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Maximum status polls per job (unset = unbounded)
    #[serde(rename = "max-attempts")]
    pub max_attempts: Option<u32>,

    /// Maximum wall time per job in milliseconds (unset = unbounded)
    #[serde(rename = "max-duration-ms")]
    pub max_duration_ms: Option<u64>,

    /// Attempts per status poll before giving up on transport errors
    #[serde(rename = "poll-retries")]
    pub poll_retries: u32,

    /// Initial backoff between poll retries in milliseconds
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    /// Per-request HTTP timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Base URL of the placeholder image service
    #[serde(rename = "placeholder-url")]
    pub placeholder_url: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            route: ServiceRoute::Direct,
            direct_url: "https://api.replicate.com/v1/predictions".to_string(),
            proxy_url: "http://localhost:3000/api/predictions".to_string(),
            model: "black-forest-labs/flux-1.1-pro".to_string(),
            api_key_env: "REPLICATE_API_TOKEN".to_string(),
            width: 1024,
            height: 1024,
            num_inference_steps: 25,
            poll_interval_ms: 2000,
            max_attempts: Some(150),
            max_duration_ms: Some(600_000),
            poll_retries: 3,
            retry_backoff_ms: 1000,
            timeout_ms: 30_000,
            placeholder_url: crate::image::DEFAULT_PLACEHOLDER_BASE.to_string(),
        }
    }
}

impl ImageConfig {
    /// Endpoint for the configured route
    pub fn endpoint(&self) -> &str {
        match self.route {
            ServiceRoute::Direct => &self.direct_url,
            ServiceRoute::Proxied => &self.proxy_url,
        }
    }

    /// Poll policy derived from this configuration
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_attempts,
            max_duration: self.max_duration_ms.map(Duration::from_millis),
            poll_retries: self.poll_retries.max(1),
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    /// Build a generation request for `prompt` with the configured parameters
    pub fn request(&self, prompt: impl Into<String>) -> GenerationRequest {
        GenerationRequest {
            model: self.model.clone(),
            prompt: prompt.into(),
            width: self.width,
            height: self.height,
            num_inference_steps: self.num_inference_steps,
        }
    }

    /// Credentials from the configured environment variable
    ///
    /// A missing variable is not an error here; the poller reports it as
    /// `AuthMissing` without touching the network.
    pub fn credentials(&self) -> Credentials {
        let token = std::env::var(&self.api_key_env).ok();
        debug!(env = %self.api_key_env, present = token.is_some(), "ImageConfig::credentials: called");
        Credentials::new(token)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding plan snapshots
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("fitcoach")
                .join("store"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.image.width, 1024);
        assert_eq!(config.image.height, 1024);
        assert_eq!(config.image.num_inference_steps, 25);
        assert_eq!(config.image.poll_interval_ms, 2000);
        assert_eq!(config.image.route, ServiceRoute::Direct);
        assert_eq!(config.plan.max_output_tokens, 10_000);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
log-level: debug
image:
  route: proxied
  proxy-url: http://localhost:9000/jobs
  max-attempts: 5
plan:
  model: gemini-1.5-pro
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.image.route, ServiceRoute::Proxied);
        assert_eq!(config.image.endpoint(), "http://localhost:9000/jobs");
        assert_eq!(config.image.max_attempts, Some(5));
        assert_eq!(config.image.width, 1024);
        assert_eq!(config.plan.model, "gemini-1.5-pro");
        assert_eq!(config.plan.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_poll_policy_from_config() {
        let config = ImageConfig {
            max_attempts: None,
            max_duration_ms: Some(5000),
            poll_retries: 0,
            ..Default::default()
        };
        let policy = config.poll_policy();
        assert_eq!(policy.interval, Duration::from_millis(2000));
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.max_duration, Some(Duration::from_secs(5)));
        // At least one attempt per poll, even when misconfigured
        assert_eq!(policy.poll_retries, 1);
    }

    #[test]
    fn test_request_uses_configured_params() {
        let config = ImageConfig::default();
        let request = config.request("a runner at sunrise");
        assert_eq!(request.prompt, "a runner at sunrise");
        assert_eq!(request.width, 1024);
        assert_eq!(request.num_inference_steps, 25);
        assert_eq!(request.model, "black-forest-labs/flux-1.1-pro");
    }

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fitcoach.yml");
        fs::write(&path, "storage:\n  path: /tmp/fitcoach-test\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.storage.path, PathBuf::from("/tmp/fitcoach-test"));
    }

    #[test]
    fn test_load_explicit_missing_file_errors() {
        let path = PathBuf::from("/nonexistent/fitcoach.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_log_level() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fitcoach.yml");
        fs::write(&path, "log-level: WARN\n").unwrap();

        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("WARN"));
    }

    #[test]
    #[serial]
    fn test_credentials_from_env() {
        let config = ImageConfig {
            api_key_env: "FITCOACH_TEST_IMAGE_TOKEN".to_string(),
            ..Default::default()
        };

        // SAFETY: serialized with other env-mutating tests
        unsafe { std::env::remove_var("FITCOACH_TEST_IMAGE_TOKEN") };
        assert!(config.credentials().token().is_none());

        unsafe { std::env::set_var("FITCOACH_TEST_IMAGE_TOKEN", "r8_secret") };
        assert_eq!(config.credentials().token(), Some("r8_secret"));

        unsafe { std::env::remove_var("FITCOACH_TEST_IMAGE_TOKEN") };
    }

    #[test]
    #[serial]
    fn test_plan_api_key_missing() {
        let config = PlanConfig {
            api_key_env: "FITCOACH_TEST_PLAN_KEY".to_string(),
            ..Default::default()
        };
        unsafe { std::env::remove_var("FITCOACH_TEST_PLAN_KEY") };
        let err = config.get_api_key().unwrap_err();
        assert!(err.to_string().contains("FITCOACH_TEST_PLAN_KEY"));
    }
}
