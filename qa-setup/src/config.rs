use std::path::{Path, PathBuf};
use std::time::Duration;

use qa_task_poller::PollPolicy;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "http://localhost:9200";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ===== Setup Configuration =====

/// Everything the setup run needs. Missing keys fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SetupConfig {
    /// Cluster REST endpoint (e.g., "http://localhost:9200")
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Task polling budget
    pub poll: PollConfig,
    /// Number of hits fetched when looking a model up by task id
    pub search_size: usize,
    pub model_group: ModelGroupConfig,
    pub model: ModelSpec,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            poll: PollConfig::default(),
            search_size: 1000,
            model_group: ModelGroupConfig::default(),
            model: ModelSpec::default(),
        }
    }
}

impl SetupConfig {
    /// Load from a JSON file and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, or the file at `path` when given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, ConfigError> {
        self.base_url = base_url.into();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "baseUrl must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.poll.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "poll.maxAttempts must be at least 1".to_string(),
            ));
        }
        if self.search_size == 0 {
            return Err(ConfigError::Invalid(
                "searchSize must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Task polling budget
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            interval_secs: policy.interval.as_secs(),
        }
    }
}

impl PollConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy::new(self.max_attempts, Duration::from_secs(self.interval_secs))
    }
}

/// Model group to create; the name gets a timestamp suffix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelGroupConfig {
    pub name_prefix: String,
    pub description: String,
}

impl Default for ModelGroupConfig {
    fn default() -> Self {
        Self {
            name_prefix: "local_model_group".to_string(),
            description: "A model group for local models".to_string(),
        }
    }
}

/// Metadata of the model to register; the name gets a timestamp suffix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSpec {
    pub name_prefix: String,
    pub version: String,
    pub function_name: String,
    pub description: String,
    pub model_format: String,
    /// SHA-256 of the artifact, checked by the cluster
    pub content_hash: String,
    pub model_type: String,
    pub framework_type: String,
    /// Where the cluster downloads the artifact from
    pub url: String,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            name_prefix: "test_question_answering".to_string(),
            version: "1.0.0".to_string(),
            function_name: "QUESTION_ANSWERING".to_string(),
            description: "test model".to_string(),
            model_format: "TORCH_SCRIPT".to_string(),
            content_hash: "f575403566bdd56d4f992632fccd5522512b49689e749d76fdd825394a851b2c"
                .to_string(),
            model_type: "multi_span_qa".to_string(),
            framework_type: "huggingface_transformers".to_string(),
            url: "https://github.com/junqiu-lei/ml-commons/releases/download/test17/opensearch_model_5.zip"
                .to_string(),
        }
    }
}
