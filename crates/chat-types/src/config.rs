use serde::{Deserialize, Serialize};
use crate::{ChatError, Result};

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChatConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollPolicy,
}

/// Connection settings for the hosted Assistants API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub api_base: String,
    pub api_key: String,
    pub assistant_id: String,
    /// Value of the `OpenAI-Beta` API-version header
    pub beta_header: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: String::new(),
            assistant_id: String::new(),
            beta_header: DEFAULT_BETA_HEADER.to_string(),
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            return Err(ChatError::Config("API base URL is empty".to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(ChatError::Config("API key is not set".to_string()));
        }
        if self.assistant_id.trim().is_empty() {
            return Err(ChatError::Config("assistant id is not set".to_string()));
        }
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.validate().is_ok()
    }

    /// Base URL without a trailing slash, ready for path concatenation
    pub fn base_url(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }
}

/// Bounds on the run status polling loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub backoff_multiplier: f64,
    pub max_attempts: u32,
    /// Overall deadline for one run, measured from the first poll
    pub timeout_ms: u64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval_ms: 1_000,
            max_interval_ms: 5_000,
            backoff_multiplier: 1.5,
            max_attempts: 120,
            timeout_ms: 300_000,
        }
    }
}

impl PollPolicy {
    /// First delay, never above the cap.
    pub fn first_interval(&self) -> u64 {
        self.initial_interval_ms.min(self.max_interval_ms)
    }

    /// Delay to use after `current`, grown by the multiplier and capped.
    pub fn next_interval(&self, current: u64) -> u64 {
        let grown = (current as f64 * self.backoff_multiplier.max(1.0)).round() as u64;
        grown.min(self.max_interval_ms)
    }
}

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_BETA_HEADER: &str = "assistants=v2";
