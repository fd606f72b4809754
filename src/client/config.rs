//! Configuration for the backend client

use std::time::Duration;

use compact_str::CompactString;

use super::error::{ClientError, Result};
use crate::domain::Platform;

/// Base URL used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "https://mmlink-backend.onrender.com";

/// Main configuration for the backend client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL
    pub base_url: CompactString,
    /// Bearer token attached to every request when present
    pub auth_token: Option<CompactString>,
    /// HTTP request configuration
    pub request: RequestConfig,
    /// Polling configuration
    pub polling: PollingConfig,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Request timeout, enforced by cancelling the in-flight call
    pub timeout: Duration,
    /// Default number of items for paginated listings
    pub page_limit: u32,
}

/// Default refresh cadence per watched resource
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Interval for refreshing the user listing
    pub users_interval: Duration,
    /// Interval for refreshing the message feed
    pub messages_interval: Duration,
    /// Interval for refreshing overview statistics
    pub stats_interval: Duration,
    /// Interval for probing backend health
    pub health_interval: Duration,
}

/// Options for a single watch binding
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Run the first fetch as soon as the watcher starts
    pub immediate: bool,
    /// Re-run the fetch on this cadence; `None` or zero disables polling
    pub refresh_interval: Option<Duration>,
}

/// Query parameters for the user listing
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    /// Maximum number of users to return
    pub limit: Option<u32>,
    /// Offset into the listing
    pub offset: Option<u32>,
    /// Restrict to a single platform
    pub platform: Option<Platform>,
}

/// Query parameters for message feeds
#[derive(Debug, Clone, Default)]
pub struct MessageQuery {
    /// Maximum number of messages to return
    pub limit: Option<u32>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            page_limit: 50,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            users_interval: Duration::from_secs(30),
            messages_interval: Duration::from_secs(10),
            stats_interval: Duration::from_secs(15),
            health_interval: Duration::from_secs(60),
        }
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            immediate: true,
            refresh_interval: None,
        }
    }
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<CompactString>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            request: RequestConfig::default(),
            polling: PollingConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ClientError::config_validation(
                "base_url",
                "Base URL cannot be empty",
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::config_validation(
                "base_url",
                "Base URL must start with http:// or https://",
            ));
        }

        if url::Url::parse(&self.base_url).is_err() {
            return Err(ClientError::config_validation(
                "base_url",
                "Base URL is not a valid URL format",
            ));
        }

        if let Some(token) = &self.auth_token
            && token.is_empty()
        {
            return Err(ClientError::config_validation(
                "auth_token",
                "Token cannot be empty when set",
            ));
        }

        if self.request.page_limit == 0 || self.request.page_limit > 100 {
            return Err(ClientError::config_validation(
                "page_limit",
                "page_limit must be between 1 and 100",
            ));
        }

        if self.request.timeout.is_zero() {
            return Err(ClientError::config_validation(
                "timeout",
                "Timeout must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Create a default user query with config values
    pub fn default_user_query(&self) -> UserQuery {
        UserQuery {
            limit: Some(self.request.page_limit),
            ..Default::default()
        }
    }

    /// Create a default message query with config values
    pub fn default_message_query(&self) -> MessageQuery {
        MessageQuery {
            limit: Some(self.request.page_limit),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl From<crate::config::AppConfig> for ClientConfig {
    fn from(config: crate::config::AppConfig) -> Self {
        Self::new(config.base_url)
    }
}

impl ClientConfig {
    /// Set the bearer token
    pub fn with_auth_token(mut self, token: Option<CompactString>) -> Self {
        self.auth_token = token;
        self
    }

    /// Set request configuration
    pub fn with_request(mut self, request: RequestConfig) -> Self {
        self.request = request;
        self
    }

    /// Set polling configuration
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = timeout;
        self
    }
}

impl WatchOptions {
    /// Immediate fetch, refreshed on the given cadence
    pub fn poll(interval: Duration) -> Self {
        Self {
            immediate: true,
            refresh_interval: Some(interval),
        }
    }

    /// No automatic fetches at all; the caller drives every refetch
    pub fn manual() -> Self {
        Self {
            immediate: false,
            refresh_interval: None,
        }
    }

    /// Set whether the first fetch runs at startup
    pub fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Set the refresh cadence
    pub fn with_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Polling cadence with zero-duration treated as disabled
    pub(crate) fn effective_interval(&self) -> Option<Duration> {
        self.refresh_interval.filter(|d| !d.is_zero())
    }
}

impl UserQuery {
    /// Set the page size
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the listing offset
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Restrict to one platform
    pub fn with_platform(mut self, platform: Option<Platform>) -> Self {
        self.platform = platform;
        self
    }
}

impl MessageQuery {
    /// Create a new message query
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}
