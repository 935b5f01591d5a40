//! Configuration for the Paddle HTTP client.

use std::time::Duration;

use url::Url;

use crate::{Error, Result};

/// Default address of a local Paddle serving endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8866";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for the Paddle HTTP client.
///
/// The pipeline flags are forwarded with every request and select the
/// document preprocessing stages run by the server.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use carta_paddle::PdConfig;
///
/// let config = PdConfig::new("http://paddle:8866")
///     .unwrap()
///     .with_timeout(Duration::from_secs(30));
/// assert_eq!(config.timeout(), Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct PdConfig {
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
    connect_timeout: Duration,
    user_agent: String,
    use_doc_orientation_classify: bool,
    use_doc_unwarping: bool,
    use_textline_orientation: bool,
}

impl PdConfig {
    /// Create a configuration with the given base URL and default settings.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref()).map_err(|e| {
            Error::config(format!("Invalid base URL '{}': {}", base_url.as_ref(), e))
        })?;

        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "Base URL '{base_url}' cannot carry a path"
            )));
        }

        Ok(Self {
            base_url,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("carta-paddle/{}", env!("CARGO_PKG_VERSION")),
            use_doc_orientation_classify: true,
            use_doc_unwarping: true,
            use_textline_orientation: true,
        })
    }

    /// Get the base URL of the Paddle service.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the API key (if configured).
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Get the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Get the user agent string.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub(crate) fn use_doc_orientation_classify(&self) -> bool {
        self.use_doc_orientation_classify
    }

    pub(crate) fn use_doc_unwarping(&self) -> bool {
        self.use_doc_unwarping
    }

    pub(crate) fn use_textline_orientation(&self) -> bool {
        self.use_textline_orientation
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable or disable whole-document orientation classification.
    pub fn with_doc_orientation_classify(mut self, enabled: bool) -> Self {
        self.use_doc_orientation_classify = enabled;
        self
    }

    /// Enable or disable document unwarping.
    pub fn with_doc_unwarping(mut self, enabled: bool) -> Self {
        self.use_doc_unwarping = enabled;
        self
    }

    /// Enable or disable per-line orientation correction.
    pub fn with_textline_orientation(mut self, enabled: bool) -> Self {
        self.use_textline_orientation = enabled;
        self
    }

    /// Resolve a path against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::config(format!("Failed to construct URL for '{path}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PdConfig::new(DEFAULT_BASE_URL).unwrap();
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert!(config.api_key().is_none());
        assert!(config.use_doc_unwarping());
        assert!(config.user_agent().starts_with("carta-paddle/"));
    }

    #[test]
    fn invalid_url_is_config_error() {
        let error = PdConfig::new("not a url").unwrap_err();
        assert_eq!(error.category(), "config");

        assert!(PdConfig::new("mailto:ocr@example.com").is_err());
    }

    #[test]
    fn endpoints_resolve_against_base() {
        let config = PdConfig::new("http://paddle:8866").unwrap();
        assert_eq!(
            config.endpoint("/ocr").unwrap().as_str(),
            "http://paddle:8866/ocr"
        );
    }
}
