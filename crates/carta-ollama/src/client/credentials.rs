//! Authentication for Ollama deployments behind a proxy.

use std::fmt;

use reqwest::RequestBuilder;

/// Authentication attached to every request.
///
/// A local Ollama server needs none; reverse proxies in front of a shared
/// server usually expect a bearer token or basic auth.
#[derive(Clone, Default)]
pub enum OllamaCredentials {
    /// `Authorization: Bearer <token>`
    BearerToken(String),
    /// HTTP basic authentication
    Basic { username: String, password: String },
    /// No authentication
    #[default]
    None,
}

impl OllamaCredentials {
    /// Create bearer token credentials
    pub fn bearer_token(token: impl Into<String>) -> Self {
        Self::BearerToken(token.into())
    }

    /// Create basic authentication credentials
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create credentials with no authentication
    pub fn none() -> Self {
        Self::None
    }

    /// Label safe to log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BearerToken(_) => "bearer_token",
            Self::Basic { .. } => "basic_auth",
            Self::None => "none",
        }
    }

    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::BearerToken(token) => request.bearer_auth(token),
            Self::Basic { username, password } => request.basic_auth(username, Some(password)),
            Self::None => request,
        }
    }
}

impl fmt::Debug for OllamaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BearerToken(_) => f.write_str("BearerToken(***)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::None => f.write_str("None"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_redacted() {
        let bearer = OllamaCredentials::bearer_token("s3cret");
        let basic = OllamaCredentials::basic("carta", "hunter2");

        assert!(!format!("{bearer:?}").contains("s3cret"));
        let debug = format!("{basic:?}");
        assert!(debug.contains("carta"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn default_is_none() {
        assert_eq!(OllamaCredentials::default().kind(), "none");
        assert_eq!(OllamaCredentials::bearer_token("t").kind(), "bearer_token");
    }
}
