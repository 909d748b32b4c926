//! Immutable per-run connection context.

use crate::error::IndyError;
use crate::sso::SsoConfig;
use tracing::info;

/// Everything a repository call needs to know about the target service.
///
/// Produced once by [`RunContext::authenticate`] and shared read-only for the
/// rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Service base URL, no trailing slash.
    pub base_url: String,
    /// Bearer token, when SSO is enabled.
    pub token: Option<String>,
    /// Verify TLS certificates.
    pub ssl_verify: bool,
}

impl RunContext {
    /// Context without credentials.
    pub fn anonymous(base_url: &str, ssl_verify: bool) -> Self {
        RunContext {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            ssl_verify,
        }
    }

    /// Attach a bearer token.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Obtain a token (if SSO is configured and enabled) and build the context.
    pub async fn authenticate(
        base_url: &str,
        sso: Option<&SsoConfig>,
        ssl_verify: bool,
    ) -> Result<Self, IndyError> {
        let context = Self::anonymous(base_url, ssl_verify);
        let token = match sso {
            Some(sso) => sso.fetch_token(ssl_verify).await?,
            None => None,
        };

        match token {
            Some(token) => {
                info!("Authenticated against SSO");
                Ok(context.with_token(&token))
            }
            None => Ok(context),
        }
    }

    /// `Authorization` header value, when a token is present.
    pub fn authorization(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    /// Host component of the base URL.
    pub fn host(&self) -> Result<String, IndyError> {
        let parsed = url::Url::parse(&self.base_url)?;
        parsed
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| IndyError::InvalidUrl(format!("{} has no host", self.base_url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_strips_trailing_slash() {
        let ctx = RunContext::anonymous("http://indy.example.com:8080/", true);
        assert_eq!(ctx.base_url, "http://indy.example.com:8080");
        assert!(ctx.authorization().is_none());
    }

    #[test]
    fn test_authorization_header() {
        let ctx = RunContext::anonymous("http://indy", true).with_token("abc");
        assert_eq!(ctx.authorization().as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_host() {
        let ctx = RunContext::anonymous("https://indy.example.com:8443/", false);
        assert_eq!(ctx.host().unwrap(), "indy.example.com");
        assert!(RunContext::anonymous("not a url", true).host().is_err());
    }

    #[tokio::test]
    async fn test_authenticate_without_sso() {
        let ctx = RunContext::authenticate("http://indy/", None, true).await.unwrap();
        assert_eq!(ctx, RunContext::anonymous("http://indy", true));
    }
}
