//! OpenID Connect token acquisition (Keycloak-style realms).

use crate::error::IndyError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// OAuth2 grant used against the token endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    #[default]
    ClientCredentials,
    Password,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::ClientCredentials => "client_credentials",
            GrantType::Password => "password",
        }
    }
}

/// SSO section of the environment (or standalone SSO) file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct SsoConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub grant_type: GrantType,

    pub url: Option<String>,
    pub realm: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

impl SsoConfig {
    /// Token endpoint for the configured realm.
    pub fn token_url(&self) -> Result<String, IndyError> {
        let base = required(&self.url, "url")?;
        let realm = required(&self.realm, "realm")?;
        Ok(format!(
            "{}/auth/realms/{}/protocol/openid-connect/token",
            base.trim_end_matches('/'),
            realm
        ))
    }

    /// Form fields for the configured grant.
    pub fn token_form(&self) -> Result<Vec<(&'static str, String)>, IndyError> {
        let mut form = vec![
            ("grant_type", self.grant_type.as_str().to_string()),
            ("client_id", required(&self.client_id, "client-id")?.to_string()),
        ];

        match self.grant_type {
            GrantType::ClientCredentials => {
                form.push((
                    "client_secret",
                    required(&self.client_secret, "client-secret")?.to_string(),
                ));
            }
            GrantType::Password => {
                form.push(("username", required(&self.username, "username")?.to_string()));
                form.push(("password", required(&self.password, "password")?.to_string()));
            }
        }

        Ok(form)
    }

    /// Every problem with this section, empty when usable or disabled.
    pub fn problems(&self) -> Vec<String> {
        if !self.enabled {
            return Vec::new();
        }
        [self.token_url().err(), self.token_form().err()]
            .into_iter()
            .flatten()
            .map(|e| e.to_string())
            .collect()
    }

    /// Request a bearer token. Returns `None` when SSO is disabled.
    pub async fn fetch_token(&self, ssl_verify: bool) -> Result<Option<String>, IndyError> {
        if !self.enabled {
            debug!("SSO disabled, continuing without a bearer token");
            return Ok(None);
        }

        let url = self.token_url()?;
        let form = self.token_form()?;

        info!(url = %url, grant = self.grant_type.as_str(), "Requesting SSO token");

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!ssl_verify)
            .build()?;

        let response = client.post(&url).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndyError::UnexpectedStatus {
                method: "POST",
                url,
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        token
            .access_token
            .filter(|t| !t.is_empty())
            .map(Some)
            .ok_or(IndyError::MissingAccessToken)
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, IndyError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| IndyError::SsoMisconfigured(format!("missing '{}'", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_credentials() -> SsoConfig {
        SsoConfig {
            enabled: true,
            url: Some("https://sso.example.com/".to_string()),
            realm: Some("perf".to_string()),
            client_id: Some("indyperf".to_string()),
            client_secret: Some("s3cret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_token_url_strips_trailing_slash() {
        assert_eq!(
            client_credentials().token_url().unwrap(),
            "https://sso.example.com/auth/realms/perf/protocol/openid-connect/token"
        );
    }

    #[test]
    fn test_client_credentials_form() {
        let form = client_credentials().token_form().unwrap();
        assert_eq!(form[0], ("grant_type", "client_credentials".to_string()));
        assert!(form.contains(&("client_secret", "s3cret".to_string())));
    }

    #[test]
    fn test_password_grant_requires_username_and_password() {
        let mut sso = client_credentials();
        sso.grant_type = GrantType::Password;
        assert!(sso.token_form().is_err());

        sso.username = Some("perf".to_string());
        sso.password = Some("pw".to_string());
        let form = sso.token_form().unwrap();
        assert!(form.contains(&("username", "perf".to_string())));
        assert!(!form.iter().any(|(k, _)| *k == "client_secret"));
    }

    #[test]
    fn test_disabled_section_has_no_problems() {
        let sso = SsoConfig::default();
        assert!(sso.problems().is_empty());
    }

    #[test]
    fn test_enabled_section_reports_missing_fields() {
        let sso = SsoConfig {
            enabled: true,
            ..Default::default()
        };
        let problems = sso.problems();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("url"));
    }

    #[tokio::test]
    async fn test_disabled_sso_yields_no_token() {
        let token = SsoConfig::default().fetch_token(true).await.unwrap();
        assert!(token.is_none());
    }
}
