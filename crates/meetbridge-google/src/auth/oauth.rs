//! Google OAuth2 token endpoint exchanges.
//!
//! Authorization-code exchange (PKCE), refresh-token grant and the
//! JWT-bearer grant used by service identities.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::{error, info};

use super::source::{ClientIdentity, ServiceAccountKey};
use crate::error::{Error, Result};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens returned from a token-endpoint exchange.
#[derive(Clone)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expiry: DateTime<Utc>,
    pub scopes: Vec<String>,
}

impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    authorize_endpoint: String,
    token_endpoint: String,
}

impl GoogleOAuth {
    pub fn new(authorize_endpoint: impl Into<String>, token_endpoint: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            authorize_endpoint: authorize_endpoint.into(),
            token_endpoint: token_endpoint.into(),
        })
    }

    pub fn authorize_url(
        &self,
        client: &ClientIdentity,
        scopes: &[String],
        state: &str,
        code_challenge: &str,
        redirect_uri: &str,
    ) -> String {
        let scope_str = scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&code_challenge={}&code_challenge_method=S256&access_type=offline&prompt=consent",
            self.authorize_endpoint,
            urlencoding::encode(&client.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope_str),
            urlencoding::encode(state),
            urlencoding::encode(code_challenge),
        )
    }

    pub async fn exchange_code(
        &self,
        client: &ClientIdentity,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<OAuthTokens> {
        info!("Exchanging authorization code for tokens");

        let mut params = HashMap::new();
        params.insert("client_id", client.client_id.as_str());
        params.insert("client_secret", client.client_secret.as_str());
        params.insert("code", code);
        params.insert("code_verifier", code_verifier);
        params.insert("grant_type", "authorization_code");
        params.insert("redirect_uri", redirect_uri);

        let body = self.post_form(&params).await?;
        parse_token_response(&body)
    }

    pub async fn refresh(&self, client: &ClientIdentity, refresh_token: &str) -> Result<OAuthTokens> {
        info!("Refreshing access token");

        let mut params = HashMap::new();
        params.insert("client_id", client.client_id.as_str());
        params.insert("client_secret", client.client_secret.as_str());
        params.insert("refresh_token", refresh_token);
        params.insert("grant_type", "refresh_token");

        let body = self.post_form(&params).await?;
        parse_token_response(&body)
    }

    /// Mint an access token for a service identity with a signed assertion.
    pub async fn service_account_token(
        &self,
        key: &ServiceAccountKey,
        scopes: &[String],
        subject: Option<&str>,
    ) -> Result<OAuthTokens> {
        info!("Requesting service account token for {}", key.client_email);

        let assertion = sign_assertion(key, scopes, subject, &self.token_endpoint, Utc::now())?;
        let mut params = HashMap::new();
        params.insert("grant_type", JWT_BEARER_GRANT);
        params.insert("assertion", assertion.as_str());

        let body = self.post_form(&params).await?;
        parse_token_response(&body)
    }

    async fn post_form(&self, params: &HashMap<&str, &str>) -> Result<String> {
        let response = self.http.post(&self.token_endpoint).form(params).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("Token endpoint returned HTTP {}", status);
            return Err(Error::Auth(token_error_message(&body).unwrap_or_else(|| {
                format!("HTTP {} from token endpoint", status)
            })));
        }
        Ok(body)
    }
}

#[derive(serde::Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
}

fn sign_assertion(
    key: &ServiceAccountKey,
    scopes: &[String],
    subject: Option<&str>,
    audience: &str,
    now: DateTime<Utc>,
) -> Result<String> {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: scopes.join(" "),
        aud: audience,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
        sub: subject,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| Error::Auth(format!("Invalid service account private key: {}", e)))?;
    encode(&header, &claims, &encoding_key)
        .map_err(|e| Error::Auth(format!("Failed to sign service account assertion: {}", e)))
}

fn token_error_message(body: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    let err = parsed.get("error")?;
    let code = err
        .as_str()
        .map(String::from)
        .or_else(|| err.get("message").and_then(|v| v.as_str()).map(String::from))?;
    match parsed.get("error_description").and_then(|v| v.as_str()) {
        Some(desc) => Some(format!("{}: {}", code, desc)),
        None => Some(code),
    }
}

/// Parse a Google OAuth2 token response.
pub fn parse_token_response(body: &str) -> Result<OAuthTokens> {
    let parsed: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| Error::Auth(format!("Invalid token response: {}", e)))?;

    if parsed.get("error").is_some() {
        return Err(Error::Auth(
            token_error_message(body).unwrap_or_else(|| "Unknown token error".to_string()),
        ));
    }

    let access_token = parsed
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Auth("Missing access_token in response".to_string()))?
        .to_string();

    let refresh_token = parsed
        .get("refresh_token")
        .and_then(|v| v.as_str())
        .map(String::from);

    let token_type = parsed
        .get("token_type")
        .and_then(|v| v.as_str())
        .unwrap_or("Bearer")
        .to_string();

    let expires_in = parsed
        .get("expires_in")
        .and_then(|v| v.as_i64())
        .unwrap_or(3600);

    let scopes = parsed
        .get("scope")
        .and_then(|v| v.as_str())
        .map(|s| s.split(' ').map(String::from).collect())
        .unwrap_or_default();

    Ok(OAuthTokens {
        access_token,
        refresh_token,
        token_type,
        expiry: Utc::now() + chrono::Duration::seconds(expires_in),
        scopes,
    })
}

// ── PKCE ────────────────────────────────────────────────────────────────────

/// PKCE code verifier (43 characters of base64url).
pub fn generate_code_verifier() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    base64_url_encode(&bytes)
}

/// S256 code challenge for a verifier.
pub fn generate_code_challenge(verifier: &str) -> String {
    use sha2::{Digest, Sha256};
    let hash = Sha256::digest(verifier.as_bytes());
    base64_url_encode(&hash)
}

/// Random CSRF state for the authorization request.
pub fn generate_state() -> String {
    use rand::Rng;
    let bytes: [u8; 16] = rand::rngs::OsRng.gen();
    hex::encode(bytes)
}

fn base64_url_encode(data: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    URL_SAFE_NO_PAD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> ClientIdentity {
        serde_json::from_str(r#"{"client_id": "cid", "client_secret": "secret"}"#).unwrap()
    }

    #[test]
    fn test_code_verifier_length() {
        let v = generate_code_verifier();
        assert!(v.len() >= 43);
        assert!(v.len() <= 128);
    }

    #[test]
    fn test_code_challenge_deterministic() {
        let c1 = generate_code_challenge("verifier");
        let c2 = generate_code_challenge("verifier");
        assert_eq!(c1, c2);
        assert!(!c1.contains('='));
    }

    #[test]
    fn test_state_is_hex() {
        let state = generate_state();
        assert_eq!(state.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_parse_token_response_success() {
        let body = r#"{
            "access_token": "ya29.test",
            "refresh_token": "1//0e.test",
            "token_type": "Bearer",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/gmail.modify https://www.googleapis.com/auth/calendar"
        }"#;
        let tokens = parse_token_response(body).unwrap();
        assert_eq!(tokens.access_token, "ya29.test");
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//0e.test"));
        assert_eq!(tokens.scopes.len(), 2);
        assert!(tokens.expiry > Utc::now());
    }

    #[test]
    fn test_parse_token_response_error() {
        let body = r#"{"error": "invalid_grant", "error_description": "Token has been revoked"}"#;
        let err = parse_token_response(body).unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[test]
    fn test_tokens_debug_redacts_secrets() {
        let tokens = parse_token_response(
            r#"{"access_token": "ya29.secret", "refresh_token": "1//secret", "expires_in": 60}"#,
        )
        .unwrap();
        let text = format!("{:?}", tokens);
        assert!(!text.contains("secret"));
        assert!(text.contains("[REDACTED]"));
    }

    #[test]
    fn test_authorize_url_carries_pkce_and_offline_access() {
        let oauth = GoogleOAuth::new("https://auth.example/auth", "https://auth.example/token").unwrap();
        let url = oauth.authorize_url(
            &client(),
            &["scope-a".to_string(), "scope-b".to_string()],
            "st",
            "challenge",
            "http://localhost:3000/oauth2callback",
        );
        assert!(url.starts_with("https://auth.example/auth?client_id=cid"));
        assert!(url.contains("code_challenge=challenge"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("scope=scope-a%20scope-b"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Foauth2callback"));
    }

    #[tokio::test]
    async fn test_refresh_posts_refresh_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=rt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let oauth = GoogleOAuth::new(format!("{}/auth", server.uri()), format!("{}/token", server.uri())).unwrap();
        let tokens = oauth.refresh(&client(), "rt-1").await.unwrap();
        assert_eq!(tokens.access_token, "fresh");
        assert!(tokens.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_token_endpoint_error_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Bad Request"
            })))
            .mount(&server)
            .await;

        let oauth = GoogleOAuth::new(format!("{}/auth", server.uri()), format!("{}/token", server.uri())).unwrap();
        let err = oauth.refresh(&client(), "rt-1").await.unwrap_err();
        assert!(matches!(err, Error::Auth(ref m) if m.contains("invalid_grant")));
    }
}
