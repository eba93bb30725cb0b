//! Installed-app (user-consent) OAuth2 flow for the Google Drive read-only
//! scope, and persistence of the resulting token next to the client-secrets
//! file.
//!
//! Mirrors the teacher's PKCE + localhost-redirect-listener flow, but prefers
//! a headless-safe localhost callback (never auto-opens a browser) with a
//! console-paste fallback, per spec.

use std::collections::HashSet;
use std::ops::Add;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;
use log::{debug, info, warn};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use url::Url;

use crate::error::AuthError;

pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const OAUTH_STATE_LEN: usize = 32;
const OAUTH_PKCE_LEN: usize = 32;

/// A persisted OAuth2 token for the installed-app flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub scope: HashSet<String>,
}

impl AuthToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now() + TimeDelta::seconds(60)
    }

    pub async fn from_file(path: &Path) -> std::result::Result<Self, AuthError> {
        let data = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&data)?)
    }

    pub async fn to_file(&self, path: &Path) -> std::result::Result<(), AuthError> {
        let data = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &data).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    fn from_response(data: serde_json::Value, old_refresh_token: Option<String>) -> std::result::Result<Self, AuthError> {
        if let Some(err) = data.get("error") {
            return Err(AuthError::RefreshFailed {
                message: err.as_str().unwrap_or("unknown error").to_string(),
            });
        }

        let access_token = data
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AuthError::InvalidKey { message: "missing access_token".to_string() })?
            .to_string();

        let expires_in = data.get("expires_in").and_then(|v| v.as_i64()).unwrap_or(3600);
        let expires_at = Utc::now().add(TimeDelta::seconds(expires_in));

        let scope: HashSet<String> = data
            .get("scope")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .split(' ')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let refresh_token = data
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(String::from)
            .or(old_refresh_token)
            .ok_or_else(|| AuthError::InvalidKey { message: "missing refresh_token".to_string() })?;

        Ok(AuthToken { access_token, refresh_token, expires_at, scope })
    }
}

/// Client-secrets JSON as downloaded from the Google Cloud console
/// ("installed application" type).
#[derive(Debug, Deserialize)]
pub struct ClientSecrets {
    pub installed: InstalledClientSecrets,
}

#[derive(Debug, Deserialize)]
pub struct InstalledClientSecrets {
    pub client_id: String,
    pub client_secret: String,
}

pub struct OAuthInstalledAppClient {
    client_id: String,
    client_secret: String,
    auth_url: Url,
    token_url: Url,
    scopes: HashSet<String>,
    state: String,
    pkce: String,
}

impl OAuthInstalledAppClient {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        OAuthInstalledAppClient {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: Url::parse(AUTH_URL).unwrap(),
            token_url: Url::parse(TOKEN_URL).unwrap(),
            scopes: HashSet::new(),
            state: Self::random_url_safe(OAUTH_STATE_LEN),
            pkce: Self::random_url_safe(OAUTH_PKCE_LEN),
        }
    }

    pub fn add_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.insert(scope.into());
        self
    }

    fn random_url_safe(len: usize) -> String {
        let mut buf = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut buf);
        URL_SAFE_NO_PAD.encode(&buf)
    }

    fn pkce_challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.pkce.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    /// Run the consent flow: try a headless-safe localhost callback first
    /// (never auto-opens a browser), falling back to console paste on any
    /// failure standing up the listener or receiving the redirect.
    pub async fn new_auth_token(&self) -> std::result::Result<AuthToken, AuthError> {
        match self.local_server_flow().await {
            Ok(token) => Ok(token),
            Err(e) => {
                warn!("Local server auth failed ({e}). Falling back to console auth.");
                self.console_flow().await
            }
        }
    }

    async fn local_server_flow(&self) -> std::result::Result<AuthToken, AuthError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{port}");

        let auth_url = self.build_auth_url(&redirect_uri);
        info!("Visit this URL to authorize access:\n  {auth_url}");

        let (mut stream, _) = listener.accept().await?;
        let mut reader = BufReader::new(&mut stream);
        let mut first_line = String::new();
        reader.read_line(&mut first_line).await?;

        let code = self.parse_redirect(&first_line, &redirect_uri)?;

        let body = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nAuthentication successful. You can close this tab.\r\n";
        stream.write_all(body).await?;
        stream.shutdown().await.ok();

        self.exchange_code(&code, &redirect_uri).await
    }

    async fn console_flow(&self) -> std::result::Result<AuthToken, AuthError> {
        let redirect_uri = "urn:ietf:wg:oauth:2.0:oob".to_string();
        let auth_url = self.build_auth_url(&redirect_uri);
        println!("Visit this URL to authorize access, then paste the code below:\n  {auth_url}");

        let mut line = String::new();
        let stdin = tokio::io::stdin();
        let mut reader = BufReader::new(stdin);
        reader.read_line(&mut line).await?;
        let code = line.trim().to_string();
        if code.is_empty() {
            return Err(AuthError::ConsentDenied { message: "no code entered".to_string() });
        }

        self.exchange_code(&code, &redirect_uri).await
    }

    fn build_auth_url(&self, redirect_uri: &str) -> Url {
        let mut url = self.auth_url.clone();
        let scopes = self.scopes.iter().join(" ");
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("state", &self.state)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("code_challenge", &self.pkce_challenge())
            .append_pair("code_challenge_method", "S256")
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("scope", &scopes);
        url
    }

    fn parse_redirect(&self, http_request_line: &str, redirect_uri: &str) -> std::result::Result<String, AuthError> {
        debug!("Parsing redirect request line: {http_request_line}");
        let path = http_request_line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| AuthError::ConsentDenied { message: "malformed HTTP request".to_string() })?;
        let full_url = format!("{redirect_uri}{path}");
        let parsed = Url::parse(&full_url).map_err(|e| AuthError::ConsentDenied { message: e.to_string() })?;

        let params: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();

        if let Some(err) = params.get("error") {
            return Err(AuthError::ConsentDenied { message: err.clone() });
        }

        let returned_state = params.get("state").cloned().unwrap_or_default();
        if returned_state != self.state {
            return Err(AuthError::ConsentDenied {
                message: "OAuth state mismatch, possible CSRF".to_string(),
            });
        }

        params
            .get("code")
            .cloned()
            .ok_or_else(|| AuthError::ConsentDenied { message: "no code in redirect".to_string() })
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> std::result::Result<AuthToken, AuthError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", &self.pkce),
            ("redirect_uri", redirect_uri),
        ];
        let client = reqwest::Client::new();
        let resp: serde_json::Value = client.post(self.token_url.clone()).form(&params).send().await?.json().await?;
        AuthToken::from_response(resp, None)
    }

    pub async fn refresh_token(&self, token: &AuthToken) -> std::result::Result<AuthToken, AuthError> {
        debug!("Refreshing OAuth token");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", token.refresh_token.as_str()),
        ];
        let client = reqwest::Client::new();
        let resp = client.post(self.token_url.clone()).form(&params).send().await?;
        let status = resp.status();
        let data: serde_json::Value = resp.json().await?;
        if !status.is_success() {
            let msg = data.get("error").and_then(|v| v.as_str()).unwrap_or("unexpected status").to_string();
            return Err(AuthError::RefreshFailed { message: msg });
        }
        AuthToken::from_response(data, Some(token.refresh_token.clone()))
    }
}

/// Token file path for a given client-secrets/service-account path:
/// `<stem>.token.json` next to it, unless overridden.
pub fn token_file_path(credentials_path: &Path, override_path: Option<&Path>) -> PathBuf {
    if let Some(p) = override_path {
        return p.to_path_buf();
    }
    let stem = credentials_path.file_stem().and_then(|s| s.to_str()).unwrap_or("credentials");
    let dir = credentials_path.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{stem}.token.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_file_path_defaults_next_to_credentials() {
        let p = token_file_path(Path::new("/cfg/credentials.json"), None);
        assert_eq!(p, PathBuf::from("/cfg/credentials.token.json"));
    }

    #[test]
    fn token_file_path_honors_override() {
        let p = token_file_path(Path::new("/cfg/credentials.json"), Some(Path::new("/other/token.json")));
        assert_eq!(p, PathBuf::from("/other/token.json"));
    }

    #[test]
    fn expired_token_detection() {
        let token = AuthToken {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: Utc::now() - TimeDelta::seconds(10),
            scope: HashSet::new(),
        };
        assert!(token.is_expired());
    }
}
