//! Credential Provider (C2): produces authenticated bearer tokens for Drive
//! requests from either a service-account key or an installed-app
//! user-consent flow, persisting refresh tokens, and serializing re-mint so
//! concurrent workers never race to refresh the same token.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;

use crate::error::{AuthError, Result};
use crate::oauth::{AuthToken, ClientSecrets, OAuthInstalledAppClient, DRIVE_READONLY_SCOPE};
use crate::service_account;

enum Source {
    ServiceAccount { key_path: PathBuf },
    Installed { client_secrets_path: PathBuf, token_path: PathBuf },
}

struct Inner {
    source: Source,
    token: Option<AuthToken>,
}

/// A shared, cloneable handle producing bearer tokens for Drive API calls.
/// Cheap to clone; workers should hold a clone rather than a reference.
#[derive(Clone)]
pub struct CredentialProvider {
    inner: Arc<Mutex<Inner>>,
}

impl CredentialProvider {
    /// Resolve the credential source with priority: (1) explicit
    /// service-account key file, (2) user-consent client-secrets file.
    pub async fn resolve(
        service_account_file: Option<&Path>,
        credentials_file: Option<&Path>,
        token_file_override: Option<&Path>,
        api_key: Option<&str>,
    ) -> Result<Self> {
        if api_key.is_some() {
            warn!(
                "API key authentication is not supported by the Google Drive API client; \
                 provide a service account or OAuth2 credentials instead"
            );
        }

        let source = if let Some(key_path) = service_account_file {
            if !key_path.exists() {
                return Err(AuthError::ServiceAccountFileNotFound { path: key_path.to_path_buf() }.into());
            }
            info!("Using service account authentication: {}", key_path.display());
            Source::ServiceAccount { key_path: key_path.to_path_buf() }
        } else if let Some(creds_path) = credentials_file {
            if !creds_path.exists() {
                return Err(AuthError::CredentialsFileNotFound { path: creds_path.to_path_buf() }.into());
            }
            let token_path = crate::oauth::token_file_path(creds_path, token_file_override);
            info!("Using installed-app OAuth2 authentication: {}", creds_path.display());
            Source::Installed { client_secrets_path: creds_path.to_path_buf(), token_path }
        } else {
            return Err(AuthError::MissingCredentials.into());
        };

        Ok(CredentialProvider { inner: Arc::new(Mutex::new(Inner { source, token: None })) })
    }

    /// Return a valid bearer access token, minting or refreshing as needed.
    /// Concurrent callers serialize on the same lock, so only one refresh
    /// happens at a time.
    pub async fn access_token(&self) -> Result<String> {
        let mut guard = self.inner.lock().await;

        if let Some(token) = &guard.token {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = match &guard.source {
            Source::ServiceAccount { key_path } => {
                service_account::mint_token(key_path, DRIVE_READONLY_SCOPE).await?
            }
            Source::Installed { client_secrets_path, token_path } => {
                Self::installed_app_token(client_secrets_path, token_path, guard.token.as_ref()).await?
            }
        };

        let access_token = fresh.access_token.clone();
        guard.token = Some(fresh);
        Ok(access_token)
    }

    async fn installed_app_token(
        client_secrets_path: &Path,
        token_path: &Path,
        cached: Option<&AuthToken>,
    ) -> std::result::Result<AuthToken, AuthError> {
        let client = Self::installed_app_client(client_secrets_path).await?;

        let existing = match cached {
            Some(t) => Some(t.clone()),
            None => AuthToken::from_file(token_path).await.ok(),
        };

        let token = match existing {
            Some(token) if !token.is_expired() => token,
            Some(token) => {
                info!("Refreshing Drive OAuth2 token");
                let refreshed = client.refresh_token(&token).await?;
                refreshed
            }
            None => {
                info!("No cached Drive token found; starting consent flow");
                client.new_auth_token().await?
            }
        };

        token.to_file(token_path).await?;
        Ok(token)
    }

    async fn installed_app_client(client_secrets_path: &Path) -> std::result::Result<OAuthInstalledAppClient, AuthError> {
        let raw = tokio::fs::read_to_string(client_secrets_path).await?;
        let secrets: ClientSecrets = serde_json::from_str(&raw)?;
        Ok(OAuthInstalledAppClient::new(secrets.installed.client_id, secrets.installed.client_secret)
            .add_scope(DRIVE_READONLY_SCOPE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_fails_without_any_credentials() {
        let result = CredentialProvider::resolve(None, None, None, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn resolve_fails_on_missing_service_account_file() {
        let result = CredentialProvider::resolve(Some(Path::new("/nonexistent/sa.json")), None, None, None).await;
        assert!(result.is_err());
    }
}
