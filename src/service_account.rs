//! Service-account (JWT-bearer) credential flow.
//!
//! The teacher has no service-account support (it only ever authenticates as
//! a user), so this is grounded in the pack's Drive tools instead: the
//! corpus reaches for `yup-oauth2`/`google-drive3` for this, but those pull
//! in an old `hyper` stack purely for the Drive client; since this crate
//! only needs a bearer token for plain `reqwest` calls, the JWT assertion is
//! signed directly with `ring`, matching `brotherbui-bosua-utility-rust`'s
//! choice of `ring` for RSA/crypto primitives.

use std::ops::Add;
use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{TimeDelta, Utc};
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use serde::Deserialize;
use serde_json::json;

use crate::error::AuthError;
use crate::oauth::AuthToken;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: Option<String>,
}

/// Mint a short-lived access token for `scope` from a service-account key
/// file via the JWT-bearer grant (RFC 7523).
pub async fn mint_token(key_path: &Path, scope: &str) -> std::result::Result<AuthToken, AuthError> {
    let raw = tokio::fs::read_to_string(key_path).await?;
    let key: ServiceAccountKey = serde_json::from_str(&raw)?;

    let token_uri = key.token_uri.clone().unwrap_or_else(|| TOKEN_URL.to_string());
    let assertion = build_assertion(&key, scope)?;

    let client = reqwest::Client::new();
    let resp: serde_json::Value = client
        .post(&token_uri)
        .form(&[
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ])
        .send()
        .await?
        .json()
        .await?;

    if let Some(err) = resp.get("error") {
        return Err(AuthError::InvalidKey {
            message: format!("service account token request failed: {err}"),
        });
    }

    let access_token = resp
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AuthError::InvalidKey { message: "missing access_token".to_string() })?
        .to_string();
    let expires_in = resp.get("expires_in").and_then(|v| v.as_i64()).unwrap_or(3600);

    // Service-account tokens are bearer-only and non-refreshable by nature;
    // re-minting (rather than refreshing) is how the caller keeps this fresh.
    Ok(AuthToken {
        access_token,
        refresh_token: String::new(),
        expires_at: Utc::now().add(TimeDelta::seconds(expires_in)),
        scope: [scope.to_string()].into_iter().collect(),
    })
}

fn build_assertion(key: &ServiceAccountKey, scope: &str) -> std::result::Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let header = json!({ "alg": "RS256", "typ": "JWT" });
    let claims = json!({
        "iss": key.client_email,
        "scope": scope,
        "aud": key.token_uri.clone().unwrap_or_else(|| TOKEN_URL.to_string()),
        "iat": now,
        "exp": now + 3600,
    });

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap()),
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap()),
    );

    let key_pair = parse_pkcs8_or_pkcs1(&key.private_key)?;
    let rng = SystemRandom::new();
    let mut signature = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(&RSA_PKCS1_SHA256, &rng, signing_input.as_bytes(), &mut signature)
        .map_err(|_| AuthError::InvalidKey { message: "failed to sign JWT assertion".to_string() })?;

    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

fn parse_pkcs8_or_pkcs1(pem: &str) -> std::result::Result<RsaKeyPair, AuthError> {
    let der = pem_to_der(pem)?;
    RsaKeyPair::from_pkcs8(&der).map_err(|_| AuthError::InvalidKey {
        message: "private key is not valid PKCS#8".to_string(),
    })
}

fn pem_to_der(pem: &str) -> std::result::Result<Vec<u8>, AuthError> {
    let body: String = pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect::<Vec<_>>()
        .join("");
    base64::engine::general_purpose::STANDARD
        .decode(body)
        .map_err(|e| AuthError::InvalidKey { message: format!("invalid PEM: {e}") })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_pem() {
        let err = pem_to_der("not a pem").unwrap_err();
        assert!(matches!(err, AuthError::InvalidKey { .. }));
    }
}
