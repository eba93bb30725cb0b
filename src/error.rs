use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;

// ------------------------------
// region ConfigError
// ------------------------------

/// Errors raised while loading a [`crate::config::SourceConfig`].
/// Fatal for the config that produced them.
pub enum ConfigError {
    NotFound { path: PathBuf },
    MissingField { path: PathBuf, field: String },
    EmptyItems { path: PathBuf },
    Parse { path: PathBuf, message: String },
}

impl std::error::Error for ConfigError {}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound { path } => write!(f, "config file not found: {}", path.display()),
            ConfigError::MissingField { path, field } => {
                write!(f, "{}: missing required field '{field}'", path.display())
            }
            ConfigError::EmptyItems { path } => {
                write!(f, "{}: 'items' must be non-empty", path.display())
            }
            ConfigError::Parse { path, message } => write!(f, "{}: {message}", path.display()),
        }
    }
}

// endregion

// ------------------------------
// region AuthError
// ------------------------------

/// Errors raised while minting or refreshing Drive credentials.
/// Fatal for the whole run.
pub enum AuthError {
    MissingCredentials,
    ServiceAccountFileNotFound { path: PathBuf },
    CredentialsFileNotFound { path: PathBuf },
    InvalidKey { message: String },
    RefreshFailed { message: String },
    ConsentDenied { message: String },
    ApiKeyUnsupported,
    Io(std::io::Error),
    Request(reqwest::Error),
    Serde(serde_json::Error),
}

impl std::error::Error for AuthError {}

impl Debug for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => {
                write!(f, "no service-account key or client-secrets file configured")
            }
            AuthError::ServiceAccountFileNotFound { path } => {
                write!(f, "service account file not found: {}", path.display())
            }
            AuthError::CredentialsFileNotFound { path } => {
                write!(f, "credentials file not found: {}", path.display())
            }
            AuthError::InvalidKey { message } => write!(f, "invalid credential data: {message}"),
            AuthError::RefreshFailed { message } => write!(f, "token refresh failed: {message}"),
            AuthError::ConsentDenied { message } => write!(f, "consent flow failed: {message}"),
            AuthError::ApiKeyUnsupported => write!(
                f,
                "API key authentication is not supported for Drive media downloads"
            ),
            AuthError::Io(e) => Display::fmt(e, f),
            AuthError::Request(e) => Display::fmt(e, f),
            AuthError::Serde(e) => Display::fmt(e, f),
        }
    }
}

impl From<std::io::Error> for AuthError {
    fn from(e: std::io::Error) -> Self {
        AuthError::Io(e)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Request(e)
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        AuthError::Serde(e)
    }
}

// endregion

// ------------------------------
// region VerifyError
// ------------------------------

/// Errors raised while verifying a local file against expected size/md5.
pub enum VerifyError {
    Missing { path: PathBuf },
    SizeMismatch { path: PathBuf, expected: u64, actual: u64 },
    Md5Mismatch { path: PathBuf },
    Io(std::io::Error),
}

impl std::error::Error for VerifyError {}

impl Debug for VerifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for VerifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyError::Missing { path } => write!(f, "missing file: {}", path.display()),
            VerifyError::SizeMismatch { path, expected, actual } => write!(
                f,
                "size mismatch for {}: expected {expected}, got {actual}",
                path.display()
            ),
            VerifyError::Md5Mismatch { path } => write!(f, "md5 mismatch for {}", path.display()),
            VerifyError::Io(e) => Display::fmt(e, f),
        }
    }
}

impl From<std::io::Error> for VerifyError {
    fn from(e: std::io::Error) -> Self {
        VerifyError::Io(e)
    }
}

// endregion

// ------------------------------
// region Error (top level)
// ------------------------------

/// Top-level crate error. One variant per module-specific error type, plus
/// generic carriers for the underlying libraries.
pub enum Error {
    Config(ConfigError),
    Auth(AuthError),
    Verify(VerifyError),
    Request(reqwest::Error),
    Io(std::io::Error),
    Serde(serde_json::Error),
    Yaml(serde_yaml::Error),
    Unknown(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::error::Error for Error {}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(e) => Display::fmt(e, f),
            Error::Auth(e) => Display::fmt(e, f),
            Error::Verify(e) => Display::fmt(e, f),
            Error::Request(e) => Display::fmt(e, f),
            Error::Io(e) => Display::fmt(e, f),
            Error::Serde(e) => Display::fmt(e, f),
            Error::Yaml(e) => Display::fmt(e, f),
            Error::Unknown(e) => write!(f, "{e}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<AuthError> for Error {
    fn from(e: AuthError) -> Self {
        Error::Auth(e)
    }
}

impl From<VerifyError> for Error {
    fn from(e: VerifyError) -> Self {
        Error::Verify(e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serde(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Yaml(e)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Unknown(e)
    }
}

// endregion
