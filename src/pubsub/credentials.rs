use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Errors raised while loading the credential file
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("Credential file {0} does not exist")]
    NotFound(PathBuf),

    #[error("Failed to read credential file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credential file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Credential file {0} has an empty username")]
    MissingUsername(PathBuf),
}

/// Broker credentials read once at startup.
///
/// Stored as JSON next to the binary by default (`key.json`):
///
/// ```json
/// { "username": "sim", "password": "secret", "client_id": "sim-device-001" }
/// ```
///
/// `client_id` is optional and, when present, overrides the configured one.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub client_id: Option<String>,
}

impl fmt::Debug for Credentials {
    // password stays out of logs
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl Credentials {
    pub async fn load(path: &Path) -> Result<Self, CredentialsError> {
        debug!("Loading credentials from {}", path.display());

        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|source| CredentialsError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        if !exists {
            return Err(CredentialsError::NotFound(path.to_path_buf()));
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CredentialsError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let credentials: Credentials =
            serde_json::from_str(&content).map_err(|source| CredentialsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if credentials.username.trim().is_empty() {
            return Err(CredentialsError::MissingUsername(path.to_path_buf()));
        }

        info!(
            "Loaded credentials for user {} from {}",
            credentials.username,
            path.display()
        );
        Ok(credentials)
    }
}
