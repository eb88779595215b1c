//! Credential selection
//!
//! Some hosting platforms reserve the standard `AWS_ACCESS_KEY_ID` /
//! `AWS_SECRET_ACCESS_KEY` names for their own use. On those hosts the keys
//! are published under an alternate pair of variable names instead. The
//! choice of source is made once, when the S3 backend factory is built,
//! and never per request. Temporary credentials from that source are
//! reloaded from it once they expire.

use std::sync::RwLock;

use s3::creds::time::{Duration, OffsetDateTime};
use s3::creds::Credentials;

use crate::config::CredentialsConfig;
use crate::error::{Error, Result};

/// Where the storage credentials come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Keys read from the alternately named environment variables
    AlternateEnv {
        access_key: String,
        secret_key: String,
    },
    /// Keys written in the configuration file
    Explicit {
        access_key: String,
        secret_key: String,
    },
    /// The standard AWS chain (environment, profile, instance metadata)
    Ambient { profile: Option<String> },
}

impl CredentialSource {
    /// Select a source using the process environment
    pub fn select(config: &CredentialsConfig) -> Self {
        Self::select_with(config, |name| std::env::var(name).ok())
    }

    /// Select a source, looking variables up through `lookup`
    pub fn select_with<F>(config: &CredentialsConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let alternate = (
            lookup(&config.access_key_var).filter(|v| !v.is_empty()),
            lookup(&config.secret_key_var).filter(|v| !v.is_empty()),
        );
        if let (Some(access_key), Some(secret_key)) = alternate {
            return CredentialSource::AlternateEnv { access_key, secret_key };
        }

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            return CredentialSource::Explicit {
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
            };
        }

        CredentialSource::Ambient {
            profile: config.profile.clone(),
        }
    }

    /// Short label for logs; never includes key material
    pub fn describe(&self) -> &'static str {
        match self {
            CredentialSource::AlternateEnv { .. } => "alternate environment variables",
            CredentialSource::Explicit { .. } => "configuration file",
            CredentialSource::Ambient { .. } => "ambient AWS credential chain",
        }
    }

    /// Load the credentials this source points at
    ///
    /// When the ambient chain yields nothing the backend falls back to
    /// anonymous requests, which work for public buckets.
    pub fn load(&self) -> Result<Credentials> {
        match self {
            CredentialSource::AlternateEnv { access_key, secret_key }
            | CredentialSource::Explicit { access_key, secret_key } => {
                Credentials::new(Some(access_key.as_str()), Some(secret_key.as_str()), None, None, None)
                    .map_err(|e| Error::Config(format!("invalid credentials: {}", e)))
            }
            CredentialSource::Ambient { profile } => {
                match Credentials::new(None, None, None, None, profile.as_deref()) {
                    Ok(credentials) => Ok(credentials),
                    Err(e) => {
                        tracing::warn!("No AWS credentials found ({}), using anonymous access", e);
                        Credentials::anonymous()
                            .map_err(|e| Error::Config(format!("anonymous credentials: {}", e)))
                    }
                }
            }
        }
    }
}

/// Reload credentials this long before they expire
const REFRESH_MARGIN: Duration = Duration::minutes(5);

/// Whether `credentials` expire within [`REFRESH_MARGIN`] of `now`
fn needs_refresh(credentials: &Credentials, now: OffsetDateTime) -> bool {
    credentials
        .expiration
        .is_some_and(|expiration| *expiration - REFRESH_MARGIN <= now)
}

/// The selected source plus the credentials last loaded from it
pub struct CredentialStore {
    source: CredentialSource,
    current: RwLock<Credentials>,
}

impl CredentialStore {
    /// Load credentials from `source` now
    pub fn load(source: CredentialSource) -> Result<Self> {
        let credentials = source.load()?;
        Ok(Self::with_credentials(source, credentials))
    }

    /// Start from credentials that were already loaded
    pub fn with_credentials(source: CredentialSource, credentials: Credentials) -> Self {
        Self {
            source,
            current: RwLock::new(credentials),
        }
    }

    /// Credentials to sign the next request with, reloaded when expired
    pub async fn current(&self) -> Result<Credentials> {
        let cached = self
            .current
            .read()
            .map_err(|_| Error::BackendUnavailable("credential store poisoned".into()))?
            .clone();
        if !needs_refresh(&cached, OffsetDateTime::now_utc()) {
            return Ok(cached);
        }

        tracing::info!("Credentials from {} expired, reloading", self.source.describe());
        // instance metadata and profile lookups block
        let source = self.source.clone();
        let fresh = tokio::task::spawn_blocking(move || source.load())
            .await
            .map_err(|e| Error::BackendUnavailable(format!("credential reload failed: {}", e)))?
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        let mut current = self
            .current
            .write()
            .map_err(|_| Error::BackendUnavailable("credential store poisoned".into()))?;
        *current = fresh.clone();
        Ok(fresh)
    }
}
