//! Public key providers.
//!
//! Verification needs an RSA public key; where it comes from is the host's
//! concern. Two providers cover the usual cases: a key already in memory and
//! a PEM file read lazily on first use.

use crate::error::KeyError;
use jsonwebtoken::DecodingKey;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Source of the session verification key.
pub trait PublicKeyProvider: Send + Sync {
    /// The current verification key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] if the key cannot be loaded or parsed.
    fn decoding_key(&self) -> impl Future<Output = Result<Arc<DecodingKey>, KeyError>> + Send;
}

impl<P: PublicKeyProvider> PublicKeyProvider for Arc<P> {
    fn decoding_key(&self) -> impl Future<Output = Result<Arc<DecodingKey>, KeyError>> + Send {
        (**self).decoding_key()
    }
}

/// Key held in memory.
#[derive(Clone)]
pub struct StaticKeyProvider {
    key: Arc<DecodingKey>,
}

impl StaticKeyProvider {
    /// Wrap an already parsed key.
    #[must_use]
    pub fn new(key: DecodingKey) -> Self {
        Self { key: Arc::new(key) }
    }

    /// Parse a PEM-encoded RSA public key.
    ///
    /// # Errors
    ///
    /// [`KeyError::Invalid`] if `pem` is not an RSA public key.
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self, KeyError> {
        DecodingKey::from_rsa_pem(pem).map(Self::new).map_err(KeyError::Invalid)
    }
}

impl PublicKeyProvider for StaticKeyProvider {
    fn decoding_key(&self) -> impl Future<Output = Result<Arc<DecodingKey>, KeyError>> + Send {
        let key = Arc::clone(&self.key);
        async move { Ok(key) }
    }
}

impl fmt::Debug for StaticKeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeyProvider").finish_non_exhaustive()
    }
}

/// Key read from a PEM file on first use and cached afterwards.
///
/// A failed read is not cached; the next verification tries again.
pub struct PemFileKeyProvider {
    path: PathBuf,
    cached: OnceCell<Arc<DecodingKey>>,
}

impl PemFileKeyProvider {
    /// Provider for the PEM file at `path`. Nothing is read yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), cached: OnceCell::new() }
    }

    async fn load(&self) -> Result<Arc<DecodingKey>, KeyError> {
        let pem = tokio::fs::read(&self.path)
            .await
            .map_err(|source| KeyError::Io { path: self.path.clone(), source })?;
        let key = DecodingKey::from_rsa_pem(&pem).map_err(KeyError::Invalid)?;
        tracing::debug!(path = %self.path.display(), "loaded session public key");
        Ok(Arc::new(key))
    }
}

impl PublicKeyProvider for PemFileKeyProvider {
    fn decoding_key(&self) -> impl Future<Output = Result<Arc<DecodingKey>, KeyError>> + Send {
        async move { self.cached.get_or_try_init(|| self.load()).await.map(Arc::clone) }
    }
}

impl fmt::Debug for PemFileKeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PemFileKeyProvider")
            .field("path", &self.path)
            .field("loaded", &self.cached.initialized())
            .finish()
    }
}
