//! # Generation Module
//!
//! Text generation with credential rotation.
//!
//! A [`RotatingGenerator`] owns an immutable [`CredentialPool`] and a
//! [`ModelConnector`] that binds a fresh [`TextModel`] client to one
//! credential. When the upstream answers with a rate-limit signal the next
//! credential is tried, sequentially, until one succeeds or every
//! credential has been attempted once. Any other failure is returned as-is.

pub mod gemini;

use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub use gemini::GeminiConnector;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("No generation credentials configured")]
    NoCredentials,
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("All {attempts} generation credentials are rate limited")]
    CredentialsExhausted { attempts: usize },
    #[error("Generation API error {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("Generation returned no text: {reason}")]
    EmptyResponse { reason: String },
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GenerationError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Cliente de generación ligado a una única credencial
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Construye un cliente nuevo para cada credencial
pub trait ModelConnector: Send + Sync {
    fn connect(&self, credential: &str) -> Box<dyn TextModel>;
}

/// Lista ordenada de credenciales, sin espacios, vacíos ni duplicados.
#[derive(Clone, Default)]
pub struct CredentialPool {
    keys: Arc<[String]>,
}

impl CredentialPool {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for key in keys {
            let key = key.as_ref().trim();
            if !key.is_empty() && !unique.iter().any(|existing| existing == key) {
                unique.push(key.to_string());
            }
        }

        Self { keys: unique.into() }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }
}

// Nunca imprimir las claves
impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("len", &self.keys.len())
            .finish()
    }
}

/// Generador que rota credenciales ante límites de tasa (HTTP 429)
#[derive(Clone)]
pub struct RotatingGenerator {
    pool: CredentialPool,
    connector: Arc<dyn ModelConnector>,
}

impl RotatingGenerator {
    pub fn new(pool: CredentialPool, connector: Arc<dyn ModelConnector>) -> Self {
        Self { pool, connector }
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Envía `prompt` y devuelve el texto generado.
    ///
    /// Cada credencial se intenta como máximo una vez. Falla con
    /// [`GenerationError::CredentialsExhausted`] si todas estaban limitadas,
    /// o con el primer error que no sea de límite de tasa.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let pool_size = self.pool.len();
        if pool_size == 0 {
            return Err(GenerationError::NoCredentials);
        }

        let mut index = 0;
        let mut attempt = 1;

        loop {
            let credential = self.pool.get(index).ok_or(GenerationError::NoCredentials)?;
            let model = self.connector.connect(credential);

            match model.generate(prompt).await {
                Ok(text) => {
                    debug!("✅ Generación exitosa en intento {}/{}", attempt, pool_size);
                    return Ok(text);
                }
                Err(e) if e.is_rate_limited() && attempt < pool_size => {
                    warn!(
                        "🔄 Límite de tasa alcanzado, rotando credencial (intento {}/{})",
                        attempt, pool_size
                    );
                    index = (index + 1) % pool_size;
                    attempt += 1;
                }
                Err(e) if e.is_rate_limited() => {
                    warn!("❌ Todas las credenciales limitadas ({}/{})", attempt, pool_size);
                    return Err(GenerationError::CredentialsExhausted { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }
}
