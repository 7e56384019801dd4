use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::cache::DEFAULT_TTL;
use crate::generation::{gemini, CredentialPool};
use crate::roast::prompt::{PromptTemplate, SupportedLanguages};
use crate::scrobbler::{self, lastfm};

#[derive(Debug, Clone)]
pub struct Config {
    // Last.fm
    pub lastfm_api_key: String,
    pub lastfm_base_url: Url,

    // Gemini
    pub gemini_api_keys: CredentialPool,
    pub gemini_model: String,
    pub gemini_base_url: Url,

    // Caché y límites
    pub cache_duration: Duration,
    pub stats_limit: usize,
    pub max_stats_limit: usize,

    // Datos estáticos
    pub languages: SupportedLanguages,
    pub prompt_template: PromptTemplate,
    pub prompt_template_path: Option<PathBuf>,

    // Servidor
    pub http_timeout: Duration,
    pub bind_addr: SocketAddr,
    pub debug_mode: bool,
}

/// Lee una variable de entorno opcional, tratando el valor vacío como ausente
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn split_list(value: &str) -> Vec<&str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        // GEMINI_API_KEYS (lista) + GEMINI_API_KEY (clave única)
        let mut keys: Vec<String> = env_opt("GEMINI_API_KEYS")
            .map(|list| split_list(&list).into_iter().map(str::to_string).collect())
            .unwrap_or_default();
        keys.extend(env_opt("GEMINI_API_KEY"));

        let prompt_template_path = env_opt("PROMPT_TEMPLATE_PATH").map(PathBuf::from);
        let prompt_template = match &prompt_template_path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read prompt template {}", path.display()))?;
                PromptTemplate::new(text)?
            }
            None => defaults.prompt_template.clone(),
        };

        let config = Self {
            // Last.fm
            lastfm_api_key: env_opt("LASTFM_API_KEY").context("LASTFM_API_KEY must be set")?,
            lastfm_base_url: match env_opt("LASTFM_BASE_URL") {
                Some(url) => Url::parse(&url).context("Invalid LASTFM_BASE_URL")?,
                None => defaults.lastfm_base_url,
            },

            // Gemini
            gemini_api_keys: CredentialPool::new(keys),
            gemini_model: env_opt("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: match env_opt("GEMINI_BASE_URL") {
                Some(url) => Url::parse(&url).context("Invalid GEMINI_BASE_URL")?,
                None => defaults.gemini_base_url,
            },

            // Caché y límites
            cache_duration: match env_opt("CACHE_DURATION") {
                Some(ms) => Duration::from_millis(ms.parse().context("Invalid CACHE_DURATION")?),
                None => defaults.cache_duration,
            },
            stats_limit: env_opt("STATS_LIMIT")
                .unwrap_or_else(|| defaults.stats_limit.to_string())
                .parse()
                .context("Invalid STATS_LIMIT")?,
            max_stats_limit: env_opt("MAX_STATS_LIMIT")
                .unwrap_or_else(|| defaults.max_stats_limit.to_string())
                .parse()
                .context("Invalid MAX_STATS_LIMIT")?,

            // Datos estáticos
            languages: env_opt("SUPPORTED_LANGUAGES")
                .map(|list| SupportedLanguages::new(split_list(&list)))
                .unwrap_or(defaults.languages),
            prompt_template,
            prompt_template_path,

            // Servidor
            http_timeout: Duration::from_secs(
                env_opt("HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|| defaults.http_timeout.as_secs().to_string())
                    .parse()
                    .context("Invalid HTTP_TIMEOUT_SECS")?,
            ),
            bind_addr: env_opt("BIND_ADDR")
                .unwrap_or_else(|| defaults.bind_addr.to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
            debug_mode: env_opt("DEBUG_MODE")
                .map(|value| value.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.debug_mode),
        };

        // Validar antes de devolver
        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - At least one Gemini credential must be configured
    /// - Cache duration must be greater than zero
    /// - Stats limit must be between 1 and the configured maximum
    /// - At least one language must be supported
    pub fn validate(&self) -> Result<()> {
        if self.lastfm_api_key.is_empty() {
            anyhow::bail!("LASTFM_API_KEY must not be empty");
        }

        if self.gemini_api_keys.is_empty() {
            anyhow::bail!("At least one Gemini API key is required (GEMINI_API_KEYS or GEMINI_API_KEY)");
        }

        if self.cache_duration.is_zero() {
            anyhow::bail!("Cache duration must be greater than 0");
        }

        if self.max_stats_limit == 0 {
            anyhow::bail!("Max stats limit must be greater than 0");
        }

        if self.stats_limit == 0 || self.stats_limit > self.max_stats_limit {
            anyhow::bail!(
                "Stats limit must be between 1 and {}, got: {}",
                self.max_stats_limit,
                self.stats_limit
            );
        }

        if self.languages.is_empty() {
            anyhow::bail!("At least one supported language is required");
        }

        if self.gemini_model.trim().is_empty() {
            anyhow::bail!("Gemini model must not be empty");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// API keys are never included; only the size of the credential pool.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Last.fm: {}\n  \
            Gemini: model {} at {} ({} keys)\n  \
            Cache: TTL {}\n  \
            Stats: {} items per category (max {})\n  \
            Languages: {} supported, template {}\n  \
            Server: {} (timeout {}, debug={})",
            self.lastfm_base_url,
            self.gemini_model,
            self.gemini_base_url,
            self.gemini_api_keys.len(),
            humantime::format_duration(self.cache_duration),
            self.stats_limit,
            self.max_stats_limit,
            self.languages.len(),
            self.prompt_template_path
                .as_ref()
                .map_or("built-in".to_string(), |path| path.display().to_string()),
            self.bind_addr,
            humantime::format_duration(self.http_timeout),
            self.debug_mode
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Credenciales (sin valores por defecto)
            lastfm_api_key: String::new(),
            lastfm_base_url: Url::parse(lastfm::DEFAULT_BASE_URL).expect("valid default Last.fm URL"),

            gemini_api_keys: CredentialPool::default(),
            gemini_model: gemini::DEFAULT_MODEL.to_string(),
            gemini_base_url: Url::parse(gemini::DEFAULT_BASE_URL).expect("valid default Gemini URL"),

            cache_duration: DEFAULT_TTL, // 5 minutos
            stats_limit: scrobbler::DEFAULT_LIMIT,
            max_stats_limit: 50,

            languages: SupportedLanguages::default(),
            prompt_template: PromptTemplate::default(),
            prompt_template_path: None,

            http_timeout: Duration::from_secs(30),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            debug_mode: false,
        }
    }
}
