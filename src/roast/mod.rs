//! # Roast Module
//!
//! Request orchestration: validation, user lookup, cache, stats fan-out,
//! prompt assembly and generation.
//!
//! ## Flow
//!
//! 1. Validate username and language (no upstream call on failure)
//! 2. Check the user exists on Last.fm
//! 3. Return the cached roast for `(username, language)` if still fresh
//! 4. Collect the five stats categories concurrently
//! 5. Render the prompt and call the rotating generator
//! 6. Cache the roast (only on success) and return it

pub mod prompt;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{roast_key, RoastCache};
use crate::generation::{GenerationError, RotatingGenerator};
use crate::scrobbler::StatsClient;

pub use prompt::{PromptTemplate, SupportedLanguages};

#[derive(Debug, Error)]
pub enum RoastError {
    #[error("{0}")]
    InputValidation(String),
    #[error("User not found")]
    NotFound,
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Cuerpo de `POST /roast`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoastRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub selected_language: Option<String>,
}

impl RoastRequest {
    #[allow(dead_code)]
    pub fn new(username: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            selected_language: Some(language.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoastResult {
    pub roast: String,
}

pub struct RoastService {
    stats: StatsClient,
    generator: RotatingGenerator,
    cache: Arc<RoastCache>,
    template: PromptTemplate,
    languages: SupportedLanguages,
    stats_limit: usize,
}

impl RoastService {
    pub fn new(
        stats: StatsClient,
        generator: RotatingGenerator,
        cache: Arc<RoastCache>,
        template: PromptTemplate,
        languages: SupportedLanguages,
        stats_limit: usize,
    ) -> Self {
        Self {
            stats,
            generator,
            cache,
            template,
            languages,
            stats_limit,
        }
    }

    /// Devuelve `(username, idioma)` o un error de entrada
    fn validate<'a>(&'a self, request: &'a RoastRequest) -> Result<(&'a str, &'a str), RoastError> {
        let username = request
            .username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| RoastError::InputValidation("Please enter your username".to_string()))?;

        let language = request
            .selected_language
            .as_deref()
            .filter(|language| !language.trim().is_empty())
            .ok_or_else(|| RoastError::InputValidation("Please select result language".to_string()))?;

        let language = self.languages.resolve(language).ok_or_else(|| {
            RoastError::InputValidation("The language is not available currently".to_string())
        })?;

        Ok((username, language))
    }

    pub async fn roast(&self, request: &RoastRequest) -> Result<RoastResult, RoastError> {
        let (username, language) = self.validate(request)?;

        if !self.stats.user_exists(username).await {
            info!("🔍 Usuario no encontrado en Last.fm: {}", username);
            return Err(RoastError::NotFound);
        }

        let key = roast_key(username, language);
        if let Some(roast) = self.cache.get(&key) {
            debug!("✅ Cache hit para roast: {}", key);
            return Ok(RoastResult { roast });
        }
        debug!("❌ Cache miss para roast: {}", key);

        let bundle = self.stats.collect(username, self.stats_limit).await;
        let data = serde_json::to_string(&bundle).map_err(GenerationError::from)?;
        let prompt = self.template.render(language, &data);

        let start_time = Instant::now();
        let roast = self.generator.generate(&prompt).await?;
        info!("🔥 Roast generado para {} en {:?}", username, start_time.elapsed());

        self.cache.set(key, roast.clone());
        Ok(RoastResult { roast })
    }
}
