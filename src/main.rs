use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

mod cache;
mod config;
mod generation;
mod roast;
mod scrobbler;
mod server;

use crate::cache::RoastCache;
use crate::config::Config;
use crate::generation::{GeminiConnector, RotatingGenerator};
use crate::roast::RoastService;
use crate::scrobbler::{LastFmHttp, StatsClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar configuración
    let config = Config::load()?;

    // Inicializar logging
    let level = if config.debug_mode { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("scrobble_roast={}", level).parse()?)
                .add_directive("hyper=info".parse()?)
                .add_directive("reqwest=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Scrobble Roast v{}", env!("CARGO_PKG_VERSION"));
    info!("{}", config.summary());

    // Cliente HTTP compartido
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .user_agent(concat!("scrobble-roast/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    // Last.fm
    let lastfm = LastFmHttp::new(
        http.clone(),
        config.lastfm_base_url.clone(),
        config.lastfm_api_key.clone(),
    );
    let stats = StatsClient::new(Arc::new(lastfm), config.max_stats_limit);

    // Gemini
    let connector = GeminiConnector::new(http, &config.gemini_base_url, &config.gemini_model)
        .context("Invalid Gemini endpoint")?;
    let generator = RotatingGenerator::new(config.gemini_api_keys.clone(), Arc::new(connector));
    info!("🔑 {} credenciales de Gemini disponibles", generator.pool_size());

    // Inicializar caché
    let cache = Arc::new(RoastCache::new(config.cache_duration));
    info!("🗄️ Caché iniciado con TTL de {}", humantime::format_duration(cache.ttl()));

    let service = Arc::new(RoastService::new(
        stats,
        generator,
        cache,
        config.prompt_template.clone(),
        config.languages.clone(),
        config.stats_limit,
    ));

    info!("🚀 Servidor iniciado exitosamente");
    server::serve(config.bind_addr, service).await
}
