//! yourfm-station - Radio station backend
//!
//! Serves station CRUD, Spotify OAuth, the discovery mixer playlist endpoint
//! and DJ bumper generation over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yourfm_common::config::{self, TomlConfig};

use yourfm_station::api::analysis::{SoundStatClient, TrackAnalyzer};
use yourfm_station::bumpers::{ElevenLabsClient, GeminiClient, SpeechSynthesizer, TextGenerator};
use yourfm_station::catalog::{SpotifyConnector, SpotifyOAuth};
use yourfm_station::mixer::DiscoveryMixer;
use yourfm_station::{build_router_with_cors, AppState};

/// Command-line arguments for yourfm-station
#[derive(Parser, Debug)]
#[command(name = "yourfm-station")]
#[command(about = "YourFM radio station backend")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "YOURFM_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "YOURFM_HOST")]
    host: String,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file (defaults to the platform config location)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut toml_config = match &args.config {
        Some(path) => TomlConfig::load(path),
        None => TomlConfig::load_default(),
    }
    .context("Failed to load configuration")?;
    toml_config.apply_env_overrides();

    // Initialize tracing
    let level = toml_config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("yourfm_station={},tower_http={}", level, level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting YourFM station (yourfm-station) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let root_folder = config::resolve_root_folder(
        args.root_folder.as_deref(),
        toml_config.root_folder.as_deref(),
    );
    config::ensure_directory_exists(&root_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Root folder: {}", root_folder.display());

    let db_path = toml_config.database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let db_pool = match yourfm_station::db::init_database_pool(&db_path).await {
        Ok(pool) => {
            info!("Database connection established");
            pool
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e);
        }
    };

    let connector = SpotifyConnector::new(toml_config.spotify.clone())
        .context("Failed to build Spotify client")?;

    let oauth = SpotifyOAuth::from_config(&toml_config.spotify);
    if oauth.is_none() {
        warn!("Spotify credentials not configured; sign-in is disabled");
    }

    let text_generator: Option<Arc<dyn TextGenerator>> = match GeminiClient::new(&toml_config.gemini) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!("Bumper text generation disabled: {}", e);
            None
        }
    };

    let synthesizer: Option<Arc<dyn SpeechSynthesizer>> =
        match ElevenLabsClient::new(&toml_config.elevenlabs) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Speech synthesis disabled: {}", e);
                None
            }
        };

    let analyzer: Option<Arc<dyn TrackAnalyzer>> =
        match SoundStatClient::new(&toml_config.soundstat) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Track analysis serves defaults only: {}", e);
                None
            }
        };

    let mixer = DiscoveryMixer::new(toml_config.mixer.clone());
    info!(
        "Mixer: {} tracks at {:.0}% discovery",
        toml_config.mixer.target_total,
        toml_config.mixer.discovery_ratio * 100.0
    );

    let state = AppState::new(db_pool, Arc::new(connector), mixer)
        .with_oauth(oauth)
        .with_text_generator(text_generator)
        .with_synthesizer(synthesizer)
        .with_analyzer(analyzer)
        .with_frontend_url(toml_config.frontend_url.clone());

    let app = build_router_with_cors(state, &toml_config.cors_origins);

    let port = args.port.unwrap_or(toml_config.port);
    let addr: SocketAddr = format!("{}:{}", args.host, port)
        .parse()
        .context("Invalid bind address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("yourfm-station listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
