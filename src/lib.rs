pub mod api;
pub mod capture;
pub mod console;
pub mod eligibility;
pub mod error;
pub mod identity;
pub mod map;
pub mod models;
pub mod notify;
pub mod records;
pub mod recorder;
pub mod settings;
mod utils;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};

use api::{HttpLocationsApi, LocationsApi};
use capture::UnsupportedGeolocator;
use console::{ConsoleNotifier, StdinPrompt};
use identity::{FileIdentityStore, IdentityProvider};
use map::SlippyMapView;
use models::Coordinates;
use recorder::{commands, ConfirmPrompt, FixedAnswer, RecorderController, RecorderOptions, RecorderServices};
use settings::{AppDirs, ClientSettings, SettingsStore};

pub use error::RecorderError;

pub const DEBUG_ENV: &str = "MEETMAP_DEBUG";

/// Map surface the console pretends to draw on.
const CONSOLE_MAP_WIDTH: f64 = 800.0;
const CONSOLE_MAP_HEIGHT: f64 = 600.0;

/// record where a business card was exchanged on the shared map
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// base URL of the card server (overrides settings and MEETMAP_API_URL)
    #[clap(long, global = true)]
    api_url: Option<String>,

    /// settings file to use instead of the platform default
    #[clap(long, global = true)]
    settings: Option<PathBuf>,

    /// open the map without any recording controls
    #[clap(long, global = true)]
    view_only: bool,

    /// echo success notices to stderr
    #[clap(short = 'v', long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// show whether recording is currently open
    Status,
    /// list recorded locations
    List {
        /// only the locations recorded from this session
        #[clap(long)]
        mine: bool,
    },
    /// record a location for this session
    Record {
        #[clap(long, allow_negative_numbers = true)]
        lat: f64,
        #[clap(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// delete a location recorded from this session
    Delete {
        id: i64,
        /// skip the confirmation question
        #[clap(long)]
        yes: bool,
    },
    /// print this session's identity
    Whoami,
    /// show the business card
    Card,
    /// show the settings, optionally saving a new server URL
    Config {
        #[clap(long = "set-api-url")]
        set_api_url: Option<String>,
    },
}

fn init_logging() {
    let debug = std::env::var(DEBUG_ENV)
        .map(|value| matches!(value.trim(), "1" | "true"))
        .unwrap_or(false);
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    // RUST_LOG still wins for individual modules.
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

struct Session {
    controller: RecorderController,
    api: Arc<HttpLocationsApi>,
    view: Arc<SlippyMapView>,
}

fn build_session(cli: &Cli, settings: &ClientSettings) -> Result<Session> {
    let api_url = cli.api_url.as_deref().unwrap_or(&settings.api_base_url);
    let api = Arc::new(
        HttpLocationsApi::new(api_url, settings.http_timeout())
            .with_context(|| format!("Failed to set up the API client for {api_url}"))?,
    );
    let view = Arc::new(SlippyMapView::new(
        settings.default_view(),
        CONSOLE_MAP_WIDTH,
        CONSOLE_MAP_HEIGHT,
        settings.min_zoom,
        settings.max_zoom,
    ));
    let prompt: Arc<dyn ConfirmPrompt> = match &cli.command {
        Command::Delete { yes: true, .. } => Arc::new(FixedAnswer(true)),
        _ => Arc::new(StdinPrompt),
    };

    let services = RecorderServices {
        api: api.clone(),
        geolocator: Arc::new(UnsupportedGeolocator),
        projector: view.clone(),
        viewport: view.clone(),
        notifier: Arc::new(ConsoleNotifier {
            verbose: cli.verbose,
        }),
        prompt,
    };
    let identities = Arc::new(IdentityProvider::new(FileIdentityStore::new(
        settings.resolved_identity_path(),
    )));
    let options = RecorderOptions {
        view_only: cli.view_only,
        geolocation_timeout: settings.geolocation_timeout(),
        default_view: settings.default_view(),
    };

    Ok(Session {
        controller: RecorderController::new(services, identities, options),
        api,
        view,
    })
}

fn show_config(store: &SettingsStore, set_api_url: Option<String>) -> Result<String> {
    if let Some(url) = set_api_url {
        let updated = ClientSettings {
            api_base_url: url,
            ..store.settings()
        };
        store.update(updated)?;
        info!("Saved settings to {}", store.path().display());
    }
    let rendered = serde_json::to_string_pretty(&store.settings())?;
    Ok(format!("# {}\n{rendered}", store.path().display()))
}

async fn dispatch(cli: &Cli, session: &Session) -> Result<String, String> {
    let controller = &session.controller;
    match &cli.command {
        Command::Status => commands::recording_status(controller).await,
        Command::List { mine } => commands::list_records(controller, *mine).await,
        Command::Record { lat, lon } => {
            commands::record_location(controller, &session.view, Coordinates::new(*lat, *lon))
                .await
        }
        Command::Delete { id, .. } => commands::delete_record(controller, *id).await,
        Command::Whoami => commands::whoami(controller),
        Command::Card => commands::card_info(session.api.as_ref() as &dyn LocationsApi).await,
        Command::Config { .. } => Err("config is handled before the session starts".into()),
    }
}

fn execute(cli: Cli) -> Result<Result<String, String>> {
    let settings_path = cli.settings.clone().unwrap_or_else(AppDirs::settings_path);
    let store = SettingsStore::new(settings_path)?;

    if let Command::Config { set_api_url } = &cli.command {
        return show_config(&store, set_api_url.clone()).map(Ok);
    }

    let settings = store.settings().with_env_overrides();
    let session = build_session(&cli, &settings)?;
    info!("Using card server {}", session.api.base_url());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    Ok(runtime.block_on(dispatch(&cli, &session)))
}

pub fn run() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match execute(cli) {
        Ok(Ok(output)) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Ok(Err(message)) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_record_with_negative_coordinates() {
        let cli = Cli::try_parse_from(["meetmap", "record", "--lat", "-33.86", "--lon", "151.2"])
            .unwrap();
        match cli.command {
            Command::Record { lat, lon } => {
                assert_eq!(lat, -33.86);
                assert_eq!(lon, 151.2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "meetmap",
            "delete",
            "7",
            "--yes",
            "--view-only",
            "--api-url",
            "http://cards.test",
        ])
        .unwrap();
        assert!(cli.view_only);
        assert_eq!(cli.api_url.as_deref(), Some("http://cards.test"));
        assert!(matches!(cli.command, Command::Delete { id: 7, yes: true }));
    }

    #[test]
    fn config_updates_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let shown = show_config(&store, Some("https://cards.example.com".into())).unwrap();
        assert!(shown.contains("https://cards.example.com"));
        assert_eq!(store.settings().api_base_url, "https://cards.example.com");
    }
}
