use std::fs;
use std::path::{Path, PathBuf};

use room_engine::{Catalog, CatalogError, CoreConfig, Session};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::script::{Script, ScriptError};

const CATALOG_ENV_VAR: &str = "ROOM_CLIENT_CATALOG";
const SCRIPT_ENV_VAR: &str = "ROOM_CLIENT_SCRIPT";
const CONFIG_ENV_VAR: &str = "ROOM_CLIENT_CONFIG";

#[derive(Debug, Error)]
pub(crate) enum ClientError {
    #[error("no {what} given: pass it as an argument or set {env_var}")]
    MissingInput {
        what: &'static str,
        env_var: &'static str,
    },
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

pub(crate) struct AppWiring {
    pub(crate) session: Session,
    pub(crate) script: Script,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InputPaths {
    pub(crate) catalog: PathBuf,
    pub(crate) script: PathBuf,
    pub(crate) config: Option<PathBuf>,
}

pub(crate) fn build_app(args: Vec<String>) -> Result<AppWiring, ClientError> {
    init_tracing();
    info!("=== Room Client Startup ===");

    let paths = resolve_input_paths(&args, |var| std::env::var(var).ok())?;
    let config = match &paths.config {
        Some(path) => load_config(path)?,
        None => CoreConfig::default(),
    };
    let catalog = Catalog::load(&paths.catalog)?;
    let script = Script::load(&paths.script)?;

    info!(
        tick_ms = config.tick_ms(),
        tile_width = config.tile_width,
        tile_height = config.tile_height,
        "client_configured"
    );

    Ok(AppWiring {
        session: Session::new(config, catalog),
        script,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Positional arguments `[catalog] [script] [config]` win over the environment.
pub(crate) fn resolve_input_paths(
    args: &[String],
    env: impl Fn(&str) -> Option<String>,
) -> Result<InputPaths, ClientError> {
    let pick = |index: usize, var: &str| {
        args.get(index)
            .map(String::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                env(var)
                    .map(|raw| raw.trim().to_string())
                    .filter(|value| !value.is_empty())
                    .map(PathBuf::from)
            })
    };

    let catalog = pick(0, CATALOG_ENV_VAR).ok_or(ClientError::MissingInput {
        what: "catalog",
        env_var: CATALOG_ENV_VAR,
    })?;
    let script = pick(1, SCRIPT_ENV_VAR).ok_or(ClientError::MissingInput {
        what: "script",
        env_var: SCRIPT_ENV_VAR,
    })?;
    let config = pick(2, CONFIG_ENV_VAR);

    Ok(InputPaths {
        catalog,
        script,
        config,
    })
}

pub(crate) fn load_config(path: &Path) -> Result<CoreConfig, ClientError> {
    let raw = fs::read_to_string(path).map_err(|source| ClientError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    CoreConfig::from_json_str(&raw).map_err(|source| ClientError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}
