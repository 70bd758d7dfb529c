use std::fs;
use std::path::{Path, PathBuf};

use room_engine::{ObjectAction, Panel, PlaceableKind};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub(crate) enum ScriptError {
    #[error("failed to read script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid script {path}: {message}")]
    Parse { path: String, message: String },
}

/// A timeline of inbound messages and local input standing in for the
/// transport and the UI.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Script {
    #[serde(default)]
    pub(crate) steps: Vec<ScriptStep>,
    /// Extra ticks to keep running after the last step so walks can finish.
    #[serde(default = "default_run_ticks")]
    pub(crate) run_ticks: u64,
}

fn default_run_ticks() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct ScriptStep {
    pub(crate) tick: u64,
    #[serde(flatten)]
    pub(crate) action: ScriptAction,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum ScriptAction {
    Inbound {
        message: Value,
    },
    Pointer {
        x: f32,
        y: f32,
        #[serde(default)]
        press: bool,
        #[serde(default)]
        release: bool,
        #[serde(default)]
        panel: Option<Panel>,
        #[serde(default, rename = "chatFocused")]
        chat_focused: bool,
    },
    Escape,
    InventoryPlace {
        kind: PlaceableKind,
        name: String,
    },
    ObjectAction {
        x: i32,
        y: i32,
        op: ObjectAction,
    },
    Chat {
        message: String,
    },
    PreviewSkin {
        #[serde(default)]
        tile: Option<String>,
        #[serde(default)]
        wall: Option<String>,
    },
    Disconnect,
}

impl Script {
    pub(crate) fn load(path: &Path) -> Result<Self, ScriptError> {
        let raw = fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let script = Self::parse(&raw, &path.display().to_string())?;
        info!(
            path = %path.display(),
            steps = script.steps.len(),
            last_tick = script.last_tick(),
            "script_loaded"
        );
        Ok(script)
    }

    pub(crate) fn parse(raw: &str, origin: &str) -> Result<Self, ScriptError> {
        let deserializer = &mut serde_json::Deserializer::from_str(raw);
        let mut script: Script =
            serde_path_to_error::deserialize(deserializer).map_err(|error| ScriptError::Parse {
                path: origin.to_string(),
                message: format!("{} at '{}'", error.inner(), error.path()),
            })?;
        // Stable, so same-tick steps keep their file order.
        script.steps.sort_by_key(|step| step.tick);
        Ok(script)
    }

    /// Tick after which the driver stops.
    pub(crate) fn last_tick(&self) -> u64 {
        let last_step = self.steps.last().map(|step| step.tick).unwrap_or(0);
        last_step.saturating_add(self.run_ticks)
    }
}
