use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::types::{FurnitureDefinition, PosterDefinition, RoomDefinition, RugDefinition};
use crate::spatial::{GridError, OccupancyGrid};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog at {path}: {message}")]
    Parse { path: String, message: String },
    #[error("room '{room}' has an invalid map: {source}")]
    InvalidRoomMap {
        room: String,
        #[source]
        source: GridError,
    },
    #[error("{section} entry '{name}' has an unusable name: {problem}")]
    InvalidName {
        section: &'static str,
        name: String,
        problem: NameProblem,
    },
    #[error("furniture '{name}' declares no orientations")]
    NoOrientations { name: String },
}

/// Why a catalog key cannot be used as an asset directory name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameProblem {
    #[error("name is empty")]
    Empty,
    #[error("name is longer than 64 bytes")]
    TooLong,
    #[error("name must start with a lowercase letter")]
    BadStart,
    #[error("'{0}' is not allowed")]
    BadCharacter(char),
}

const MAX_NAME_LEN: usize = 64;

/// Keys become one segment of a sprite path such as `rugs/<name>`, so only
/// lowercase letters, digits, `_` and `-` are accepted.
fn check_name(name: &str) -> Result<(), NameProblem> {
    let mut chars = name.chars();
    let first = chars.next().ok_or(NameProblem::Empty)?;
    if name.len() > MAX_NAME_LEN {
        return Err(NameProblem::TooLong);
    }
    if !first.is_ascii_lowercase() {
        return Err(NameProblem::BadStart);
    }
    let allowed =
        |ch: char| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '-');
    match chars.find(|ch| !allowed(*ch)) {
        Some(ch) => Err(NameProblem::BadCharacter(ch)),
        None => Ok(()),
    }
}

fn check_section_names<V>(
    section: &'static str,
    entries: &HashMap<String, V>,
) -> Result<(), CatalogError> {
    for name in entries.keys() {
        check_name(name).map_err(|problem| CatalogError::InvalidName {
            section,
            name: name.clone(),
            problem,
        })?;
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    rooms: HashMap<String, RoomDefinition>,
    #[serde(default)]
    furniture: HashMap<String, FurnitureDefinition>,
    #[serde(default)]
    rugs: HashMap<String, RugDefinition>,
    #[serde(default)]
    posters: HashMap<String, PosterDefinition>,
}

/// Room layouts and placeable item definitions, keyed by name.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    rooms: HashMap<String, RoomDefinition>,
    furniture: HashMap<String, FurnitureDefinition>,
    rugs: HashMap<String, RugDefinition>,
    posters: HashMap<String, PosterDefinition>,
}

impl Catalog {
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        Self::parse(raw, "<inline>")
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::parse(&raw, &path.display().to_string())?;
        info!(
            path = %path.display(),
            rooms = catalog.rooms.len(),
            furniture = catalog.furniture.len(),
            rugs = catalog.rugs.len(),
            posters = catalog.posters.len(),
            "catalog_loaded"
        );
        Ok(catalog)
    }

    fn parse(raw: &str, origin: &str) -> Result<Self, CatalogError> {
        let deserializer = &mut serde_json::Deserializer::from_str(raw);
        let document: CatalogDocument =
            serde_path_to_error::deserialize(deserializer).map_err(|error| {
                CatalogError::Parse {
                    path: origin.to_string(),
                    message: format!("{} at '{}'", error.inner(), error.path()),
                }
            })?;

        check_section_names("rooms", &document.rooms)?;
        check_section_names("furniture", &document.furniture)?;
        check_section_names("rugs", &document.rugs)?;
        check_section_names("posters", &document.posters)?;
        for (name, room) in &document.rooms {
            OccupancyGrid::from_blocked_rows(&room.map).map_err(|source| {
                CatalogError::InvalidRoomMap {
                    room: name.clone(),
                    source,
                }
            })?;
        }
        for (name, def) in &document.furniture {
            if def.orientations.is_empty() {
                return Err(CatalogError::NoOrientations { name: name.clone() });
            }
        }

        Ok(Self {
            rooms: document.rooms,
            furniture: document.furniture,
            rugs: document.rugs,
            posters: document.posters,
        })
    }

    pub fn room(&self, name: &str) -> Option<&RoomDefinition> {
        self.rooms.get(name)
    }

    pub fn furniture(&self, name: &str) -> Option<&FurnitureDefinition> {
        self.furniture.get(name)
    }

    pub fn rug(&self, name: &str) -> Option<&RugDefinition> {
        self.rugs.get(name)
    }

    pub fn poster(&self, name: &str) -> Option<&PosterDefinition> {
        self.posters.get(name)
    }

}
