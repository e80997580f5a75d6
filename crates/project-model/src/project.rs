//! Project aggregate and on-disk persistence.
//!
//! A project is the top-level container that ties together the asset set
//! and the editing timeline. The whole model persists as one JSON document
//! (`project.json`) so a saved project deserializes back to an identical
//! model regardless of transport.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::asset::{Asset, AssetId};
use crate::timeline::{Timeline, Track, TrackKind};

/// Unique project identifier.
pub type ProjectId = Uuid;

/// Top-level project document (`project.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Schema version.
    pub version: String,

    /// Unique project identifier.
    pub id: ProjectId,

    /// Human-readable title.
    pub title: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Last modified timestamp (ISO 8601).
    pub modified_at: String,

    /// Media assets owned by this project.
    #[serde(default)]
    pub assets: Vec<Asset>,

    /// The editing timeline. The track set is fixed at creation.
    pub timeline: Timeline,
}

impl Project {
    /// Create a project with the standard track set: one video, one audio,
    /// and one text track.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_tracks(
            title,
            vec![
                Track::new("Video 1", TrackKind::Video),
                Track::new("Audio 1", TrackKind::Audio),
                Track::new("Text 1", TrackKind::Text),
            ],
        )
    }

    /// Create a project with a custom track set. Tracks cannot be added or
    /// removed afterward by ordinary editing.
    pub fn with_tracks(title: impl Into<String>, tracks: Vec<Track>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: "1.0".to_string(),
            id: Uuid::new_v4(),
            title: title.into(),
            created_at: now.clone(),
            modified_at: now,
            assets: Vec::new(),
            timeline: Timeline { tracks },
        }
    }

    /// Look up an asset by id.
    pub fn asset(&self, id: AssetId) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Register an asset, returning its id.
    pub fn add_asset(&mut self, asset: Asset) -> AssetId {
        let id = asset.id;
        self.assets.push(asset);
        id
    }

    /// Check model invariants, returning human-readable violations.
    pub fn validate(&self) -> Vec<String> {
        self.timeline.validate(&self.assets)
    }
}

/// The in-memory representation of a project loaded from disk.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    /// Filesystem path to the project directory.
    pub root: PathBuf,

    /// The project model.
    pub project: Project,
}

impl LoadedProject {
    /// Load a project from a directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();
        let project_path = root.join("project.json");

        let project_json =
            std::fs::read_to_string(&project_path).map_err(|e| ProjectError::IoError {
                path: project_path.clone(),
                source: e,
            })?;

        let project: Project =
            serde_json::from_str(&project_json).map_err(|e| ProjectError::ParseError {
                path: project_path,
                source: e,
            })?;

        Ok(Self { root, project })
    }

    /// Save the project document, refreshing the modified timestamp.
    pub fn save(&mut self) -> Result<(), ProjectError> {
        std::fs::create_dir_all(&self.root).map_err(|e| ProjectError::IoError {
            path: self.root.clone(),
            source: e,
        })?;

        self.project.modified_at = chrono::Utc::now().to_rfc3339();

        let project_path = self.root.join("project.json");
        let project_json =
            serde_json::to_string_pretty(&self.project).map_err(|e| ProjectError::ParseError {
                path: project_path.clone(),
                source: e,
            })?;
        std::fs::write(&project_path, project_json).map_err(|e| ProjectError::IoError {
            path: project_path,
            source: e,
        })?;

        Ok(())
    }

    /// Create a new project on disk with the standard directory structure.
    pub fn create(root: impl AsRef<Path>, title: impl Into<String>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();

        for subdir in &["assets", "exports"] {
            std::fs::create_dir_all(root.join(subdir)).map_err(|e| ProjectError::IoError {
                path: root.join(subdir),
                source: e,
            })?;
        }

        let mut loaded = Self {
            root,
            project: Project::new(title),
        };
        loaded.save()?;
        Ok(loaded)
    }

    /// Resolve an asset locator against the project root. Absolute paths
    /// and URIs pass through unchanged.
    pub fn resolve_locator(&self, locator: &str) -> PathBuf {
        let path = Path::new(locator);
        if path.is_absolute() || locator.contains("://") {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Validate that all file-backed assets are reachable.
    ///
    /// Returns human-readable problems; an empty list means every locator
    /// resolved. Remote URIs are skipped (fetchability is the transport's
    /// concern).
    pub fn validate_assets(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for asset in &self.project.assets {
            if !asset.has_media_file() || asset.locator.contains("://") {
                continue;
            }
            let path = self.resolve_locator(&asset.locator);
            if !path.exists() {
                let label = asset.name.as_deref().unwrap_or("unnamed");
                errors.push(format!("Asset '{}' missing: {}", label, asset.locator));
            }
        }
        errors
    }
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}
