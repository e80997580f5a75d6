//! Media asset types.
//!
//! An asset is an immutable-once-created reference to a piece of source
//! media. Assets are owned by the project and referenced by items, never
//! duplicated. Content locators are either absolute URIs or paths relative
//! to the project root.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique asset identifier.
pub type AssetId = Uuid;

/// A reference to one piece of source media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique identifier.
    pub id: AssetId,

    /// Content locator: URI or project-relative path.
    pub locator: String,

    /// Natural duration in seconds, where the media has one.
    #[serde(default)]
    pub duration_secs: Option<f64>,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Thumbnail locator.
    #[serde(default)]
    pub thumbnail: Option<String>,

    /// Media payload by kind.
    #[serde(flatten)]
    pub kind: AssetKind,
}

/// Discriminated union of media kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetKind {
    Video,
    Image,
    Audio,
    Text {
        /// Literal text content.
        content: String,
        /// Rendering style.
        style: TextStyle,
    },
}

/// Style record for text assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    /// Font family name.
    pub font_family: String,

    /// Font size in output pixels.
    pub font_size: f64,

    /// Text color as hex string (for example `#ffffff`).
    pub color: String,

    /// Horizontal alignment; also drives the draw anchor.
    pub alignment: TextAlignment,

    /// Font weight.
    pub weight: FontWeight,

    /// Font slant.
    pub slant: FontSlant,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextAlignment {
    Left,
    #[default]
    Center,
    Right,
}

/// Font weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// Font slant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FontSlant {
    #[default]
    Normal,
    Italic,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            font_size: 48.0,
            color: "#ffffff".to_string(),
            alignment: TextAlignment::Center,
            weight: FontWeight::Normal,
            slant: FontSlant::Normal,
        }
    }
}

impl Asset {
    /// Create a video asset.
    pub fn video(locator: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            locator: locator.into(),
            duration_secs: Some(duration_secs),
            name: None,
            thumbnail: None,
            kind: AssetKind::Video,
        }
    }

    /// Create an image asset.
    pub fn image(locator: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            locator: locator.into(),
            duration_secs: None,
            name: None,
            thumbnail: None,
            kind: AssetKind::Image,
        }
    }

    /// Create an audio asset.
    pub fn audio(locator: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            locator: locator.into(),
            duration_secs: Some(duration_secs),
            name: None,
            thumbnail: None,
            kind: AssetKind::Audio,
        }
    }

    /// Create a text asset. Text has no backing file, so the locator is empty.
    pub fn text(content: impl Into<String>, style: TextStyle) -> Self {
        Self {
            id: Uuid::new_v4(),
            locator: String::new(),
            duration_secs: None,
            name: None,
            thumbnail: None,
            kind: AssetKind::Text {
                content: content.into(),
                style,
            },
        }
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether this asset draws pixels (video or image or text).
    pub fn is_visual(&self) -> bool {
        !matches!(self.kind, AssetKind::Audio)
    }

    /// Whether this asset has a backing media file to fetch.
    pub fn has_media_file(&self) -> bool {
        matches!(
            self.kind,
            AssetKind::Video | AssetKind::Image | AssetKind::Audio
        )
    }
}
