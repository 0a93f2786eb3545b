//! Declared-type classification and the per-kind strategy table.
//!
//! [`classify`] is total: every declared type maps to exactly one
//! [`AssetKind`], unrecognized tags landing on [`AssetKind::Opaque`]. The
//! [`Strategy`] recorded for an extracted object is the outcome tag that
//! repack dispatches on; it also fixes the artifact subdirectory and the
//! marker appended to the declared type when a raw fallback was taken.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

/// Texture artifacts (PNG).
pub const TEXTURES_DIR: &str = "Textures";
/// Text asset artifacts (`.txt` / `.bytes`).
pub const TEXT_ASSETS_DIR: &str = "TextAssets";
/// Structured objects serialized as field trees.
pub const STRUCTURED_JSON_DIR: &str = "MonoBehaviours_JSON";
/// Structured objects that fell back to raw bytes.
pub const STRUCTURED_RAW_DIR: &str = "MonoBehaviours_DAT";
/// Audio clip artifacts.
pub const AUDIO_DIR: &str = "AudioClips";
/// Raw bytes of objects without a dedicated strategy.
pub const OTHER_DIR: &str = "OtherAssets";

/// Every artifact subdirectory, created unconditionally on extraction.
pub const ALL_SUBDIRS: [&str; 6] = [
    TEXTURES_DIR,
    TEXT_ASSETS_DIR,
    STRUCTURED_JSON_DIR,
    STRUCTURED_RAW_DIR,
    AUDIO_DIR,
    OTHER_DIR,
];

/// Marker appended to the declared type of structured objects stored raw.
pub const STRUCTURED_RAW_SUFFIX: &str = "_Raw";
/// Marker appended to the declared type of opaque objects stored raw.
pub const GENERIC_RAW_SUFFIX: &str = "_genericdat";
/// Older manifests marked structured raw fallbacks with this suffix.
const LEGACY_STRUCTURED_RAW_SUFFIX: &str = "_DAT";

/// Named payload field probed for structured raw bytes.
pub const SCRIPT_FIELD: &str = "m_Script";

/// Kind of an object, derived from its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Textures and sprites.
    Image,
    /// Text assets.
    Text,
    /// Script-backed objects with an optional field-tree schema.
    Structured,
    /// Audio clips.
    Audio,
    /// Anything else.
    Opaque,
}

impl AssetKind {
    /// Canonical artifact subdirectory for this kind.
    #[must_use]
    pub const fn subdir(self) -> &'static str {
        match self {
            Self::Image => TEXTURES_DIR,
            Self::Text => TEXT_ASSETS_DIR,
            Self::Structured => STRUCTURED_JSON_DIR,
            Self::Audio => AUDIO_DIR,
            Self::Opaque => OTHER_DIR,
        }
    }

    /// Artifact policy for this kind.
    #[must_use]
    pub const fn policy(self) -> ArtifactPolicy {
        match self {
            Self::Opaque => ArtifactPolicy::OpaqueBytes,
            _ => ArtifactPolicy::Editable,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Text => "text",
            Self::Structured => "structured",
            Self::Audio => "audio",
            Self::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

/// Whether an artifact is meant for structured editing or carries opaque
/// bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactPolicy {
    /// Decoded into an editable format (PNG, text, JSON, audio).
    Editable,
    /// Written verbatim.
    OpaqueBytes,
}

/// Maps a declared type tag to its kind. Never fails.
///
/// # Examples
///
/// ```
/// use bundlesync_core::classify::AssetKind;
/// use bundlesync_core::classify::classify;
///
/// assert_eq!(classify("Sprite"), AssetKind::Image);
/// assert_eq!(classify("Mesh"), AssetKind::Opaque);
/// ```
#[must_use]
pub fn classify(declared_type: &str) -> AssetKind {
    match declared_type {
        "Texture2D" | "Sprite" => AssetKind::Image,
        "TextAsset" => AssetKind::Text,
        "MonoBehaviour" => AssetKind::Structured,
        "AudioClip" => AssetKind::Audio,
        _ => AssetKind::Opaque,
    }
}

/// How an object was extracted, and therefore how it is repacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// PNG artifact assigned back into the image slot.
    Image,
    /// `.txt` or `.bytes` artifact assigned back into the script field.
    Text,
    /// Field tree serialized to JSON.
    StructuredJson,
    /// Structured object stored as raw bytes after the field tree was
    /// unavailable.
    StructuredRaw,
    /// Audio artifact written back into the raw audio field.
    Audio,
    /// Opaque object stored as raw bytes.
    GenericRaw,
}

impl Strategy {
    /// Artifact subdirectory used by this strategy.
    #[must_use]
    pub const fn subdir(self) -> &'static str {
        match self {
            Self::Image => TEXTURES_DIR,
            Self::Text => TEXT_ASSETS_DIR,
            Self::StructuredJson => STRUCTURED_JSON_DIR,
            Self::StructuredRaw => STRUCTURED_RAW_DIR,
            Self::Audio => AUDIO_DIR,
            Self::GenericRaw => OTHER_DIR,
        }
    }

    /// Kind of object this strategy applies to.
    #[must_use]
    pub const fn kind(self) -> AssetKind {
        match self {
            Self::Image => AssetKind::Image,
            Self::Text => AssetKind::Text,
            Self::StructuredJson | Self::StructuredRaw => AssetKind::Structured,
            Self::Audio => AssetKind::Audio,
            Self::GenericRaw => AssetKind::Opaque,
        }
    }

    /// Fixed artifact extension, or `None` when it is chosen per object.
    #[must_use]
    pub const fn extension(self) -> Option<&'static str> {
        match self {
            Self::Image => Some("png"),
            Self::StructuredJson => Some("json"),
            Self::StructuredRaw => Some("dat"),
            Self::GenericRaw => Some("genericdat"),
            Self::Text | Self::Audio => None,
        }
    }

    /// Declared type as recorded in the manifest for this strategy.
    #[must_use]
    pub fn recorded_type(self, declared_type: &str) -> String {
        match self {
            Self::StructuredRaw => format!("{declared_type}{STRUCTURED_RAW_SUFFIX}"),
            Self::GenericRaw => format!("{declared_type}{GENERIC_RAW_SUFFIX}"),
            _ => declared_type.to_string(),
        }
    }

    /// Infers the strategy from a recorded declared type.
    ///
    /// Used for manifests that predate the persisted strategy tag. Returns
    /// `None` for types repack does not handle.
    ///
    /// # Examples
    ///
    /// ```
    /// use bundlesync_core::classify::Strategy;
    ///
    /// assert_eq!(Strategy::infer("Texture2D"), Some(Strategy::Image));
    /// assert_eq!(Strategy::infer("MonoBehaviour_Raw"), Some(Strategy::StructuredRaw));
    /// assert_eq!(Strategy::infer("Mesh_genericdat"), Some(Strategy::GenericRaw));
    /// assert_eq!(Strategy::infer("Mesh"), None);
    /// ```
    #[must_use]
    pub fn infer(recorded_type: &str) -> Option<Self> {
        if recorded_type.ends_with(GENERIC_RAW_SUFFIX) {
            return Some(Self::GenericRaw);
        }
        if recorded_type.ends_with(STRUCTURED_RAW_SUFFIX)
            || recorded_type.ends_with(LEGACY_STRUCTURED_RAW_SUFFIX)
        {
            return Some(Self::StructuredRaw);
        }
        if recorded_type.starts_with("AudioClip") {
            return Some(Self::Audio);
        }
        match classify(recorded_type) {
            AssetKind::Image => Some(Self::Image),
            AssetKind::Text => Some(Self::Text),
            AssetKind::Structured => Some(Self::StructuredJson),
            AssetKind::Audio => Some(Self::Audio),
            AssetKind::Opaque => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Text => "text",
            Self::StructuredJson => "structured_json",
            Self::StructuredRaw => "structured_raw",
            Self::Audio => "audio",
            Self::GenericRaw => "generic_raw",
        };
        f.write_str(name)
    }
}

/// Where the raw bytes of a raw-strategy artifact came from.
///
/// Probed in declaration order during extraction; repack writes back into
/// the same source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RawSource {
    /// The object's own raw accessor.
    Object,
    /// Raw bytes exposed by the decoded payload.
    Payload,
    /// A named byte field on the payload.
    Field(String),
}

impl fmt::Display for RawSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => f.write_str("object"),
            Self::Payload => f.write_str("payload"),
            Self::Field(name) => write!(f, "field:{name}"),
        }
    }
}

impl FromStr for RawSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "object" => Ok(Self::Object),
            "payload" => Ok(Self::Payload),
            other => match other.strip_prefix("field:") {
                Some(name) if !name.is_empty() => Ok(Self::Field(name.to_string())),
                _ => Err(format!("unknown raw source '{other}'")),
            },
        }
    }
}

impl TryFrom<String> for RawSource {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RawSource> for String {
    fn from(value: RawSource) -> Self {
        value.to_string()
    }
}
