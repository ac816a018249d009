//! Layered configuration for lowres.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A configuration file: the one passed explicitly, otherwise
//!    `lowres.{toml,yaml,yml,json}` in the platform configuration directory.
//! 3. Environment variables prefixed with `LOWRES_`, nested with `__`
//!    (`LOWRES_RESIZE__PAGE_SIZE=50`).
//! 4. `DBX_TOKEN` from the process environment or, failing that, from a
//!    `.env` file in the working directory (or one of its parents), mapped
//!    onto `storage.token`.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use lowres_library::{
    Context, DEFAULT_ARCHIVE_FOLDER, DEFAULT_FOLDER, DEFAULT_PAGE_SIZE, DEFAULT_SUFFIX, DEFAULT_THRESHOLD, ErrorPolicy,
    PathPolicy,
};
use lowres_storage::{ThumbnailFormat, ThumbnailMode, ThumbnailRequest, ThumbnailSize, validate_path};
use serde::{Deserialize, Deserializer, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "LOWRES_";
pub const TOKEN_VAR: &str = "DBX_TOKEN";
pub const PAGE_SIZE_RANGE: RangeInclusive<u32> = 1..=2000;
const FILE_STEM: &str = "lowres";
const FILE_EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub resize: ResizeConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Access token. Left unset, every remote call fails authentication.
    pub token: Option<String>,
    pub api_url: String,
    pub content_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: "https://api.dropboxapi.com/2".to_string(),
            content_url: "https://content.dropboxapi.com/2".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    pub folder: String,
    pub page_size: u32,
    /// Bytes; only strictly larger files are replaced.
    pub threshold: u64,
    pub format: ThumbnailFormat,
    pub size: ThumbnailSize,
    pub mode: ThumbnailMode,
    #[serde(deserialize_with = "lenient_string")]
    pub suffix: String,
    #[serde(deserialize_with = "lenient_string")]
    pub archive_folder: String,
    pub on_error: ErrorPolicy,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            folder: DEFAULT_FOLDER.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            threshold: DEFAULT_THRESHOLD,
            format: ThumbnailFormat::default(),
            size: ThumbnailSize::default(),
            mode: ThumbnailMode::default(),
            suffix: DEFAULT_SUFFIX.to_string(),
            archive_folder: DEFAULT_ARCHIVE_FOLDER.to_string(),
            on_error: ErrorPolicy::default(),
        }
    }
}

impl Config {
    /// Load from every source, with `file` (if given) replacing the lookup
    /// in the platform configuration directory. An explicit file must exist.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::extract(Self::figment(file)?)
    }

    /// All sources layered, but not yet extracted.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let file = match file {
            Some(path) if !path.is_file() => {
                exn::bail!(ErrorKind::Invalid(format!("config file {} does not exist", path.display())))
            },
            Some(path) => Some(path.to_path_buf()),
            None => default_file(),
        };
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            tracing::debug!(path = %path.display(), "Reading configuration file");
            figment = merge_file(figment, &path)?;
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        // Merged as a plain string: tokens are opaque and may look numeric.
        if let Some(token) = token()? {
            figment = figment.merge(Serialized::default("storage.token", token));
        }
        Ok(figment)
    }

    /// Deserialize and validate whatever `figment` has been layered with.
    pub fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let resize = &self.resize;
        if !PAGE_SIZE_RANGE.contains(&resize.page_size) {
            exn::bail!(ErrorKind::Invalid("resize.page_size".to_string()));
        }
        validate_path(&resize.folder).or_raise(|| ErrorKind::Invalid("resize.folder".to_string()))?;
        if !is_segment(&resize.suffix) {
            exn::bail!(ErrorKind::Invalid("resize.suffix".to_string()));
        }
        if !is_segment(&resize.archive_folder) || matches!(resize.archive_folder.as_str(), "." | "..") {
            exn::bail!(ErrorKind::Invalid("resize.archive_folder".to_string()));
        }
        Ok(())
    }

    /// Everything a resize run needs, with the folder normalized.
    pub fn context(&self) -> Result<Context> {
        let resize = &self.resize;
        let folder = validate_path(&resize.folder).or_raise(|| ErrorKind::Invalid("resize.folder".to_string()))?;
        Ok(Context {
            folder,
            page_size: resize.page_size,
            threshold: resize.threshold,
            thumbnail: ThumbnailRequest {
                format: resize.format,
                size: resize.size,
                mode: resize.mode,
            },
            policy: PathPolicy::new(resize.format)
                .with_suffix(resize.suffix.clone())
                .with_archive_folder(resize.archive_folder.clone()),
            on_error: resize.on_error,
        })
    }
}

/// `DBX_TOKEN` from the process environment, then from the nearest `.env`
/// file. The `.env` file is read, not applied to the process environment.
fn token() -> Result<Option<String>> {
    if let Some(token) = std::env::var(TOKEN_VAR).ok().filter(|t| !t.trim().is_empty()) {
        return Ok(Some(token));
    }
    let entries = match dotenvy::dotenv_iter() {
        Ok(entries) => entries,
        Err(e) if e.not_found() => return Ok(None),
        Err(e) => return Err(e).or_raise(|| ErrorKind::Load),
    };
    for entry in entries {
        let (key, value) = entry.or_raise(|| ErrorKind::Load)?;
        if key == TOKEN_VAR {
            tracing::debug!("Read access token from .env file");
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Accepts scalars of any type as a string; environment values such as
/// `LOWRES_RESIZE__SUFFIX=2` arrive as numbers.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        String(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::String(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    })
}

fn is_segment(value: &str) -> bool {
    !value.is_empty() && !value.contains('/')
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::Invalid(format!("unsupported config file format: {}", path.display()))),
    })
}

/// The first `lowres.*` file found in the platform configuration directory.
fn default_file() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", FILE_STEM)?;
    FILE_EXTENSIONS
        .iter()
        .map(|ext| dirs.config_dir().join(format!("{FILE_STEM}.{ext}")))
        .find(|path| path.is_file())
}
