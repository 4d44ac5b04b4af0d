mod types;

pub use types::*;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result as AnyResult;
use globset::Glob;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCategory {
    Type,
    Range,
    Dependency,
}

impl ValidationCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationCategory::Type => "type",
            ValidationCategory::Range => "range",
            ValidationCategory::Dependency => "dependency",
        }
    }
}

impl fmt::Display for ValidationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config parse error [type]: {source}")]
    Parse {
        #[source]
        source: toml::de::Error,
    },

    #[error("config validation error [{category}] for `{field}`: {message}")]
    Validation {
        category: ValidationCategory,
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    pub fn category(&self) -> Option<ValidationCategory> {
        match self {
            ConfigError::Read { .. } => None,
            ConfigError::Parse { .. } => Some(ValidationCategory::Type),
            ConfigError::Validation { category, .. } => Some(*category),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

pub fn load_from(path: impl AsRef<Path>) -> AnyResult<Config> {
    load_from_typed(path).map_err(anyhow::Error::new)
}

pub fn load_from_typed(path: impl AsRef<Path>) -> Result<Config> {
    let path_ref = path.as_ref();
    let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
        path: path_ref.to_path_buf(),
        source,
    })?;
    let cfg: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse { source })?;
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> Result<()> {
    validate_enum(
        "output.format",
        cfg.output.format.as_str(),
        &["text", "json"],
    )?;
    validate_enum("output.mode", cfg.output.mode.as_str(), &["warn", "enforce"])?;

    validate_range_usize(
        "github.max_annotations_per_request",
        cfg.github.max_annotations_per_request,
        1,
        50,
    )?;

    if cfg.report.globs.is_empty() {
        return Err(validation_error(
            ValidationCategory::Dependency,
            "report.globs",
            "at least one report glob is required",
        ));
    }
    validate_globs("report.globs", &cfg.report.globs)?;

    if cfg.github.check_name.trim().is_empty() {
        return Err(validation_error(
            ValidationCategory::Dependency,
            "github.check_name",
            "must be non-empty",
        ));
    }
    if cfg.github.check_title.trim().is_empty() {
        return Err(validation_error(
            ValidationCategory::Dependency,
            "github.check_title",
            "must be non-empty",
        ));
    }

    Ok(())
}

fn validate_enum(field: &'static str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(validation_error(
            ValidationCategory::Type,
            field,
            format!("invalid value `{value}` (expected: {})", allowed.join("|")),
        ))
    }
}

fn validate_range_usize(field: &'static str, value: usize, min: usize, max: usize) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(validation_error(
            ValidationCategory::Range,
            field,
            format!("`{value}` is outside allowed range {min}..={max}"),
        ))
    }
}

fn validate_globs(field: &'static str, globs: &[String]) -> Result<()> {
    for pattern in globs {
        Glob::new(pattern).map_err(|err| {
            validation_error(
                ValidationCategory::Type,
                field,
                format!("invalid glob pattern `{pattern}`: {err}"),
            )
        })?;
    }
    Ok(())
}

fn validation_error(
    category: ValidationCategory,
    field: &'static str,
    message: impl Into<String>,
) -> ConfigError {
    ConfigError::Validation {
        category,
        field,
        message: message.into(),
    }
}
