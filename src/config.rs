// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Editor settings.
//!
//! Settings come from the file named by `CHROMAHINT_CONFIG`, else from
//! `chromahint.yaml` in the working directory, else the defaults. Every
//! field is optional in the file.

use crate::backend::remote::Credentials;
use crate::io::cache::DEFAULT_FRAME_CACHE_SIZE;
use crate::io::serialization::Format;
use crate::models::color_point::{Rgb, DEFAULT_POINT_COLOR};
use crate::tracking::TrackerParams;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "CHROMAHINT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "chromahint.yaml";

/// Which backend the editor starts with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendSettings {
    #[default]
    Local,
    Remote {
        url: String,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },
}

impl BackendSettings {
    /// Basic-auth credentials, when a username is configured.
    pub fn credentials(&self) -> Option<Credentials> {
        match self {
            BackendSettings::Remote {
                username: Some(username),
                password,
                ..
            } => Some(Credentials {
                username: username.clone(),
                password: password.clone().unwrap_or_default(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Decoded frames kept in memory.
    pub frame_cache_size: usize,
    /// On-screen radius of a hint marker, in screen pixels.
    pub point_radius: f32,
    /// Color of newly added hints.
    pub default_color: Rgb,
    /// Colorize after every frame switch.
    pub auto_colorize: bool,
    pub backend: BackendSettings,
    pub tracker: TrackerParams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frame_cache_size: DEFAULT_FRAME_CACHE_SIZE,
            point_radius: 5.0,
            default_color: DEFAULT_POINT_COLOR,
            auto_colorize: true,
            backend: BackendSettings::Local,
            tracker: TrackerParams::default(),
        }
    }
}

impl Settings {
    /// Settings from the usual locations. Never fails; problems are logged
    /// and the defaults are used.
    pub fn load() -> Self {
        let path = match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => PathBuf::from(path),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    log::info!("No {} found, using default settings", DEFAULT_CONFIG_FILE);
                    return Self::default();
                }
                fallback
            }
        };

        match Self::from_path(&path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::error!("Ignoring settings file: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let format = Format::from_path(path)?;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings = match format {
            Format::Yaml => serde_yaml::from_str(&text)
                .with_context(|| format!("Invalid YAML in {}", path.display()))?,
            Format::Json => serde_json::from_str(&text)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?,
        };
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("chromahint-config-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let path = scratch("partial.yaml");
        std::fs::write(
            &path,
            "auto_colorize: false\ntracker:\n  window_size: 21\nbackend:\n  kind: remote\n  url: http://gpu-box:8000/\n  username: ana\n",
        )
        .unwrap();

        let settings = Settings::from_path(&path).unwrap();
        assert!(!settings.auto_colorize);
        assert_eq!(settings.tracker.window_size, 21);
        assert_eq!(settings.tracker.max_level, 2);
        assert_eq!(settings.frame_cache_size, DEFAULT_FRAME_CACHE_SIZE);
        assert_eq!(
            settings.backend.credentials(),
            Some(Credentials {
                username: "ana".into(),
                password: String::new(),
            })
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_json_settings() {
        let path = scratch("settings.json");
        std::fs::write(&path, r#"{"default_color": [255, 0, 0], "backend": {"kind": "local"}}"#).unwrap();
        let settings = Settings::from_path(&path).unwrap();
        assert_eq!(settings.default_color, [255, 0, 0]);
        assert_eq!(settings.backend, BackendSettings::Local);
        assert_eq!(settings.backend.credentials(), None);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = scratch("broken.yaml");
        std::fs::write(&path, "frame_cache_size: [").unwrap();
        assert!(Settings::from_path(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
