// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Optional JSON settings file, merged under the command line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Defaults for everything the command line leaves unspecified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Program document to run.
    pub model: PathBuf,
    /// Palette document for symbol colors.
    pub palette: PathBuf,
    /// Tick-rate bound in ticks per second (0 = unlimited).
    pub tickrate: u32,
    /// Grid extents as `(depth, height, width)`.
    pub extent: [u32; 3],
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/Growth.xml"),
            palette: PathBuf::from("resources/palette.xml"),
            tickrate: 60,
            extent: [1, 59, 59],
        }
    }
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing settings {}", path.display()))
    }
}
