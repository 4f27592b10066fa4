//! # Engine Configuration
//!
//! Loaded once at startup, from code or from TOML:
//!
//! ```toml
//! threading = "single"
//! compaction_threshold = 0.5
//!
//! [layout]
//! entity_length = "u16"
//! component_length = "u16"
//! type_id = "u8"
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use serde::Deserialize;

use fastecs_core::{EcsError, EcsResult, HeaderLayout};

/// Where `run_mt` systems execute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Threading {
    /// Inline on the caller's thread, like `run_st`.
    Single,
    /// One scoped OS thread per call.
    #[default]
    Multi,
}

/// Engine configuration.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Threading mode for parallel systems.
    pub threading: Threading,
    /// Header widths of the packed record store.
    pub layout: HeaderLayout,
    /// Tombstoned share of a packed pool above which `maintain` compacts it.
    pub compaction_threshold: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threading: Threading::Multi,
            layout: HeaderLayout::default(),
            compaction_threshold: 0.25,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on malformed TOML, unknown keys,
    /// or values out of range.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the threading mode.
    #[must_use]
    pub fn with_threading(mut self, threading: Threading) -> Self {
        self.threading = threading;
        self
    }

    /// Sets the packed header layout.
    #[must_use]
    pub fn with_layout(mut self, layout: HeaderLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the compaction threshold is not
    /// within `0.0..=1.0`.
    pub fn validate(&self) -> EcsResult<()> {
        if !(0.0..=1.0).contains(&self.compaction_threshold) {
            return Err(EcsError::InvalidConfig(format!(
                "compaction_threshold must be within 0.0..=1.0, got {}",
                self.compaction_threshold
            )));
        }
        Ok(())
    }
}
