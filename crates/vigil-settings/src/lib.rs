//! # vigil-settings
//!
//! Configuration for the Vigil bot, loaded from three layers (in priority
//! order):
//!
//! 1. **Compiled defaults** — [`VigilSettings::default()`]
//! 2. **Config file** — JSON, deep-merged over defaults
//! 3. **Environment variables** — `VIGIL_*` overrides (highest priority)
//!
//! There is no global settings singleton: `main` loads a [`VigilSettings`]
//! once and passes it (or slices of it) to the components that need it.

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path};
pub use types::*;
