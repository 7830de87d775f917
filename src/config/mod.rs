// src/config/mod.rs

//! Session configuration: the config file, the environment overrides used
//! under `cargo test`, and launch mode resolution.
//!
//! - [`model`] holds the TOML mapping.
//! - [`loader`] reads and validates it.
//! - [`mode`] implements launch mode priority and the per-session snapshot.

pub mod loader;
pub mod mode;
pub mod model;

pub use loader::{default_config_path, load_and_validate, load_default, load_from_path};
pub use mode::{resolve_launch_mode, session, Session, HIDE_RUN_RESULTS_ENV, LAUNCH_MODE_ENV};
pub use model::{default_interpreters, ConfigFile, RawConfigFile};
