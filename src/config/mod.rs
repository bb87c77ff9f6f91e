// src/config/mod.rs

//! Configuration loading and validation for observer.
//!
//! Responsibilities:
//! - Define the serde-backed data model (`model.rs`).
//! - Load a config file from disk, TOML or JSON (`loader.rs`).
//! - Validate commands and patterns (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, WatcherConfig};
pub use validate::{compile_pattern, validate_config};
