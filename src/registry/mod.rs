//! Registry of installed tools.
//!
//! This module provides:
//! - [`ToolRecord`] and [`Registry`], the in-memory data model
//! - [`RegistryFile`] for atomic load/save of `tools.json`
//! - [`RegistryStore`], the single writer shared by concurrent operations

pub mod record;
pub mod store;

pub use record::{Registry, ToolRecord};
pub use store::{RegistryFile, RegistryStore};
