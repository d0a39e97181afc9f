//! Core types shared by the cms-search crates.
//!
//! This crate has no internal dependencies. It provides:
//!
//! - [`error`]: the engine's error taxonomy and `Result` alias
//! - [`ids`]: normalization of group identifiers and search words
//! - [`status`]: observable tenant lifecycle status

pub mod error;
pub mod ids;
pub mod status;

pub use error::{Error, Result};
pub use ids::{normalize_group, split_words};
pub use status::{StatusHandle, TenantStatus};
