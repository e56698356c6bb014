//! Application services layer.

pub mod error;
pub mod pdf;
pub mod sources;
pub mod templates;
