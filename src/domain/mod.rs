//! Pure render-domain types and decisions with no I/O.

pub mod options;
pub mod render;
pub mod urls;
