//! CLI library components for the case decomposer.

pub mod documents;
pub mod logging;
pub mod output;
