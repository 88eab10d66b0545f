//! LayerLens CLI library.

pub mod commands;
pub mod output;
