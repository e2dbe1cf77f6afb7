//! Data models: configuration, input primitives, templates and output.

pub mod config;
pub mod output;
pub mod primitive;
pub mod template;
