//! Builders for configurations assembled in code.

pub mod config;
