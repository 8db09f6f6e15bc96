//! Shared utilities for Hiroba: logging setup and clock abstraction.

pub mod logger;
pub mod time;
