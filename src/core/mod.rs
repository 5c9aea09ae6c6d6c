//! Core domain models for Gantry
//!
//! This module defines the fundamental data structures that represent
//! pipelines, steps, and their configuration.

pub mod config;
pub mod pipeline;
pub mod state;
pub mod step;

pub use pipeline::*;
pub use state::*;
pub use step::*;
