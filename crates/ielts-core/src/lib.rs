//! ielts-core: answer normalization, grading, and exam session state.
//!
//! This crate defines the test-definition data model, the grading engine
//! with its band conversion tables, and the session state manager that the
//! `ielts` CLI builds on.

pub mod band;
pub mod config;
pub mod error;
pub mod grader;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod report;
pub mod session;
pub mod store;
pub mod traits;
