//! # PQTK Common Library
//!
//! Shared code for the Perceptual Quality Toolkit client crates including:
//! - Experiment setup and result models (wire format of the REST backend)
//! - Schema validation of untrusted JSON (API responses, uploaded setup files)
//! - Configuration loading
//! - Notice (toast) types and the NoticeBus
//! - Identifier generation

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod uid;
pub mod validation;

pub use error::{Error, Result};
pub use models::{ExperimentSetup, Question, Sample, Test, TestType};
pub use validation::{validate, validate_test, FieldIssue, Schema, ValidationReport};
