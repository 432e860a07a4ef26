//! # PQTK Admin
//!
//! Client side of the Perceptual Quality Toolkit: REST transport, the
//! experiment builder, sample upload admission, results aggregation, sample
//! ranking and result submission. The `pqtk-admin` binary drives these from
//! the command line.

pub mod builder;
pub mod catalog;
pub mod client;
pub mod error;
pub mod ranking;
pub mod results;
pub mod session;
pub mod submission;
pub mod upload;

pub use builder::{BuilderPhase, ExperimentBuilder, SetupStore};
pub use client::ApiClient;
pub use error::{
    BuilderError, CatalogError, ClientError, LibraryError, SubmitError, UploadRejection,
};
pub use session::Session;
pub use upload::{UploadCandidate, UploadLimits, UploadQueue};
