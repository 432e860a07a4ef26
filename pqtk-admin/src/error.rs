//! Error types for the admin client

use pqtk_common::{TestType, ValidationReport};
use thiserror::Error;

/// Transport-level errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request never produced a response (connect, timeout, body read)
    #[error("Network error: {0}")]
    Transport(String),

    /// 401 from the backend; the caller has to log in again
    #[error("Not authorized, please log in")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-2xx status
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    /// Response parsed but failed schema validation
    #[error("Invalid data from {endpoint}: {report}")]
    InvalidData {
        endpoint: String,
        report: ValidationReport,
    },

    /// 2xx response whose acknowledgement reported `success: false`
    #[error("Request to {0} was not accepted by the backend")]
    Rejected(String),

    /// Local failure (token file, output file)
    #[error(transparent)]
    Local(#[from] pqtk_common::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Local(e.into())
    }
}

/// Refused builder operations; builder state is unchanged when one is returned
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("No experiment loaded")]
    NotLoaded,

    #[error("No test selected")]
    NoSelection,

    #[error("Test #{0} does not exist")]
    TestNotFound(u32),

    #[error("An experiment can contain at most {0} tests")]
    TestLimit(usize),

    #[error("{test_type} tests compare exactly two samples")]
    SampleLimit { test_type: TestType },

    #[error("{operation} is not available for {test_type} tests")]
    NotApplicable {
        operation: &'static str,
        test_type: TestType,
    },

    #[error("Text cannot be empty")]
    EmptyText,

    #[error("{0:?} already exists in this test")]
    DuplicateText(String),

    #[error("{field} must be at most {max} characters, found {found}")]
    TooLong {
        field: &'static str,
        max: usize,
        found: usize,
    },

    #[error("{0}")]
    InvalidTest(ValidationReport),

    #[error("Invalid setup file: {0}")]
    InvalidSetup(ValidationReport),

    #[error("Save failed: {0}")]
    SaveFailed(#[source] ClientError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Refused experiment catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Experiment name cannot be empty")]
    EmptyName,

    #[error("Experiment name must be at most {max} characters, found {found}")]
    NameTooLong { max: usize, found: usize },

    #[error("Experiment {0:?} already exists")]
    Duplicate(String),

    #[error("Experiment {0:?} does not exist")]
    Unknown(String),

    #[error("At most {0} experiments can exist")]
    LimitReached(usize),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Why one candidate file was kept out of an upload queue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("File {name:?} is not an audio file")]
    NotAudio { name: String },

    #[error("File {name:?} exceeds the maximum size of {max_mib}MB")]
    TooLarge { name: String, size: u64, max_mib: u64 },

    #[error("Sample {name:?} already exists")]
    Duplicate { name: String },

    #[error("Cannot add {name:?}: at most {ceiling} samples in total, including already uploaded samples")]
    OverCeiling { name: String, ceiling: usize },
}

impl UploadRejection {
    pub fn file_name(&self) -> &str {
        match self {
            UploadRejection::NotAudio { name }
            | UploadRejection::TooLarge { name, .. }
            | UploadRejection::Duplicate { name }
            | UploadRejection::OverCeiling { name, .. } => name,
        }
    }
}

/// Refused result submissions and exports
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Nothing to submit")]
    Empty,

    #[error("Result for test #{0} does not match any test")]
    UnknownTest(u32),

    #[error("Result for test #{test_number} is {found} but the test is {expected}")]
    TypeMismatch {
        test_number: u32,
        expected: TestType,
        found: TestType,
    },

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Refused sample library operations
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(u8),

    #[error("Sample {0:?} is not in the library")]
    UnknownSample(String),

    #[error("Nothing to upload")]
    NothingToUpload,

    #[error(transparent)]
    Client(#[from] ClientError),
}
