//! Wire models shared by every PQTK client component
//!
//! Field names follow the backend's JSON exactly (`camelCase` for setups and
//! results, `snake_case` where the backend uses it). The uploaded `setup.json`
//! format is the one contract that must stay bit-exact.

pub mod api;
pub mod results;
pub mod setup;

pub use api::{
    ExperimentName, ExperimentsList, RatedSample, SamplePaths, SamplesList, SuccessResponse,
    TokenResponse, UserData,
};
pub use results::{
    AbResult, AbxResult, ApeResult, AxisResult, MushraResult, ResultsList, SampleRating,
    SampleScore, SampleSelection, TestResult,
};
pub use setup::{
    AbTest, AbxTest, ApeTest, ExperimentSetup, MushraTest, Question, Sample, Test, TestType,
    MAX_DESCRIPTION_LENGTH, MAX_END_TEXT_LENGTH, MAX_NAME_LENGTH, MAX_TESTS,
};
