//! Shared API request/response bodies
//!
//! Small envelopes the backend wraps around lists and acknowledgements.

use serde::{Deserialize, Serialize};

/// `GET /experiments` body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentsList {
    pub experiments: Vec<String>,
}

/// Body of experiment create/delete requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentName {
    pub name: String,
}

/// Generic acknowledgement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// `POST /experiments/{name}/samples/v2` body: newly available asset paths
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplePaths {
    pub asset_path: Vec<String>,
}

/// Library sample with its average rating (also the `PUT /samples/rate` body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatedSample {
    pub sample_id: String,
    pub name: String,
    pub asset_path: String,
    /// Average rating; 0 when unrated
    #[serde(default)]
    pub rating: f64,
}

impl RatedSample {
    pub fn is_rated(&self) -> bool {
        self.rating > 0.0
    }
}

/// `GET /samples` body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplesList {
    pub samples: Vec<RatedSample>,
}

/// `POST /auth/login` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// `GET /auth/user` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub is_active: bool,
}
