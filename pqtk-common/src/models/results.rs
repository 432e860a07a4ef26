//! Test result records produced by participants and returned by the backend

use super::setup::TestType;
use serde::{Deserialize, Serialize};

/// Participant picked `sample_id` for `question_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSelection {
    pub question_id: String,
    pub sample_id: String,
}

/// MUSHRA slider score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleScore {
    pub sample_id: String,
    pub score: f64,
}

/// APE rating of one sample on one axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRating {
    pub sample_id: String,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisResult {
    pub axis_id: String,
    pub sample_ratings: Vec<SampleRating>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbResult {
    pub test_number: u32,
    pub selections: Vec<SampleSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Run identifier the backend assigns to one participant's submission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_use: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbxResult {
    pub test_number: u32,
    pub x_sample_id: String,
    pub x_selected: String,
    #[serde(default)]
    pub selections: Vec<SampleSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_use: Option<String>,
}

impl AbxResult {
    pub fn is_correct(&self) -> bool {
        self.x_selected == self.x_sample_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MushraResult {
    pub test_number: u32,
    pub reference_score: f64,
    pub anchors_scores: Vec<SampleScore>,
    pub samples_scores: Vec<SampleScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_use: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApeResult {
    pub test_number: u32,
    pub axis_results: Vec<AxisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_use: Option<String>,
}

/// One participant's answer to one test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TestResult {
    #[serde(rename = "AB")]
    Ab(AbResult),
    #[serde(rename = "ABX")]
    Abx(AbxResult),
    #[serde(rename = "MUSHRA")]
    Mushra(MushraResult),
    #[serde(rename = "APE")]
    Ape(ApeResult),
}

impl TestResult {
    pub fn test_number(&self) -> u32 {
        match self {
            TestResult::Ab(r) => r.test_number,
            TestResult::Abx(r) => r.test_number,
            TestResult::Mushra(r) => r.test_number,
            TestResult::Ape(r) => r.test_number,
        }
    }

    pub fn test_type(&self) -> TestType {
        match self {
            TestResult::Ab(_) => TestType::Ab,
            TestResult::Abx(_) => TestType::Abx,
            TestResult::Mushra(_) => TestType::Mushra,
            TestResult::Ape(_) => TestType::Ape,
        }
    }

    pub fn experiment_use(&self) -> Option<&str> {
        match self {
            TestResult::Ab(r) => r.experiment_use.as_deref(),
            TestResult::Abx(r) => r.experiment_use.as_deref(),
            TestResult::Mushra(r) => r.experiment_use.as_deref(),
            TestResult::Ape(r) => r.experiment_use.as_deref(),
        }
    }
}

/// `GET /experiments/{name}/results` body, also the submission body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsList {
    pub results: Vec<TestResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_results_list_mixed_types() {
        let value = json!({
            "results": [
                {"type": "AB", "testNumber": 1, "experimentUse": "run-1",
                 "selections": [{"questionId": "q1", "sampleId": "a.wav"}]},
                {"type": "ABX", "testNumber": 2, "xSampleId": "a.wav", "xSelected": "b.wav",
                 "selections": []},
                {"type": "MUSHRA", "testNumber": 3, "referenceScore": 100,
                 "anchorsScores": [{"sampleId": "lp.wav", "score": 20}],
                 "samplesScores": [{"sampleId": "s.wav", "score": 71.5}]},
                {"type": "APE", "testNumber": 4,
                 "axisResults": [{"axisId": "Brightness",
                                  "sampleRatings": [{"sampleId": "s.wav", "rating": 0.4}]}]}
            ]
        });
        let list: ResultsList = serde_json::from_value(value).unwrap();
        assert_eq!(list.results.len(), 4);
        assert_eq!(list.results[0].experiment_use(), Some("run-1"));
        assert_eq!(list.results[2].test_type(), TestType::Mushra);
        match &list.results[1] {
            TestResult::Abx(r) => assert!(!r.is_correct()),
            other => panic!("unexpected {:?}", other.test_type()),
        }
    }
}
