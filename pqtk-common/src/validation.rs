//! Schema validation for untrusted JSON
//!
//! [`validate`] turns an arbitrary `serde_json::Value` into a typed model or a
//! [`ValidationReport`] listing every field-level problem it found. It never
//! panics on malformed input. Validation runs in three passes:
//!
//! 1. Shape: required fields, JSON types, the `type` discriminant, string
//!    length caps (collects all issues)
//! 2. Decode: serde into the typed model
//! 3. Constraints: cross-field rules on the typed value
//!
//! [`validate_test`] holds the per-type listening-test rules shared by manual
//! edits and uploaded setup files.

use crate::models::{
    ExperimentSetup, ExperimentsList, Question, ResultsList, Sample, SamplePaths, SamplesList,
    SuccessResponse, Test, TokenResponse, UserData, MAX_DESCRIPTION_LENGTH, MAX_END_TEXT_LENGTH,
    MAX_NAME_LENGTH,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Upper bound on an uploaded setup file
pub const MAX_SETUP_FILE_BYTES: usize = 1024 * 1024;

const TEST_TYPES: [&str; 4] = ["AB", "ABX", "MUSHRA", "APE"];

/// One problem at one location (`tests[1].samples[0].assetPath`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every issue found while validating one value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    issues: Vec<FieldIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report holding a single issue
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        let mut report = Self::new();
        report.push(path, message);
        report
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(FieldIssue {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    pub fn first(&self) -> Option<&FieldIssue> {
        self.issues.first()
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationReport> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.issues.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationReport {}

/// A model that can be validated out of untrusted JSON
pub trait Schema: DeserializeOwned {
    /// Structural checks on raw JSON, before typed decoding
    fn check_shape(value: &Value, path: &str, report: &mut ValidationReport) {
        let _ = (value, path, report);
    }

    /// Rules on the decoded value
    fn check_constraints(&self, report: &mut ValidationReport) {
        let _ = report;
    }
}

/// Validate an untyped JSON value into `T`
pub fn validate<T: Schema>(value: &Value) -> Result<T, ValidationReport> {
    let mut report = ValidationReport::new();
    T::check_shape(value, "", &mut report);
    if !report.is_empty() {
        return Err(report);
    }

    let typed = match T::deserialize(value) {
        Ok(typed) => typed,
        Err(e) => return Err(ValidationReport::single("", e.to_string())),
    };

    typed.check_constraints(&mut report);
    report.into_result(typed)
}

/// Parse JSON bytes then validate; malformed or oversized input becomes a report
pub fn parse_json<T: Schema>(bytes: &[u8]) -> Result<T, ValidationReport> {
    validate(&parse_value(bytes)?)
}

/// Parse JSON bytes into an untyped value, enforcing the document size cap
pub fn parse_value(bytes: &[u8]) -> Result<Value, ValidationReport> {
    if bytes.len() > MAX_SETUP_FILE_BYTES {
        return Err(ValidationReport::single(
            "",
            format!(
                "document is {} bytes, limit is {} bytes",
                bytes.len(),
                MAX_SETUP_FILE_BYTES
            ),
        ));
    }
    serde_json::from_slice(bytes)
        .map_err(|e| ValidationReport::single("", format!("invalid JSON: {}", e)))
}

// ========================================
// Per-type test rules
// ========================================

/// Listening-test rules applied on commit and on setup upload
///
/// - AB/ABX: exactly 2 distinct samples, at least one question
/// - MUSHRA: a reference and at least one sample
/// - APE: at least one sample and one axis
/// - Question/axis texts non-empty and unique within the test
pub fn validate_test(test: &Test) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::new();
    let path = format!("Test #{} ({})", test.test_number(), test.test_type());

    check_unique_assets(test.samples(), &path, "samples", &mut report);

    match test {
        Test::Ab(t) => {
            check_pair(&t.samples, &path, &mut report);
            check_prompts(&t.questions, &path, "question", &mut report);
        }
        Test::Abx(t) => {
            check_pair(&t.samples, &path, &mut report);
            check_prompts(&t.questions, &path, "question", &mut report);
            if let Some(x) = &t.x_sample_id {
                if !t.samples.iter().any(|s| &s.sample_id == x) {
                    report.push(path.clone(), format!("xSampleId {:?} is not one of the samples", x));
                }
            }
        }
        Test::Mushra(t) => {
            if t.reference.is_empty() {
                report.push(path.clone(), "a reference sample is required");
            }
            if t.samples.is_empty() {
                report.push(path.clone(), "at least one sample is required");
            }
            check_unique_assets(&t.anchors, &path, "anchors", &mut report);
        }
        Test::Ape(t) => {
            if t.samples.is_empty() {
                report.push(path.clone(), "at least one sample is required");
            }
            check_prompts(&t.axis, &path, "axis", &mut report);
        }
    }

    report.into_result(())
}

fn check_pair(samples: &[Sample], path: &str, report: &mut ValidationReport) {
    if samples.len() != 2 {
        report.push(
            path,
            format!("exactly 2 samples required, found {}", samples.len()),
        );
    }
}

fn check_prompts(prompts: &[Question], path: &str, label: &str, report: &mut ValidationReport) {
    if prompts.is_empty() {
        report.push(path, format!("at least one {} is required", label));
        return;
    }
    let mut seen = HashSet::new();
    for prompt in prompts {
        if prompt.text.trim().is_empty() {
            report.push(path, format!("{} text cannot be empty", label));
        } else if !seen.insert(prompt.text.as_str()) {
            report.push(path, format!("duplicate {} {:?}", label, prompt.text));
        }
    }
}

fn check_unique_assets(samples: &[Sample], path: &str, label: &str, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for sample in samples {
        if sample.is_empty() {
            report.push(path, format!("{} contain an empty asset path", label));
        } else if !seen.insert(sample.asset_path.as_str()) {
            report.push(path, format!("{} list {:?} twice", label, sample.asset_path));
        }
    }
}

// ========================================
// Shape helpers
// ========================================

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn object<'v>(
    value: &'v Value,
    path: &str,
    report: &mut ValidationReport,
) -> Option<&'v Map<String, Value>> {
    match value.as_object() {
        Some(obj) => Some(obj),
        None => {
            report.push(path, format!("expected object, found {}", json_type(value)));
            None
        }
    }
}

fn string_field(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    max_chars: Option<usize>,
    report: &mut ValidationReport,
) {
    let field = join(path, key);
    match obj.get(key) {
        None => report.push(field, "required field missing"),
        Some(Value::String(s)) => {
            if let Some(max) = max_chars {
                let n = s.chars().count();
                if n > max {
                    report.push(
                        field,
                        format!("must be at most {} characters, found {}", max, n),
                    );
                }
            }
        }
        Some(other) => report.push(field, format!("expected string, found {}", json_type(other))),
    }
}

fn optional_string_field(obj: &Map<String, Value>, key: &str, path: &str, report: &mut ValidationReport) {
    match obj.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(other) => report.push(
            join(path, key),
            format!("expected string or null, found {}", json_type(other)),
        ),
    }
}

fn optional_rating_field(obj: &Map<String, Value>, key: &str, path: &str, report: &mut ValidationReport) {
    match obj.get(key) {
        None | Some(Value::Null) => {}
        Some(Value::Number(n)) => {
            let rating = n.as_f64().unwrap_or(f64::NAN);
            if !(1.0..=5.0).contains(&rating) {
                report.push(join(path, key), format!("rating must be between 1 and 5, found {}", n));
            }
        }
        Some(other) => report.push(
            join(path, key),
            format!("expected number or null, found {}", json_type(other)),
        ),
    }
}

fn number_field(obj: &Map<String, Value>, key: &str, path: &str, report: &mut ValidationReport) {
    match obj.get(key) {
        None => report.push(join(path, key), "required field missing"),
        Some(Value::Number(_)) => {}
        Some(other) => report.push(
            join(path, key),
            format!("expected number, found {}", json_type(other)),
        ),
    }
}

fn positive_integer_field(obj: &Map<String, Value>, key: &str, path: &str, report: &mut ValidationReport) {
    match obj.get(key) {
        None => report.push(join(path, key), "required field missing"),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) if v >= 1 && v <= u32::MAX as u64 => {}
            _ => report.push(join(path, key), format!("expected positive integer, found {}", n)),
        },
        Some(other) => report.push(
            join(path, key),
            format!("expected integer, found {}", json_type(other)),
        ),
    }
}

fn array_field<'v>(
    obj: &'v Map<String, Value>,
    key: &str,
    path: &str,
    report: &mut ValidationReport,
) -> Option<&'v Vec<Value>> {
    match obj.get(key) {
        None => {
            report.push(join(path, key), "required field missing");
            None
        }
        Some(Value::Array(items)) => Some(items),
        Some(other) => {
            report.push(join(path, key), format!("expected array, found {}", json_type(other)));
            None
        }
    }
}

fn optional_array_field<'v>(
    obj: &'v Map<String, Value>,
    key: &str,
    path: &str,
    report: &mut ValidationReport,
) -> Option<&'v Vec<Value>> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(_) => array_field(obj, key, path, report),
    }
}

fn bool_field(obj: &Map<String, Value>, key: &str, path: &str, report: &mut ValidationReport) {
    match obj.get(key) {
        None => report.push(join(path, key), "required field missing"),
        Some(Value::Bool(_)) => {}
        Some(other) => report.push(
            join(path, key),
            format!("expected boolean, found {}", json_type(other)),
        ),
    }
}

fn each(
    items: Option<&Vec<Value>>,
    path: &str,
    key: &str,
    report: &mut ValidationReport,
    check: fn(&Value, &str, &mut ValidationReport),
) {
    if let Some(items) = items {
        for (i, item) in items.iter().enumerate() {
            check(item, &format!("{}[{}]", join(path, key), i), report);
        }
    }
}

fn check_sample_shape(value: &Value, path: &str, report: &mut ValidationReport) {
    let Some(obj) = object(value, path, report) else {
        return;
    };
    string_field(obj, "sampleId", path, None, report);
    string_field(obj, "assetPath", path, None, report);
    optional_string_field(obj, "name", path, report);
    optional_rating_field(obj, "rating", path, report);
}

fn check_question_shape(value: &Value, path: &str, report: &mut ValidationReport) {
    let Some(obj) = object(value, path, report) else {
        return;
    };
    string_field(obj, "questionId", path, None, report);
    string_field(obj, "text", path, None, report);
}

fn check_test_shape(value: &Value, path: &str, report: &mut ValidationReport) {
    let Some(obj) = object(value, path, report) else {
        return;
    };

    positive_integer_field(obj, "testNumber", path, report);
    let samples = array_field(obj, "samples", path, report);
    each(samples, path, "samples", report, check_sample_shape);

    let kind = match obj.get("type") {
        None => {
            report.push(join(path, "type"), "required field missing");
            return;
        }
        Some(Value::String(kind)) if TEST_TYPES.contains(&kind.as_str()) => kind.as_str(),
        Some(Value::String(kind)) => {
            report.push(join(path, "type"), format!("unknown test type {:?}", kind));
            return;
        }
        Some(other) => {
            report.push(
                join(path, "type"),
                format!("expected string, found {}", json_type(other)),
            );
            return;
        }
    };

    match kind {
        "AB" | "ABX" => {
            let questions = array_field(obj, "questions", path, report);
            each(questions, path, "questions", report, check_question_shape);
            if kind == "ABX" {
                optional_string_field(obj, "xSampleId", path, report);
            }
        }
        "MUSHRA" => {
            match obj.get("reference") {
                None => report.push(join(path, "reference"), "required field missing"),
                Some(reference) => check_sample_shape(reference, &join(path, "reference"), report),
            }
            let anchors = array_field(obj, "anchors", path, report);
            each(anchors, path, "anchors", report, check_sample_shape);
        }
        _ => {
            let axis = array_field(obj, "axis", path, report);
            each(axis, path, "axis", report, check_question_shape);
        }
    }
}

fn check_result_shape(value: &Value, path: &str, report: &mut ValidationReport) {
    let Some(obj) = object(value, path, report) else {
        return;
    };
    positive_integer_field(obj, "testNumber", path, report);
    optional_string_field(obj, "feedback", path, report);
    optional_string_field(obj, "experimentUse", path, report);

    let kind = match obj.get("type") {
        Some(Value::String(kind)) if TEST_TYPES.contains(&kind.as_str()) => kind.as_str(),
        Some(Value::String(kind)) => {
            report.push(join(path, "type"), format!("unknown test type {:?}", kind));
            return;
        }
        Some(other) => {
            report.push(
                join(path, "type"),
                format!("expected string, found {}", json_type(other)),
            );
            return;
        }
        None => {
            report.push(join(path, "type"), "required field missing");
            return;
        }
    };

    match kind {
        "AB" => {
            let selections = array_field(obj, "selections", path, report);
            each(selections, path, "selections", report, check_selection_shape);
        }
        "ABX" => {
            string_field(obj, "xSampleId", path, None, report);
            string_field(obj, "xSelected", path, None, report);
            let selections = optional_array_field(obj, "selections", path, report);
            each(selections, path, "selections", report, check_selection_shape);
        }
        "MUSHRA" => {
            number_field(obj, "referenceScore", path, report);
            for key in ["anchorsScores", "samplesScores"] {
                let scores = array_field(obj, key, path, report);
                each(scores, path, key, report, |item, path, report| {
                    let Some(obj) = object(item, path, report) else {
                        return;
                    };
                    string_field(obj, "sampleId", path, None, report);
                    number_field(obj, "score", path, report);
                });
            }
        }
        _ => {
            let axes = array_field(obj, "axisResults", path, report);
            each(axes, path, "axisResults", report, |item, path, report| {
                let Some(obj) = object(item, path, report) else {
                    return;
                };
                string_field(obj, "axisId", path, None, report);
                let ratings = array_field(obj, "sampleRatings", path, report);
                each(ratings, path, "sampleRatings", report, |item, path, report| {
                    let Some(obj) = object(item, path, report) else {
                        return;
                    };
                    string_field(obj, "sampleId", path, None, report);
                    number_field(obj, "rating", path, report);
                });
            });
        }
    }
}

fn check_selection_shape(value: &Value, path: &str, report: &mut ValidationReport) {
    let Some(obj) = object(value, path, report) else {
        return;
    };
    string_field(obj, "questionId", path, None, report);
    string_field(obj, "sampleId", path, None, report);
}

fn check_string_item(value: &Value, path: &str, report: &mut ValidationReport) {
    if !value.is_string() {
        report.push(path, format!("expected string, found {}", json_type(value)));
    }
}

fn check_string_list(value: &Value, path: &str, report: &mut ValidationReport) {
    match value.as_array() {
        Some(items) => {
            for (i, item) in items.iter().enumerate() {
                check_string_item(item, &format!("{}[{}]", path, i), report);
            }
        }
        None => report.push(path, format!("expected array, found {}", json_type(value))),
    }
}

// ========================================
// Schema implementations
// ========================================

impl Schema for ExperimentSetup {
    fn check_shape(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(obj) = object(value, path, report) else {
            return;
        };
        string_field(obj, "uid", path, None, report);
        string_field(obj, "name", path, Some(MAX_NAME_LENGTH), report);
        string_field(obj, "description", path, Some(MAX_DESCRIPTION_LENGTH), report);
        string_field(obj, "endText", path, Some(MAX_END_TEXT_LENGTH), report);
        let tests = array_field(obj, "tests", path, report);
        each(tests, path, "tests", report, check_test_shape);
    }

    fn check_constraints(&self, report: &mut ValidationReport) {
        let mut seen = HashSet::new();
        for (i, test) in self.tests.iter().enumerate() {
            if !seen.insert(test.test_number()) {
                report.push(
                    format!("tests[{}].testNumber", i),
                    format!("duplicate test number {}", test.test_number()),
                );
            }
        }
    }
}

impl Schema for Test {
    fn check_shape(value: &Value, path: &str, report: &mut ValidationReport) {
        check_test_shape(value, path, report);
    }
}

impl Schema for ResultsList {
    fn check_shape(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(obj) = object(value, path, report) else {
            return;
        };
        let results = array_field(obj, "results", path, report);
        each(results, path, "results", report, check_result_shape);
    }
}

impl Schema for ExperimentsList {
    fn check_shape(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(obj) = object(value, path, report) else {
            return;
        };
        let names = array_field(obj, "experiments", path, report);
        each(names, path, "experiments", report, check_string_item);
    }

    fn check_constraints(&self, report: &mut ValidationReport) {
        for (i, name) in self.experiments.iter().enumerate() {
            if name.trim().is_empty() {
                report.push(format!("experiments[{}]", i), "experiment name is empty");
            }
        }
    }
}

impl Schema for SamplesList {
    fn check_shape(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(obj) = object(value, path, report) else {
            return;
        };
        let samples = array_field(obj, "samples", path, report);
        each(samples, path, "samples", report, |item, path, report| {
            let Some(obj) = object(item, path, report) else {
                return;
            };
            string_field(obj, "sampleId", path, None, report);
            string_field(obj, "name", path, None, report);
            string_field(obj, "assetPath", path, None, report);
        });
    }
}

impl Schema for TokenResponse {
    fn check_shape(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(obj) = object(value, path, report) else {
            return;
        };
        string_field(obj, "access_token", path, None, report);
        optional_string_field(obj, "token_type", path, report);
    }

    fn check_constraints(&self, report: &mut ValidationReport) {
        if self.access_token.trim().is_empty() {
            report.push("access_token", "token is empty");
        }
    }
}

impl Schema for SuccessResponse {
    fn check_shape(value: &Value, path: &str, report: &mut ValidationReport) {
        if let Some(obj) = object(value, path, report) {
            bool_field(obj, "success", path, report);
        }
    }
}

impl Schema for SamplePaths {
    fn check_shape(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(obj) = object(value, path, report) else {
            return;
        };
        let paths = array_field(obj, "asset_path", path, report);
        each(paths, path, "asset_path", report, check_string_item);
    }
}

impl Schema for UserData {
    fn check_shape(value: &Value, path: &str, report: &mut ValidationReport) {
        let Some(obj) = object(value, path, report) else {
            return;
        };
        optional_string_field(obj, "username", path, report);
        optional_string_field(obj, "email", path, report);
        bool_field(obj, "is_active", path, report);
    }
}

impl Schema for Vec<String> {
    fn check_shape(value: &Value, path: &str, report: &mut ValidationReport) {
        check_string_list(value, path, report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AbTest, ApeTest, MushraTest};
    use serde_json::json;

    fn ab(samples: &[&str], questions: &[&str]) -> Test {
        Test::Ab(AbTest {
            test_number: 1,
            samples: samples.iter().map(|s| Sample::from_asset_path(*s)).collect(),
            questions: questions.iter().map(|q| Question::new(*q)).collect(),
        })
    }

    #[test]
    fn test_valid_setup_passes() {
        let value = json!({
            "uid": "1-1-1-1",
            "name": "Demo",
            "description": " ",
            "endText": "",
            "tests": [
                {"type": "AB", "testNumber": 1,
                 "samples": [{"sampleId": "a.wav", "assetPath": "a.wav"}],
                 "questions": []}
            ]
        });
        let setup: ExperimentSetup = validate(&value).unwrap();
        assert_eq!(setup.tests.len(), 1);
    }

    #[test]
    fn test_reports_every_field_issue() {
        let value = json!({
            "uid": 7,
            "name": "x".repeat(51),
            "description": "d",
            "tests": [
                {"type": "XYZ", "testNumber": 1, "samples": []},
                {"type": "APE", "testNumber": 0, "samples": [{"assetPath": 3}], "axis": "nope"}
            ]
        });
        let report = validate::<ExperimentSetup>(&value).unwrap_err();
        let paths: Vec<&str> = report.issues().iter().map(|i| i.path.as_str()).collect();

        assert!(paths.contains(&"uid"));
        assert!(paths.contains(&"name"));
        assert!(paths.contains(&"endText"));
        assert!(paths.contains(&"tests[0].type"));
        assert!(paths.contains(&"tests[1].testNumber"));
        assert!(paths.contains(&"tests[1].samples[0].sampleId"));
        assert!(paths.contains(&"tests[1].samples[0].assetPath"));
        assert!(paths.contains(&"tests[1].axis"));
    }

    #[test]
    fn test_non_object_root() {
        let report = validate::<ExperimentSetup>(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(report.len(), 1);
        assert!(report.to_string().contains("expected object, found array"));
    }

    #[test]
    fn test_duplicate_test_numbers_rejected() {
        let value = json!({
            "uid": "u", "name": "n", "description": "", "endText": "",
            "tests": [
                {"type": "AB", "testNumber": 1, "samples": [], "questions": []},
                {"type": "APE", "testNumber": 1, "samples": [], "axis": []}
            ]
        });
        let report = validate::<ExperimentSetup>(&value).unwrap_err();
        assert_eq!(report.first().unwrap().path, "tests[1].testNumber");
    }

    #[test]
    fn test_rating_out_of_range() {
        let value = json!({"type": "APE", "testNumber": 1, "axis": [],
            "samples": [{"sampleId": "a", "assetPath": "a", "rating": 9}]});
        let report = validate::<Test>(&value).unwrap_err();
        assert_eq!(report.first().unwrap().path, "samples[0].rating");
    }

    #[test]
    fn test_parse_json_garbage() {
        let report = parse_json::<ExperimentSetup>(b"{not json").unwrap_err();
        assert!(report.to_string().starts_with("invalid JSON"));
    }

    #[test]
    fn test_parse_json_too_large() {
        let big = vec![b' '; MAX_SETUP_FILE_BYTES + 1];
        assert!(parse_json::<ExperimentSetup>(&big).is_err());
    }

    #[test]
    fn test_validate_test_ab_rules() {
        assert!(validate_test(&ab(&["a.wav", "b.wav"], &["Which is louder?"])).is_ok());

        let report = validate_test(&ab(&["a.wav"], &["q"])).unwrap_err();
        assert!(report.to_string().contains("exactly 2 samples required, found 1"));

        let report = validate_test(&ab(&["a.wav", "b.wav"], &[])).unwrap_err();
        assert!(report.to_string().contains("at least one question"));

        let report = validate_test(&ab(&["a.wav", "a.wav"], &["q"])).unwrap_err();
        assert!(report.to_string().contains("twice"));

        let report = validate_test(&ab(&["a.wav", "b.wav"], &["q", "q"])).unwrap_err();
        assert!(report.to_string().contains("duplicate question"));
    }

    #[test]
    fn test_validate_test_mushra_needs_reference() {
        let test = Test::Mushra(MushraTest {
            test_number: 2,
            samples: vec![Sample::from_asset_path("s.wav")],
            reference: Sample::empty(),
            anchors: vec![],
        });
        let report = validate_test(&test).unwrap_err();
        assert_eq!(report.first().unwrap().path, "Test #2 (MUSHRA)");
        assert!(report.to_string().contains("reference"));
    }

    #[test]
    fn test_validate_test_ape_needs_axis() {
        let test = Test::Ape(ApeTest {
            test_number: 1,
            samples: vec![Sample::from_asset_path("s.wav")],
            axis: vec![],
        });
        assert!(validate_test(&test).is_err());
    }

    #[test]
    fn test_results_unknown_type() {
        let value = json!({"results": [{"type": "SCORE", "testNumber": 1}]});
        let report = validate::<ResultsList>(&value).unwrap_err();
        assert_eq!(report.first().unwrap().path, "results[0].type");
    }

    #[test]
    fn test_plain_string_list() {
        let list: Vec<String> = validate(&json!(["a.wav", "b.wav"])).unwrap();
        assert_eq!(list.len(), 2);
        assert!(validate::<Vec<String>>(&json!({"a": 1})).is_err());
    }
}
