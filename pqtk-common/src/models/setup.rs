//! Experiment setup model: the `setup.json` document
//!
//! An [`ExperimentSetup`] owns an ordered list of [`Test`]s. `Test` is a sum
//! type with one struct per listening-test variant so that each variant only
//! carries the fields it can use.

use crate::uid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of tests in one experiment
pub const MAX_TESTS: usize = 10;
/// Maximum experiment name length (characters)
pub const MAX_NAME_LENGTH: usize = 50;
/// Maximum description length (characters)
pub const MAX_DESCRIPTION_LENGTH: usize = 200;
/// Maximum end text ("end credits") length (characters)
pub const MAX_END_TEXT_LENGTH: usize = 100;

/// Audio sample reference inside a setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Currently mirrors `asset_path`
    pub sample_id: String,
    /// Storage path / file name relative to the experiment
    pub asset_path: String,
    /// Display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Administrator quality score, 1-5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl Sample {
    /// Sample whose id mirrors its asset path (how editors create them)
    pub fn from_asset_path(asset_path: impl Into<String>) -> Self {
        let asset_path = asset_path.into();
        Self {
            sample_id: asset_path.clone(),
            asset_path,
            name: None,
            rating: None,
        }
    }

    /// Placeholder reference used by a freshly switched MUSHRA test
    pub fn empty() -> Self {
        Self::from_asset_path("")
    }

    pub fn is_empty(&self) -> bool {
        self.asset_path.trim().is_empty()
    }
}

/// Question (AB/ABX) or rating axis (APE)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_id: String,
    pub text: String,
}

impl Question {
    /// Questions created in the editor use their text as id
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            question_id: text.clone(),
            text,
        }
    }
}

/// Discriminant of the [`Test`] union
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestType {
    #[serde(rename = "AB")]
    Ab,
    #[serde(rename = "ABX")]
    Abx,
    #[serde(rename = "MUSHRA")]
    Mushra,
    #[serde(rename = "APE")]
    Ape,
}

impl TestType {
    pub const ALL: [TestType; 4] = [TestType::Ab, TestType::Abx, TestType::Mushra, TestType::Ape];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Ab => "AB",
            TestType::Abx => "ABX",
            TestType::Mushra => "MUSHRA",
            TestType::Ape => "APE",
        }
    }

    /// AB and ABX compare exactly two samples
    pub fn is_pairwise(&self) -> bool {
        matches!(self, TestType::Ab | TestType::Abx)
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AB" => Ok(TestType::Ab),
            "ABX" => Ok(TestType::Abx),
            "MUSHRA" => Ok(TestType::Mushra),
            "APE" => Ok(TestType::Ape),
            other => Err(format!("unknown test type {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbTest {
    pub test_number: u32,
    pub samples: Vec<Sample>,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbxTest {
    pub test_number: u32,
    pub samples: Vec<Sample>,
    pub questions: Vec<Question>,
    /// Hidden "X" sample; assigned per participant, kept if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_sample_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MushraTest {
    pub test_number: u32,
    pub samples: Vec<Sample>,
    pub reference: Sample,
    pub anchors: Vec<Sample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApeTest {
    pub test_number: u32,
    pub samples: Vec<Sample>,
    pub axis: Vec<Question>,
}

/// One listening test, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Test {
    #[serde(rename = "AB")]
    Ab(AbTest),
    #[serde(rename = "ABX")]
    Abx(AbxTest),
    #[serde(rename = "MUSHRA")]
    Mushra(MushraTest),
    #[serde(rename = "APE")]
    Ape(ApeTest),
}

impl Test {
    /// New empty AB test (what "add test" appends)
    pub fn new_ab(test_number: u32) -> Self {
        Test::Ab(AbTest {
            test_number,
            samples: Vec::new(),
            questions: Vec::new(),
        })
    }

    pub fn test_type(&self) -> TestType {
        match self {
            Test::Ab(_) => TestType::Ab,
            Test::Abx(_) => TestType::Abx,
            Test::Mushra(_) => TestType::Mushra,
            Test::Ape(_) => TestType::Ape,
        }
    }

    pub fn test_number(&self) -> u32 {
        match self {
            Test::Ab(t) => t.test_number,
            Test::Abx(t) => t.test_number,
            Test::Mushra(t) => t.test_number,
            Test::Ape(t) => t.test_number,
        }
    }

    pub fn set_test_number(&mut self, number: u32) {
        match self {
            Test::Ab(t) => t.test_number = number,
            Test::Abx(t) => t.test_number = number,
            Test::Mushra(t) => t.test_number = number,
            Test::Ape(t) => t.test_number = number,
        }
    }

    pub fn samples(&self) -> &[Sample] {
        match self {
            Test::Ab(t) => &t.samples,
            Test::Abx(t) => &t.samples,
            Test::Mushra(t) => &t.samples,
            Test::Ape(t) => &t.samples,
        }
    }

    pub fn samples_mut(&mut self) -> &mut Vec<Sample> {
        match self {
            Test::Ab(t) => &mut t.samples,
            Test::Abx(t) => &mut t.samples,
            Test::Mushra(t) => &mut t.samples,
            Test::Ape(t) => &mut t.samples,
        }
    }

    /// Questions for AB/ABX, axes for APE, `None` for MUSHRA
    pub fn prompts(&self) -> Option<&[Question]> {
        match self {
            Test::Ab(t) => Some(&t.questions),
            Test::Abx(t) => Some(&t.questions),
            Test::Ape(t) => Some(&t.axis),
            Test::Mushra(_) => None,
        }
    }

    pub fn prompts_mut(&mut self) -> Option<&mut Vec<Question>> {
        match self {
            Test::Ab(t) => Some(&mut t.questions),
            Test::Abx(t) => Some(&mut t.questions),
            Test::Ape(t) => Some(&mut t.axis),
            Test::Mushra(_) => None,
        }
    }

    /// Convert to another variant, resetting variant-specific fields
    ///
    /// Samples are kept (truncated to the first two for AB/ABX); questions,
    /// axes, reference and anchors start empty. Converting to the current
    /// type returns the test unchanged.
    pub fn into_type(self, target: TestType) -> Test {
        if self.test_type() == target {
            return self;
        }
        let test_number = self.test_number();
        let mut samples = match self {
            Test::Ab(t) => t.samples,
            Test::Abx(t) => t.samples,
            Test::Mushra(t) => t.samples,
            Test::Ape(t) => t.samples,
        };

        match target {
            TestType::Ab => {
                samples.truncate(2);
                Test::Ab(AbTest {
                    test_number,
                    samples,
                    questions: Vec::new(),
                })
            }
            TestType::Abx => {
                samples.truncate(2);
                Test::Abx(AbxTest {
                    test_number,
                    samples,
                    questions: Vec::new(),
                    x_sample_id: None,
                })
            }
            TestType::Mushra => Test::Mushra(MushraTest {
                test_number,
                samples,
                reference: Sample::empty(),
                anchors: Vec::new(),
            }),
            TestType::Ape => Test::Ape(ApeTest {
                test_number,
                samples,
                axis: Vec::new(),
            }),
        }
    }

    /// Every asset path this test plays (samples, reference, anchors)
    pub fn referenced_asset_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.samples().iter().map(|s| s.asset_path.as_str()).collect();
        if let Test::Mushra(t) = self {
            if !t.reference.is_empty() {
                paths.push(t.reference.asset_path.as_str());
            }
            paths.extend(t.anchors.iter().map(|s| s.asset_path.as_str()));
        }
        paths
    }
}

/// The full experiment configuration, persisted wholesale on save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentSetup {
    pub uid: String,
    pub name: String,
    pub description: String,
    pub end_text: String,
    pub tests: Vec<Test>,
}

impl ExperimentSetup {
    /// Blank setup with a fresh random uid
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            uid: uid::generate_setup_uid(),
            name: name.into(),
            description: " ".to_string(),
            end_text: String::new(),
            tests: Vec::new(),
        }
    }

    pub fn find_test(&self, test_number: u32) -> Option<&Test> {
        self.tests.iter().find(|t| t.test_number() == test_number)
    }

    /// True when test numbers are exactly 1..N in list order
    pub fn is_contiguous(&self) -> bool {
        self.tests
            .iter()
            .enumerate()
            .all(|(i, t)| t.test_number() as usize == i + 1)
    }

    /// Sort by test number and rewrite numbers to 1..N. Returns whether anything changed.
    pub fn normalize_numbering(&mut self) -> bool {
        if self.is_contiguous() {
            return false;
        }
        self.tests.sort_by_key(|t| t.test_number());
        for (i, test) in self.tests.iter_mut().enumerate() {
            test.set_test_number(i as u32 + 1);
        }
        true
    }

    /// Serialize to the `setup.json` wire format
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sample_optional_fields_omitted() {
        let sample = Sample::from_asset_path("a.wav");
        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value, json!({"sampleId": "a.wav", "assetPath": "a.wav"}));
    }

    #[test]
    fn test_setup_wire_field_names() {
        let mut setup = ExperimentSetup::empty("Demo");
        setup.uid = "1-1-1-1".to_string();
        setup.tests.push(Test::new_ab(1));
        let value = serde_json::to_value(&setup).unwrap();

        assert_eq!(
            value,
            json!({
                "uid": "1-1-1-1",
                "name": "Demo",
                "description": " ",
                "endText": "",
                "tests": [{"type": "AB", "testNumber": 1, "samples": [], "questions": []}]
            })
        );
    }

    #[test]
    fn test_mushra_deserializes() {
        let value = json!({
            "type": "MUSHRA",
            "testNumber": 3,
            "samples": [{"sampleId": "s1.wav", "assetPath": "s1.wav"}],
            "reference": {"sampleId": "ref.wav", "assetPath": "ref.wav"},
            "anchors": []
        });
        let test: Test = serde_json::from_value(value).unwrap();
        assert_eq!(test.test_type(), TestType::Mushra);
        assert_eq!(test.test_number(), 3);
        assert_eq!(test.referenced_asset_paths(), vec!["s1.wav", "ref.wav"]);
    }

    #[test]
    fn test_into_type_ab_to_ape_drops_questions() {
        let mut ab = AbTest {
            test_number: 2,
            samples: vec![Sample::from_asset_path("a.wav"), Sample::from_asset_path("b.wav")],
            questions: vec![Question::new("Which is louder?")],
        };
        ab.samples.push(Sample::from_asset_path("c.wav"));

        let ape = Test::Ab(ab).into_type(TestType::Ape);
        let value = serde_json::to_value(&ape).unwrap();
        assert_eq!(value["type"], "APE");
        assert!(value.get("questions").is_none());
        assert_eq!(value["axis"], json!([]));
        assert_eq!(ape.samples().len(), 3);
        assert_eq!(ape.test_number(), 2);
    }

    #[test]
    fn test_into_type_pairwise_truncates_samples() {
        let ape = Test::Ape(ApeTest {
            test_number: 1,
            samples: vec![
                Sample::from_asset_path("a.wav"),
                Sample::from_asset_path("b.wav"),
                Sample::from_asset_path("c.wav"),
            ],
            axis: vec![Question::new("Brightness")],
        });
        let abx = ape.into_type(TestType::Abx);
        assert_eq!(abx.samples().len(), 2);
        assert_eq!(abx.prompts().unwrap().len(), 0);
    }

    #[test]
    fn test_into_type_mushra_gets_empty_reference() {
        let mushra = Test::new_ab(1).into_type(TestType::Mushra);
        match mushra {
            Test::Mushra(t) => {
                assert!(t.reference.is_empty());
                assert!(t.anchors.is_empty());
            }
            other => panic!("expected MUSHRA, got {:?}", other.test_type()),
        }
    }

    #[test]
    fn test_normalize_numbering() {
        let mut setup = ExperimentSetup::empty("x");
        setup.tests = vec![Test::new_ab(5), Test::new_ab(2)];
        assert!(!setup.is_contiguous());
        assert!(setup.normalize_numbering());
        let numbers: Vec<u32> = setup.tests.iter().map(|t| t.test_number()).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert!(!setup.normalize_numbering());
    }

    #[test]
    fn test_type_from_str() {
        assert_eq!("abx".parse::<TestType>().unwrap(), TestType::Abx);
        assert_eq!(" MUSHRA ".parse::<TestType>().unwrap(), TestType::Mushra);
        assert!("XYZ".parse::<TestType>().is_err());
    }
}
