//! Edits applied to the detached draft test
//!
//! None of these touch the committed test list. Each returns an error and
//! leaves the draft unchanged when the edit is refused.

use crate::error::BuilderError;
use pqtk_common::models::{Question, Sample, Test};

/// Add or remove a sample; pairwise tests hold at most two
pub(crate) fn toggle_sample(test: &mut Test, asset_path: &str) -> Result<bool, BuilderError> {
    let test_type = test.test_type();
    let samples = test.samples_mut();

    if let Some(pos) = samples.iter().position(|s| s.asset_path == asset_path) {
        samples.remove(pos);
        if let Test::Abx(abx) = test {
            if abx.x_sample_id.as_deref() == Some(asset_path) {
                abx.x_sample_id = None;
            }
        }
        return Ok(false);
    }

    if test_type.is_pairwise() && samples.len() >= 2 {
        return Err(BuilderError::SampleLimit { test_type });
    }
    samples.push(Sample::from_asset_path(asset_path));
    Ok(true)
}

/// Add a question (AB/ABX) or axis (APE)
pub(crate) fn add_prompt(test: &mut Test, text: &str) -> Result<(), BuilderError> {
    let test_type = test.test_type();
    let prompts = test.prompts_mut().ok_or(BuilderError::NotApplicable {
        operation: "Adding questions",
        test_type,
    })?;

    let text = text.trim();
    if text.is_empty() {
        return Err(BuilderError::EmptyText);
    }
    if prompts.iter().any(|p| p.text == text) {
        return Err(BuilderError::DuplicateText(text.to_string()));
    }
    prompts.push(Question::new(text));
    Ok(())
}

pub(crate) fn remove_prompt(test: &mut Test, text: &str) -> Result<bool, BuilderError> {
    let test_type = test.test_type();
    let prompts = test.prompts_mut().ok_or(BuilderError::NotApplicable {
        operation: "Removing questions",
        test_type,
    })?;
    let before = prompts.len();
    prompts.retain(|p| p.text != text);
    Ok(prompts.len() != before)
}

/// MUSHRA reference; an empty path clears it
pub(crate) fn set_reference(test: &mut Test, asset_path: &str) -> Result<(), BuilderError> {
    match test {
        Test::Mushra(mushra) => {
            mushra.reference = Sample::from_asset_path(asset_path.trim());
            Ok(())
        }
        other => Err(BuilderError::NotApplicable {
            operation: "Setting a reference",
            test_type: other.test_type(),
        }),
    }
}

pub(crate) fn toggle_anchor(test: &mut Test, asset_path: &str) -> Result<bool, BuilderError> {
    match test {
        Test::Mushra(mushra) => {
            if let Some(pos) = mushra.anchors.iter().position(|s| s.asset_path == asset_path) {
                mushra.anchors.remove(pos);
                Ok(false)
            } else {
                mushra.anchors.push(Sample::from_asset_path(asset_path));
                Ok(true)
            }
        }
        other => Err(BuilderError::NotApplicable {
            operation: "Selecting anchors",
            test_type: other.test_type(),
        }),
    }
}
