//! Participant result submission and CSV export

use crate::client::ApiClient;
use crate::error::{ClientError, SubmitError};
use pqtk_common::models::{ExperimentSetup, ResultsList, TestResult, TestType};
use pqtk_common::uid;
use std::path::{Path, PathBuf};
use tracing::info;

/// Every result must answer an existing test of the same type
pub fn check_results(setup: &ExperimentSetup, results: &ResultsList) -> Result<(), SubmitError> {
    if results.results.is_empty() {
        return Err(SubmitError::Empty);
    }
    for result in &results.results {
        let number = result.test_number();
        let test = setup
            .find_test(number)
            .ok_or(SubmitError::UnknownTest(number))?;
        if test.test_type() != result.test_type() {
            return Err(SubmitError::TypeMismatch {
                test_number: number,
                expected: test.test_type(),
                found: result.test_type(),
            });
        }
    }
    Ok(())
}

/// Tag every result lacking a run identifier with one fresh id
pub fn assign_run_id(results: &mut ResultsList) -> String {
    let existing = results
        .results
        .iter()
        .find_map(|r| r.experiment_use().map(str::to_string));
    let run_id = existing.unwrap_or_else(|| uid::generate().to_string());

    for result in results.results.iter_mut() {
        let slot = match result {
            TestResult::Ab(r) => &mut r.experiment_use,
            TestResult::Abx(r) => &mut r.experiment_use,
            TestResult::Mushra(r) => &mut r.experiment_use,
            TestResult::Ape(r) => &mut r.experiment_use,
        };
        slot.get_or_insert_with(|| run_id.clone());
    }
    run_id
}

/// Check, tag and post a participant's results; returns the run id
pub async fn submit(
    client: &ApiClient,
    experiment: &str,
    mut results: ResultsList,
) -> Result<String, SubmitError> {
    let setup = client.fetch_setup(experiment).await?;
    check_results(&setup, &results)?;
    let run_id = assign_run_id(&mut results);
    client.submit_results(experiment, &results).await?;
    Ok(run_id)
}

/// File name the backend export is saved under
pub fn csv_file_name(experiment: &str, test_number: u32, test_type: TestType) -> String {
    format!("{}_test_{}_{}.csv", experiment, test_number, test_type)
}

pub fn zip_file_name(experiment: &str) -> String {
    format!("{}_results.zip", experiment)
}

/// Save one test's CSV into `dir`
pub async fn download_test_csv(
    client: &ApiClient,
    experiment: &str,
    test_number: u32,
    test_type: TestType,
    dir: &Path,
) -> Result<PathBuf, ClientError> {
    let bytes = client
        .download_test_csv(experiment, test_number, test_type)
        .await?;
    let path = dir.join(csv_file_name(experiment, test_number, test_type));
    write_file(&path, &bytes).await?;
    Ok(path)
}

/// Save the zip of all test CSVs into `dir`
pub async fn download_all_csv(
    client: &ApiClient,
    experiment: &str,
    dir: &Path,
) -> Result<PathBuf, ClientError> {
    let bytes = client.download_all_csv(experiment).await?;
    let path = dir.join(zip_file_name(experiment));
    write_file(&path, &bytes).await?;
    Ok(path)
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ClientError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    info!(path = %path.display(), bytes = bytes.len(), "Saved export");
    Ok(())
}
