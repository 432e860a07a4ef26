//! Experiment builder state machine
//!
//! Holds the committed [`ExperimentSetup`] plus at most one detached draft
//! (the focused test). Draft edits never touch the committed list until
//! [`ExperimentBuilder::commit`] validates and writes them back.
//!
//! ```text
//! Empty -> Loaded -> Editing -> Saving -> Saved
//!                       ^          |
//!                       |          +----> SaveFailed
//!                       +-----------------(edit)
//! ```
//!
//! Loads are tagged with a generation number. A completion carrying an old
//! ticket is dropped, so a slow response for a previous experiment can never
//! overwrite the current one.

mod draft;

use crate::error::{BuilderError, ClientError};
use async_trait::async_trait;
use pqtk_common::events::NoticeBus;
use pqtk_common::models::{
    ExperimentSetup, Test, TestType, MAX_DESCRIPTION_LENGTH, MAX_END_TEXT_LENGTH, MAX_TESTS,
};
use pqtk_common::validation::{parse_value, validate, validate_test};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info};

/// Where setups are fetched from and persisted to
#[async_trait]
pub trait SetupStore: Send + Sync {
    async fn fetch_setup(&self, name: &str) -> Result<ExperimentSetup, ClientError>;
    async fn save_setup(&self, name: &str, setup: &ExperimentSetup) -> Result<(), ClientError>;
    /// Asset paths in the experiment's sample pool
    async fn list_samples(&self, name: &str) -> Result<Vec<String>, ClientError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderPhase {
    Empty,
    Loaded,
    Editing,
    Saving,
    Saved,
    SaveFailed,
}

impl fmt::Display for BuilderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BuilderPhase::Empty => "empty",
            BuilderPhase::Loaded => "loaded",
            BuilderPhase::Editing => "editing",
            BuilderPhase::Saving => "saving",
            BuilderPhase::Saved => "saved",
            BuilderPhase::SaveFailed => "save failed",
        };
        f.write_str(label)
    }
}

/// Issued by [`ExperimentBuilder::begin_load`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    name: String,
}

impl LoadTicket {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Setup fetched from the backend
    Loaded,
    /// Nothing usable on the backend; started from an empty setup
    Fallback,
    /// A newer load was started; this completion was ignored
    Stale,
}

pub struct ExperimentBuilder {
    phase: BuilderPhase,
    setup: Option<ExperimentSetup>,
    draft: Option<Test>,
    generation: u64,
    last_error: Option<String>,
    notices: NoticeBus,
}

impl ExperimentBuilder {
    pub fn new(notices: NoticeBus) -> Self {
        Self {
            phase: BuilderPhase::Empty,
            setup: None,
            draft: None,
            generation: 0,
            last_error: None,
            notices,
        }
    }

    pub fn phase(&self) -> BuilderPhase {
        self.phase
    }

    pub fn setup(&self) -> Option<&ExperimentSetup> {
        self.setup.as_ref()
    }

    /// The focused test being edited, if any
    pub fn draft(&self) -> Option<&Test> {
        self.draft.as_ref()
    }

    pub fn has_focus(&self) -> bool {
        self.draft.is_some()
    }

    /// Raw error of the last failed save
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn refuse<T>(&self, err: BuilderError) -> Result<T, BuilderError> {
        self.notices.warning(err.to_string());
        Err(err)
    }

    fn setup_mut(&mut self) -> Result<&mut ExperimentSetup, BuilderError> {
        match self.setup.as_mut() {
            Some(setup) => Ok(setup),
            None => {
                self.notices.warning(BuilderError::NotLoaded.to_string());
                Err(BuilderError::NotLoaded)
            }
        }
    }

    fn draft_mut(&mut self) -> Result<&mut Test, BuilderError> {
        match self.draft.as_mut() {
            Some(draft) => Ok(draft),
            None => {
                self.notices.warning(BuilderError::NoSelection.to_string());
                Err(BuilderError::NoSelection)
            }
        }
    }

    fn touch(&mut self) {
        if self.phase != BuilderPhase::Editing {
            debug!(from = %self.phase, "Builder entering editing");
        }
        self.phase = BuilderPhase::Editing;
    }

    // ========================================
    // Loading
    // ========================================

    /// Start loading `name`; any earlier outstanding ticket becomes stale
    pub fn begin_load(&mut self, name: &str) -> LoadTicket {
        self.generation += 1;
        debug!(experiment = %name, generation = self.generation, "Load started");
        LoadTicket {
            generation: self.generation,
            name: name.to_string(),
        }
    }

    /// Apply a fetch result for `ticket`
    ///
    /// Not-found and invalid setups fall back to an empty setup. Other
    /// failures leave the builder untouched.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        outcome: Result<ExperimentSetup, ClientError>,
    ) -> Result<LoadOutcome, BuilderError> {
        if ticket.generation != self.generation {
            debug!(
                experiment = %ticket.name,
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale load"
            );
            return Ok(LoadOutcome::Stale);
        }

        let (mut setup, result) = match outcome {
            Ok(setup) => (setup, LoadOutcome::Loaded),
            Err(ClientError::NotFound(_)) => {
                info!(experiment = %ticket.name, "No setup stored yet, starting empty");
                (ExperimentSetup::empty(&ticket.name), LoadOutcome::Fallback)
            }
            Err(ClientError::InvalidData { report, .. }) => {
                self.notices.warning(format!(
                    "Stored setup for {} is invalid, starting empty ({})",
                    ticket.name, report
                ));
                (ExperimentSetup::empty(&ticket.name), LoadOutcome::Fallback)
            }
            Err(e) => {
                self.notices.error(format!("Failed to load {}: {}", ticket.name, e));
                return Err(BuilderError::Client(e));
            }
        };

        if setup.tests.len() > MAX_TESTS {
            self.notices.warning(format!(
                "Experiment contains {} tests, only the first {} were kept",
                setup.tests.len(),
                MAX_TESTS
            ));
            setup.tests.truncate(MAX_TESTS);
        }
        if setup.normalize_numbering() {
            debug!(experiment = %ticket.name, "Renumbered tests to 1..N");
        }

        info!(experiment = %ticket.name, tests = setup.tests.len(), "Experiment loaded");
        self.setup = Some(setup);
        self.draft = None;
        self.last_error = None;
        self.phase = BuilderPhase::Loaded;
        Ok(result)
    }

    pub async fn load<S: SetupStore + ?Sized>(
        &mut self,
        store: &S,
        name: &str,
    ) -> Result<LoadOutcome, BuilderError> {
        let ticket = self.begin_load(name);
        let outcome = store.fetch_setup(name).await;
        self.finish_load(ticket, outcome)
    }

    // ========================================
    // Test list
    // ========================================

    /// Append an empty AB test numbered N+1
    pub fn add_test(&mut self) -> Result<u32, BuilderError> {
        let count = self.setup_mut()?.tests.len();
        if count >= MAX_TESTS {
            return self.refuse(BuilderError::TestLimit(MAX_TESTS));
        }
        let number = count as u32 + 1;
        self.setup_mut()?.tests.push(Test::new_ab(number));
        self.touch();
        info!(test_number = number, "Added test");
        Ok(number)
    }

    /// Focus a test: the draft becomes a copy of it
    pub fn select_test(&mut self, test_number: u32) -> Result<&Test, BuilderError> {
        let found = self.setup_mut()?.find_test(test_number).cloned();
        let Some(test) = found else {
            return self.refuse(BuilderError::TestNotFound(test_number));
        };
        self.touch();
        let draft: &Test = self.draft.insert(test);
        Ok(draft)
    }

    /// Remove a test and shift every later test down by one
    pub fn delete_test(&mut self, test_number: u32) -> Result<(), BuilderError> {
        let setup = self.setup_mut()?;
        let Some(pos) = setup.tests.iter().position(|t| t.test_number() == test_number) else {
            return self.refuse(BuilderError::TestNotFound(test_number));
        };
        setup.tests.remove(pos);
        for test in setup.tests.iter_mut() {
            if test.test_number() > test_number {
                test.set_test_number(test.test_number() - 1);
            }
        }
        self.draft = None;
        self.touch();
        info!(test_number, "Deleted test");
        Ok(())
    }

    // ========================================
    // Draft edits
    // ========================================

    fn edit_draft<T>(
        &mut self,
        edit: impl FnOnce(&mut Test) -> Result<T, BuilderError>,
    ) -> Result<T, BuilderError> {
        let result = edit(self.draft_mut()?);
        match result {
            Ok(value) => {
                self.touch();
                Ok(value)
            }
            Err(e) => self.refuse(e),
        }
    }

    /// Returns whether the sample is selected afterwards
    pub fn toggle_sample(&mut self, asset_path: &str) -> Result<bool, BuilderError> {
        self.edit_draft(|test| draft::toggle_sample(test, asset_path))
    }

    pub fn add_prompt(&mut self, text: &str) -> Result<(), BuilderError> {
        self.edit_draft(|test| draft::add_prompt(test, text))
    }

    pub fn remove_prompt(&mut self, text: &str) -> Result<bool, BuilderError> {
        self.edit_draft(|test| draft::remove_prompt(test, text))
    }

    pub fn set_reference(&mut self, asset_path: &str) -> Result<(), BuilderError> {
        self.edit_draft(|test| draft::set_reference(test, asset_path))
    }

    pub fn toggle_anchor(&mut self, asset_path: &str) -> Result<bool, BuilderError> {
        self.edit_draft(|test| draft::toggle_anchor(test, asset_path))
    }

    /// Switch the draft to another test type, resetting type-specific fields
    pub fn change_type(&mut self, target: TestType) -> Result<(), BuilderError> {
        let current = self.draft_mut()?.clone();
        debug!(from = %current.test_type(), to = %target, "Changing test type");
        self.draft = Some(current.into_type(target));
        self.touch();
        Ok(())
    }

    /// Validate the draft and write it over the test with the same number
    pub fn commit(&mut self) -> Result<(), BuilderError> {
        let draft = self.draft_mut()?.clone();
        if let Err(report) = validate_test(&draft) {
            return self.refuse(BuilderError::InvalidTest(report));
        }

        let setup = self.setup_mut()?;
        let Some(slot) = setup
            .tests
            .iter_mut()
            .find(|t| t.test_number() == draft.test_number())
        else {
            return self.refuse(BuilderError::TestNotFound(draft.test_number()));
        };
        *slot = draft;

        let number = slot.test_number();
        self.touch();
        self.notices.success(format!("Test #{} saved", number));
        Ok(())
    }

    // ========================================
    // Experiment fields
    // ========================================

    pub fn set_description(&mut self, text: &str) -> Result<(), BuilderError> {
        check_length("Description", text, MAX_DESCRIPTION_LENGTH).or_else(|e| self.refuse(e))?;
        self.setup_mut()?.description = text.to_string();
        self.touch();
        Ok(())
    }

    pub fn set_end_text(&mut self, text: &str) -> Result<(), BuilderError> {
        check_length("End text", text, MAX_END_TEXT_LENGTH).or_else(|e| self.refuse(e))?;
        self.setup_mut()?.end_text = text.to_string();
        self.touch();
        Ok(())
    }

    /// Replace the setup with an uploaded `setup.json`
    ///
    /// Every test must pass validation; any failure rejects the whole file
    /// and leaves the builder unchanged. The file's own `name` is ignored:
    /// the current experiment name replaces it before validation.
    pub fn upload_setup(&mut self, bytes: &[u8]) -> Result<(), BuilderError> {
        let name = self.setup_mut()?.name.clone();

        let parsed = parse_value(bytes).and_then(|mut value| {
            if let Some(obj) = value.as_object_mut() {
                obj.insert("name".to_string(), Value::String(name));
            }
            validate::<ExperimentSetup>(&value)
        });
        let mut uploaded = match parsed {
            Ok(setup) => setup,
            Err(report) => {
                self.notices.error("Invalid setup file structure");
                return self.refuse(BuilderError::InvalidSetup(report));
            }
        };

        if uploaded.tests.len() > MAX_TESTS {
            self.notices.warning(format!(
                "Experiment contains too many tests (max {} allowed)",
                MAX_TESTS
            ));
            uploaded.tests.truncate(MAX_TESTS);
        }
        uploaded.normalize_numbering();

        for test in &uploaded.tests {
            if let Err(report) = validate_test(test) {
                self.notices.error("Invalid test configuration in setup file");
                return self.refuse(BuilderError::InvalidTest(report));
            }
        }

        info!(tests = uploaded.tests.len(), "Setup file accepted");
        self.setup = Some(uploaded);
        self.draft = None;
        self.touch();
        self.notices.success("Experiment setup uploaded successfully");
        Ok(())
    }

    // ========================================
    // Saving
    // ========================================

    /// Persist the committed setup wholesale
    ///
    /// On a store failure the phase becomes `SaveFailed` and the raw error is
    /// kept in [`last_error`](Self::last_error).
    pub async fn save<S: SetupStore + ?Sized>(&mut self, store: &S) -> Result<(), BuilderError> {
        let setup = self.setup_mut()?.clone();
        check_length("Description", &setup.description, MAX_DESCRIPTION_LENGTH)
            .and_then(|_| check_length("End text", &setup.end_text, MAX_END_TEXT_LENGTH))
            .or_else(|e| self.refuse(e))?;

        self.phase = BuilderPhase::Saving;
        debug!(experiment = %setup.name, "Saving setup");

        match store.save_setup(&setup.name, &setup).await {
            Ok(()) => {
                self.phase = BuilderPhase::Saved;
                self.last_error = None;
                self.notices.success("Experiment saved successfully");
                Ok(())
            }
            Err(e) => {
                self.phase = BuilderPhase::SaveFailed;
                self.last_error = Some(e.to_string());
                self.notices.error(format!("Failed to save experiment: {}", e));
                Err(BuilderError::SaveFailed(e))
            }
        }
    }

    // ========================================
    // Sample availability
    // ========================================

    /// Asset paths a test plays that are missing from `pool`
    pub fn missing_samples(&self, test_number: u32, pool: &[String]) -> Vec<String> {
        self.setup
            .as_ref()
            .and_then(|s| s.find_test(test_number))
            .map(|test| missing_from_pool(test, pool))
            .unwrap_or_default()
    }

    /// Fetch the experiment's sample pool and warn about every test that
    /// plays a file missing from it; returns the pool
    pub async fn check_samples<S: SetupStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<Vec<String>, BuilderError> {
        let Some(setup) = self.setup.as_ref() else {
            return self.refuse(BuilderError::NotLoaded);
        };
        let pool = store.list_samples(&setup.name).await?;
        for number in self.tests_with_missing_samples(&pool) {
            self.notices.warning(format!(
                "Test #{}: some sample files are missing ({})",
                number,
                self.missing_samples(number, &pool).join(", ")
            ));
        }
        Ok(pool)
    }

    /// Numbers of tests that reference files missing from `pool`
    pub fn tests_with_missing_samples(&self, pool: &[String]) -> Vec<u32> {
        self.setup
            .iter()
            .flat_map(|s| s.tests.iter())
            .filter(|t| !missing_from_pool(t, pool).is_empty())
            .map(|t| t.test_number())
            .collect()
    }
}

fn check_length(field: &'static str, text: &str, max: usize) -> Result<(), BuilderError> {
    let found = text.chars().count();
    if found > max {
        return Err(BuilderError::TooLong { field, max, found });
    }
    Ok(())
}

fn missing_from_pool(test: &Test, pool: &[String]) -> Vec<String> {
    test.referenced_asset_paths()
        .into_iter()
        .filter(|path| !pool.iter().any(|p| p == path))
        .map(str::to_string)
        .collect()
}
