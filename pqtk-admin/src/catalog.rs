//! Experiment catalog: list, create, delete
//!
//! Names are checked locally before any request is sent.

use crate::client::ApiClient;
use crate::error::CatalogError;
use pqtk_common::events::NoticeBus;
use pqtk_common::models::MAX_NAME_LENGTH;

/// Maximum number of experiments
pub const MAX_EXPERIMENTS: usize = 15;

/// Check a new experiment name against the current catalog
pub fn check_new_name(name: &str, existing: &[String]) -> Result<String, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::EmptyName);
    }
    let found = name.chars().count();
    if found > MAX_NAME_LENGTH {
        return Err(CatalogError::NameTooLong {
            max: MAX_NAME_LENGTH,
            found,
        });
    }
    if existing.iter().any(|e| e == name) {
        return Err(CatalogError::Duplicate(name.to_string()));
    }
    if existing.len() >= MAX_EXPERIMENTS {
        return Err(CatalogError::LimitReached(MAX_EXPERIMENTS));
    }
    Ok(name.to_string())
}

pub struct Catalog<'a> {
    client: &'a ApiClient,
    notices: NoticeBus,
    experiments: Vec<String>,
}

impl<'a> Catalog<'a> {
    /// Fetch the current experiment list
    pub async fn fetch(client: &'a ApiClient, notices: NoticeBus) -> Result<Catalog<'a>, CatalogError> {
        let experiments = client.list_experiments().await?;
        Ok(Self {
            client,
            notices,
            experiments,
        })
    }

    pub fn experiments(&self) -> &[String] {
        &self.experiments
    }

    fn refuse<T>(&self, err: CatalogError) -> Result<T, CatalogError> {
        self.notices.warning(err.to_string());
        Err(err)
    }

    pub async fn create(&mut self, name: &str) -> Result<String, CatalogError> {
        let name = match check_new_name(name, &self.experiments) {
            Ok(name) => name,
            Err(e) => return self.refuse(e),
        };
        if let Err(e) = self.client.create_experiment(&name).await {
            self.notices.error(format!("Failed to create experiment: {}", e));
            return Err(e.into());
        }
        self.experiments.push(name.clone());
        self.notices.success(format!("Experiment {} created", name));
        Ok(name)
    }

    pub async fn delete(&mut self, name: &str) -> Result<(), CatalogError> {
        if !self.experiments.iter().any(|e| e == name) {
            return self.refuse(CatalogError::Unknown(name.to_string()));
        }
        if let Err(e) = self.client.delete_experiment(name).await {
            self.notices.error(format!("Failed to delete experiment: {}", e));
            return Err(e.into());
        }
        self.experiments.retain(|e| e != name);
        self.notices.success(format!("Experiment {} deleted", name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("exp-{}", i)).collect()
    }

    #[test]
    fn test_name_rules() {
        assert_eq!(check_new_name("  Codec test ", &[]).unwrap(), "Codec test");
        assert!(matches!(check_new_name("   ", &[]), Err(CatalogError::EmptyName)));
        assert!(check_new_name(&"x".repeat(50), &[]).is_ok());
        assert!(matches!(
            check_new_name(&"x".repeat(51), &[]),
            Err(CatalogError::NameTooLong { found: 51, .. })
        ));
        assert!(matches!(
            check_new_name("exp-3", &names(5)),
            Err(CatalogError::Duplicate(_))
        ));
    }

    #[test]
    fn test_experiment_limit() {
        assert!(check_new_name("new", &names(14)).is_ok());
        assert!(matches!(
            check_new_name("new", &names(15)),
            Err(CatalogError::LimitReached(15))
        ));
    }
}
