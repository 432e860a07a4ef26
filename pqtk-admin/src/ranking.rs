//! Shared sample library and participant ranking

use crate::client::ApiClient;
use crate::error::LibraryError;
use crate::upload::UploadQueue;
use pqtk_common::events::NoticeBus;
use pqtk_common::models::RatedSample;
use std::cmp::Ordering;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            other => Err(format!("unknown sort order {:?} (use asc or desc)", other)),
        }
    }
}

/// Sort by average rating; unrated samples always go last, ties by name
pub fn sort_by_rating(samples: &mut [RatedSample], order: SortOrder) {
    samples.sort_by(|a, b| match (a.is_rated(), b.is_rated()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.name.cmp(&b.name),
        (true, true) => {
            let by_rating = a.rating.total_cmp(&b.rating);
            let by_rating = match order {
                SortOrder::Ascending => by_rating,
                SortOrder::Descending => by_rating.reverse(),
            };
            by_rating.then_with(|| a.name.cmp(&b.name))
        }
    });
}

/// Whole-star rating accepted by the backend
pub fn check_rating(rating: u8) -> Result<f64, LibraryError> {
    if (1..=5).contains(&rating) {
        Ok(f64::from(rating))
    } else {
        Err(LibraryError::RatingOutOfRange(rating))
    }
}

/// The library as fetched, plus the operations on it
pub struct Library<'a> {
    client: &'a ApiClient,
    notices: NoticeBus,
    samples: Vec<RatedSample>,
}

impl<'a> Library<'a> {
    pub async fn fetch(client: &'a ApiClient, notices: NoticeBus) -> Result<Library<'a>, LibraryError> {
        let samples = client.list_library_samples().await?;
        Ok(Self {
            client,
            notices,
            samples,
        })
    }

    pub fn samples(&self) -> &[RatedSample] {
        &self.samples
    }

    pub fn sorted(&self, order: SortOrder) -> Vec<RatedSample> {
        let mut samples = self.samples.clone();
        sort_by_rating(&mut samples, order);
        samples
    }

    /// Empty upload queue seeded with the current library names
    pub fn upload_queue(&self) -> UploadQueue {
        UploadQueue::for_library(&self.samples, self.notices.clone())
    }

    pub async fn rate(&mut self, sample_id: &str, rating: u8) -> Result<(), LibraryError> {
        let value = match check_rating(rating) {
            Ok(value) => value,
            Err(e) => {
                self.notices.warning(e.to_string());
                return Err(e);
            }
        };
        let Some(sample) = self.samples.iter().find(|s| s.sample_id == sample_id) else {
            let e = LibraryError::UnknownSample(sample_id.to_string());
            self.notices.warning(e.to_string());
            return Err(e);
        };

        let mut rated = sample.clone();
        rated.rating = value;
        if let Err(e) = self.client.rate_sample(&rated).await {
            self.notices.error(format!("Failed to submit rating: {}", e));
            return Err(e.into());
        }
        info!(sample_id = %sample_id, rating, "Rated sample");
        self.notices.success("Rating submitted successfully!");
        Ok(())
    }

    /// Upload everything admitted to `queue`, then refresh the list
    pub async fn upload(&mut self, queue: UploadQueue) -> Result<usize, LibraryError> {
        let batch = queue.into_batch();
        if batch.files.is_empty() {
            self.notices.warning(LibraryError::NothingToUpload.to_string());
            return Err(LibraryError::NothingToUpload);
        }
        if let Err(e) = self.client.upload_library_samples(&batch.files).await {
            self.notices.error(format!("Failed to upload files: {}", e));
            return Err(e.into());
        }
        self.samples = self.client.list_library_samples().await?;
        self.notices.success("Samples uploaded successfully!");
        Ok(batch.files.len())
    }

    pub async fn delete(&mut self, sample_id: &str) -> Result<(), LibraryError> {
        if !self.samples.iter().any(|s| s.sample_id == sample_id) {
            let e = LibraryError::UnknownSample(sample_id.to_string());
            self.notices.warning(e.to_string());
            return Err(e);
        }
        if let Err(e) = self.client.delete_library_sample(sample_id).await {
            self.notices.error(format!("Failed to delete sample: {}", e));
            return Err(e.into());
        }
        self.samples.retain(|s| s.sample_id != sample_id);
        self.notices.success("Sample deleted successfully!");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, rating: f64) -> RatedSample {
        RatedSample {
            sample_id: name.to_string(),
            name: name.to_string(),
            asset_path: name.to_string(),
            rating,
        }
    }

    fn names(samples: &[RatedSample]) -> Vec<&str> {
        samples.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_sort_unrated_last_both_ways() {
        let mut samples = vec![
            sample("u", 0.0),
            sample("b", 4.5),
            sample("a", 2.0),
            sample("c", 4.5),
        ];
        sort_by_rating(&mut samples, SortOrder::Descending);
        assert_eq!(names(&samples), vec!["b", "c", "a", "u"]);

        sort_by_rating(&mut samples, SortOrder::Ascending);
        assert_eq!(names(&samples), vec!["a", "b", "c", "u"]);
    }

    #[test]
    fn test_check_rating() {
        assert_eq!(check_rating(1).unwrap(), 1.0);
        assert_eq!(check_rating(5).unwrap(), 5.0);
        assert!(check_rating(0).is_err());
        assert!(check_rating(6).is_err());
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Ascending);
        assert_eq!("descending".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert!("up".parse::<SortOrder>().is_err());
    }
}
