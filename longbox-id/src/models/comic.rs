//! Catalog entry types produced by the engine
//!
//! The engine never persists a [`Comic`]; it assembles one after a successful
//! organize and hands it to the downstream library store.

use chrono::{DateTime, Utc};
use longbox_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Highest allowed user rating
pub const MAX_RATING: u8 = 6;

/// Resolved metadata accumulated by the pipeline for one file
///
/// Comic-shaped but fully nullable: this is what the path formatter and the
/// enrichment merge operate on before anything is final.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComicMetadata {
    pub series: Option<String>,
    pub issue: Option<String>,
    pub year: Option<u16>,
    pub publisher: Option<String>,
    pub volume: Option<u16>,
    pub summary: Option<String>,
}

/// A durable catalog entry, created after successful organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comic {
    pub id: Uuid,
    pub series: String,
    pub issue: Option<String>,
    pub year: Option<u16>,
    pub publisher: Option<String>,
    pub volume: Option<u16>,
    pub summary: Option<String>,
    /// Reference to an extracted cover image, owned by the archive reader
    pub cover_path: Option<PathBuf>,
    pub date_added: DateTime<Utc>,
    /// Where the organized file now lives
    pub file_path: PathBuf,
    /// User rating 0..=6, unset until the user rates it
    rating: Option<u8>,
}

impl Comic {
    /// Build a catalog entry from resolved metadata and the organized path
    ///
    /// Returns `None` when the metadata has no series: an unresolved file
    /// never becomes a catalog entry.
    pub fn from_metadata(metadata: &ComicMetadata, file_path: PathBuf) -> Option<Self> {
        let series = metadata.series.clone()?;
        Some(Self {
            id: Uuid::new_v4(),
            series,
            issue: metadata.issue.clone(),
            year: metadata.year,
            publisher: metadata.publisher.clone(),
            volume: metadata.volume,
            summary: metadata.summary.clone(),
            cover_path: None,
            date_added: Utc::now(),
            file_path,
            rating: None,
        })
    }

    /// Set the user rating
    ///
    /// # Errors
    /// `InvalidInput` when the rating exceeds [`MAX_RATING`].
    pub fn set_rating(&mut self, rating: u8) -> Result<()> {
        if rating > MAX_RATING {
            return Err(Error::InvalidInput(format!(
                "Rating must be 0-{}, got {}",
                MAX_RATING, rating
            )));
        }
        self.rating = Some(rating);
        Ok(())
    }

    pub fn rating(&self) -> Option<u8> {
        self.rating
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saga_metadata() -> ComicMetadata {
        ComicMetadata {
            series: Some("Saga".to_string()),
            issue: Some("1".to_string()),
            year: Some(2012),
            publisher: Some("Image Comics".to_string()),
            volume: None,
            summary: Some("Two soldiers from opposite sides of a war...".to_string()),
        }
    }

    #[test]
    fn test_from_metadata_requires_series() {
        let comic = Comic::from_metadata(&saga_metadata(), PathBuf::from("/lib/saga-1.cbz"));
        assert!(comic.is_some());

        let empty = ComicMetadata::default();
        assert!(Comic::from_metadata(&empty, PathBuf::from("/lib/x.cbz")).is_none());
    }

    #[test]
    fn test_rating_bounds() {
        let mut comic =
            Comic::from_metadata(&saga_metadata(), PathBuf::from("/lib/saga-1.cbz")).unwrap();
        assert_eq!(comic.rating(), None);

        comic.set_rating(0).unwrap();
        assert_eq!(comic.rating(), Some(0));
        comic.set_rating(MAX_RATING).unwrap();
        assert_eq!(comic.rating(), Some(6));

        let err = comic.set_rating(7).unwrap_err();
        assert!(err.to_string().contains("0-6"));
        // A rejected rating leaves the previous value intact
        assert_eq!(comic.rating(), Some(6));
    }
}
