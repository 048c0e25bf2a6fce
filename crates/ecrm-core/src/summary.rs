//! Per-repository report data.

use serde::{Deserialize, Serialize};

use crate::image::ImageRecord;

/// Image counts and sizes for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    /// Repository name.
    pub repository: String,

    /// Number of expired records.
    pub expired_images: u64,

    /// Number of classified records.
    pub total_images: u64,

    /// Total size of expired records in bytes.
    pub expired_image_size: u64,

    /// Total size of classified records in bytes.
    pub total_image_size: u64,
}

impl RepositorySummary {
    /// Creates an empty summary.
    #[must_use]
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Self::default()
        }
    }

    /// Counts a record toward the totals.
    pub fn add(&mut self, record: &ImageRecord) {
        self.total_images += 1;
        self.total_image_size += record.size_bytes;
    }

    /// Counts a record as expired.
    pub fn expire(&mut self, record: &ImageRecord) {
        self.expired_images += 1;
        self.expired_image_size += record.size_bytes;
    }

    /// Number of records retained.
    #[must_use]
    pub const fn kept_images(&self) -> u64 {
        self.total_images.saturating_sub(self.expired_images)
    }

    /// Size of records retained, in bytes.
    #[must_use]
    pub const fn kept_image_size(&self) -> u64 {
        self.total_image_size.saturating_sub(self.expired_image_size)
    }
}
