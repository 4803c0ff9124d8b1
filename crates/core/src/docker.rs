// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cached container image bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Last time an image was successfully built or pulled
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DockerImageBuild {
    pub image: String,
    pub last_build_completion_date: DateTime<Utc>,
}

impl DockerImageBuild {
    pub fn new(image: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            image: image.into(),
            last_build_completion_date: at,
        }
    }

    /// Whether the image was used recently enough to reuse
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return true;
        };
        now.signed_duration_since(self.last_build_completion_date) <= max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn image_is_fresh_within_max_age() {
        let built = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let image = DockerImageBuild::new("ls1tum/java:17", built);
        let day = Duration::from_secs(24 * 3600);

        assert!(image.is_fresh(day, built + chrono::Duration::hours(23)));
        assert!(!image.is_fresh(day, built + chrono::Duration::hours(25)));
    }
}
