// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared record of when each Docker image was last built or pulled

use crate::access::DistributedDataAccess;
use bq_core::{Clock, DataResult, DistributedDataProvider, DockerImageBuild, SystemClock};
use std::sync::Arc;
use std::time::Duration;

pub struct DockerImageCache<P, C: Clock = SystemClock> {
    access: Arc<DistributedDataAccess<P>>,
    clock: C,
}

impl<P: DistributedDataProvider> DockerImageCache<P> {
    pub fn new(access: Arc<DistributedDataAccess<P>>) -> Self {
        Self::with_clock(access, SystemClock)
    }
}

impl<P: DistributedDataProvider, C: Clock> DockerImageCache<P, C> {
    pub fn with_clock(access: Arc<DistributedDataAccess<P>>, clock: C) -> Self {
        Self { access, clock }
    }

    /// Note that `image` was just built or pulled successfully
    pub fn record_build(&self, image: &str) -> DataResult<()> {
        let build = DockerImageBuild::new(image, self.clock.utc());
        self.access.images()?.put(image.to_string(), build)?;
        tracing::debug!(image, "recorded image build");
        Ok(())
    }

    /// True if the image was built within `max_age`; unknown images are stale
    pub fn is_fresh(&self, image: &str, max_age: Duration) -> DataResult<bool> {
        let now = self.clock.utc();
        Ok(self
            .access
            .images()?
            .get(&image.to_string())?
            .map(|build| build.is_fresh(max_age, now))
            .unwrap_or(false))
    }

    /// Images not built within `max_age`, oldest first
    pub fn stale_images(&self, max_age: Duration) -> DataResult<Vec<DockerImageBuild>> {
        let now = self.clock.utc();
        let mut stale: Vec<_> = self
            .access
            .images()?
            .values()?
            .into_iter()
            .filter(|build| !build.is_fresh(max_age, now))
            .collect();
        stale.sort_by(|a, b| a.last_build_completion_date.cmp(&b.last_build_completion_date));
        Ok(stale)
    }

    /// Drop an image after it was removed from the hosts
    pub fn forget(&self, image: &str) -> DataResult<bool> {
        Ok(self.access.images()?.remove(&image.to_string())?.is_some())
    }
}

#[cfg(test)]
#[path = "images_tests.rs"]
mod tests;
