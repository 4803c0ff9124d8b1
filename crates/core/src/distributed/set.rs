// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::DataResult;
use crate::listener::{ItemListener, ListenerId};
use std::collections::HashSet;
use std::sync::Arc;

/// A cluster-wide set
pub trait DistributedSet<E>: Send + Sync {
    fn name(&self) -> &str;

    /// Returns false if the element was already present
    fn add(&self, element: E) -> DataResult<bool>;

    fn add_all(&self, elements: Vec<E>) -> DataResult<bool>;

    fn remove(&self, element: &E) -> DataResult<bool>;

    fn remove_all(&self, elements: &[E]) -> DataResult<bool>;

    fn contains(&self, element: &E) -> DataResult<bool>;

    fn contains_all(&self, elements: &[E]) -> DataResult<bool>;

    fn size(&self) -> DataResult<usize>;

    fn is_empty(&self) -> DataResult<bool> {
        Ok(self.size()? == 0)
    }

    fn clear(&self) -> DataResult<()>;

    fn set_copy(&self) -> DataResult<HashSet<E>>;

    fn add_item_listener(&self, listener: Arc<dyn ItemListener<E>>) -> DataResult<ListenerId>;

    fn remove_listener(&self, id: &ListenerId);
}
