// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::DataResult;
use crate::listener::{ChangeListener, ItemListener, ListenerId};
use std::sync::Arc;

/// A cluster-wide FIFO (or priority-ordered) queue
///
/// No operation blocks: `poll` and `peek` return `None` on an empty queue.
pub trait DistributedQueue<T>: Send + Sync {
    fn name(&self) -> &str;

    fn add(&self, item: T) -> DataResult<bool>;

    /// Append every item in order; one added event per item
    fn add_all(&self, items: Vec<T>) -> DataResult<bool>;

    /// Remove and return the head
    fn poll(&self) -> DataResult<Option<T>>;

    fn peek(&self) -> DataResult<Option<T>>;

    /// Remove every element equal to one of `items`; one removed event per element
    fn remove_all(&self, items: &[T]) -> DataResult<bool>;

    /// Ordered snapshot of the queue
    fn get_all(&self) -> DataResult<Vec<T>>;

    /// Remove everything; one removed event per element
    fn clear(&self) -> DataResult<()>;

    fn size(&self) -> DataResult<usize>;

    fn is_empty(&self) -> DataResult<bool> {
        Ok(self.size()? == 0)
    }

    fn add_item_listener(&self, listener: Arc<dyn ItemListener<T>>) -> DataResult<ListenerId>;

    fn add_listener(&self, listener: Arc<dyn ChangeListener>) -> DataResult<ListenerId>;

    /// Unknown or already removed ids are ignored
    fn remove_listener(&self, id: &ListenerId);
}
