// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::DataResult;
use crate::listener::{ListenerId, MessageListener};
use std::sync::Arc;

/// A cluster-wide publish/subscribe topic
///
/// Messages from one publisher reach each listener in publish order.
pub trait DistributedTopic<T>: Send + Sync {
    fn name(&self) -> &str;

    fn publish(&self, message: T) -> DataResult<()>;

    fn add_message_listener(
        &self,
        listener: Arc<dyn MessageListener<T>>,
    ) -> DataResult<ListenerId>;

    fn remove_message_listener(&self, id: &ListenerId);
}
