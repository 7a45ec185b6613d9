// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification collaborator interface.
//!
//! The engine evaluates *whether* to notify; the collaborator only delivers.
//! The contract is the provider's HTTP status code: 2xx is success,
//! anything else is a delivery failure. Production implementations live
//! outside this workspace.

use async_trait::async_trait;
use thiserror::Error;

/// Errors reaching the provider at all (network, serialization). A non-2xx
/// response is not an error — it comes back as the status code.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Where a notification goes: provider name plus its opaque routing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyTarget {
    pub provider: String,
    /// Provider-specific routing data (user key, webhook URL, channel).
    pub target: String,
}

/// Adapter for delivering notifications.
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    /// Deliver a notification; returns the provider's HTTP status code.
    async fn send(
        &self,
        target: &NotifyTarget,
        title: &str,
        message: &str,
    ) -> Result<u16, NotifyError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recorded notification
    #[derive(Debug, Clone)]
    pub struct NotifyCall {
        pub target: NotifyTarget,
        pub title: String,
        pub message: String,
    }

    struct FakeNotifyState {
        calls: Vec<NotifyCall>,
        status: u16,
        fail: Option<String>,
    }

    /// Fake notification adapter for testing.
    #[derive(Clone)]
    pub struct FakeNotifyAdapter {
        inner: Arc<Mutex<FakeNotifyState>>,
    }

    impl Default for FakeNotifyAdapter {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeNotifyState {
                    calls: Vec::new(),
                    status: 200,
                    fail: None,
                })),
            }
        }
    }

    impl FakeNotifyAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the HTTP status returned by every send.
        pub fn set_status(&self, status: u16) {
            self.inner.lock().status = status;
        }

        /// Make every send fail before reaching the provider.
        pub fn set_unreachable(&self, reason: impl Into<String>) {
            self.inner.lock().fail = Some(reason.into());
        }

        /// Get all recorded notifications
        pub fn calls(&self) -> Vec<NotifyCall> {
            self.inner.lock().calls.clone()
        }

        pub fn call_count(&self) -> usize {
            self.inner.lock().calls.len()
        }
    }

    #[async_trait]
    impl NotifyAdapter for FakeNotifyAdapter {
        async fn send(
            &self,
            target: &NotifyTarget,
            title: &str,
            message: &str,
        ) -> Result<u16, NotifyError> {
            let mut state = self.inner.lock();
            if let Some(reason) = &state.fail {
                return Err(NotifyError::SendFailed(reason.clone()));
            }
            state.calls.push(NotifyCall {
                target: target.clone(),
                title: title.to_string(),
                message: message.to_string(),
            });
            Ok(state.status)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
