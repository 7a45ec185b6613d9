// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-subscriber event fan-out.
//!
//! Every subscriber gets its own bounded channel. Broadcasting never
//! blocks: a full channel drops the event for that subscriber only,
//! trading delivery guarantees for producer liveness. A subscriber whose
//! channel has been silent past the keepalive window receives a synthetic
//! keepalive instead of an error, so consumers can detect liveness.

use arca_core::{Clock, Event, SubscriberId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

struct Registry {
    subscribers: HashMap<SubscriberId, mpsc::Sender<Event>>,
    history: VecDeque<Event>,
}

/// Fan-out hub for job lifecycle and output events.
pub struct EventBroadcaster<C: Clock> {
    clock: C,
    channel_capacity: usize,
    history_limit: usize,
    keepalive: Duration,
    registry: Mutex<Registry>,
}

impl<C: Clock> EventBroadcaster<C> {
    pub fn new(clock: C, channel_capacity: usize, history_limit: usize, keepalive: Duration) -> Self {
        Self {
            clock,
            channel_capacity: channel_capacity.max(1),
            history_limit,
            keepalive,
            registry: Mutex::new(Registry {
                subscribers: HashMap::new(),
                history: VecDeque::new(),
            }),
        }
    }

    /// Register a new subscriber with its own bounded channel.
    pub fn subscribe(&self) -> Subscription<C> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let id = SubscriberId::new();
        self.registry.lock().subscribers.insert(id.clone(), tx);
        tracing::debug!(subscriber = %id, "event subscriber registered");
        Subscription { id, rx, keepalive: self.keepalive, clock: self.clock.clone() }
    }

    /// Remove a subscriber; its stream ends after draining buffered events.
    pub fn unsubscribe(&self, id: &SubscriberId) -> bool {
        let removed = self.registry.lock().subscribers.remove(id).is_some();
        if removed {
            tracing::debug!(subscriber = %id, "event subscriber removed");
        }
        removed
    }

    /// Deliver an event to every subscriber without blocking. Full
    /// channels drop the event for that subscriber; closed channels are
    /// pruned.
    pub fn broadcast(&self, event: Event) {
        let mut registry = self.registry.lock();

        if self.history_limit > 0 {
            while registry.history.len() >= self.history_limit {
                registry.history.pop_front();
            }
            registry.history.push_back(event.clone());
        }

        registry.subscribers.retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!(subscriber = %id, "subscriber channel full, event dropped");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    /// Most recent events, oldest first, up to `limit`.
    pub fn recent_events(&self, limit: usize) -> Vec<Event> {
        let registry = self.registry.lock();
        let skip = registry.history.len().saturating_sub(limit);
        registry.history.iter().skip(skip).cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().subscribers.len()
    }
}

/// One subscriber's view of the event stream.
///
/// Infinite while subscribed: silence yields keepalives. The stream ends
/// (`None`) only after `unsubscribe` removes the channel and buffered
/// events have drained.
pub struct Subscription<C: Clock> {
    id: SubscriberId,
    rx: mpsc::Receiver<Event>,
    keepalive: Duration,
    clock: C,
}

impl<C: Clock> Subscription<C> {
    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// Wait for the next event, yielding a keepalive after the silence
    /// window instead of failing.
    pub async fn next(&mut self) -> Option<Event> {
        match tokio::time::timeout(self.keepalive, self.rx.recv()).await {
            Ok(Some(event)) => Some(event),
            Ok(None) => None,
            Err(_) => Some(Event::Keepalive { epoch_ms: self.clock.epoch_ms() }),
        }
    }
}

#[cfg(test)]
#[path = "broadcaster_tests.rs"]
mod tests;
