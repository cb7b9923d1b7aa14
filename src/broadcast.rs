//! Topic-indexed, best-effort broadcast fabric.
//!
//! Each topic fans a single published value out to any number of
//! subscribers over bounded `mpsc` channels. A full subscriber channel
//! means that subscriber is too slow; its message is dropped and a
//! per-topic drop counter is incremented rather than blocking the
//! publisher or the other subscribers. Dead subscribers (channel
//! closed) are pruned the next time their topic is published to.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::frame::Frame;

#[derive(Debug, Default)]
struct Topic {
    subscribers: Vec<mpsc::Sender<Frame>>,
    dropped: AtomicU64,
}

/// The fabric's only published payload type is a decoded [`Frame`];
/// vitals and other derived values are published by callers through
/// their own channels, since the fabric only needs to fan out the one
/// thing multiple independent consumers (recording, display, vitals)
/// all want a copy of.
#[derive(Default)]
pub struct Fabric {
    topics: Mutex<HashMap<String, Topic>>,
}

#[derive(Debug)]
pub struct PublishError {
    pub dropped: u64,
}

impl Fabric {
    #[must_use]
    pub fn new() -> Self {
        Self { topics: Mutex::new(HashMap::new()) }
    }

    /// Registers a new subscriber on `topic`, with a channel of
    /// `capacity` bounded slots.
    pub fn subscribe(&self, topic: &str, capacity: usize) -> mpsc::Receiver<Frame> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let mut topics = self.topics.lock().unwrap();
        topics.entry(topic.to_string()).or_default().subscribers.push(tx);
        rx
    }

    /// Publishes `value` to every live subscriber on `topic`. Dead
    /// subscribers are pruned as part of this call. Returns an error
    /// (carrying the topic's total drop count so far) if at least one
    /// live subscriber's channel was full, while still delivering to
    /// every subscriber that had room.
    pub fn publish(&self, topic: &str, value: Frame) -> Result<(), PublishError> {
        let mut topics = self.topics.lock().unwrap();
        let Some(entry) = topics.get_mut(topic) else {
            return Ok(());
        };

        let mut any_dropped = false;
        entry.subscribers.retain_mut(|tx| {
            if tx.is_closed() {
                return false;
            }
            match tx.try_send(value.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    any_dropped = true;
                    entry.dropped.fetch_add(1, Ordering::Relaxed);
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });

        if any_dropped {
            Err(PublishError { dropped: entry.dropped.load(Ordering::Relaxed) })
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn dropped_count(&self, topic: &str) -> u64 {
        self.topics.lock().unwrap().get(topic).map_or(0, |t| t.dropped.load(Ordering::Relaxed))
    }
}
