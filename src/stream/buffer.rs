//! Inbound message buffer
//!
//! An unbounded FIFO of raw payloads. The connection manager pushes on
//! message arrival, the pull path pops oldest-first. The buffer is
//! deliberately unbounded: a slow consumer grows it without limit rather
//! than dropping messages or blocking the broker event loop. Bounding it
//! would change delivery semantics, so the risk stays documented instead.

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

/// FIFO queue of inbound payloads with arrival notification.
#[derive(Debug, Default)]
pub struct InboundBuffer {
    queue: Mutex<VecDeque<Bytes>>,
    arrival: Notify,
}

impl InboundBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload and wake one waiting consumer. O(1), never fails,
    /// never blocks the caller.
    pub fn push(&self, payload: Bytes) {
        self.queue
            .lock()
            .expect("inbound buffer lock poisoned")
            .push_back(payload);
        self.arrival.notify_one();
    }

    /// Remove and return the oldest payload, or `None` when empty. O(1).
    pub fn pop_or_null(&self) -> Option<Bytes> {
        self.queue
            .lock()
            .expect("inbound buffer lock poisoned")
            .pop_front()
    }

    /// Wait until a payload arrives. The caller must re-check the buffer
    /// after waking: the permit may be stale or the payload already taken.
    pub async fn wait_for_arrival(&self) {
        self.arrival.notified().await;
    }

    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .expect("inbound buffer lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let buffer = InboundBuffer::new();
        buffer.push(Bytes::from_static(b"one"));
        buffer.push(Bytes::from_static(b"two"));
        buffer.push(Bytes::from_static(b"three"));

        assert_eq!(buffer.pop_or_null(), Some(Bytes::from_static(b"one")));
        assert_eq!(buffer.pop_or_null(), Some(Bytes::from_static(b"two")));
        assert_eq!(buffer.pop_or_null(), Some(Bytes::from_static(b"three")));
        assert_eq!(buffer.pop_or_null(), None);
    }

    #[test]
    fn test_pop_empty_returns_none() {
        let buffer = InboundBuffer::new();
        assert!(buffer.pop_or_null().is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_unbounded_growth_no_drop() {
        let buffer = InboundBuffer::new();
        for i in 0..10_000u32 {
            buffer.push(Bytes::from(i.to_be_bytes().to_vec()));
        }
        assert_eq!(buffer.len(), 10_000);

        for i in 0..10_000u32 {
            let payload = buffer.pop_or_null().expect("payload missing");
            assert_eq!(payload.as_ref(), i.to_be_bytes());
        }
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_arrival_wakes_waiter() {
        let buffer = Arc::new(InboundBuffer::new());

        let waiter = {
            let buffer = buffer.clone();
            tokio::spawn(async move {
                loop {
                    if let Some(payload) = buffer.pop_or_null() {
                        return payload;
                    }
                    buffer.wait_for_arrival().await;
                }
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        buffer.push(Bytes::from_static(b"late"));

        let payload = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter timed out")
            .expect("waiter panicked");
        assert_eq!(payload, Bytes::from_static(b"late"));
    }
}
