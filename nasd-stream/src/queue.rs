//! Bounded per-connection write queue (§4.5 backpressure): on overflow the
//! oldest *data* frame is dropped and a counter incremented; control frames
//! (subscribe acks, pongs) are never evicted and never count against the
//! data capacity.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use axum::extract::ws::Message;
use tokio::sync::Notify;

struct QueuedFrame {
    message: Message,
    is_control: bool,
}

struct QueueState {
    items: VecDeque<QueuedFrame>,
    data_count: usize,
}

pub struct ConnectionQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
}

impl ConnectionQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                data_count: 0,
            }),
            notify: Notify::new(),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
        }
    }

    /// Returns `true` if pushing this frame evicted an older one to stay
    /// within capacity — the caller can use this to report the drop to an
    /// external metrics sink, since this crate has no metrics dependency
    /// of its own.
    pub fn push_data(&self, message: Message) -> bool {
        let mut state = self.state.lock().unwrap();
        let mut dropped = false;
        if state.data_count >= self.capacity {
            if let Some(pos) = state.items.iter().position(|f| !f.is_control) {
                state.items.remove(pos);
                state.data_count -= 1;
                self.dropped.fetch_add(1, Ordering::Relaxed);
                dropped = true;
            }
        }
        state.items.push_back(QueuedFrame {
            message,
            is_control: false,
        });
        state.data_count += 1;
        drop(state);
        self.notify.notify_one();
        dropped
    }

    /// Control frames bypass the data capacity entirely — the hub never
    /// drops a pong or a subscribe acknowledgement to make room.
    pub fn push_control(&self, message: Message) {
        let mut state = self.state.lock().unwrap();
        state.items.push_back(QueuedFrame {
            message,
            is_control: true,
        });
        drop(state);
        self.notify.notify_one();
    }

    pub async fn pop(&self) -> Message {
        loop {
            {
                let mut state = self.state.lock().unwrap();
                if let Some(front) = state.items.pop_front() {
                    if !front.is_control {
                        state.data_count -= 1;
                    }
                    return front.message;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Message {
        Message::Text(s.to_string().into())
    }

    #[tokio::test]
    async fn overflow_drops_oldest_data_frame() {
        let queue = ConnectionQueue::new(2);
        queue.push_data(text("a"));
        queue.push_data(text("b"));
        queue.push_data(text("c"));

        assert_eq!(queue.dropped_frames(), 1);
        assert_eq!(queue.pop().await, text("b"));
        assert_eq!(queue.pop().await, text("c"));
    }

    #[tokio::test]
    async fn control_frames_are_never_evicted() {
        let queue = ConnectionQueue::new(1);
        queue.push_control(text("ack"));
        queue.push_data(text("frame-1"));
        queue.push_data(text("frame-2"));

        assert_eq!(queue.dropped_frames(), 1);
        assert_eq!(queue.pop().await, text("ack"));
        assert_eq!(queue.pop().await, text("frame-2"));
    }
}
