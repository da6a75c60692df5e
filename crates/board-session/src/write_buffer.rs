use std::collections::VecDeque;

/// Unbounded FIFO of encoded command payloads awaiting a ready device
///
/// Commands issued before the session reaches Ready land here and are
/// drained exactly once, in insertion order, when the first data from
/// the device proves it is listening. A shutdown discards the queue.
#[derive(Debug, Default)]
pub struct WriteBuffer {
    queue: VecDeque<String>,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Append a payload to the tail
    pub fn enqueue(&mut self, payload: String) {
        self.queue.push_back(payload);
    }

    /// Remove and return all payloads in insertion order
    pub fn drain(&mut self) -> Vec<String> {
        self.queue.drain(..).collect()
    }

    /// Discard everything without yielding it
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
