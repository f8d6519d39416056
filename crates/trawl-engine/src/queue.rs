use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use trawl_common::model::Batch;

/// Unbounded FIFO of completed batches, shared between the scrape worker and pollers.
#[derive(Clone, Default)]
pub struct DeliveryQueue {
    batches: Arc<Mutex<VecDeque<Batch>>>,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, batch: Batch) {
        self.lock().push_back(batch);
    }

    /// Remove and return everything queued, oldest first.
    pub fn drain_all(&self) -> Vec<Batch> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Batch>> {
        // Nothing here can leave the deque half-updated, so a poisoned lock is still usable.
        self.batches.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_returns_fifo_and_empties() {
        let queue = DeliveryQueue::new();
        assert!(queue.drain_all().is_empty());

        queue.push(Batch::new("https://a.test/", vec![]));
        queue.push(Batch::new("https://b.test/", vec![]));
        assert_eq!(queue.len(), 2);

        let drained = queue.drain_all();
        let urls: Vec<_> = drained.iter().map(|b| b.page_url.as_str()).collect();
        assert_eq!(urls, ["https://a.test/", "https://b.test/"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clones_share_state_across_threads() {
        let queue = DeliveryQueue::new();
        let producer = queue.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..50 {
                producer.push(Batch::new(format!("https://a.test/{i}"), vec![]));
            }
        });
        handle.join().unwrap();
        let drained = queue.drain_all();
        assert_eq!(drained.len(), 50);
        assert_eq!(drained[49].page_url, "https://a.test/49");
    }
}
