//! Single-flight FIFO work queue
//!
//! At most one item is in flight at a time. Items submitted while another is
//! in flight wait in submission order. The worker receives a [`Completion`]
//! with each item; dropping it (normally from the item's completion callback)
//! starts the next pending item.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

type Worker<T> = Box<dyn Fn(T, Completion<T>) + Send + Sync>;

struct QueueState<T> {
    busy: bool,
    pending: VecDeque<T>,
}

/// Queue guaranteeing that the worker never runs two items concurrently
pub struct SingleFlightQueue<T: Send + 'static> {
    state: Mutex<QueueState<T>>,
    worker: Worker<T>,
}

impl<T: Send + 'static> SingleFlightQueue<T> {
    pub fn new(worker: impl Fn(T, Completion<T>) + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState {
                busy: false,
                pending: VecDeque::new(),
            }),
            worker: Box::new(worker),
        })
    }

    /// Run `item` now if idle, otherwise queue it behind the in-flight item
    pub fn submit(self: &Arc<Self>, item: T) {
        {
            let mut state = self.lock();
            if state.busy {
                state.pending.push_back(item);
                trace!(pending = state.pending.len(), "Queued behind in-flight item");
                return;
            }
            state.busy = true;
        }
        self.dispatch(item);
    }

    /// Whether an item is in flight
    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    /// Number of items waiting behind the in-flight one
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    fn dispatch(self: &Arc<Self>, item: T) {
        let completion = Completion {
            queue: Some(self.clone()),
        };
        (self.worker)(item, completion);
    }

    fn advance(self: &Arc<Self>) {
        let next = {
            let mut state = self.lock();
            let next = state.pending.pop_front();
            state.busy = next.is_some();
            next
        };
        if let Some(item) = next {
            self.dispatch(item);
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        // A panicking worker cannot leave the state half-updated
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Marks the in-flight item as finished when dropped
#[must_use = "dropping the completion immediately starts the next queued item"]
pub struct Completion<T: Send + 'static> {
    queue: Option<Arc<SingleFlightQueue<T>>>,
}

impl<T: Send + 'static> Completion<T> {
    /// Finish the in-flight item
    pub fn finish(self) {}
}

impl<T: Send + 'static> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.take() {
            queue.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Held = Arc<Mutex<Vec<Completion<u32>>>>;

    fn recording_queue() -> (Arc<Mutex<Vec<u32>>>, Held, Arc<SingleFlightQueue<u32>>) {
        let started = Arc::new(Mutex::new(Vec::new()));
        let held: Held = Arc::new(Mutex::new(Vec::new()));
        let (s, h) = (started.clone(), held.clone());
        let queue = SingleFlightQueue::new(move |item, completion| {
            s.lock().unwrap().push(item);
            h.lock().unwrap().push(completion);
        });
        (started, held, queue)
    }

    fn finish_oldest(held: &Held) {
        let completion = held.lock().unwrap().remove(0);
        completion.finish();
    }

    #[test]
    fn test_runs_immediately_when_idle() {
        let (started, _held, queue) = recording_queue();
        queue.submit(1);

        assert_eq!(*started.lock().unwrap(), vec![1]);
        assert!(queue.is_busy());
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_serializes_in_submission_order() {
        let (started, held, queue) = recording_queue();
        queue.submit(1);
        queue.submit(2);
        queue.submit(3);

        assert_eq!(*started.lock().unwrap(), vec![1]);
        assert_eq!(queue.pending(), 2);

        finish_oldest(&held);
        assert_eq!(*started.lock().unwrap(), vec![1, 2]);

        finish_oldest(&held);
        assert_eq!(*started.lock().unwrap(), vec![1, 2, 3]);

        finish_oldest(&held);
        assert!(!queue.is_busy());
    }

    #[test]
    fn test_synchronous_completion_drains() {
        let started = Arc::new(Mutex::new(Vec::new()));
        let s = started.clone();
        let queue = SingleFlightQueue::new(move |item: u32, completion| {
            s.lock().unwrap().push(item);
            drop(completion);
        });

        queue.submit(1);
        queue.submit(2);

        assert_eq!(*started.lock().unwrap(), vec![1, 2]);
        assert!(!queue.is_busy());
    }

    #[test]
    fn test_completion_on_another_thread_advances() {
        let (started, held, queue) = recording_queue();
        queue.submit(1);
        queue.submit(2);

        let completion = held.lock().unwrap().remove(0);
        std::thread::spawn(move || completion.finish()).join().unwrap();

        assert_eq!(*started.lock().unwrap(), vec![1, 2]);
        assert!(queue.is_busy());
        assert_eq!(queue.pending(), 0);
    }
}
