use std::{
    collections::VecDeque,
    fmt::{Debug, Display, Formatter},
    sync::{Condvar, Mutex},
};

/// Returned when a task is offered to a queue that has been closed. The task is
/// handed back so that the caller can release whatever it owns.
pub struct QueueClosed<T>(pub T);

impl<T> QueueClosed<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Debug for QueueClosed<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("QueueClosed(..)")
    }
}

impl<T> Display for QueueClosed<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("the task queue is closed")
    }
}

/// Result of a blocking dequeue
pub enum Dequeued<T> {
    Task(T),
    /// The queue is closed and empty, the caller should stop asking for work
    Shutdown,
}

struct QueueState<T> {
    tasks: VecDeque<T>,
    closed: bool,
}

/// Unbounded FIFO shared between one or more producers and a set of consumers
/// that park on a condition variable until there is something to do. Each task
/// is handed to exactly one consumer.
///
/// There is no capacity limit, so producers never block. Closing the queue
/// stops it handing out tasks: consumers receive `Dequeued::Shutdown` from then
/// on and tasks still queued stay there until the owner drains them.
pub struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Appends a task to the tail of the queue and wakes at most one parked consumer
    pub fn enqueue(self: &Self, task: T) -> Result<(), QueueClosed<T>> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(QueueClosed(task));
        }
        state.tasks.push_back(task);
        self.available.notify_one();
        Ok(())
    }

    /// Blocks until there is a task to return or the queue is closed. Once closed
    /// nothing more is handed out, whatever is still queued is left for `drain`.
    pub fn dequeue_blocking(self: &Self) -> Dequeued<T> {
        let state = self.state.lock().unwrap();
        let mut state = self
            .available
            .wait_while(state, |state| state.tasks.is_empty() && !state.closed)
            .unwrap();

        if state.closed {
            return Dequeued::Shutdown;
        }
        match state.tasks.pop_front() {
            Some(task) => Dequeued::Task(task),
            None => Dequeued::Shutdown,
        }
    }

    /// Refuses any further tasks and wakes every parked consumer. Returns false
    /// if the queue was already closed.
    pub fn close(self: &Self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return false;
        }
        state.closed = true;
        self.available.notify_all();
        true
    }

    pub fn is_closed(self: &Self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub fn len(self: &Self) -> usize {
        self.state.lock().unwrap().tasks.len()
    }

    pub fn is_empty(self: &Self) -> bool {
        self.len() == 0
    }

    /// Removes and returns every task that is still waiting, in queue order
    pub fn drain(self: &Self) -> Vec<T> {
        self.state.lock().unwrap().tasks.drain(..).collect()
    }
}
