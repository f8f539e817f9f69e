use std::sync::Mutex;

use line_server_net::data_types::ClientCount;

/// Number of clients currently being served. Every operation takes the same
/// mutex, so a reader never observes a half applied update.
///
/// Connection handling code should use `enter()` rather than calling
/// `increment()` and `decrement()` directly: the returned guard decrements when
/// it is dropped, which keeps the two calls paired on every exit path.
pub struct SharedCounter {
    count: Mutex<ClientCount>,
}

impl SharedCounter {
    pub fn new() -> Self {
        Self {
            count: Mutex::new(0),
        }
    }

    pub fn increment(self: &Self) {
        *self.count.lock().unwrap() += 1;
    }

    /// Decrementing a counter that is already zero means a connection left twice,
    /// which is a bug in the caller, so this panics rather than wrapping or clamping.
    pub fn decrement(self: &Self) {
        let mut count = self.count.lock().unwrap();
        assert!(*count > 0, "SharedCounter: decrement below zero");
        *count -= 1;
    }

    pub fn get(self: &Self) -> ClientCount {
        *self.count.lock().unwrap()
    }

    /// Counts the caller as an active client until the guard is dropped
    pub fn enter(self: &Self) -> ActiveClient<'_> {
        self.increment();
        ActiveClient { counter: self }
    }
}

pub struct ActiveClient<'a> {
    counter: &'a SharedCounter,
}

impl<'a> Drop for ActiveClient<'a> {
    fn drop(&mut self) {
        self.counter.decrement();
    }
}
