use std::{
    any::Any,
    fmt::{Display, Formatter},
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
};

use log::{debug, error, info, warn};

use crate::{
    shared_counter::SharedCounter,
    task_queue::{Dequeued, QueueClosed, TaskQueue},
};

/// One unit of deferred work. Whatever the closure captures is owned by the
/// queue until a worker takes it, then by that worker until the closure returns.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, PartialEq)]
pub enum PoolErr {
    InvalidConfiguration { worker_count: usize },
    CreationFailed { msg: String },
}

impl Display for PoolErr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolErr::InvalidConfiguration { worker_count } => {
                write!(f, "invalid worker count {worker_count}, at least one worker is required")
            }
            PoolErr::CreationFailed { msg } => write!(f, "failed to create worker pool: {msg}"),
        }
    }
}

pub type PoolResult<T> = Result<T, PoolErr>;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum PoolState {
    Created,
    Running,
    ShuttingDown,
    Terminated,
}

/// A fixed number of long lived worker threads that take tasks from a shared
/// FIFO queue and run them to completion, one at a time each.
///
/// Shutting down closes the queue, so that `submit` fails from then on, lets
/// each worker finish the task it is running, and joins them. Tasks that were
/// still queued are dropped without running. The pool is shut down when it is
/// dropped if that has not already happened.
pub struct WorkerPool {
    worker_count: usize,
    queue: Arc<TaskQueue<Task>>,
    counter: Arc<SharedCounter>,
    state: Mutex<PoolState>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> PoolResult<Self> {
        Self::with_spawner(worker_count, spawn_worker)
    }

    fn with_spawner<S>(worker_count: usize, mut spawn: S) -> PoolResult<Self>
    where
        S: FnMut(usize, Worker) -> std::io::Result<JoinHandle<()>>,
    {
        if worker_count == 0 {
            return Err(PoolErr::InvalidConfiguration { worker_count });
        }

        let pool = Self {
            worker_count,
            queue: Arc::new(TaskQueue::new()),
            counter: Arc::new(SharedCounter::new()),
            state: Mutex::new(PoolState::Created),
            workers: Mutex::new(Vec::new()),
        };

        for index in 0..worker_count {
            let worker = Worker {
                index,
                queue: pool.queue.clone(),
            };
            match spawn(index, worker) {
                Ok(handle) => {
                    debug!("WorkerPool: Created worker thread {index}");
                    pool.workers.lock().unwrap().push(handle);
                }
                Err(e) => {
                    error!("WorkerPool: Failed to create worker thread {index}: {e}");
                    pool.shutdown();
                    return Err(PoolErr::CreationFailed {
                        msg: format!("worker thread {index}: {e}"),
                    });
                }
            }
        }

        *pool.state.lock().unwrap() = PoolState::Running;
        info!("WorkerPool: Created with {worker_count} threads");
        Ok(pool)
    }

    /// Queues a task for the next free worker. After shutdown has started the
    /// task is handed back inside the error and the caller must dispose of it.
    pub fn submit<F>(self: &Self, task: F) -> Result<(), QueueClosed<Task>>
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.enqueue(Box::new(task))
    }

    /// Stops accepting tasks, waits for every worker thread to finish its current
    /// task and exit, then releases anything still queued without running it. Calling this again, or while another thread is
    /// shutting the pool down, returns immediately.
    pub fn shutdown(self: &Self) {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                PoolState::ShuttingDown | PoolState::Terminated => return,
                PoolState::Created | PoolState::Running => *state = PoolState::ShuttingDown,
            }
        }

        info!("WorkerPool: Signalling worker threads to stop");
        self.queue.close();

        let workers: Vec<JoinHandle<()>> = self.workers.lock().unwrap().drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                error!("WorkerPool: A worker thread terminated abnormally");
            }
        }

        let released = self.queue.drain();
        if !released.is_empty() {
            warn!("WorkerPool: Released {} queued tasks that were never run", released.len());
        }
        drop(released);

        *self.state.lock().unwrap() = PoolState::Terminated;
        info!("WorkerPool: Stopped");
    }

    pub fn state(self: &Self) -> PoolState {
        *self.state.lock().unwrap()
    }

    pub fn worker_count(self: &Self) -> usize {
        self.worker_count
    }

    pub fn queued_task_count(self: &Self) -> usize {
        self.queue.len()
    }

    /// The active client counter that tasks running on this pool share
    pub fn counter(self: &Self) -> &Arc<SharedCounter> {
        &self.counter
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    index: usize,
    queue: Arc<TaskQueue<Task>>,
}

impl Worker {
    fn run(self: Self) {
        debug!("Worker {}: Starting", self.index);
        loop {
            match self.queue.dequeue_blocking() {
                Dequeued::Task(task) => self.execute(task),
                Dequeued::Shutdown => break,
            }
        }
        debug!("Worker {}: Exiting", self.index);
    }

    fn execute(self: &Self, task: Task) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            error!("Worker {}: Task panicked: {}", self.index, panic_message(payload.as_ref()));
        }
    }
}

fn spawn_worker(index: usize, worker: Worker) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("worker-{index}"))
        .spawn(move || worker.run())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::HashSet,
        io::{Error, ErrorKind},
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            mpsc::{channel, Receiver},
            Barrier,
        },
        time::Duration,
    };

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn should_reject_zero_workers() {
        let result = WorkerPool::new(0);
        assert_eq!(Some(PoolErr::InvalidConfiguration { worker_count: 0 }), result.err());
    }

    #[test]
    fn should_start_running() {
        let pool = WorkerPool::new(3).unwrap();
        assert_eq!(PoolState::Running, pool.state());
        assert_eq!(3, pool.worker_count());
        assert_eq!(0, pool.counter().get());
    }

    /// Blocks until `count` tasks have reported on the channel
    fn wait_for(receiver: &Receiver<()>, count: usize) {
        for _ in 0..count {
            receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        }
    }

    #[test]
    fn should_run_every_task_exactly_once() {
        const TASK_COUNT: usize = 500;
        let pool = WorkerPool::new(4).unwrap();
        let executed = Arc::new(Mutex::new(Vec::new()));
        let (sender, receiver) = channel();

        for id in 0..TASK_COUNT {
            let executed = executed.clone();
            let sender = sender.clone();
            pool.submit(move || {
                executed.lock().unwrap().push(id);
                sender.send(()).unwrap();
            })
            .unwrap();
        }
        wait_for(&receiver, TASK_COUNT);
        pool.shutdown();

        let executed = executed.lock().unwrap();
        let unique: HashSet<usize> = executed.iter().copied().collect();
        assert_eq!(TASK_COUNT, executed.len());
        assert_eq!((0..TASK_COUNT).collect::<HashSet<usize>>(), unique);
    }

    #[test]
    fn should_run_tasks_in_submission_order_with_one_worker() {
        let pool = WorkerPool::new(1).unwrap();
        let executed = Arc::new(Mutex::new(Vec::new()));
        let (sender, receiver) = channel();

        for id in 0..100 {
            let executed = executed.clone();
            let sender = sender.clone();
            pool.submit(move || {
                executed.lock().unwrap().push(id);
                sender.send(()).unwrap();
            })
            .unwrap();
        }
        wait_for(&receiver, 100);
        pool.shutdown();

        assert_eq!((0..100).collect::<Vec<i32>>(), *executed.lock().unwrap());
    }

    #[test]
    fn should_run_tasks_in_parallel() {
        const WORKERS: usize = 4;
        let pool = WorkerPool::new(WORKERS).unwrap();
        let all_running = Arc::new(Barrier::new(WORKERS + 1));

        for _ in 0..WORKERS {
            let all_running = all_running.clone();
            pool.submit(move || {
                all_running.wait();
            })
            .unwrap();
        }

        all_running.wait();
        pool.shutdown();
    }

    #[test]
    fn should_wait_for_running_tasks_before_returning_from_shutdown() {
        let pool = WorkerPool::new(2).unwrap();
        let finished = Arc::new(AtomicUsize::new(0));
        let (started, receiver) = channel();

        for _ in 0..2 {
            let finished = finished.clone();
            let started = started.clone();
            pool.submit(move || {
                started.send(()).unwrap();
                thread::sleep(Duration::from_millis(50));
                finished.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        wait_for(&receiver, 2);
        pool.shutdown();

        assert_eq!(2, finished.load(Ordering::SeqCst));
        assert_eq!(PoolState::Terminated, pool.state());
        assert_eq!(0, pool.queued_task_count());
    }

    #[test]
    fn should_release_queued_tasks_without_running_them() {
        let pool = Arc::new(WorkerPool::new(1).unwrap());
        let (started, running) = channel();
        let (release, released_worker) = channel::<()>();

        pool.submit(move || {
            started.send(()).unwrap();
            released_worker.recv().unwrap();
        })
        .unwrap();
        wait_for(&running, 1);

        let ran = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicBool::new(false));
        {
            let ran = ran.clone();
            let resource = DropFlag(dropped.clone());
            pool.submit(move || {
                let _resource = resource;
                ran.store(true, Ordering::SeqCst);
            })
            .unwrap();
        }
        assert_eq!(1, pool.queued_task_count());

        let stopper = {
            let pool = pool.clone();
            thread::spawn(move || pool.shutdown())
        };
        while !pool.queue.is_closed() {
            thread::sleep(Duration::from_millis(1));
        }
        release.send(()).unwrap();
        stopper.join().unwrap();

        assert_eq!(PoolState::Terminated, pool.state());
        assert!(dropped.load(Ordering::SeqCst));
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(0, pool.queued_task_count());
    }

    #[test]
    fn should_refuse_and_hand_back_tasks_after_shutdown() {
        let pool = WorkerPool::new(2).unwrap();
        pool.shutdown();

        let ran = Arc::new(AtomicBool::new(false));
        let released = Arc::new(AtomicBool::new(false));
        let resource = DropFlag(released.clone());
        let result = {
            let ran = ran.clone();
            pool.submit(move || {
                let _resource = resource;
                ran.store(true, Ordering::SeqCst);
            })
        };

        let rejected = result.unwrap_err();
        assert!(!released.load(Ordering::SeqCst));
        drop(rejected);
        assert!(released.load(Ordering::SeqCst));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn should_allow_shutdown_more_than_once() {
        let pool = WorkerPool::new(2).unwrap();
        pool.shutdown();
        pool.shutdown();
        assert_eq!(PoolState::Terminated, pool.state());
    }

    #[test]
    fn should_keep_working_after_a_task_panics() {
        let pool = WorkerPool::new(1).unwrap();
        let (sender, receiver) = channel();

        pool.submit(|| panic!("task failed")).unwrap();
        pool.submit(move || sender.send("still alive").unwrap()).unwrap();

        assert_eq!("still alive", receiver.recv_timeout(Duration::from_secs(5)).unwrap());
        pool.shutdown();
    }

    #[test]
    fn should_shut_down_when_dropped() {
        let finished = Arc::new(AtomicBool::new(false));
        {
            let pool = WorkerPool::new(1).unwrap();
            let finished = finished.clone();
            let (started, receiver) = channel();
            pool.submit(move || {
                started.send(()).unwrap();
                thread::sleep(Duration::from_millis(20));
                finished.store(true, Ordering::SeqCst);
            })
            .unwrap();
            wait_for(&receiver, 1);
        }
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn should_join_started_workers_when_a_thread_fails_to_start() {
        let exited = Arc::new(AtomicUsize::new(0));
        let spawner = {
            let exited = exited.clone();
            move |index: usize, worker: Worker| {
                if index == 2 {
                    return Err(Error::new(ErrorKind::Other, "no more threads"));
                }
                let exited = exited.clone();
                thread::Builder::new().spawn(move || {
                    worker.run();
                    exited.fetch_add(1, Ordering::SeqCst);
                })
            }
        };

        let result = WorkerPool::with_spawner(4, spawner);

        match result {
            Err(PoolErr::CreationFailed { msg }) => assert!(msg.contains("no more threads")),
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("pool creation should have failed"),
        }
        assert_eq!(2, exited.load(Ordering::SeqCst));
    }

    #[test]
    fn should_report_creation_failure_for_huge_worker_count() {
        let spawner = |_: usize, _: Worker| -> std::io::Result<JoinHandle<()>> {
            Err(Error::new(ErrorKind::Other, "no more threads"))
        };

        let result = WorkerPool::with_spawner(usize::MAX, spawner);

        assert!(matches!(result, Err(PoolErr::CreationFailed { .. })));
    }
}
