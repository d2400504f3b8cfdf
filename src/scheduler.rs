//! Frame-batched DOM reads and writes.
//!
//! Interleaving layout reads with style writes forces the browser to
//! recompute layout synchronously. The [`Scheduler`] splits every update into
//! a read half and a write half: reads run at the start of the next frame,
//! their results are captured, and the matching writes run in the frame after
//! that. Within one frame every read runs before any write.
//!
//! There is no cancellation. Writes are expected to be cheap, idempotent
//! style mutations that re-check element existence before touching anything.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use crate::dom::Dom;

/// Captured result of a read, ready to be applied.
pub type WriteTask = Box<dyn FnOnce(&mut dyn Dom)>;
/// Read half of a scheduled update.
pub type ReadTask = Box<dyn FnOnce(&dyn Dom) -> WriteTask>;
/// Low-priority work run when the host is idle.
pub type IdleTask = Box<dyn FnOnce(&mut dyn Dom, &IdleDeadline)>;

/// Budget handed to idle tasks.
pub const IDLE_BUDGET: Duration = Duration::from_millis(50);

/// Whether the host can tell us when it is idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdleSupport {
    /// Idle tasks run at the end of the first frame without queued work.
    #[default]
    Native,
    /// Idle tasks run after a fixed timeout.
    Fallback,
}

/// Time budget for one idle task, measured from when it started running.
#[derive(Debug, Clone, Copy)]
pub struct IdleDeadline {
    started: Instant,
    budget: Duration,
    did_timeout: bool,
}

impl IdleDeadline {
    fn start(did_timeout: bool) -> Self {
        Self {
            started: Instant::now(),
            budget: IDLE_BUDGET,
            did_timeout,
        }
    }

    /// Remaining budget; zero once the task has used up its slice.
    pub fn time_remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }

    /// True when the task ran because it waited too long, not because the
    /// host went idle.
    pub const fn did_timeout(&self) -> bool {
        self.did_timeout
    }
}

/// Work performed by one call to [`Scheduler::run_frame`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub reads: usize,
    pub writes: usize,
    pub idle: usize,
}

struct QueuedIdle {
    task: IdleTask,
    queued_at: u64,
}

/// Read/write batching queue driven by the page's frame loop.
pub struct Scheduler {
    reads: Vec<ReadTask>,
    writes: Vec<WriteTask>,
    idle: VecDeque<QueuedIdle>,
    support: IdleSupport,
    idle_timeout_ms: u64,
    frames: u64,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("reads", &self.reads.len())
            .field("writes", &self.writes.len())
            .field("idle", &self.idle.len())
            .field("support", &self.support)
            .field("frames", &self.frames)
            .finish()
    }
}

impl Scheduler {
    /// Create a scheduler. `idle_timeout_ms` is the fallback delay for
    /// hosts without idle callbacks, and the starvation limit for hosts with
    /// them.
    pub fn new(support: IdleSupport, idle_timeout_ms: u64) -> Self {
        Self {
            reads: Vec::new(),
            writes: Vec::new(),
            idle: VecDeque::new(),
            support,
            idle_timeout_ms,
            frames: 0,
        }
    }

    /// Queue `read` for the next frame and `write(snapshot)` for the one after.
    pub fn schedule<S, R, W>(&mut self, read: R, write: W)
    where
        S: 'static,
        R: FnOnce(&dyn Dom) -> S + 'static,
        W: FnOnce(&mut dyn Dom, S) + 'static,
    {
        self.reads.push(Box::new(move |dom: &dyn Dom| {
            let snapshot = read(dom);
            Box::new(move |dom: &mut dyn Dom| write(dom, snapshot)) as WriteTask
        }));
    }

    /// Queue a write that needs no layout read; it runs next frame.
    pub fn mutate<W>(&mut self, write: W)
    where
        W: FnOnce(&mut dyn Dom) + 'static,
    {
        self.writes.push(Box::new(write));
    }

    /// Defer low-priority work until the host is idle.
    pub fn request_idle<T>(&mut self, task: T, now_ms: u64)
    where
        T: FnOnce(&mut dyn Dom, &IdleDeadline) + 'static,
    {
        self.idle.push_back(QueuedIdle {
            task: Box::new(task),
            queued_at: now_ms,
        });
    }

    /// Whether any read or write is waiting for a frame.
    pub fn has_pending(&self) -> bool {
        !self.reads.is_empty() || !self.writes.is_empty()
    }

    pub fn pending_idle(&self) -> usize {
        self.idle.len()
    }

    pub const fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Run one animation frame: queued reads first, then the writes captured
    /// by the previous frame's reads, then any idle work that is due.
    pub fn run_frame(&mut self, dom: &mut dyn Dom, now_ms: u64) -> FrameStats {
        self.frames += 1;
        let reads = std::mem::take(&mut self.reads);
        let writes = std::mem::take(&mut self.writes);
        let mut stats = FrameStats {
            reads: reads.len(),
            writes: writes.len(),
            idle: 0,
        };

        for read in reads {
            let write = read(&*dom);
            self.writes.push(write);
        }
        for write in writes {
            write(dom);
        }

        let frame_was_quiet = stats.reads == 0 && stats.writes == 0;
        stats.idle = self.run_idle(dom, now_ms, frame_was_quiet);
        stats
    }

    fn run_idle(&mut self, dom: &mut dyn Dom, now_ms: u64, frame_was_quiet: bool) -> usize {
        let mut ran = 0;
        let mut waiting = VecDeque::with_capacity(self.idle.len());
        while let Some(queued) = self.idle.pop_front() {
            let overdue = now_ms.saturating_sub(queued.queued_at) >= self.idle_timeout_ms;
            let deadline = match self.support {
                IdleSupport::Native if frame_was_quiet => Some(IdleDeadline::start(false)),
                IdleSupport::Native if overdue => Some(IdleDeadline::start(true)),
                IdleSupport::Fallback if overdue => Some(IdleDeadline::start(false)),
                _ => None,
            };
            match deadline {
                Some(deadline) => {
                    (queued.task)(dom, &deadline);
                    ran += 1;
                }
                None => waiting.push_back(queued),
            }
        }
        self.idle = waiting;
        ran
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::dom::MemoryDom;

    fn log() -> Rc<RefCell<Vec<String>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_read_runs_next_frame_and_write_the_frame_after() {
        let mut dom = MemoryDom::new(800.0, 600.0);
        let mut scheduler = Scheduler::new(IdleSupport::Native, 100);
        let events = log();
        let (r, w) = (events.clone(), events.clone());
        scheduler.schedule(
            move |_| {
                r.borrow_mut().push("read".into());
                42
            },
            move |_, value: i32| w.borrow_mut().push(format!("write {value}")),
        );

        assert!(events.borrow().is_empty(), "nothing runs before a frame");
        scheduler.run_frame(&mut dom, 16);
        assert_eq!(*events.borrow(), vec!["read"]);
        scheduler.run_frame(&mut dom, 32);
        assert_eq!(*events.borrow(), vec!["read", "write 42"]);
    }

    #[test]
    fn test_all_reads_in_a_frame_precede_its_writes() {
        let mut dom = MemoryDom::new(800.0, 600.0);
        let mut scheduler = Scheduler::new(IdleSupport::Native, 100);
        let events = log();

        let w = events.clone();
        scheduler.mutate(move |_| w.borrow_mut().push("write-a".into()));
        for name in ["read-b", "read-c"] {
            let r = events.clone();
            scheduler.schedule(move |_| r.borrow_mut().push(name.into()), |_, ()| {});
        }

        scheduler.run_frame(&mut dom, 16);
        assert_eq!(*events.borrow(), vec!["read-b", "read-c", "write-a"]);
    }

    #[test]
    fn test_write_sees_value_captured_by_read() {
        let mut dom = MemoryDom::new(800.0, 600.0);
        let html = dom.document_element();
        let bar = dom.append(html, "div").rect(0.0, 0.0, 800.0, 80.0).finish();
        let mut scheduler = Scheduler::new(IdleSupport::Native, 100);
        scheduler.schedule(
            move |dom| dom.offset_height(bar),
            move |dom, height| {
                let root = dom.document_element();
                dom.set_style_property(root, "--bar-height", &format!("{height}px"));
            },
        );
        scheduler.run_frame(&mut dom, 16);
        scheduler.run_frame(&mut dom, 32);
        assert_eq!(dom.style_property(html, "--bar-height"), Some("80px"));
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn test_native_idle_waits_for_quiet_frame() {
        let mut dom = MemoryDom::new(800.0, 600.0);
        let mut scheduler = Scheduler::new(IdleSupport::Native, 100);
        let events = log();
        let i = events.clone();
        scheduler.request_idle(
            move |_, deadline| {
                assert!(!deadline.did_timeout());
                i.borrow_mut().push("idle".into());
            },
            0,
        );
        scheduler.mutate(|_| {});

        let stats = scheduler.run_frame(&mut dom, 16);
        assert_eq!(stats.idle, 0, "frame with writes is not idle");
        let stats = scheduler.run_frame(&mut dom, 32);
        assert_eq!(stats.idle, 1);
        assert_eq!(*events.borrow(), vec!["idle"]);
    }

    #[test]
    fn test_native_idle_runs_with_timeout_flag_when_starved() {
        let mut dom = MemoryDom::new(800.0, 600.0);
        let mut scheduler = Scheduler::new(IdleSupport::Native, 100);
        let timed_out = Rc::new(RefCell::new(None));
        let t = timed_out.clone();
        scheduler.request_idle(move |_, d| *t.borrow_mut() = Some(d.did_timeout()), 0);

        let mut now = 0;
        while timed_out.borrow().is_none() {
            now += 16;
            scheduler.mutate(|_| {});
            scheduler.run_frame(&mut dom, now);
            assert!(now < 1000, "idle task starved");
        }
        assert_eq!(*timed_out.borrow(), Some(true));
        assert!(now >= 100);
    }

    #[test]
    fn test_fallback_idle_runs_after_fixed_timeout() {
        let mut dom = MemoryDom::new(800.0, 600.0);
        let mut scheduler = Scheduler::new(IdleSupport::Fallback, 100);
        let events = log();
        let i = events.clone();
        scheduler.request_idle(
            move |_, deadline| {
                assert!(deadline.time_remaining() <= IDLE_BUDGET);
                i.borrow_mut().push("idle".into());
            },
            0,
        );

        scheduler.run_frame(&mut dom, 16);
        scheduler.run_frame(&mut dom, 96);
        assert!(events.borrow().is_empty(), "fallback waits the full timeout");
        scheduler.run_frame(&mut dom, 112);
        assert_eq!(*events.borrow(), vec!["idle"]);
        assert_eq!(scheduler.pending_idle(), 0);
    }
}
