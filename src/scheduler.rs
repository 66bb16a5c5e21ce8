//! # Scheduler
//!
//! Core scheduling logic: a time-ordered main queue of tasks, a lock-free
//! handoff ring for interrupt-level scheduling, and a single-step run
//! loop. The caller drives the scheduler by invoking [`Scheduler::step`]
//! from its main loop; each step transfers any interrupt-queued tasks
//! into the main queue, then runs at most one due task (or the idle task
//! when nothing is due).
//!
//! ## Scheduling Algorithm
//!
//! On each `step()`:
//! 1. **Drain the ISR ring**: every task handed off from interrupt
//!    context is inserted into the main queue at its time-ordered
//!    position.
//! 2. **Select**: peek the head of the main queue. If its fire time has
//!    arrived, pop it, mark it current, and invoke its callable; once the
//!    callable returns, clear the current marker.
//! 3. **Idle**: if the head is still in the future (or the queue is
//!    empty), invoke the idle task instead, with no current marker.
//!
//! ## Single-Occupancy Invariant
//!
//! A task appears in the main queue at most once. Every scheduling entry
//! unlinks the task first (an O(1) splice thanks to the intrusive link),
//! then re-inserts it at the position of its new fire time. Scheduling an
//! already-scheduled task therefore re-arms it rather than duplicating
//! it, which prevents runaway self-scheduling.
//!
//! ## Ordered Insertion
//!
//! Insertion scans from the head and places the task before the first
//! element whose fire time it strictly precedes. Tasks with equal fire
//! times therefore run in insertion order, and a task that reschedules
//! itself to "now" yields to every task that is already runnable.
//!
//! ## Concurrency Contract
//!
//! All entries except the `isr_*` family are foreground-only: they are
//! not re-entrant and must never be called from interrupt context.
//! Interrupts are deliberately not masked anywhere; the SPSC ring is the
//! only structure shared with interrupt context. The `isr_*` entries are
//! wait-free, never touch the main queue, and are safe against a
//! concurrent foreground `step()`.

use core::ptr::NonNull;

use crate::arch;
use crate::config::ISR_QUEUE_CAPACITY;
use crate::list::{self, Link, List};
use crate::spsc::SpscRing;
use crate::task::Task;
use crate::time::{Duration, Instant};
use crate::Error;

// ---------------------------------------------------------------------------
// Clock source
// ---------------------------------------------------------------------------

/// Signature of a clock source: returns the current time.
///
/// The source must be monotonic within the timestamp comparison window.
/// It is queried on every step and on every scheduling call that needs
/// the current time — including `isr_task_now` / `isr_task_in`, so a
/// clock used with those entries must also be safe to read from
/// interrupt context (the default SysTick counter is).
pub type ClockFn = fn() -> Instant;

// ---------------------------------------------------------------------------
// Task status
// ---------------------------------------------------------------------------

/// Observable state of a task with respect to a scheduler.
///
/// ```text
///              task_at / task_in / task_now
///   ┌────────┐ (or ISR-ring drain)  ┌───────────┐
///   │  Idle  │ ───────────────────► │ Scheduled │
///   └────────┘                      └───────────┘
///        ▲                                │ passage of time
///        │ remove()                       ▼
///        │                          ┌───────────┐
///        │◄──────────────────────── │ Runnable  │
///        │                          └───────────┘
///        │                                │ step() pops the head
///        │       callable returns         ▼
///        │       without rescheduling ┌────────┐
///        └─────────────────────────── │ Active │ ─► Scheduled
///                                     └────────┘  (reschedule_now /
///                                                   reschedule_in)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Not scheduled and not running.
    Idle,
    /// In the main queue with a fire time still in the future.
    Scheduled,
    /// In the main queue with a fire time that has arrived.
    Runnable,
    /// Currently being run by `step()`.
    Active,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// A cooperative run-to-completion scheduler.
///
/// The scheduler holds non-owning references to caller-owned tasks. The
/// usual deployment is the process-wide instance behind the
/// [`kernel`](crate::kernel) facade; an explicit instance works the same
/// way and is what the tests use.
///
/// # Safety contract
///
/// The scheduler is safe code at the surface but relies on two
/// caller-upheld rules, both inherent to intrusive designs:
///
/// - A task must stay alive and must not move while it is scheduled
///   (its embedded link is woven into the queue).
/// - The scheduler itself must not move once a task has been scheduled
///   (the queue sentinel becomes self-referential).
pub struct Scheduler {
    /// Time-ordered list of scheduled tasks, soonest first.
    queue: List,

    /// Replaceable source of the current time.
    clock: ClockFn,

    /// User-installed idle task; `None` selects the built-in no-op.
    idle: Option<NonNull<Task>>,

    /// The task currently being run by `step()`, if any.
    current: Option<NonNull<Task>>,

    /// Handoff ring for tasks scheduled from interrupt context.
    isr_queue: SpscRing<NonNull<Task>, ISR_QUEUE_CAPACITY>,

    /// Storage for the built-in idle task.
    default_idle: Task,
}

/// The built-in idle task doesn't do much.
fn default_idle_fn(_sched: &mut Scheduler, _context: *mut (), _arg: *mut ()) {}

impl Scheduler {
    /// A new scheduler with the platform-default clock source and the
    /// built-in idle task. Usable in `const` and `static` initializers.
    pub const fn new() -> Self {
        Scheduler {
            queue: List::new(),
            clock: arch::systick::now,
            idle: None,
            current: None,
            isr_queue: SpscRing::new(),
            default_idle: Task::new(default_idle_fn, core::ptr::null_mut(), "idle"),
        }
    }

    /// (Re)initialize: restore the platform-default clock source and the
    /// built-in idle task, then drain all queues. Foreground-only.
    pub fn init(&mut self) {
        self.clock = arch::systick::now;
        self.idle = None;
        self.reset();
        log::debug!("scheduler initialized");
    }

    /// Drain the ISR ring and the main queue without invoking any task,
    /// and clear the current-task marker. Links of drained tasks become
    /// unlinked. Foreground-only; the caller must ensure no interrupt
    /// producer is active.
    pub fn reset(&mut self) {
        self.isr_queue.reset();
        // Safety: linked tasks are live per the scheduling contract.
        while unsafe { self.queue.pop_front() }.is_some() {}
        self.current = None;
    }

    // -----------------------------------------------------------------------
    // Clock source
    // -----------------------------------------------------------------------

    /// Replace the clock source. Takes effect on the next query.
    pub fn set_clock_source(&mut self, clock: ClockFn) {
        self.clock = clock;
    }

    /// The current clock source.
    pub fn clock_source(&self) -> ClockFn {
        self.clock
    }

    /// The current time, as reported by the clock source.
    #[inline]
    pub fn now(&self) -> Instant {
        (self.clock)()
    }

    // -----------------------------------------------------------------------
    // Idle task
    // -----------------------------------------------------------------------

    /// Install `task` as the idle task, invoked whenever a step finds no
    /// runnable task. The idle task may itself schedule work. It must
    /// satisfy the same lifetime rules as a scheduled task.
    pub fn set_idle_task(&mut self, task: &mut Task) {
        self.idle = Some(NonNull::from(task));
    }

    /// The task that will run when nothing is due.
    pub fn idle_task(&self) -> &Task {
        match self.idle {
            // Safety: the installed idle task is live per the contract.
            Some(task) => unsafe { &*task.as_ptr() },
            None => &self.default_idle,
        }
    }

    /// The built-in no-op idle task.
    pub fn default_idle_task(&self) -> &Task {
        &self.default_idle
    }

    // -----------------------------------------------------------------------
    // Foreground scheduling
    // -----------------------------------------------------------------------

    /// Schedule (or re-arm) `task` to run at time `at`. Foreground-only.
    ///
    /// If the task is already scheduled it is first removed, so it occurs
    /// in the queue exactly once afterwards. Always succeeds; the error
    /// return is an extension point.
    pub fn task_at(&mut self, task: &mut Task, at: Instant) -> Result<(), Error> {
        task.set_time(at);
        self.enqueue(NonNull::from(task));
        Ok(())
    }

    /// Schedule (or re-arm) `task` to run `delay` from now.
    /// Foreground-only.
    pub fn task_in(&mut self, task: &mut Task, delay: Duration) -> Result<(), Error> {
        let at = self.now().offset(delay);
        self.task_at(task, at)
    }

    /// Schedule (or re-arm) `task` to run as soon as possible.
    /// Tasks that are already runnable get to run first. Foreground-only.
    pub fn task_now(&mut self, task: &mut Task) -> Result<(), Error> {
        let at = self.now();
        self.task_at(task, at)
    }

    /// Re-arm the currently running task to run as soon as possible,
    /// yielding to any other runnable tasks. Returns `Error::NotFound`
    /// if no task is running (including from within the idle task).
    pub fn reschedule_now(&mut self) -> Result<(), Error> {
        let Some(task) = self.current else {
            return Err(Error::NotFound);
        };
        let now = self.now();
        // Safety: the current task was popped by step() and is live.
        unsafe { (*task.as_ptr()).set_time(now) };
        self.enqueue(task);
        Ok(())
    }

    /// Re-arm the currently running task `delay` after its recorded fire
    /// time — not after the current time, so a periodic task keeps its
    /// cadence even when a step runs late. Returns `Error::NotFound` if
    /// no task is running.
    pub fn reschedule_in(&mut self, delay: Duration) -> Result<(), Error> {
        let Some(task) = self.current else {
            return Err(Error::NotFound);
        };
        // Safety: the current task was popped by step() and is live.
        let at = unsafe { task.as_ref() }.time().offset(delay);
        unsafe { (*task.as_ptr()).set_time(at) };
        self.enqueue(task);
        Ok(())
    }

    /// Unschedule `task`. Returns the task if it was scheduled, `None`
    /// if it was not (a no-op). Foreground-only.
    pub fn remove<'t>(&mut self, task: &'t mut Task) -> Option<&'t mut Task> {
        let link = task.link_ptr();
        // Safety: exclusive queue access through &mut self; neighbors of
        // a linked task are live per the scheduling contract.
        unsafe { list::unlink(link) }.map(|_| task)
    }

    // -----------------------------------------------------------------------
    // Interrupt-level scheduling
    // -----------------------------------------------------------------------

    /// Schedule `task` from interrupt context to run at time `at`.
    ///
    /// Wait-free; writes only to the handoff ring, never to the main
    /// queue. The task becomes visible to the scheduler at the next
    /// `step()`. Returns `Error::Full` when the ring is at capacity.
    pub fn isr_task_at(&self, task: &mut Task, at: Instant) -> Result<(), Error> {
        task.set_time(at);
        self.isr_queue.put(NonNull::from(task))
    }

    /// Schedule `task` from interrupt context to run as soon as possible.
    /// The fire time is stamped at enqueue. Returns `Error::Full` when
    /// the ring is at capacity.
    pub fn isr_task_now(&self, task: &mut Task) -> Result<(), Error> {
        task.set_time(self.now());
        self.isr_queue.put(NonNull::from(task))
    }

    /// Schedule `task` from interrupt context to run `delay` from now.
    /// The fire time is stamped at enqueue. Returns `Error::Full` when
    /// the ring is at capacity.
    pub fn isr_task_in(&self, task: &mut Task, delay: Duration) -> Result<(), Error> {
        task.set_time(self.now().offset(delay));
        self.isr_queue.put(NonNull::from(task))
    }

    // -----------------------------------------------------------------------
    // Step
    // -----------------------------------------------------------------------

    /// Run one scheduler iteration: drain the ISR ring into the main
    /// queue, then run the soonest due task — or the idle task if none is
    /// due. At most one main-queue task runs per step; the caller
    /// controls the loop cadence. Foreground-only.
    pub fn step(&mut self) -> Result<(), Error> {
        let now = self.now();

        // Transfer any tasks queued at interrupt level to the main queue,
        // in their enqueue order.
        while let Ok(task) = self.isr_queue.get() {
            self.enqueue(task);
        }

        match self.pop_runnable(now) {
            Some(task) => {
                self.current = Some(task);
                self.run(task);
                self.current = None;
            }
            // The idle task runs with no current-task marker, so a
            // reschedule_* call from inside it reports NotFound.
            None => self.run_idle(),
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Number of scheduled tasks. O(n); for diagnostics only.
    pub fn task_count(&self) -> usize {
        // Safety: linked tasks are live per the scheduling contract.
        unsafe { self.queue.len() }
    }

    /// True if no tasks are scheduled.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// The task currently being run by `step()`, if any. Between steps
    /// this is always `None`.
    pub fn current_task(&self) -> Option<&Task> {
        // Safety: the current task was popped by step() and is live.
        self.current.map(|task| unsafe { &*task.as_ptr() })
    }

    /// The next task in line, or `None` if the queue is empty.
    pub fn next_task(&self) -> Option<&Task> {
        self.queue
            .first()
            // Safety: linked tasks are live per the scheduling contract.
            .map(|link| unsafe { &*Task::from_link(link).as_ptr() })
    }

    /// The status of `task` with respect to this scheduler.
    pub fn task_status(&self, task: &Task) -> TaskStatus {
        if let Some(current) = self.current {
            if core::ptr::eq(current.as_ptr(), task) {
                return TaskStatus::Active;
            }
        }
        if !task.is_scheduled() {
            return TaskStatus::Idle;
        }
        if task.time().follows(self.now()) {
            TaskStatus::Scheduled
        } else {
            TaskStatus::Runnable
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Insert `task` into the main queue at its time-ordered position,
    /// unlinking it first if it is already queued.
    fn enqueue(&mut self, mut task: NonNull<Task>) {
        // Safety: callers pass tasks that are live and exclusively
        // accessible from the foreground.
        let link = unsafe { task.as_mut() }.link_ptr();
        if unsafe { list::unlink(link) }.is_some() {
            log::trace!("re-arming a task that was already scheduled");
        }
        let time = unsafe { task.as_ref() }.time();
        match self.insertion_point(time) {
            Some(anchor) => unsafe { list::insert_before(anchor, link) },
            None => unsafe { self.queue.push_back(link) },
        }
    }

    /// The first queued element whose fire time `time` strictly precedes,
    /// or `None` when the new task belongs at the back. Ties go behind
    /// the incumbent, giving FIFO order among equal fire times.
    fn insertion_point(&self, time: Instant) -> Option<NonNull<Link>> {
        // Safety: linked tasks are live per the scheduling contract.
        unsafe {
            self.queue.traverse(|link| {
                let incumbent = Task::from_link(link);
                time.precedes(incumbent.as_ref().time()).then_some(link)
            })
        }
    }

    /// Pop the head of the main queue if its fire time has arrived.
    fn pop_runnable(&mut self, now: Instant) -> Option<NonNull<Task>> {
        let link = self.queue.first()?;
        // Safety: linked tasks are live per the scheduling contract.
        let task = unsafe { Task::from_link(link) };
        if unsafe { task.as_ref() }.time().follows(now) {
            return None;
        }
        unsafe { self.queue.pop_front() };
        Some(task)
    }

    /// Invoke `task`'s callable and account the invocation.
    fn run(&mut self, task: NonNull<Task>) {
        #[cfg(feature = "profiling")]
        let started = self.now();
        // Copy the deferred call out so no borrow of the task is live
        // while its callable runs (the callable may re-arm the task).
        let (callable, context) = {
            // Safety: the task is live; it was either popped from the
            // queue or installed as the idle task.
            let t = unsafe { task.as_ref() };
            (t.callable(), t.context())
        };
        callable(self, context, core::ptr::null_mut());
        #[cfg(feature = "profiling")]
        {
            let elapsed = self.now().since(started);
            // Safety: the task is still live; the callable has returned.
            unsafe { (*task.as_ptr()).note_run(elapsed) };
        }
    }

    /// Invoke the idle task (user-installed or built-in).
    fn run_idle(&mut self) {
        match self.idle {
            Some(task) => self.run(task),
            None => {
                #[cfg(feature = "profiling")]
                let started = self.now();
                let callable = self.default_idle.callable();
                let context = self.default_idle.context();
                callable(self, context, core::ptr::null_mut());
                #[cfg(feature = "profiling")]
                {
                    let elapsed = self.now().since(started);
                    self.default_idle.note_run(elapsed);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
