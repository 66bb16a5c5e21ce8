//! # Task Model
//!
//! A task is a deferrable unit of work: a callable plus an opaque context
//! handle, a fire time, and an intrusive queue link. The link is the sole
//! source of truth for "is this task scheduled" — a linked task is in the
//! scheduler's main queue, an unlinked one is not.
//!
//! Tasks are caller-owned. The scheduler never allocates, copies, or
//! frees them; it only holds references while they are scheduled. A task
//! must stay alive and must not move for as long as it is linked.
//!
//! With the `profiling` feature enabled, each task additionally carries a
//! display name and invocation counters (call count, total runtime, max
//! single-invocation runtime) updated every time the scheduler runs it.

use core::mem::offset_of;
use core::ptr::NonNull;

use crate::list::Link;
use crate::scheduler::Scheduler;
use crate::time::Instant;

#[cfg(feature = "profiling")]
use crate::config::RawTick;
#[cfg(feature = "profiling")]
use crate::time::Duration;

// ---------------------------------------------------------------------------
// Deferred call
// ---------------------------------------------------------------------------

/// Signature of a task's deferred call.
///
/// The scheduler passes itself as the first parameter so the callable can
/// schedule further work (including re-arming its own task via
/// [`Scheduler::reschedule_in`] / [`Scheduler::reschedule_now`]). The
/// second parameter is the task's own context handle; the third is a
/// caller-supplied argument, always null when the call is made by
/// [`Scheduler::step`].
pub type TaskFn = fn(sched: &mut Scheduler, context: *mut (), arg: *mut ());

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A deferrable unit of work with a fire time and an intrusive queue link.
pub struct Task {
    /// Link into the scheduler's main queue. Unlinked ⇔ not scheduled.
    link: Link,

    /// The time at or after which this task becomes runnable.
    time: Instant,

    /// The deferred call.
    callable: TaskFn,

    /// Opaque handle passed back to the callable on every invocation.
    context: *mut (),

    /// User-defined display name.
    #[cfg(feature = "profiling")]
    name: &'static str,

    /// Number of completed invocations.
    #[cfg(feature = "profiling")]
    call_count: u32,

    /// Accumulated ticks spent running this task.
    #[cfg(feature = "profiling")]
    runtime_ticks: RawTick,

    /// Longest single invocation, in ticks.
    #[cfg(feature = "profiling")]
    max_runtime_ticks: RawTick,
}

impl Task {
    /// Create a task with the given callable and context. The task starts
    /// unlinked with a cleared fire time and zeroed profiling counters.
    ///
    /// `name` is retained only in `profiling` builds.
    pub const fn new(callable: TaskFn, context: *mut (), name: &'static str) -> Self {
        #[cfg(not(feature = "profiling"))]
        let _ = name;
        Task {
            link: Link::new(),
            time: Instant::ZERO,
            callable,
            context,
            #[cfg(feature = "profiling")]
            name,
            #[cfg(feature = "profiling")]
            call_count: 0,
            #[cfg(feature = "profiling")]
            runtime_ticks: 0,
            #[cfg(feature = "profiling")]
            max_runtime_ticks: 0,
        }
    }

    /// The task's fire time.
    #[inline]
    pub fn time(&self) -> Instant {
        self.time
    }

    /// Set the task's fire time. Does not move the task within the queue;
    /// use the scheduler's `task_at`/`task_in`/`task_now` to (re)schedule.
    #[inline]
    pub fn set_time(&mut self, time: Instant) {
        self.time = time;
    }

    /// True if the task is currently linked into a scheduler queue.
    #[inline]
    pub fn is_scheduled(&self) -> bool {
        self.link.is_linked()
    }

    /// The deferred call's function pointer.
    #[inline]
    pub fn callable(&self) -> TaskFn {
        self.callable
    }

    /// The deferred call's context handle.
    #[inline]
    pub fn context(&self) -> *mut () {
        self.context
    }

    /// Invoke the task's callable directly with a caller-supplied
    /// argument.
    ///
    /// Counts as an invocation in `profiling` builds; runtime is only
    /// accounted for invocations made by [`Scheduler::step`], which has
    /// access to the clock.
    pub fn call(&mut self, sched: &mut Scheduler, arg: *mut ()) {
        #[cfg(feature = "profiling")]
        {
            self.call_count += 1;
        }
        let callable = self.callable;
        let context = self.context;
        callable(sched, context, arg);
    }

    /// The task's display name.
    #[cfg(feature = "profiling")]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of completed invocations.
    #[cfg(feature = "profiling")]
    #[inline]
    pub fn call_count(&self) -> u32 {
        self.call_count
    }

    /// Total ticks spent running this task.
    #[cfg(feature = "profiling")]
    #[inline]
    pub fn runtime_ticks(&self) -> RawTick {
        self.runtime_ticks
    }

    /// Longest single invocation, in ticks.
    #[cfg(feature = "profiling")]
    #[inline]
    pub fn max_runtime_ticks(&self) -> RawTick {
        self.max_runtime_ticks
    }

    /// Record one scheduler-driven invocation taking `elapsed` ticks.
    #[cfg(feature = "profiling")]
    pub(crate) fn note_run(&mut self, elapsed: Duration) {
        let ticks = elapsed.ticks().max(0) as RawTick;
        self.call_count += 1;
        self.runtime_ticks = self.runtime_ticks.wrapping_add(ticks);
        if ticks > self.max_runtime_ticks {
            self.max_runtime_ticks = ticks;
        }
    }

    /// Pointer to the embedded queue link.
    #[inline]
    pub(crate) fn link_ptr(&mut self) -> NonNull<Link> {
        NonNull::from(&mut self.link)
    }

    /// Recover the owning task from a pointer to its embedded link.
    ///
    /// # Safety
    ///
    /// `link` must point to the `link` field of a live `Task`.
    pub(crate) unsafe fn from_link(link: NonNull<Link>) -> NonNull<Task> {
        let task = link.as_ptr().cast::<u8>().sub(offset_of!(Task, link));
        NonNull::new_unchecked(task.cast::<Task>())
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
