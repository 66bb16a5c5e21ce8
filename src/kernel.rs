//! # Kernel
//!
//! Process-wide singleton facade over [`Scheduler`]. Most firmware wants
//! exactly one scheduler that outlives everything else; this module owns
//! that instance and mirrors the scheduler API as free functions, so
//! application code and interrupt handlers can schedule work without
//! threading a scheduler handle around.
//!
//! ## Startup Sequence
//!
//! ```text
//! main()
//!   ├─► kernel::init()                      ← reset the singleton
//!   ├─► arch::systick::configure(&mut syst) ← start the default clock
//!   ├─► kernel::task_now(&mut TASK)         ← schedule initial work (×N)
//!   └─► loop { kernel::step(); }            ← run-to-completion loop
//! ```
//!
//! ## Safety
//!
//! The singleton is a `static mut` reached through raw pointers, exactly
//! as permissive as the underlying scheduler contract:
//!
//! - All functions except the `isr_*` family are foreground-only and not
//!   re-entrant.
//! - `isr_*` functions may be called from interrupt context; they only
//!   touch the SPSC handoff ring.
//! - Task references must be `'static`: the singleton never goes away,
//!   so neither may a task it might still point at.

use core::ptr::addr_of_mut;

use crate::scheduler::{ClockFn, Scheduler, TaskStatus};
use crate::task::Task;
use crate::time::{Duration, Instant};
use crate::Error;

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// The process-wide scheduler.
///
/// # Safety
/// Foreground access is exclusive by the foreground-only contract;
/// interrupt context reaches only the interior-mutable handoff ring.
static mut SCHEDULER: Scheduler = Scheduler::new();

#[inline]
fn scheduler() -> *mut Scheduler {
    addr_of_mut!(SCHEDULER)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Initialize the process-wide scheduler: platform-default clock source,
/// built-in idle task, empty queues. Call once at startup, before any
/// other kernel function. Foreground-only.
pub fn init() {
    unsafe { (*scheduler()).init() }
}

/// Drain all queues without invoking tasks. Foreground-only; no interrupt
/// producer may be active during the call.
pub fn reset() {
    unsafe { (*scheduler()).reset() }
}

/// Run one scheduler iteration. See [`Scheduler::step`]. Foreground-only.
pub fn step() -> Result<(), Error> {
    unsafe { (*scheduler()).step() }
}

// ---------------------------------------------------------------------------
// Clock source
// ---------------------------------------------------------------------------

/// Replace the clock source. Foreground-only.
pub fn set_clock_source(clock: ClockFn) {
    unsafe { (*scheduler()).set_clock_source(clock) }
}

/// The current clock source.
pub fn clock_source() -> ClockFn {
    unsafe { (*scheduler()).clock_source() }
}

/// The current time, as reported by the clock source.
pub fn now() -> Instant {
    unsafe { (*scheduler()).now() }
}

// ---------------------------------------------------------------------------
// Idle task
// ---------------------------------------------------------------------------

/// Install the idle task. Foreground-only.
pub fn set_idle_task(task: &'static mut Task) {
    unsafe { (*scheduler()).set_idle_task(task) }
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

/// Schedule (or re-arm) `task` to run at time `at`. Foreground-only.
pub fn task_at(task: &'static mut Task, at: Instant) -> Result<(), Error> {
    unsafe { (*scheduler()).task_at(task, at) }
}

/// Schedule (or re-arm) `task` to run `delay` from now. Foreground-only.
pub fn task_in(task: &'static mut Task, delay: Duration) -> Result<(), Error> {
    unsafe { (*scheduler()).task_in(task, delay) }
}

/// Schedule (or re-arm) `task` to run as soon as possible.
/// Foreground-only.
pub fn task_now(task: &'static mut Task) -> Result<(), Error> {
    unsafe { (*scheduler()).task_now(task) }
}

/// Re-arm the currently running task for "now", yielding to other
/// runnable tasks. Foreground-only (call from within a task callable).
pub fn reschedule_now() -> Result<(), Error> {
    unsafe { (*scheduler()).reschedule_now() }
}

/// Re-arm the currently running task `delay` after its recorded fire
/// time. Foreground-only (call from within a task callable).
pub fn reschedule_in(delay: Duration) -> Result<(), Error> {
    unsafe { (*scheduler()).reschedule_in(delay) }
}

/// Unschedule `task`; returns it if it was scheduled. Foreground-only.
pub fn remove(task: &'static mut Task) -> Option<&'static mut Task> {
    unsafe { (*scheduler()).remove(task) }
}

// ---------------------------------------------------------------------------
// Interrupt-level scheduling
// ---------------------------------------------------------------------------

/// Schedule `task` from interrupt context to run at time `at`.
pub fn isr_task_at(task: &'static mut Task, at: Instant) -> Result<(), Error> {
    unsafe { (*scheduler()).isr_task_at(task, at) }
}

/// Schedule `task` from interrupt context to run as soon as possible.
pub fn isr_task_now(task: &'static mut Task) -> Result<(), Error> {
    unsafe { (*scheduler()).isr_task_now(task) }
}

/// Schedule `task` from interrupt context to run `delay` from now.
pub fn isr_task_in(task: &'static mut Task, delay: Duration) -> Result<(), Error> {
    unsafe { (*scheduler()).isr_task_in(task, delay) }
}

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

/// Number of scheduled tasks. O(n); diagnostics only.
pub fn task_count() -> usize {
    unsafe { (*scheduler()).task_count() }
}

/// True if no tasks are scheduled.
pub fn is_empty() -> bool {
    unsafe { (*scheduler()).is_empty() }
}

/// The status of `task` with respect to the singleton scheduler.
pub fn task_status(task: &Task) -> TaskStatus {
    unsafe { (*scheduler()).task_status(task) }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::ptr::addr_of_mut;

    std::thread_local! {
        static NOW: Cell<u32> = Cell::new(0);
    }

    fn test_clock() -> Instant {
        Instant::from_ticks(NOW.with(|c| c.get()))
    }

    static mut HITS: u32 = 0;

    fn bump(_sched: &mut Scheduler, _ctx: *mut (), _arg: *mut ()) {
        unsafe { *addr_of_mut!(HITS) += 1 };
    }

    static mut TASK: Task = Task::new(bump, core::ptr::null_mut(), "bump");
    static mut ISR_TASK: Task = Task::new(bump, core::ptr::null_mut(), "isr-bump");

    // The facade is a process-wide singleton, so everything is exercised
    // in one test to keep parallel test threads off the shared state.
    #[test]
    fn singleton_round_trip() {
        init();
        set_clock_source(test_clock);
        NOW.with(|c| c.set(1000));
        assert!(is_empty());
        assert_eq!(now(), Instant::from_ticks(1000));
        assert!(clock_source() == test_clock as ClockFn);

        let task = unsafe { &mut *addr_of_mut!(TASK) };
        task_at(task, Instant::from_ticks(1010)).unwrap();
        assert_eq!(task_count(), 1);
        assert_eq!(
            task_status(unsafe { &*addr_of_mut!(TASK) }),
            TaskStatus::Scheduled
        );

        step().unwrap(); // not due: idle
        assert_eq!(unsafe { *addr_of_mut!(HITS) }, 0);

        NOW.with(|c| c.set(1010));
        step().unwrap();
        assert_eq!(unsafe { *addr_of_mut!(HITS) }, 1);
        assert!(is_empty());

        // Interrupt-level path: enqueue, then drain on the next step.
        let isr_task = unsafe { &mut *addr_of_mut!(ISR_TASK) };
        isr_task_now(isr_task).unwrap();
        assert!(is_empty());
        step().unwrap();
        assert_eq!(unsafe { *addr_of_mut!(HITS) }, 2);

        // Reschedule-current entries outside of a running task.
        assert_eq!(reschedule_now(), Err(Error::NotFound));
        assert_eq!(reschedule_in(Duration::from_ticks(5)), Err(Error::NotFound));

        // Remove round-trip.
        let task = unsafe { &mut *addr_of_mut!(TASK) };
        task_now(task).unwrap();
        let task = unsafe { &mut *addr_of_mut!(TASK) };
        assert!(remove(task).is_some());
        assert!(is_empty());

        reset();
        assert!(is_empty());
    }
}
