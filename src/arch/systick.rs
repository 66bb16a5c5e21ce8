//! # SysTick Clock Source
//!
//! The platform-default clock source: a free-running tick counter
//! advanced from the application's SysTick handler. The counter is a
//! single atomic word, so reading it is safe from both foreground and
//! interrupt context — which the `isr_task_now` / `isr_task_in` entries
//! rely on.
//!
//! Wiring it up:
//!
//! ```ignore
//! #[exception]
//! fn SysTick() {
//!     cadence::arch::systick::on_tick();
//! }
//!
//! let mut peripherals = cortex_m::Peripherals::take().unwrap();
//! cadence::arch::systick::configure(&mut peripherals.SYST);
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;

use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};
use crate::time::Instant;

/// Ticks elapsed since boot. Written only from the SysTick handler.
static TICKS: AtomicU32 = AtomicU32::new(0);

/// Configure the SysTick timer to fire at [`TICK_HZ`] from the core
/// clock. Call once at startup; the application's SysTick handler must
/// call [`on_tick`].
pub fn configure(syst: &mut SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// Advance the tick counter by one. Call from the SysTick handler.
#[inline]
pub fn on_tick() {
    TICKS.fetch_add(1, Ordering::Release);
}

/// The current tick count as an [`Instant`]. This is the scheduler's
/// default clock source.
#[inline]
pub fn now() -> Instant {
    Instant::from_ticks(TICKS.load(Ordering::Acquire))
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_advance_monotonically() {
        let before = now();
        on_tick();
        on_tick();
        let after = now();
        assert!(after.ticks().wrapping_sub(before.ticks()) >= 2);
        assert!(before.precedes(after));
    }
}
