//! # Configuration
//!
//! Compile-time constants governing scheduler behavior. All limits are
//! fixed at compile time — no dynamic allocation anywhere in the crate.

/// Capacity of the ISR handoff ring, in task slots. Must be a power of
/// two; one slot is reserved so full and empty are distinguishable, so
/// `ISR_QUEUE_CAPACITY - 1` tasks can be outstanding between steps.
/// Interrupt bursts larger than this are rejected with `Error::Full`.
pub const ISR_QUEUE_CAPACITY: usize = 8;

/// SysTick frequency in Hz. Determines the granularity of the
/// platform-default clock source (`arch::systick`). Higher values give
/// finer fire-time precision at the cost of increased interrupt overhead.
pub const TICK_HZ: u32 = 1000;

/// System clock frequency in Hz (default for STM32F4 at 16 MHz HSI).
/// Used to derive the SysTick reload value in `arch::systick::configure`.
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Underlying representation of a timestamp. Timestamps order within a
/// rolling window of half this type's range; tasks must not be scheduled
/// further than half the window into the future. Widen to `u64` (with
/// [`RawTickDelta`] as `i64`) for applications that need a larger window.
pub type RawTick = u32;

/// Underlying representation of a signed tick count (a duration).
/// Must be the signed counterpart of [`RawTick`].
pub type RawTickDelta = i32;
