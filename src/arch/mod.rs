//! # Architecture Port Layer
//!
//! Platform-specific glue for the scheduler. Currently provides the
//! SysTick-driven default clock source for Cortex-M targets; extensible
//! to other time bases by adding sibling modules.

pub mod systick;
