//! # SPSC Handoff Ring
//!
//! Lock-free single-producer/single-consumer ring buffer, used to hand
//! task references from interrupt context to the foreground scheduler.
//! No heap, no mutex, no critical sections: one atomic index per side,
//! published with release ordering after the slot access so the opposite
//! side never observes an index ahead of its data. On single-core
//! Cortex-M parts this compiles down to plain loads and stores with
//! compiler reordering suppressed.
//!
//! Capacity must be a power of two. One slot is reserved so that full
//! and empty states are distinguishable: a ring of `N` slots holds at
//! most `N - 1` items.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::Error;

/// Fixed-capacity SPSC ring.
///
/// `put` may be called from interrupt context while the foreground calls
/// `get`; both take `&self`. The ring is single-producer/single-consumer:
/// callers that enqueue from multiple interrupt priorities must serialize
/// at the producer site (e.g. by interrupt masking there).
pub struct SpscRing<T, const N: usize> {
    slots: [UnsafeCell<MaybeUninit<T>>; N],
    /// Written only by the producer side.
    put_index: AtomicUsize,
    /// Written only by the consumer side.
    get_index: AtomicUsize,
}

// The producer and consumer sides may live in different execution
// contexts; the atomics order all slot accesses.
unsafe impl<T: Send, const N: usize> Sync for SpscRing<T, N> {}

impl<T, const N: usize> SpscRing<T, N> {
    /// A new empty ring. Usable in `const` and `static` initializers.
    pub const fn new() -> Self {
        const { assert!(N.is_power_of_two(), "ring capacity must be a power of two") };
        Self {
            slots: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
            put_index: AtomicUsize::new(0),
            get_index: AtomicUsize::new(0),
        }
    }

    /// Usable capacity (one slot is reserved).
    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Producer side: append `item` to the ring.
    ///
    /// Returns `Error::Full` (dropping nothing; the caller keeps the
    /// item's state) when the ring is at capacity. Safe to call from
    /// interrupt context while the foreground calls [`SpscRing::get`].
    pub fn put(&self, item: T) -> Result<(), Error> {
        let put = self.put_index.load(Ordering::Relaxed);
        let get = self.get_index.load(Ordering::Acquire);
        let next = (put + 1) % N;
        if next == get {
            return Err(Error::Full);
        }
        unsafe {
            *self.slots[put].get() = MaybeUninit::new(item);
        }
        // Publish the slot only after it is written.
        self.put_index.store(next, Ordering::Release);
        Ok(())
    }

    /// Consumer side: take the oldest item from the ring.
    ///
    /// Returns `Error::Empty` when there is nothing to take. Safe to call
    /// from the foreground while interrupt context calls
    /// [`SpscRing::put`].
    pub fn get(&self) -> Result<T, Error> {
        let get = self.get_index.load(Ordering::Relaxed);
        let put = self.put_index.load(Ordering::Acquire);
        if get == put {
            return Err(Error::Empty);
        }
        let item = unsafe { (*self.slots[get].get()).assume_init_read() };
        // Release the slot only after it is read.
        self.get_index.store((get + 1) % N, Ordering::Release);
        Ok(item)
    }

    /// Number of items currently in the ring.
    pub fn len(&self) -> usize {
        let put = self.put_index.load(Ordering::Relaxed);
        let get = self.get_index.load(Ordering::Relaxed);
        (put + N - get) % N
    }

    /// True if the ring holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if the ring is at capacity.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Discard all items and reset both indices.
    ///
    /// The caller must ensure neither side is using the ring
    /// concurrently. Items still in the ring are dropped without their
    /// destructors running; the ring is intended for `Copy`-like handles.
    pub fn reset(&self) {
        self.get_index.store(0, Ordering::Relaxed);
        self.put_index.store(0, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get() {
        let ring: SpscRing<u32, 8> = SpscRing::new();
        assert!(ring.is_empty());
        ring.put(42).unwrap();
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.get(), Ok(42));
        assert!(ring.is_empty());
        assert_eq!(ring.get(), Err(Error::Empty));
    }

    #[test]
    fn full_ring_rejects_put() {
        let ring: SpscRing<u32, 4> = SpscRing::new();
        assert_eq!(ring.capacity(), 3);
        ring.put(1).unwrap();
        ring.put(2).unwrap();
        ring.put(3).unwrap();
        assert!(ring.is_full());
        assert_eq!(ring.put(4), Err(Error::Full));
        // Draining one slot frees one slot.
        assert_eq!(ring.get(), Ok(1));
        ring.put(4).unwrap();
    }

    #[test]
    fn fifo_order() {
        let ring: SpscRing<u32, 8> = SpscRing::new();
        for i in 0..5 {
            ring.put(i).unwrap();
        }
        for i in 0..5 {
            assert_eq!(ring.get(), Ok(i));
        }
    }

    #[test]
    fn wraparound_reuses_slots() {
        let ring: SpscRing<u32, 4> = SpscRing::new();
        for round in 0..4 {
            for i in 0..3 {
                ring.put(round * 10 + i).unwrap();
            }
            for i in 0..3 {
                assert_eq!(ring.get(), Ok(round * 10 + i));
            }
        }
    }

    #[test]
    fn reset_discards_items() {
        let ring: SpscRing<u32, 8> = SpscRing::new();
        ring.put(1).unwrap();
        ring.put(2).unwrap();
        ring.reset();
        assert!(ring.is_empty());
        assert_eq!(ring.get(), Err(Error::Empty));
        ring.put(3).unwrap();
        assert_eq!(ring.get(), Ok(3));
    }
}
