use std::num::NonZeroUsize;

use parking_lot::Mutex;

use crate::error::{MonitorError, Result};

// ─── Public types ────────────────────────────────────────────────

/// Fixed-capacity, overwrite-oldest sample store.
///
/// Writers and readers share one short critical section: `add` assigns the
/// slot and writes it under the lock, `snapshot` copies the whole backing
/// array under the same lock, so a reader never observes a half-written slot.
#[derive(Debug)]
pub struct RingBuffer<T> {
    inner: Mutex<Slots<T>>,
}

// ─── Internal state ──────────────────────────────────────────────

#[derive(Debug)]
struct Slots<T> {
    /// Backing storage; `None` until the slot is first written.
    buf: Box<[Option<T>]>,
    /// Total writes so far. Position of the next write is `index % len`.
    index: u64,
}

impl<T> Slots<T> {
    #[inline]
    fn position(&self) -> usize {
        (self.index % self.buf.len() as u64) as usize
    }
}

// ─── RingBuffer impl ─────────────────────────────────────────────

impl<T> RingBuffer<T> {
    /// Builds a buffer holding the last `capacity` samples.
    ///
    /// Fails with `InvalidConfiguration` for a zero capacity.
    pub fn new(capacity: usize) -> Result<Self> {
        NonZeroUsize::new(capacity)
            .map(Self::with_capacity)
            .ok_or_else(|| {
                MonitorError::InvalidConfiguration(
                    "ring buffer capacity must be greater than zero".into(),
                )
            })
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        let buf = std::iter::repeat_with(|| None)
            .take(capacity.get())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            inner: Mutex::new(Slots { buf, index: 0 }),
        }
    }

    /// Writes `sample` at `index mod N`, evicting whatever was there.
    pub fn add(&self, sample: T) {
        let mut slots = self.inner.lock();
        let pos = slots.position();
        slots.buf[pos] = Some(sample);
        slots.index = slots.index.wrapping_add(1);
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().buf.len()
    }

    /// Number of populated slots, `min(total_written, capacity)`.
    pub fn len(&self) -> usize {
        let slots = self.inner.lock();
        slots.index.min(slots.buf.len() as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().index == 0
    }

    /// Total samples ever added, including evicted ones.
    pub fn total_written(&self) -> u64 {
        self.inner.lock().index
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Independent copy of every slot in storage order.
    ///
    /// Always `capacity` long; slots not yet written are `None`.
    pub fn snapshot(&self) -> Vec<Option<T>> {
        self.inner.lock().buf.to_vec()
    }

    /// Populated samples, oldest first.
    pub fn ordered(&self) -> Vec<T> {
        let slots = self.inner.lock();
        let (newest, oldest) = if slots.index < slots.buf.len() as u64 {
            (&slots.buf[..slots.position()], &[][..])
        } else {
            let pos = slots.position();
            (&slots.buf[..pos], &slots.buf[pos..])
        };

        oldest
            .iter()
            .chain(newest.iter())
            .filter_map(|slot| slot.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        let err = RingBuffer::<u64>::new(0).unwrap_err();
        assert!(matches!(err, MonitorError::InvalidConfiguration(_)));
    }

    #[test]
    fn underfilled_buffer_leaves_empty_slots() {
        let buffer = RingBuffer::new(5).unwrap();
        buffer.add(1u64);
        buffer.add(2);

        assert_eq!(buffer.snapshot(), vec![Some(1), Some(2), None, None, None]);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.ordered(), vec![1, 2]);
    }

    #[test]
    fn overflow_evicts_oldest() {
        let buffer = RingBuffer::new(3).unwrap();
        for v in 1u64..=5 {
            buffer.add(v);
        }

        // slots hold 4, 5, 3 in storage order; chronologically 3, 4, 5
        assert_eq!(buffer.snapshot(), vec![Some(4), Some(5), Some(3)]);
        assert_eq!(buffer.ordered(), vec![3, 4, 5]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.total_written(), 5);
    }

    #[test]
    fn snapshot_is_independent_of_later_writes() {
        let buffer = RingBuffer::new(2).unwrap();
        buffer.add(10u64);
        let snap = buffer.snapshot();
        buffer.add(20);

        assert_eq!(snap, vec![Some(10), None]);
        assert_eq!(buffer.snapshot(), vec![Some(10), Some(20)]);
    }

    #[test]
    fn concurrent_adds_are_never_lost() {
        let buffer = RingBuffer::new(10_000).unwrap();

        std::thread::scope(|s| {
            for t in 0..8u64 {
                let buffer = &buffer;
                s.spawn(move || {
                    for i in 0..1_000u64 {
                        buffer.add(t * 1_000 + i);
                    }
                });
            }
        });

        assert_eq!(buffer.total_written(), 8_000);
        let mut seen = buffer.ordered();
        seen.sort_unstable();
        assert_eq!(seen, (0..8_000).collect::<Vec<_>>());
    }
}
