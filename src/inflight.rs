//! In-flight command table.
//!
//! Tracks every outstanding GET/ACTN command: its sequence number, its
//! [`Completion`] bundle and the write-once ACK latch. One internal mutex
//! serializes all operations. The table never invokes user code; callers
//! lift the completion out and fire it after releasing the lock.
//!
//! Sequence numbers start at `0xFFFF_FF00` and increment on each
//! allocation; `0` is reserved as the "no sequence" sentinel and skipped
//! on wraparound, as is any value still present in the table. A sequence
//! may be reused once its entry is removed.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::handler::Completion;

/// First sequence number handed out by a fresh table.
pub(crate) const SEQUENCE_START: u32 = 0xFFFF_FF00;

/// One outstanding command.
#[derive(Debug, Clone)]
struct PendingCommand {
    completion: Completion,
    /// Write-once latch, set when the ACK arrives.
    ack_received: bool,
}

/// Outcome of recording an ACK against the table.
#[derive(Debug)]
pub(crate) enum AckOutcome {
    /// No entry for that sequence.
    Unknown,
    /// The latch was already set; the entry has been removed.
    DoubleAck,
    /// Latch set; the entry stays pending for the RSP.
    Acked(Completion),
}

#[derive(Debug)]
struct Inner {
    entries: HashMap<u32, PendingCommand>,
    next_sequence: u32,
}

/// The in-flight table.
#[derive(Debug)]
pub(crate) struct InFlightTable {
    inner: Mutex<Inner>,
}

impl InFlightTable {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                next_sequence: SEQUENCE_START,
            }),
        }
    }

    /// Allocate the next free sequence number.
    ///
    /// Skips `0` and any value currently in flight.
    pub fn allocate_sequence(&self) -> u32 {
        let mut inner = self.lock();
        loop {
            let candidate = inner.next_sequence;
            inner.next_sequence = inner.next_sequence.wrapping_add(1);
            if candidate != 0 && !inner.entries.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Insert a new entry.
    ///
    /// # Panics
    ///
    /// Panics if the sequence is already present; allocation and insertion
    /// are driven by the same send path, so a duplicate is a programming
    /// error.
    pub fn insert(&self, sequence: u32, completion: Completion) {
        let mut inner = self.lock();
        let previous = inner.entries.insert(
            sequence,
            PendingCommand {
                completion,
                ack_received: false,
            },
        );
        assert!(
            previous.is_none(),
            "duplicate in-flight sequence {sequence:#010x}"
        );
    }

    /// Record an ACK for a sequence.
    ///
    /// Sets the write-once latch on first ACK and returns the completion
    /// for the caller to invoke outside the lock. A second ACK removes the
    /// entry and reports [`AckOutcome::DoubleAck`].
    pub fn mark_acked(&self, sequence: u32) -> AckOutcome {
        let mut inner = self.lock();
        match inner.entries.get_mut(&sequence) {
            None => AckOutcome::Unknown,
            Some(entry) if entry.ack_received => {
                inner.entries.remove(&sequence);
                AckOutcome::DoubleAck
            }
            Some(entry) => {
                entry.ack_received = true;
                AckOutcome::Acked(entry.completion.clone())
            }
        }
    }

    /// Remove an entry, returning its completion and ACK latch.
    ///
    /// No-op (returns `None`) for the reserved sequence `0` or an absent
    /// entry.
    pub fn remove(&self, sequence: u32) -> Option<(Completion, bool)> {
        if sequence == 0 {
            return None;
        }
        let mut inner = self.lock();
        inner
            .entries
            .remove(&sequence)
            .map(|entry| (entry.completion, entry.ack_received))
    }

    /// Drop all entries. Used on disconnect.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Number of outstanding commands.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("in-flight table poisoned")
    }

    #[cfg(test)]
    fn set_next_sequence(&self, value: u32) {
        self.lock().next_sequence = value;
    }
}
