//! Checkpoint reader: when is state safe to persist
//!
//! Records within a slice are not assumed ordered by cursor value, so the
//! slice boundary is the unit of consistency. The reader walks the slice
//! sequence and answers, at each boundary, whether the cumulative state
//! should be emitted as a durable checkpoint.

/// When state checkpoints are emitted.
///
/// Decisions are taken at slice boundaries; there is no mid-slice
/// checkpoint because a partially read slice has no consistent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointPolicy {
    /// After every completed slice (streams with an incremental cursor)
    EverySlice,
    /// At the first slice boundary after every N records
    EveryNRecords(usize),
    /// Only once the whole stream finishes (plain full refresh)
    StreamEnd,
}

/// Where the reader is in the slice sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// No slice started yet
    NotStarted,
    /// Reading the slice at this index
    ProcessingSlice(usize),
    /// The slice at this index finished
    SliceComplete(usize),
    /// All slices finished
    Done,
}

/// Tracks slice progress and applies the checkpoint policy.
///
/// Every `true` returned from [`observe_record`], [`slice_complete`] or
/// [`finish`] means: emit the cursor's current state snapshot now.
///
/// [`observe_record`]: CheckpointReader::observe_record
/// [`slice_complete`]: CheckpointReader::slice_complete
/// [`finish`]: CheckpointReader::finish
#[derive(Debug)]
pub struct CheckpointReader {
    policy: CheckpointPolicy,
    state: ReaderState,
    records_since_checkpoint: usize,
    checkpoints: usize,
}

impl CheckpointReader {
    /// Create a reader for one stream read
    pub fn new(policy: CheckpointPolicy) -> Self {
        Self {
            policy,
            state: ReaderState::NotStarted,
            records_since_checkpoint: 0,
            checkpoints: 0,
        }
    }

    /// Current position in the slice sequence
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Number of checkpoints requested so far
    pub fn checkpoints_emitted(&self) -> usize {
        self.checkpoints
    }

    /// Enter the slice at `index`
    pub fn start_slice(&mut self, index: usize) {
        self.state = ReaderState::ProcessingSlice(index);
    }

    /// Note one record read within the current slice
    pub fn observe_record(&mut self) {
        self.records_since_checkpoint += 1;
    }

    /// Mark the current slice complete; true when a checkpoint is due
    pub fn slice_complete(&mut self) -> bool {
        if let ReaderState::ProcessingSlice(index) = self.state {
            self.state = ReaderState::SliceComplete(index);
        }

        let due = match self.policy {
            CheckpointPolicy::EverySlice => true,
            CheckpointPolicy::EveryNRecords(n) => self.records_since_checkpoint >= n.max(1),
            CheckpointPolicy::StreamEnd => false,
        };
        if due {
            self.records_since_checkpoint = 0;
            self.checkpoints += 1;
        }
        due
    }

    /// Mark the stream finished; true when a final checkpoint is due.
    ///
    /// A read that emitted no checkpoint at all (zero slices, or a
    /// full-refresh policy) still gets exactly one here, so a zero-record
    /// run is distinguishable from a stream that never ran.
    pub fn finish(&mut self) -> bool {
        self.state = ReaderState::Done;

        let due = match self.policy {
            CheckpointPolicy::StreamEnd => true,
            CheckpointPolicy::EverySlice => self.checkpoints == 0,
            // Flush any tail of records below the threshold
            CheckpointPolicy::EveryNRecords(_) => {
                self.checkpoints == 0 || self.records_since_checkpoint > 0
            }
        };
        if due {
            self.records_since_checkpoint = 0;
            self.checkpoints += 1;
        }
        due
    }
}
