//! Frame batch accumulation.
//!
//! Draw calls from the three pipelines arrive interleaved. Consecutive calls
//! of the same kind extend the current [`BatchDescriptor`]; a change of kind
//! starts a new descriptor whose start index is rounded up to the pipeline's
//! alignment step. Replaying the descriptors in order reproduces the exact
//! stacking order of the draw calls.

use std::fmt;

use crate::config::{ConfigResult, PipelineKind, RendererConfig};

/// One contiguous GPU draw: `count` records of `kind` starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchDescriptor {
    pub kind: PipelineKind,
    pub start: u32,
    pub count: u32,
}

impl BatchDescriptor {
    #[inline]
    pub fn end(&self) -> u32 {
        self.start + self.count
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// The pipeline's per-frame capacity would be exceeded.
    CapacityExceeded {
        kind: PipelineKind,
        /// Index one past the last record the append would have written.
        requested: u64,
        capacity: u32,
    },
    /// The frame already holds the maximum number of batch descriptors.
    TooManyBatches { max: usize },
    /// Appending zero records would create an empty descriptor.
    ZeroIncrement,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::CapacityExceeded {
                kind,
                requested,
                capacity,
            } => write!(
                f,
                "{} capacity exceeded: need {} records, capacity is {}",
                kind, requested, capacity
            ),
            BatchError::TooManyBatches { max } => {
                write!(f, "frame exceeded the limit of {} batches", max)
            }
            BatchError::ZeroIncrement => write!(f, "cannot append zero records to a batch"),
        }
    }
}

impl std::error::Error for BatchError {}

pub type BatchResult<T> = Result<T, BatchError>;

/// Builds the ordered batch list for one frame.
#[derive(Debug, Clone)]
pub struct BatchAccumulator {
    steps: [u32; PipelineKind::COUNT],
    capacities: [u32; PipelineKind::COUNT],
    next_free: [u32; PipelineKind::COUNT],
    batches: Vec<BatchDescriptor>,
    max_batches: usize,
    /// Kind and descriptor index of the most recent append.
    last: Option<(PipelineKind, usize)>,
}

impl BatchAccumulator {
    pub fn new(config: &RendererConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            steps: PipelineKind::ALL.map(|kind| config.alignment_step(kind)),
            capacities: PipelineKind::ALL.map(|kind| config.limits(kind).max_count),
            next_free: [0; PipelineKind::COUNT],
            batches: Vec::with_capacity(config.max_batches),
            max_batches: config.max_batches,
            last: None,
        })
    }

    /// Forget everything accumulated; called at the start of every frame.
    pub fn reset(&mut self) {
        self.batches.clear();
        self.next_free = [0; PipelineKind::COUNT];
        self.last = None;
    }

    /// Reserve `increment` records of `kind` and return the index of the
    /// first one.
    ///
    /// A rejected append leaves the accumulator unchanged.
    #[inline]
    pub fn append(&mut self, kind: PipelineKind, increment: u32) -> BatchResult<u32> {
        if increment == 0 {
            return Err(BatchError::ZeroIncrement);
        }
        let k = kind.index();

        if let Some((last_kind, batch)) = self.last
            && last_kind == kind
        {
            let start = self.next_free[k];
            let end = self.check_capacity(kind, start, increment)?;
            self.batches[batch].count += increment;
            self.next_free[k] = end;
            return Ok(start);
        }

        self.append_new_batch(kind, increment)
    }

    fn append_new_batch(&mut self, kind: PipelineKind, increment: u32) -> BatchResult<u32> {
        let k = kind.index();
        let step = self.steps[k];
        let mut start = self.next_free[k];
        let misalignment = start % step;
        if misalignment != 0 {
            start += step - misalignment;
        }

        let end = self.check_capacity(kind, start, increment)?;
        if self.batches.len() >= self.max_batches {
            return Err(BatchError::TooManyBatches {
                max: self.max_batches,
            });
        }

        self.batches.push(BatchDescriptor {
            kind,
            start,
            count: increment,
        });
        self.last = Some((kind, self.batches.len() - 1));
        self.next_free[k] = end;
        Ok(start)
    }

    #[inline]
    fn check_capacity(&self, kind: PipelineKind, start: u32, increment: u32) -> BatchResult<u32> {
        let capacity = self.capacities[kind.index()];
        let end = start as u64 + increment as u64;
        if end > capacity as u64 {
            return Err(BatchError::CapacityExceeded {
                kind,
                requested: end,
                capacity,
            });
        }
        Ok(end as u32)
    }

    /// Descriptors in append order.
    pub fn batches(&self) -> &[BatchDescriptor] {
        &self.batches
    }

    /// One past the highest record index reserved for `kind` this frame.
    pub fn next_free(&self, kind: PipelineKind) -> u32 {
        self.next_free[kind.index()]
    }

    pub fn current_kind(&self) -> Option<PipelineKind> {
        self.last.map(|(kind, _)| kind)
    }

    pub fn capacity(&self, kind: PipelineKind) -> u32 {
        self.capacities[kind.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineKind::*;

    fn accumulator() -> BatchAccumulator {
        BatchAccumulator::new(&RendererConfig::default()).unwrap()
    }

    #[test]
    fn test_same_kind_run_coalesces() {
        let mut acc = accumulator();
        let first = acc.append(Primitive, 1).unwrap();
        for i in 1..10 {
            assert_eq!(acc.append(Primitive, 1).unwrap(), first + i);
        }
        assert_eq!(
            acc.batches(),
            &[BatchDescriptor {
                kind: Primitive,
                start: first,
                count: 10
            }]
        );
    }

    #[test]
    fn test_interleaved_kinds_keep_order() {
        let mut acc = accumulator();
        for kind in [Atlas, Atlas, Primitive, Primitive, Atlas] {
            acc.append(kind, 1).unwrap();
        }
        acc.append(Text, 12).unwrap();

        let kinds: Vec<_> = acc.batches().iter().map(|b| b.kind).collect();
        let counts: Vec<_> = acc.batches().iter().map(|b| b.count).collect();
        assert_eq!(kinds, vec![Atlas, Primitive, Atlas, Text]);
        assert_eq!(counts, vec![2, 2, 1, 12]);
    }

    #[test]
    fn test_switch_rounds_start_up_to_alignment_step() {
        let mut acc = accumulator();
        acc.append(Text, 3).unwrap();
        acc.append(Atlas, 1).unwrap();
        // text step is 8: 3 rounds up to 8
        assert_eq!(acc.append(Text, 6).unwrap(), 8);
        assert_eq!(acc.next_free(Text), 14);
        acc.append(Atlas, 1).unwrap();
        // atlas: 1 rounds up to 2
        assert_eq!(acc.batches().last().unwrap().start, 2);
    }

    #[test]
    fn test_capacity_is_inclusive_and_rejection_keeps_state() {
        let config = RendererConfig::default().with_capacity(Primitive, 4);
        let mut acc = BatchAccumulator::new(&config).unwrap();
        for _ in 0..4 {
            acc.append(Primitive, 1).unwrap();
        }
        let before = acc.clone();
        assert_eq!(
            acc.append(Primitive, 1),
            Err(BatchError::CapacityExceeded {
                kind: Primitive,
                requested: 5,
                capacity: 4
            })
        );
        assert_eq!(acc.batches(), before.batches());
        assert_eq!(acc.next_free(Primitive), 4);
    }

    #[test]
    fn test_alignment_padding_counts_against_capacity() {
        let config = RendererConfig::default().with_capacity(Atlas, 4);
        let mut acc = BatchAccumulator::new(&config).unwrap();
        acc.append(Atlas, 3).unwrap();
        acc.append(Primitive, 1).unwrap();
        // next atlas batch would start at 4, leaving no room
        assert!(matches!(
            acc.append(Atlas, 1),
            Err(BatchError::CapacityExceeded { requested: 5, .. })
        ));
        assert_eq!(acc.current_kind(), Some(Primitive));
    }

    #[test]
    fn test_batch_limit() {
        let config = RendererConfig::default().with_max_batches(2);
        let mut acc = BatchAccumulator::new(&config).unwrap();
        acc.append(Atlas, 1).unwrap();
        acc.append(Primitive, 1).unwrap();
        assert_eq!(acc.append(Atlas, 1), Err(BatchError::TooManyBatches { max: 2 }));
        // extending the current batch is still fine
        assert!(acc.append(Primitive, 1).is_ok());
    }

    #[test]
    fn test_zero_increment_is_rejected() {
        let mut acc = accumulator();
        assert_eq!(acc.append(Text, 0), Err(BatchError::ZeroIncrement));
        assert!(acc.is_empty());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut acc = accumulator();
        acc.append(Atlas, 5).unwrap();
        acc.append(Text, 6).unwrap();
        acc.reset();
        assert!(acc.is_empty());
        assert_eq!(acc.current_kind(), None);
        assert_eq!(acc.next_free(Atlas), 0);
        assert_eq!(acc.append(Text, 6).unwrap(), 0);
    }
}
