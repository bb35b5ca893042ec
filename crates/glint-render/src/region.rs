//! Bounds-checked CPU staging for one pipeline's records.

use std::fmt;

use bytemuck::Pod;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionError {
    pub index: usize,
    pub len: usize,
    pub capacity: usize,
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "write of {} records at index {} exceeds region capacity {}",
            self.len, self.index, self.capacity
        )
    }
}

impl std::error::Error for RegionError {}

pub type RegionResult<T> = Result<T, RegionError>;

/// Fixed-capacity array of records staged for the current ring slot.
///
/// Writes are checked against the capacity; the high-water mark tracks how
/// many records need uploading at the end of the frame. The storage is
/// allocated once and reused every frame.
#[derive(Debug)]
pub struct InstanceRegion<T: Pod> {
    records: Vec<T>,
    high_water: usize,
}

impl<T: Pod> InstanceRegion<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: vec![T::zeroed(); capacity],
            high_water: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Records `[0, high_water)` are the ones to upload.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    #[inline]
    pub fn write(&mut self, index: usize, record: T) -> RegionResult<()> {
        let capacity = self.records.len();
        let slot = self.records.get_mut(index).ok_or(RegionError {
            index,
            len: 1,
            capacity,
        })?;
        *slot = record;
        self.high_water = self.high_water.max(index + 1);
        Ok(())
    }

    #[inline]
    pub fn write_slice(&mut self, start: usize, records: &[T]) -> RegionResult<()> {
        let end = start.checked_add(records.len());
        let capacity = self.records.len();
        match end {
            Some(end) if end <= capacity => {
                self.records[start..end].copy_from_slice(records);
                self.high_water = self.high_water.max(end);
                Ok(())
            }
            _ => Err(RegionError {
                index: start,
                len: records.len(),
                capacity,
            }),
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.records[..self.high_water].get(index)
    }

    /// Bytes of records `[0, high_water)`.
    pub fn written_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records[..self.high_water])
    }

    /// Start a new frame. Stale records are left in place; they are
    /// overwritten before being read again.
    pub fn reset(&mut self) {
        self.high_water = 0;
    }
}
