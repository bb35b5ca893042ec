//! Multi-buffered instance storage.
//!
//! Each pipeline owns one GPU buffer split into `frames_in_flight` slots. The
//! CPU records into one slot while the GPU may still be reading the others.
//! A counting semaphore gates reuse: acquiring a slot takes a permit, and the
//! backend's completion callback for that frame gives it back.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glint_core::profiling::profile_function;
use glint_test_utils::{
    BackendError, BufferDesc, BufferKind, CompletionCallback, GpuBuffer, RenderBackend,
};
use parking_lot::{Condvar, Mutex};

use crate::config::{ConfigError, PipelineKind, RendererConfig};

/// Bounded counting semaphore.
#[derive(Debug)]
pub struct SlotSemaphore {
    permits: Mutex<usize>,
    released: Condvar,
    max: usize,
}

impl SlotSemaphore {
    /// Starts with all `max` permits available.
    pub fn new(max: usize) -> Self {
        Self {
            permits: Mutex::new(max),
            released: Condvar::new(),
            max,
        }
    }

    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits > 0 {
            *permits -= 1;
            true
        } else {
            false
        }
    }

    /// Wait up to `timeout` for a permit.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut permits = self.permits.lock();
        while *permits == 0 {
            if self.released.wait_until(&mut permits, deadline).timed_out() {
                break;
            }
        }
        if *permits > 0 {
            *permits -= 1;
            true
        } else {
            false
        }
    }

    pub fn release(&self) {
        let mut permits = self.permits.lock();
        debug_assert!(*permits < self.max, "slot released more often than acquired");
        *permits = (*permits + 1).min(self.max);
        self.released.notify_all();
    }

    /// Wait up to `timeout` for every permit to be back. Takes none.
    pub fn wait_all_released(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut permits = self.permits.lock();
        while *permits < self.max {
            if self.released.wait_until(&mut permits, deadline).timed_out() {
                break;
            }
        }
        *permits == self.max
    }

    pub fn available(&self) -> usize {
        *self.permits.lock()
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

/// Hands a slot back from the backend's completion callback.
#[derive(Debug, Clone)]
pub struct SlotReleaser {
    semaphore: Arc<SlotSemaphore>,
}

impl SlotReleaser {
    pub fn release(self) {
        self.semaphore.release();
    }

    pub fn into_callback(self) -> CompletionCallback {
        Box::new(move || self.release())
    }
}

/// Lifecycle of one ring slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    /// Owned by the CPU, being filled.
    Recording,
    /// Handed to the backend, completion not yet registered.
    Submitted,
    /// The GPU may be reading it.
    InFlight,
}

/// The slot acquired for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    pub index: usize,
    /// Frames acquired so far, including this one.
    pub frame: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RingError {
    Config(ConfigError),
    Backend(BackendError),
    /// `acquire` while a slot is still being recorded.
    SlotHeld { index: usize },
    /// Submit bookkeeping without a recorded slot.
    NoSlot,
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingError::Config(e) => write!(f, "invalid ring configuration: {}", e),
            RingError::Backend(e) => write!(f, "failed to create ring buffers: {}", e),
            RingError::SlotHeld { index } => {
                write!(f, "slot {} is still being recorded", index)
            }
            RingError::NoSlot => write!(f, "no slot is being recorded"),
        }
    }
}

impl std::error::Error for RingError {}

pub type RingResult<T> = Result<T, RingError>;

impl From<ConfigError> for RingError {
    fn from(e: ConfigError) -> Self {
        RingError::Config(e)
    }
}

impl From<BackendError> for RingError {
    fn from(e: BackendError) -> Self {
        RingError::Backend(e)
    }
}

/// `frames_in_flight` rotating regions of each pipeline buffer.
pub struct SlotRing {
    semaphore: Arc<SlotSemaphore>,
    buffers: [GpuBuffer; PipelineKind::COUNT],
    slot_bytes: [u64; PipelineKind::COUNT],
    strides: [u64; PipelineKind::COUNT],
    slots: usize,
    next_slot: usize,
    current: Option<(usize, SlotState)>,
    /// Submitted slots, oldest first; the newest `in_flight()` are still on the GPU.
    history: VecDeque<usize>,
    frames: u64,
    wait_interval: Duration,
}

impl SlotRing {
    pub fn new(backend: &dyn RenderBackend, config: &RendererConfig) -> RingResult<Self> {
        config.validate()?;
        let slots = config.frames_in_flight;

        let slot_bytes = PipelineKind::ALL.map(|kind| {
            align_up(config.limits(kind).frame_bytes(), config.offset_alignment)
        });
        let strides = PipelineKind::ALL.map(|kind| config.limits(kind).stride);

        let create = |kind: PipelineKind| -> Result<GpuBuffer, BackendError> {
            let label = format!("{} ring buffer", kind);
            let buffer = backend.create_buffer(&BufferDesc {
                label: &label,
                size: slot_bytes[kind.index()] * slots as u64,
                kind: BufferKind::Vertex,
            })?;
            tracing::info!(
                "Created {} ring: {} slots x {} bytes",
                kind,
                slots,
                slot_bytes[kind.index()]
            );
            Ok(buffer)
        };
        let buffers = [
            create(PipelineKind::Atlas)?,
            create(PipelineKind::Primitive)?,
            create(PipelineKind::Text)?,
        ];

        Ok(Self {
            semaphore: Arc::new(SlotSemaphore::new(slots)),
            buffers,
            slot_bytes,
            strides,
            slots,
            next_slot: 0,
            current: None,
            history: VecDeque::with_capacity(slots + 1),
            frames: 0,
            wait_interval: config.slot_wait_interval,
        })
    }

    /// Block until a slot is free, then hand it to the CPU.
    ///
    /// Waits on the semaphore in bounded intervals, polling the backend in
    /// between so completion callbacks get a chance to run.
    pub fn acquire(&mut self, backend: &dyn RenderBackend) -> RingResult<FrameSlot> {
        profile_function!();
        if let Some((index, _)) = self.current {
            return Err(RingError::SlotHeld { index });
        }

        if !self.semaphore.try_acquire() {
            let started = Instant::now();
            loop {
                backend.poll();
                if self.semaphore.acquire_timeout(self.wait_interval) {
                    break;
                }
            }
            tracing::trace!("Waited {:?} for a free ring slot", started.elapsed());
        }

        Ok(self.take_slot())
    }

    /// Non-blocking [`acquire`](Self::acquire).
    pub fn try_acquire(&mut self) -> Option<FrameSlot> {
        if self.current.is_some() || !self.semaphore.try_acquire() {
            return None;
        }
        Some(self.take_slot())
    }

    fn take_slot(&mut self) -> FrameSlot {
        let index = self.next_slot;
        self.next_slot = (index + 1) % self.slots;
        self.current = Some((index, SlotState::Recording));
        self.frames += 1;
        FrameSlot {
            index,
            frame: self.frames,
        }
    }

    /// Mark the recorded slot as handed to the backend and return the
    /// releaser for its completion callback.
    pub fn begin_submit(&mut self) -> RingResult<SlotReleaser> {
        match &mut self.current {
            Some((_, state)) => {
                *state = SlotState::Submitted;
                Ok(SlotReleaser {
                    semaphore: Arc::clone(&self.semaphore),
                })
            }
            None => Err(RingError::NoSlot),
        }
    }

    /// The backend accepted the submission; the slot is now in flight.
    pub fn finish_submit(&mut self) -> RingResult<()> {
        let (index, _) = self.current.take().ok_or(RingError::NoSlot)?;
        self.history.push_back(index);
        while self.history.len() > self.slots {
            self.history.pop_front();
        }
        Ok(())
    }

    /// The recorded slot never reached the GPU: give it back right away and
    /// reuse it for the next frame.
    pub fn abandon(&mut self) {
        if let Some((index, _)) = self.current.take() {
            self.next_slot = index;
            self.semaphore.release();
        }
    }

    /// Block until every submitted slot has completed.
    pub fn drain(&mut self, backend: &dyn RenderBackend) {
        self.drain_until(backend, None);
    }

    /// [`drain`](Self::drain), giving up after `timeout`. Returns whether the
    /// ring is fully drained.
    pub fn drain_timeout(&mut self, backend: &dyn RenderBackend, timeout: Duration) -> bool {
        self.drain_until(backend, Some(Instant::now() + timeout))
    }

    fn drain_until(&mut self, backend: &dyn RenderBackend, deadline: Option<Instant>) -> bool {
        profile_function!();
        self.abandon();
        loop {
            backend.poll();
            if self.semaphore.wait_all_released(self.wait_interval) {
                break;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return false;
            }
        }
        self.history.clear();
        tracing::debug!("Ring drained, {} slots free", self.slots);
        true
    }

    /// Slots the GPU may still be reading.
    pub fn in_flight(&self) -> usize {
        let held = usize::from(self.current.is_some());
        self.slots
            .saturating_sub(self.semaphore.available())
            .saturating_sub(held)
    }

    pub fn slot_state(&self, index: usize) -> SlotState {
        if let Some((current, state)) = self.current
            && current == index
        {
            return state;
        }
        let in_flight = self.in_flight();
        if self.history.iter().rev().take(in_flight).any(|&i| i == index) {
            SlotState::InFlight
        } else {
            SlotState::Free
        }
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn buffer(&self, kind: PipelineKind) -> &GpuBuffer {
        &self.buffers[kind.index()]
    }

    /// Byte offset of `slot`'s region inside `kind`'s buffer.
    #[inline]
    pub fn slot_offset(&self, kind: PipelineKind, slot: usize) -> u64 {
        slot as u64 * self.slot_bytes[kind.index()]
    }

    /// Byte offset of record `start` in `slot`'s region.
    #[inline]
    pub fn record_offset(&self, kind: PipelineKind, slot: usize, start: u32) -> u64 {
        self.slot_offset(kind, slot) + start as u64 * self.strides[kind.index()]
    }
}

#[inline]
fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_semaphore_counts_permits() {
        let sem = SlotSemaphore::new(2);
        assert!(sem.try_acquire());
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());
        assert!(!sem.acquire_timeout(Duration::from_millis(5)));
        sem.release();
        assert_eq!(sem.available(), 1);
        assert!(sem.acquire_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn test_semaphore_wakes_on_release_from_other_thread() {
        let sem = Arc::new(SlotSemaphore::new(1));
        assert!(sem.try_acquire());

        let other = Arc::clone(&sem);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            other.release();
        });

        assert!(sem.acquire_timeout(Duration::from_secs(5)));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_all_released() {
        let sem = SlotSemaphore::new(2);
        assert!(sem.wait_all_released(Duration::ZERO));
        assert!(sem.try_acquire());
        assert!(!sem.wait_all_released(Duration::from_millis(5)));
        sem.release();
        assert!(sem.wait_all_released(Duration::ZERO));
        assert_eq!(sem.available(), 2);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(512, 256), 512);
    }
}
