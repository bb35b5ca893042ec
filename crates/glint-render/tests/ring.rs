//! Slot rotation and CPU/GPU synchronization of the instance ring.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glint_render::{PipelineKind, RendererConfig, RingError, SlotReleaser, SlotRing, SlotState};
use glint_test_utils::{BackendCall, FrameEncoder, FrameParams, MockBackend, RenderBackend};

fn ring(mock: &MockBackend) -> SlotRing {
    SlotRing::new(mock, &RendererConfig::default()).unwrap()
}

/// Acquire a slot and hand it to the "GPU"; the returned releaser plays the
/// completion callback.
fn submit(ring: &mut SlotRing, mock: &MockBackend) -> (usize, SlotReleaser) {
    let slot = ring.acquire(mock).unwrap();
    let releaser = ring.begin_submit().unwrap();
    ring.finish_submit().unwrap();
    (slot.index, releaser)
}

#[test]
fn test_one_buffer_per_pipeline_sized_for_all_slots() {
    let mock = MockBackend::new();
    let ring = ring(&mock);

    let sizes: Vec<u64> = mock
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            BackendCall::CreateBuffer { size, .. } => Some(size),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![3 * 50_000 * 128, 3 * 50_000 * 128, 3 * 24_576 * 32]);

    assert_eq!(ring.slot_offset(PipelineKind::Primitive, 2), 2 * 50_000 * 128);
    assert_eq!(ring.record_offset(PipelineKind::Text, 1, 8), 24_576 * 32 + 8 * 32);
}

#[test]
fn test_slot_bytes_round_up_to_alignment() {
    let mock = MockBackend::new();
    let config = RendererConfig::default().with_capacity(PipelineKind::Text, 9);
    let ring = SlotRing::new(&mock, &config).unwrap();
    // 9 * 32 = 288 bytes -> 512
    assert_eq!(ring.slot_offset(PipelineKind::Text, 1), 512);
    for slot in 0..3 {
        for kind in PipelineKind::ALL {
            assert_eq!(ring.slot_offset(kind, slot) % 256, 0);
        }
    }
}

#[test]
fn test_slots_rotate_and_wrap() {
    let mock = MockBackend::new();
    let mut ring = ring(&mock);
    let mut releasers = Vec::new();

    for expected in 0..3 {
        let (index, releaser) = submit(&mut ring, &mock);
        assert_eq!(index, expected);
        releasers.push(releaser);
    }
    assert_eq!(ring.in_flight(), 3);
    assert!(ring.try_acquire().is_none());

    releasers.remove(0).release();
    let slot = ring.try_acquire().unwrap();
    assert_eq!(slot.index, 0);
    assert_eq!(slot.frame, 4);
    assert_eq!(ring.slot_offset(PipelineKind::Atlas, slot.index), 0);
}

#[test]
fn test_slot_states_follow_submission() {
    let mock = MockBackend::new();
    let mut ring = ring(&mock);

    assert_eq!(ring.slot_state(0), SlotState::Free);
    ring.acquire(&mock).unwrap();
    assert_eq!(ring.slot_state(0), SlotState::Recording);

    let releaser = ring.begin_submit().unwrap();
    assert_eq!(ring.slot_state(0), SlotState::Submitted);
    ring.finish_submit().unwrap();
    assert_eq!(ring.slot_state(0), SlotState::InFlight);
    assert_eq!(ring.slot_state(1), SlotState::Free);

    releaser.release();
    assert_eq!(ring.slot_state(0), SlotState::Free);
    assert_eq!(ring.in_flight(), 0);
}

#[test]
fn test_acquire_while_recording_is_an_error() {
    let mock = MockBackend::new();
    let mut ring = ring(&mock);
    ring.acquire(&mock).unwrap();
    assert_eq!(ring.acquire(&mock), Err(RingError::SlotHeld { index: 0 }));
    assert!(ring.try_acquire().is_none());
}

#[test]
fn test_submit_without_slot_is_an_error() {
    let mock = MockBackend::new();
    let mut ring = ring(&mock);
    assert!(matches!(ring.begin_submit(), Err(RingError::NoSlot)));
    assert_eq!(ring.finish_submit(), Err(RingError::NoSlot));
}

#[test]
fn test_abandoned_slot_is_reused() {
    let mock = MockBackend::new();
    let mut ring = ring(&mock);

    let first = ring.acquire(&mock).unwrap();
    ring.abandon();
    assert_eq!(ring.in_flight(), 0);

    let second = ring.acquire(&mock).unwrap();
    assert_eq!(second.index, first.index);
    assert_eq!(second.frame, first.frame + 1);
}

#[test]
fn test_acquire_blocks_until_completion_from_another_thread() {
    let mock = Arc::new(MockBackend::new());
    let mut ring = ring(&mock);
    let mut releasers: Vec<_> = (0..3).map(|_| submit(&mut ring, &mock).1).collect();

    // The GPU finishes frames in submission order.
    let releaser = releasers.remove(0);
    let started = Instant::now();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        releaser.release();
    });

    let slot = ring.acquire(mock.as_ref()).unwrap();
    handle.join().unwrap();

    assert!(started.elapsed() >= Duration::from_millis(25));
    assert_eq!(slot.index, 0);
    assert!(mock.poll_count() > 0, "acquire polls the backend while waiting");
}

#[test]
fn test_acquire_polls_backend_to_run_completions() {
    let mock = MockBackend::auto_completing();
    let config = RendererConfig::default().with_frames_in_flight(2);
    let mut ring = SlotRing::new(&mock, &config).unwrap();

    // Route the releasers through the mock so only `poll` can fire them.
    for _ in 0..2 {
        let encoder_slot = ring.acquire(&mock).unwrap();
        let releaser = ring.begin_submit().unwrap();
        let mut encoder = mock.begin_frame(&frame_params()).unwrap();
        encoder.end();
        encoder.submit(releaser.into_callback()).unwrap();
        ring.finish_submit().unwrap();
        assert!(encoder_slot.index < 2);
    }
    assert_eq!(mock.pending_completions(), 2);

    let slot = ring.acquire(&mock).unwrap();
    assert_eq!(slot.index, 0);
    assert_eq!(mock.pending_completions(), 0);
}

#[test]
fn test_drain_waits_for_every_slot() {
    let mock = MockBackend::new();
    let mut ring = ring(&mock);
    let releasers: Vec<_> = (0..2).map(|_| submit(&mut ring, &mock).1).collect();

    assert!(!ring.drain_timeout(&mock, Duration::from_millis(10)));
    assert_eq!(ring.in_flight(), 2);

    for releaser in releasers {
        releaser.release();
    }
    assert!(ring.drain_timeout(&mock, Duration::from_secs(5)));
    ring.drain(&mock);
    assert_eq!(ring.in_flight(), 0);
}

fn frame_params() -> FrameParams {
    FrameParams {
        projection: [[0.0; 4]; 4],
        distance_range: 0.0,
        font_atlas_size: [1.0, 1.0],
        clear_color: [0.0; 4],
    }
}
