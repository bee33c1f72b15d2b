use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use vidcomp::capture::frame::FrameMetadata;
use vidcomp::display::{DrawTransform, Viewport};
use vidcomp::{
    Compositor, CompositorError, CompositorResult, Config, Filter, Frame, LoopState, PixelFormat,
    SurfaceContext, TargetKind,
};

#[derive(Default)]
struct Recorder {
    setups: AtomicUsize,
    draws: AtomicUsize,
    presents: AtomicUsize,
    releases: AtomicUsize,
    fail_draws: AtomicBool,
    last_viewport: Mutex<Option<Viewport>>,
}

impl Recorder {
    fn draws(&self) -> usize {
        self.draws.load(Ordering::SeqCst)
    }

    fn presents(&self) -> usize {
        self.presents.load(Ordering::SeqCst)
    }
}

struct RecordingSurface {
    recorder: Arc<Recorder>,
    configured: bool,
}

fn recording_surface(recorder: &Arc<Recorder>) -> Box<dyn SurfaceContext> {
    Box::new(RecordingSurface {
        recorder: Arc::clone(recorder),
        configured: false,
    })
}

impl SurfaceContext for RecordingSurface {
    fn setup(&mut self, _width: u32, _height: u32) -> CompositorResult<()> {
        self.recorder.setups.fetch_add(1, Ordering::SeqCst);
        self.configured = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.configured
    }

    fn make_current(&mut self) -> CompositorResult<()> {
        Ok(())
    }

    fn draw(&mut self, _composite: &RgbaImage, transform: &DrawTransform) -> CompositorResult<()> {
        self.recorder.draws.fetch_add(1, Ordering::SeqCst);
        *self.recorder.last_viewport.lock() = Some(transform.viewport);
        if self.recorder.fail_draws.load(Ordering::SeqCst) {
            return Err(CompositorError::context("surface lost"));
        }
        Ok(())
    }

    fn read_pixels(&mut self) -> CompositorResult<RgbaImage> {
        Ok(RgbaImage::new(1, 1))
    }

    fn present(&mut self) -> CompositorResult<()> {
        self.recorder.presents.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&mut self) {
        self.configured = false;
        self.recorder.releases.fetch_add(1, Ordering::SeqCst);
    }
}

struct Paint([u8; 4]);

impl Filter for Paint {
    fn apply(&self, texture: &mut RgbaImage) {
        for pixel in texture.pixels_mut() {
            pixel.0 = self.0;
        }
    }
}

fn test_config(fps: u32) -> Config {
    let mut config = Config::default();
    config.view.width = 64;
    config.view.height = 36;
    config.encoder.width = 32;
    config.encoder.height = 18;
    config.encoder.fps = fps;
    config.pipeline.idle_wait_ms = 20;
    config
}

fn frame() -> Frame {
    Frame::from_rgba(RgbaImage::from_pixel(16, 9, Rgba([90, 120, 200, 255])))
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

const PATIENCE: Duration = Duration::from_secs(2);

#[test]
fn display_draws_once_per_published_frame() {
    let compositor = Compositor::new(&test_config(0));
    let display = Arc::new(Recorder::default());
    compositor.on_surface_created(recording_surface(&display)).unwrap();
    assert_eq!(compositor.state(), LoopState::Running);

    let source = compositor.frame_source();
    for expected in 1..=4 {
        source.publish(frame());
        assert!(wait_until(PATIENCE, || display.draws() >= expected));
    }
    compositor.stop();

    assert_eq!(display.draws(), 4);
    assert_eq!(display.presents(), 4);
    assert_eq!(compositor.stats().display_draws, 4);
}

#[test]
fn encoder_never_outpaces_display() {
    let compositor = Compositor::new(&test_config(30));
    let display = Arc::new(Recorder::default());
    let encoder = Arc::new(Recorder::default());
    compositor.attach_encoder_surface(recording_surface(&encoder));
    compositor.on_surface_created(recording_surface(&display)).unwrap();

    let source = compositor.frame_source();
    let started = Instant::now();
    while started.elapsed() < Duration::from_millis(400) {
        source.publish(frame());
        thread::sleep(Duration::from_millis(3));
    }
    let elapsed = started.elapsed();
    compositor.stop();

    let stats = compositor.stats();
    assert!(encoder.draws() >= 1);
    assert!(encoder.draws() <= display.draws());
    assert!(stats.encoder_skipped > 0);
    assert!(encoder.draws() as f64 <= elapsed.as_secs_f64() * 30.0 + 2.0);
    assert_eq!(stats.encoder_draws as usize, encoder.draws());
}

#[test]
fn filter_edits_apply_in_submission_order() {
    let compositor = Compositor::new(&test_config(0));
    let display = Arc::new(Recorder::default());
    compositor.on_surface_created(recording_surface(&display)).unwrap();

    compositor.clear_filters().unwrap();
    compositor.add_filter(Arc::new(Paint([255, 0, 0, 255]))).unwrap();
    compositor.set_filter_at(0, Arc::new(Paint([0, 255, 0, 255]))).unwrap();

    // One edit per drawn frame
    let source = compositor.frame_source();
    assert!(wait_until(PATIENCE, || {
        source.publish(frame());
        compositor.stats().edits_applied == 3
    }));
    assert_eq!(compositor.filter_count(), 1);
    assert_eq!(compositor.stats().edits_failed, 0);

    // The iteration that applied the last edit composited before it
    let drawn = display.draws();
    source.publish(frame());
    assert!(wait_until(PATIENCE, || display.draws() > drawn));

    let (tx, rx) = flume::bounded(1);
    compositor.take_photo(move |image| {
        let _ = tx.send(image);
    });
    source.publish(frame());
    let photo = rx.recv_timeout(PATIENCE).unwrap();

    assert_eq!(photo.dimensions(), (32, 18));
    assert_eq!(photo.get_pixel(16, 9).0, [0, 255, 0, 255]);
}

#[test]
fn superseded_photo_request_is_never_called() {
    let compositor = Compositor::new(&test_config(0));
    let display = Arc::new(Recorder::default());
    compositor.on_surface_created(recording_surface(&display)).unwrap();

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    {
        let first = Arc::clone(&first);
        compositor.take_photo(move |_| {
            first.fetch_add(1, Ordering::SeqCst);
        });
        let second = Arc::clone(&second);
        compositor.take_photo(move |_| {
            second.fetch_add(1, Ordering::SeqCst);
        });
    }

    let source = compositor.frame_source();
    source.publish(frame());
    assert!(wait_until(PATIENCE, || second.load(Ordering::SeqCst) == 1));

    for _ in 0..3 {
        source.publish(frame());
        thread::sleep(Duration::from_millis(10));
    }
    compositor.stop();

    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
    let stats = compositor.stats();
    assert_eq!(stats.photos_superseded, 1);
    assert_eq!(stats.photos_captured, 1);
}

#[test]
fn stop_wakes_a_pacing_wait_and_releases_everything() {
    let mut config = test_config(1);
    config.pipeline.idle_wait_ms = 10_000;
    let compositor = Compositor::new(&config);
    let display = Arc::new(Recorder::default());
    let encoder = Arc::new(Recorder::default());
    compositor.attach_encoder_surface(recording_surface(&encoder));
    compositor.on_surface_created(recording_surface(&display)).unwrap();

    compositor.frame_source().publish(frame());
    assert!(wait_until(PATIENCE, || display.draws() >= 1));

    let started = Instant::now();
    compositor.stop();
    assert!(started.elapsed() < Duration::from_millis(500));

    assert_eq!(compositor.state(), LoopState::Stopped);
    assert!(!compositor.is_running());
    for kind in [TargetKind::Display, TargetKind::Encoder, TargetKind::Photo] {
        assert!(compositor.target_released(kind), "{kind} still live");
    }
    assert_eq!(display.releases.load(Ordering::SeqCst), 1);
    assert_eq!(encoder.releases.load(Ordering::SeqCst), 1);

    // Idempotent
    compositor.stop();
    assert_eq!(display.releases.load(Ordering::SeqCst), 1);
}

#[test]
fn muted_encoder_still_presents_an_empty_frame() {
    let compositor = Compositor::new(&test_config(0));
    let display = Arc::new(Recorder::default());
    let encoder = Arc::new(Recorder::default());
    compositor.attach_encoder_surface(recording_surface(&encoder));
    compositor.mute_video();
    compositor.on_surface_created(recording_surface(&display)).unwrap();

    compositor.frame_source().publish(frame());
    assert!(wait_until(PATIENCE, || encoder.presents() >= 1));
    compositor.stop();

    assert_eq!(*encoder.last_viewport.lock(), Some(Viewport::EMPTY));
    assert!(display.last_viewport.lock().is_some_and(|v| !v.is_empty()));
}

#[test]
fn failing_encoder_is_disabled_while_display_continues() {
    let mut config = test_config(0);
    config.pipeline.max_target_failures = 2;
    let compositor = Compositor::new(&config);
    let display = Arc::new(Recorder::default());
    let encoder = Arc::new(Recorder::default());
    encoder.fail_draws.store(true, Ordering::SeqCst);
    compositor.attach_encoder_surface(recording_surface(&encoder));
    compositor.on_surface_created(recording_surface(&display)).unwrap();

    let source = compositor.frame_source();
    assert!(wait_until(PATIENCE, || {
        source.publish(frame());
        compositor.target_released(TargetKind::Encoder)
    }));
    let attempts = encoder.draws();
    let shown = display.draws();

    for _ in 0..3 {
        source.publish(frame());
        thread::sleep(Duration::from_millis(10));
    }
    assert!(wait_until(PATIENCE, || display.draws() > shown));
    assert_eq!(encoder.draws(), attempts);
    assert_eq!(attempts, 2);
    assert!(compositor.is_running());

    compositor.stop();
}

#[test]
fn start_preconditions() {
    let compositor = Compositor::new(&test_config(0));
    assert!(matches!(compositor.start(), Err(CompositorError::NoDisplaySurface)));

    let display = Arc::new(Recorder::default());
    compositor.on_surface_created(recording_surface(&display)).unwrap();
    assert!(matches!(compositor.start(), Err(CompositorError::AlreadyRunning)));

    compositor.on_surface_destroyed();
    assert!(!compositor.is_running());
    assert!(matches!(compositor.start(), Err(CompositorError::NoDisplaySurface)));
}

#[test]
fn full_queue_rejects_edits() {
    let mut config = test_config(0);
    config.pipeline.filter_queue_depth = 2;
    let compositor = Compositor::new(&config);

    compositor.clear_filters().unwrap();
    compositor.clear_filters().unwrap();
    assert!(matches!(
        compositor.add_filter(Arc::new(Paint([0; 4]))),
        Err(CompositorError::FilterQueueFull(_))
    ));
    assert_eq!(compositor.pending_filter_edits(), 2);

    let stats = compositor.stats();
    assert_eq!(stats.edits_enqueued, 2);
    assert_eq!(stats.edits_rejected, 1);
    assert_eq!(stats.edits_dropped, 0);
}

#[test]
fn malformed_frame_does_not_stop_the_loop() {
    let compositor = Compositor::new(&test_config(0));
    let display = Arc::new(Recorder::default());
    compositor.on_surface_created(recording_surface(&display)).unwrap();

    // Claims 4x4 RGBA but carries 8 bytes
    let truncated = Frame {
        data: Bytes::from(vec![0u8; 8]),
        meta: Arc::new(FrameMetadata {
            sequence: 0,
            width: 4,
            height: 4,
            stride: 16,
            format: PixelFormat::Rgba8,
        }),
        timestamp: Instant::now(),
    };
    let source = compositor.frame_source();
    source.publish(truncated);
    assert!(wait_until(PATIENCE, || display.draws() >= 1));

    source.publish(frame());
    assert!(wait_until(PATIENCE, || display.draws() >= 2));
    assert!(compositor.is_running());
    assert_eq!(compositor.state(), LoopState::Running);
    assert!(matches!(compositor.start(), Err(CompositorError::AlreadyRunning)));

    compositor.stop();
    assert_eq!(display.releases.load(Ordering::SeqCst), 1);
}

#[test]
fn force_render_draws_without_frames() {
    let compositor = Compositor::new(&test_config(0));
    let display = Arc::new(Recorder::default());
    compositor.on_surface_created(recording_surface(&display)).unwrap();

    thread::sleep(Duration::from_millis(60));
    assert_eq!(display.draws(), 0);

    compositor.set_force_render(true);
    assert!(wait_until(PATIENCE, || display.draws() >= 3));

    compositor.set_force_render(false);
    // Let an in-flight iteration finish
    thread::sleep(Duration::from_millis(60));
    let settled = display.draws();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(display.draws(), settled);

    compositor.stop();
}

#[test]
fn filters_survive_a_surface_restart() {
    let compositor = Compositor::new(&test_config(0));
    let first = Arc::new(Recorder::default());
    compositor.on_surface_created(recording_surface(&first)).unwrap();
    compositor.add_filter(Arc::new(Paint([1, 2, 3, 255]))).unwrap();

    let source = compositor.frame_source();
    assert!(wait_until(PATIENCE, || {
        source.publish(frame());
        compositor.filter_count() == 1
    }));

    compositor.on_surface_destroyed();
    let second = Arc::new(Recorder::default());
    compositor.on_surface_created(recording_surface(&second)).unwrap();
    assert_eq!(compositor.filter_count(), 1);

    source.publish(frame());
    assert!(wait_until(PATIENCE, || second.draws() >= 1));
    compositor.stop();
    assert_eq!(first.releases.load(Ordering::SeqCst), 1);
}
