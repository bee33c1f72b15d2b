//! Render loop and the thread-safe handle that drives it
//!
//! One dedicated thread owns every surface context. Each iteration it
//! composites the latest frame once, then fans the result out to the
//! display, the encoder (paced) and, on request, a still photo.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use image::RgbaImage;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::capture::FrameSource;
use crate::display::target::draw_and_present;
use crate::display::{
    AspectRatioMode, DrawParams, RenderTarget, Rotation, SoftwareSurface, SurfaceContext, TargetKind,
};
use crate::error::{CompositorError, CompositorResult};
use crate::pipeline::composite::CompositePass;
use crate::pipeline::filter::{FilterChain, FilterEdit, FilterHandle};
use crate::pipeline::fps_limiter::FpsLimiter;
use crate::pipeline::photo::{PhotoCallback, PhotoGate};
use crate::pipeline::queue::FilterQueue;
use crate::pipeline::settings::RenderSettings;
use crate::pipeline::stats::{LoopStats, LoopStatsSnapshot};
use crate::{Config, PipelineConfig};

/// Lifecycle of the render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    Stopped = 0,
    Initializing = 1,
    Running = 2,
    Draining = 3,
}

impl LoopState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LoopState::Initializing,
            2 => LoopState::Running,
            3 => LoopState::Draining,
            _ => LoopState::Stopped,
        }
    }
}

/// Guarded by the monitor.
struct Signal {
    frame_available: bool,
    running: bool,
}

/// Encoder and photo share one lock: a photo readback must never interleave
/// with an encoder draw of the same composite.
struct Outputs {
    encoder: RenderTarget,
    photo: RenderTarget,
    gate: PhotoGate,
}

struct Shared {
    signal: Mutex<Signal>,
    wakeup: Condvar,
    display: Mutex<RenderTarget>,
    outputs: Mutex<Outputs>,
    edits: FilterQueue,
    settings: ArcSwap<RenderSettings>,
    filter_count: AtomicUsize,
    state: AtomicU8,
    stats: LoopStats,
}

impl Shared {
    fn notify_frame_available(&self) {
        self.signal.lock().frame_available = true;
        self.wakeup.notify_all();
    }

    fn is_running(&self) -> bool {
        self.signal.lock().running
    }

    /// Read and clear the frame flag; `force` draws regardless.
    fn take_frame_signal(&self, force: bool) -> bool {
        let mut signal = self.signal.lock();
        let draw = signal.frame_available || force;
        signal.frame_available = false;
        draw
    }

    fn set_state(&self, state: LoopState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Photo, encoder, display. Each release is isolated and idempotent.
    fn release_targets(&self) {
        let abandoned = {
            let mut outputs = self.outputs.lock();
            outputs.photo.release();
            outputs.encoder.release();
            outputs.gate.cancel()
        };
        self.display.lock().release();

        if abandoned.is_some() {
            debug!("pending photo request dropped at shutdown");
        }
    }
}

#[derive(Default)]
struct Lifecycle {
    thread: Option<JoinHandle<FilterChain>>,
    /// Chain handed back by the last session, reused by the next `start`.
    parked: Option<FilterChain>,
}

/// Handle to the compositor. Every method takes `&self` and may be called
/// from any thread.
///
/// Callbacks passed to [`Compositor::take_photo`] run on the render thread
/// and must not call [`Compositor::stop`].
pub struct Compositor {
    shared: Arc<Shared>,
    source: Arc<FrameSource>,
    pipeline: PipelineConfig,
    max_filters: usize,
    lifecycle: Mutex<Lifecycle>,
}

impl Compositor {
    /// Compositor whose photo path reads back through a software surface.
    pub fn new(config: &Config) -> Self {
        Self::with_photo_surface(config, Box::new(SoftwareSurface::new("photo")))
    }

    pub fn with_photo_surface(config: &Config, photo_surface: Box<dyn SurfaceContext>) -> Self {
        let max_failures = config.pipeline.max_target_failures;
        let mut photo = RenderTarget::new(TargetKind::Photo, max_failures);
        photo.attach(photo_surface);

        let shared = Arc::new(Shared {
            signal: Mutex::new(Signal {
                frame_available: false,
                running: false,
            }),
            wakeup: Condvar::new(),
            display: Mutex::new(RenderTarget::new(TargetKind::Display, max_failures)),
            outputs: Mutex::new(Outputs {
                encoder: RenderTarget::new(TargetKind::Encoder, max_failures),
                photo,
                gate: PhotoGate::default(),
            }),
            edits: FilterQueue::new(config.pipeline.filter_queue_depth, config.pipeline.queue_overflow),
            settings: ArcSwap::from_pointee(RenderSettings::from_config(config)),
            filter_count: AtomicUsize::new(0),
            state: AtomicU8::new(LoopState::Stopped as u8),
            stats: LoopStats::default(),
        });

        Self {
            shared,
            source: Arc::new(FrameSource::new()),
            pipeline: config.pipeline.clone(),
            max_filters: config.view.max_filters,
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Where producers publish frames.
    pub fn frame_source(&self) -> Arc<FrameSource> {
        Arc::clone(&self.source)
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Spawn the render thread and wait until it has created its contexts.
    pub fn start(&self) -> CompositorResult<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.thread.as_ref().is_some_and(|handle| handle.is_finished()) {
            warn!("render thread exited on its own, reclaiming it");
            self.join_render_thread(&mut lifecycle);
        }
        if lifecycle.thread.is_some() {
            return Err(CompositorError::AlreadyRunning);
        }
        if !self.shared.display.lock().has_surface() {
            return Err(CompositorError::NoDisplaySurface);
        }

        let chain = lifecycle
            .parked
            .take()
            .unwrap_or_else(|| FilterChain::new(self.max_filters));
        let settings = self.shared.settings.load_full();
        let render_loop = RenderLoop {
            shared: Arc::clone(&self.shared),
            source: Arc::clone(&self.source),
            composite: CompositePass::new(chain, settings.encoder_width, settings.encoder_height),
            limiter: FpsLimiter::new(settings.fps, Instant::now()),
            idle_wait: Duration::from_millis(self.pipeline.idle_wait_ms.max(1)),
            core: self.pipeline.render_thread_core,
            display_size: (settings.preview_width, settings.preview_height),
            encoder_size: (settings.encoder_width, settings.encoder_height),
        };

        {
            let mut signal = self.shared.signal.lock();
            signal.running = true;
            signal.frame_available = false;
        }

        let (ready_tx, ready_rx) = flume::bounded(1);
        let handle = thread::Builder::new()
            .name("vidcomp-render".to_string())
            .spawn(move || render_loop.run(ready_tx))
            .map_err(|e| {
                self.shared.signal.lock().running = false;
                CompositorError::ThreadSpawn(e)
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                lifecycle.thread = Some(handle);
                info!("render loop started");
                Ok(())
            }
            Ok(Err(e)) => {
                lifecycle.parked = handle.join().ok();
                Err(e)
            }
            Err(_) => {
                lifecycle.parked = handle.join().ok();
                Err(CompositorError::RenderThreadDead)
            }
        }
    }

    /// Ask the render thread to finish its iteration, tear down, and exit.
    /// Returns once it has been joined. No-op when not running.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.thread.is_none() {
            return;
        }

        self.shared.signal.lock().running = false;
        self.shared.wakeup.notify_all();

        self.join_render_thread(&mut lifecycle);
        info!("render loop stopped");
    }

    fn join_render_thread(&self, lifecycle: &mut Lifecycle) {
        let Some(handle) = lifecycle.thread.take() else {
            return;
        };
        match handle.join() {
            Ok(chain) => lifecycle.parked = Some(chain),
            Err(_) => {
                error!("render thread panicked, filter chain reset");
                self.shared.filter_count.store(0, Ordering::Release);
            }
        }
        self.shared.release_targets();
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// The window system produced a display surface: (re)start on it.
    pub fn on_surface_created(&self, surface: Box<dyn SurfaceContext>) -> CompositorResult<()> {
        self.stop();
        self.shared.display.lock().attach(surface);
        self.start()
    }

    pub fn on_surface_changed(&self, width: u32, height: u32) {
        info!("preview size: {width}x{height}");
        self.update_settings(|s| {
            s.preview_width = width;
            s.preview_height = height;
        });
    }

    pub fn on_surface_destroyed(&self) {
        self.stop();
        self.shared.display.lock().detach();
    }

    // ---------------------------------------------------------------------
    // Encoder path
    // ---------------------------------------------------------------------

    /// Route composited frames into an encoder input surface. The context
    /// is created on the render thread before its first draw.
    pub fn attach_encoder_surface(&self, surface: Box<dyn SurfaceContext>) {
        self.shared.outputs.lock().encoder.attach(surface);
        info!("encoder surface attached");
    }

    pub fn detach_encoder_surface(&self) -> Option<Box<dyn SurfaceContext>> {
        let surface = self.shared.outputs.lock().encoder.detach();
        if surface.is_some() {
            info!("encoder surface detached");
        }
        surface
    }

    pub fn set_encoder_size(&self, width: u32, height: u32) {
        self.update_settings(|s| {
            s.encoder_width = width;
            s.encoder_height = height;
        });
    }

    /// Encoder frame rate; 0 disables pacing.
    pub fn set_fps(&self, fps: u32) {
        self.update_settings(|s| s.fps = fps);
    }

    // ---------------------------------------------------------------------
    // Filters
    // ---------------------------------------------------------------------

    pub fn set_filter(&self, filter: FilterHandle) -> CompositorResult<()> {
        self.shared.edits.enqueue(FilterEdit::Set(filter))
    }

    pub fn set_filter_at(&self, index: usize, filter: FilterHandle) -> CompositorResult<()> {
        self.shared.edits.enqueue(FilterEdit::SetAt(index, filter))
    }

    pub fn add_filter(&self, filter: FilterHandle) -> CompositorResult<()> {
        self.shared.edits.enqueue(FilterEdit::Add(filter))
    }

    pub fn add_filter_at(&self, index: usize, filter: FilterHandle) -> CompositorResult<()> {
        self.shared.edits.enqueue(FilterEdit::AddAt(index, filter))
    }

    pub fn remove_filter(&self, filter: FilterHandle) -> CompositorResult<()> {
        self.shared.edits.enqueue(FilterEdit::Remove(filter))
    }

    pub fn remove_filter_at(&self, index: usize) -> CompositorResult<()> {
        self.shared.edits.enqueue(FilterEdit::RemoveAt(index))
    }

    pub fn clear_filters(&self) -> CompositorResult<()> {
        self.shared.edits.enqueue(FilterEdit::Clear)
    }

    /// Filters currently in the chain (not counting queued edits).
    pub fn filter_count(&self) -> usize {
        self.shared.filter_count.load(Ordering::Acquire)
    }

    pub fn pending_filter_edits(&self) -> usize {
        self.shared.edits.len()
    }

    // ---------------------------------------------------------------------
    // Capture
    // ---------------------------------------------------------------------

    /// Capture the next composited frame at encoder resolution.
    ///
    /// Only one request is kept: asking again before the callback fired
    /// replaces the earlier request, whose callback is then never called.
    pub fn take_photo(&self, callback: impl FnOnce(RgbaImage) + Send + 'static) {
        let superseded = self.shared.outputs.lock().gate.request(Box::new(callback));
        if superseded.is_some() {
            LoopStats::bump(&self.shared.stats.photos_superseded);
        }
        drop(superseded);
    }

    // ---------------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------------

    pub fn settings(&self) -> Arc<RenderSettings> {
        self.shared.settings.load_full()
    }

    pub fn set_aspect_ratio_mode(&self, mode: AspectRatioMode) {
        self.update_settings(|s| s.aspect_ratio_mode = mode);
    }

    pub fn enable_aa(&self, enabled: bool) {
        self.update_settings(|s| s.antialias = enabled);
    }

    pub fn is_aa_enabled(&self) -> bool {
        self.shared.settings.load().antialias
    }

    /// Rotation of the camera image inside the composite.
    pub fn set_rotation(&self, degrees: i32) {
        let rotation = Rotation::from_degrees(degrees);
        if rotation.degrees() != degrees.rem_euclid(360) {
            warn!(degrees, "rotation snapped to {}", rotation.degrees());
        }
        self.update_settings(|s| s.camera_rotation = rotation);
    }

    pub fn set_camera_flip(&self, horizontal: bool, vertical: bool) {
        self.update_settings(|s| {
            s.camera_flip_horizontal = horizontal;
            s.camera_flip_vertical = vertical;
        });
    }

    /// Rotation of the encoder and photo output.
    pub fn set_stream_rotation(&self, degrees: i32) {
        let rotation = Rotation::from_degrees(degrees);
        self.update_settings(|s| s.stream_rotation = rotation);
    }

    pub fn set_stream_flip(&self, horizontal: bool, vertical: bool) {
        self.update_settings(|s| {
            s.stream_flip_horizontal = horizontal;
            s.stream_flip_vertical = vertical;
        });
    }

    pub fn set_preview_flip(&self, horizontal: bool, vertical: bool) {
        self.update_settings(|s| {
            s.preview_flip_horizontal = horizontal;
            s.preview_flip_vertical = vertical;
        });
    }

    /// Keep feeding the encoder with blank frames instead of video.
    pub fn mute_video(&self) {
        self.update_settings(|s| s.mute_video = true);
    }

    pub fn unmute_video(&self) {
        self.update_settings(|s| s.mute_video = false);
    }

    pub fn is_video_muted(&self) -> bool {
        self.shared.settings.load().mute_video
    }

    /// Draw every iteration even without a new frame.
    pub fn set_force_render(&self, force: bool) {
        self.update_settings(|s| s.force_render = force);
        if force {
            // Raised under the monitor so a loop about to wait sees it.
            self.shared.notify_frame_available();
        }
    }

    // ---------------------------------------------------------------------
    // Observability
    // ---------------------------------------------------------------------

    pub fn stats(&self) -> LoopStatsSnapshot {
        let queue = self.shared.edits.stats();
        LoopStatsSnapshot {
            edits_enqueued: queue.enqueued as u64,
            edits_dropped: queue.dropped as u64,
            edits_rejected: queue.rejected as u64,
            ..self.shared.stats.snapshot()
        }
    }

    pub fn target_released(&self, kind: TargetKind) -> bool {
        match kind {
            TargetKind::Display => self.shared.display.lock().is_released(),
            TargetKind::Encoder => self.shared.outputs.lock().encoder.is_released(),
            TargetKind::Photo => self.shared.outputs.lock().photo.is_released(),
        }
    }

    fn update_settings(&self, update: impl Fn(&mut RenderSettings)) {
        self.shared.settings.rcu(|current| {
            let mut next = RenderSettings::clone(current);
            update(&mut next);
            next
        });
    }
}

impl Drop for Compositor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State owned by the render thread.
struct RenderLoop {
    shared: Arc<Shared>,
    source: Arc<FrameSource>,
    composite: CompositePass,
    limiter: FpsLimiter,
    idle_wait: Duration,
    core: Option<usize>,
    display_size: (u32, u32),
    encoder_size: (u32, u32),
}

/// Releases every target when the render thread leaves, even by panic.
struct Teardown {
    shared: Arc<Shared>,
    source: Arc<FrameSource>,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.shared.set_state(LoopState::Draining);
        self.source.set_listener(None);
        self.shared.signal.lock().running = false;
        self.shared.release_targets();
        self.shared.set_state(LoopState::Stopped);
        debug!("render targets released");
    }
}

impl RenderLoop {
    fn run(mut self, ready: flume::Sender<CompositorResult<()>>) -> FilterChain {
        let _teardown = Teardown {
            shared: Arc::clone(&self.shared),
            source: Arc::clone(&self.source),
        };
        self.pin_to_core();
        self.shared.set_state(LoopState::Initializing);

        match self.initialize() {
            Ok(()) => {
                self.shared.set_state(LoopState::Running);
                let _ = ready.send(Ok(()));
                self.render();
            }
            Err(e) => {
                error!("render loop failed to initialize: {e}");
                let _ = ready.send(Err(e));
            }
        }
        self.composite.into_chain()
    }

    #[instrument(skip(self), name = "render_init")]
    fn initialize(&mut self) -> CompositorResult<()> {
        let settings = self.shared.settings.load_full();
        let (preview_w, preview_h) = self.display_size;
        let (encoder_w, encoder_h) = self.encoder_size;

        self.shared
            .display
            .lock()
            .setup(preview_w, preview_h)
            .map_err(|e| CompositorError::InitFailed(format!("display context: {e}")))?;

        self.composite.resize(encoder_w, encoder_h);

        let shared = Arc::downgrade(&self.shared);
        self.source.set_listener(Some(Box::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.notify_frame_available();
            }
        })));

        {
            let mut outputs = self.shared.outputs.lock();
            let Outputs { encoder, photo, .. } = &mut *outputs;
            if encoder.has_surface() {
                let result = encoder.setup(encoder_w, encoder_h);
                encoder.record_outcome(result);
            }
            let result = photo.setup(encoder_w, encoder_h);
            photo.record_outcome(result);
        }

        info!(
            preview = ?self.display_size,
            encoder = ?self.encoder_size,
            fps = settings.fps,
            "render loop initialized"
        );
        Ok(())
    }

    fn render(&mut self) {
        loop {
            let settings = self.shared.settings.load_full();
            let now = Instant::now();
            self.apply_settings(&settings, now);
            self.limiter.mark_iteration_start(now);
            LoopStats::bump(&self.shared.stats.iterations);

            if self.shared.take_frame_signal(settings.force_render) {
                self.draw_display(&settings);
                self.apply_pending_edit();
                self.draw_outputs(&settings);
            }

            if !self.wait_for_next_frame() {
                break;
            }
        }
    }

    fn apply_settings(&mut self, settings: &RenderSettings, now: Instant) {
        if settings.fps != self.limiter.fps() {
            debug!(fps = settings.fps, "encoder frame rate changed");
            self.limiter.set_fps(settings.fps, now);
        }

        let preview = (settings.preview_width, settings.preview_height);
        if preview != self.display_size {
            let mut display = self.shared.display.lock();
            let result = display.resize(preview.0, preview.1);
            display.record_outcome(result);
            self.display_size = preview;
        }

        let encoder = (settings.encoder_width, settings.encoder_height);
        if encoder != self.encoder_size {
            self.composite.resize(encoder.0, encoder.1);
            let mut outputs = self.shared.outputs.lock();
            let result = outputs.encoder.resize(encoder.0, encoder.1);
            outputs.encoder.record_outcome(result);
            let result = outputs.photo.resize(encoder.0, encoder.1);
            outputs.photo.record_outcome(result);
            self.encoder_size = encoder;
        }
    }

    /// Composite once, then draw the preview.
    fn draw_display(&mut self, settings: &RenderSettings) {
        let started = Instant::now();
        let frame = self.source.acquire_latest();
        if let Err(e) = self.composite.update_frame(frame.as_deref()) {
            warn!("skipping unreadable frame: {e}");
        }
        self.composite.draw_off_screen(&settings.source_params());
        LoopStats::bump(&self.shared.stats.composites);
        metrics::histogram!("vidcomp_composite_time_us").record(started.elapsed().as_micros() as f64);

        let mut display = self.shared.display.lock();
        if !display.ready() {
            trace!("display not ready, preview skipped");
            return;
        }
        let result = draw_and_present(&mut display, self.composite.output(), &settings.preview_params());
        if display.record_outcome(result).is_some() {
            LoopStats::bump(&self.shared.stats.display_draws);
            metrics::counter!("vidcomp_display_draws").increment(1);
        }
    }

    fn apply_pending_edit(&mut self) {
        let Some(edit) = self.shared.edits.dequeue_one() else {
            return;
        };
        let action = edit.action();
        match self.composite.apply_edit(edit) {
            Ok(()) => {
                LoopStats::bump(&self.shared.stats.edits_applied);
                debug!(?action, filters = self.composite.filter_count(), "filter edit applied");
            }
            Err(e) => {
                LoopStats::bump(&self.shared.stats.edits_failed);
                warn!(?action, "filter edit discarded: {e}");
            }
        }
        metrics::counter!("vidcomp_filter_edits").increment(1);
        self.shared
            .filter_count
            .store(self.composite.filter_count(), Ordering::Release);
    }

    /// Encoder and photo draws under the shared outputs lock.
    fn draw_outputs(&mut self, settings: &RenderSettings) {
        let composite = self.composite.output();
        let mut delivery: Option<(PhotoCallback, RgbaImage)> = None;
        let mut abandoned = None;

        {
            let mut outputs = self.shared.outputs.lock();
            let Outputs { encoder, photo, gate } = &mut *outputs;

            if encoder.needs_setup() {
                let result = encoder.setup(settings.encoder_width, settings.encoder_height);
                encoder.record_outcome(result);
            }
            if encoder.ready() {
                if self.limiter.should_skip(Instant::now()) {
                    LoopStats::bump(&self.shared.stats.encoder_skipped);
                    metrics::counter!("vidcomp_encoder_skipped").increment(1);
                } else {
                    let result = draw_and_present(encoder, composite, &settings.encoder_params());
                    if encoder.record_outcome(result).is_some() {
                        LoopStats::bump(&self.shared.stats.encoder_draws);
                        metrics::counter!("vidcomp_encoder_draws").increment(1);
                    }
                }
            }

            if gate.is_pending() {
                if photo.needs_setup() {
                    let result = photo.setup(settings.encoder_width, settings.encoder_height);
                    photo.record_outcome(result);
                }
                if photo.ready() {
                    let result = capture_still(photo, composite, &settings.photo_params());
                    if let Some(image) = photo.record_outcome(result) {
                        delivery = gate.take().map(|callback| (callback, image));
                        // Transient context, recreated for the next request.
                        photo.release();
                    }
                }
                if photo.is_disabled() {
                    abandoned = gate.cancel();
                }
            }
        }

        if let Some(callback) = abandoned {
            warn!("photo target disabled, pending capture dropped");
            drop(callback);
        }

        if let Some((callback, image)) = delivery {
            LoopStats::bump(&self.shared.stats.photos_captured);
            metrics::counter!("vidcomp_photos_captured").increment(1);
            debug!(width = image.width(), height = image.height(), "photo captured");
            callback(image);
        }
    }

    /// Sleep out the rest of the pacing interval, or until a frame or a stop
    /// request arrives. Returns whether the loop should keep going.
    fn wait_for_next_frame(&mut self) -> bool {
        let remaining = self.limiter.remaining_sleep(Instant::now());
        let timeout = if !remaining.is_zero() {
            remaining
        } else if self.limiter.is_limited() {
            Duration::ZERO
        } else {
            self.idle_wait
        };

        let mut signal = self.shared.signal.lock();
        if signal.running && !signal.frame_available && !timeout.is_zero() {
            self.shared.wakeup.wait_for(&mut signal, timeout);
        }
        signal.running
    }

    fn pin_to_core(&self) {
        let Some(core) = self.core else {
            return;
        };
        let core_id = core_affinity::get_core_ids().and_then(|ids| ids.into_iter().find(|id| id.id == core));
        match core_id {
            Some(core_id) if core_affinity::set_for_current(core_id) => {
                debug!(core, "render thread pinned")
            }
            _ => warn!(core, "could not pin render thread"),
        }
    }
}

/// Draw at full resolution and read the pixels back before presenting.
fn capture_still(
    photo: &mut RenderTarget,
    composite: &RgbaImage,
    params: &DrawParams,
) -> CompositorResult<RgbaImage> {
    photo.make_current()?;
    photo.draw(composite, params)?;
    let image = photo.read_pixels()?;
    photo.present()?;
    Ok(image)
}
