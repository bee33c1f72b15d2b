//! vidcomp demo: test pattern in, software display and encoder out

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use image::RgbaImage;
use tracing::{debug, info, warn};

use vidcomp::{Compositor, Config, Filter, SoftwareSurface, TestPattern};

struct Grayscale;

impl Filter for Grayscale {
    fn name(&self) -> &str {
        "grayscale"
    }

    fn apply(&self, texture: &mut RgbaImage) {
        for pixel in texture.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            let luma = (r as u32 * 77 + g as u32 * 150 + b as u32 * 29) >> 8;
            pixel.0 = [luma as u8, luma as u8, luma as u8, a];
        }
    }
}

struct Invert;

impl Filter for Invert {
    fn name(&self) -> &str {
        "invert"
    }

    fn apply(&self, texture: &mut RgbaImage) {
        for pixel in texture.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            pixel.0 = [255 - r, 255 - g, 255 - b, a];
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vidcomp=debug"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_timer(fmt::time::uptime()));

    #[cfg(feature = "profiling")]
    let registry = registry.with(tracing_tracy::TracyLayer::default());

    registry.init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    init_tracing();

    info!("vidcomp launching...");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    let compositor = Arc::new(Compositor::new(&config));

    // Encoder consumer
    let (encoded_tx, encoded_rx) = flume::bounded::<RgbaImage>(4);
    compositor.attach_encoder_surface(Box::new(SoftwareSurface::with_sink("encoder", encoded_tx)));
    let encoder_task = tokio::spawn(async move {
        let mut frames = 0u64;
        while let Ok(image) = encoded_rx.recv_async().await {
            frames += 1;
            if frames % 30 == 0 {
                debug!(frames, width = image.width(), height = image.height(), "encoder input");
            }
        }
        frames
    });

    compositor.on_surface_changed(960, 540);
    compositor.on_surface_created(Box::new(SoftwareSurface::new("display")))?;

    compositor.add_filter(Arc::new(Grayscale))?;
    compositor.add_filter_at(0, Arc::new(Invert))?;

    // Frame producer, ~60fps
    let source = compositor.frame_source();
    let producer = tokio::spawn(async move {
        let mut pattern = TestPattern::new(640, 480);
        let mut ticker = tokio::time::interval(Duration::from_millis(16));
        loop {
            ticker.tick().await;
            source.publish(pattern.next_frame());
        }
    });

    let (photo_tx, photo_rx) = tokio::sync::oneshot::channel();
    compositor.take_photo(move |image| {
        let _ = photo_tx.send(image);
    });
    match tokio::time::timeout(Duration::from_secs(1), photo_rx).await {
        Ok(Ok(photo)) => info!("photo captured: {}x{}", photo.width(), photo.height()),
        _ => warn!("no photo within 1s"),
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
        _ = tokio::time::sleep(Duration::from_secs(5)) => {}
    }

    producer.abort();
    let stopping = Arc::clone(&compositor);
    tokio::task::spawn_blocking(move || stopping.stop()).await?;

    // Dropping the encoder surface closes the sink
    drop(compositor.detach_encoder_surface());
    let consumed = encoder_task.await?;

    let stats = compositor.stats();
    info!(
        iterations = stats.iterations,
        display = stats.display_draws,
        encoder = stats.encoder_draws,
        skipped = stats.encoder_skipped,
        photos = stats.photos_captured,
        consumed,
        "vidcomp shutting down"
    );
    Ok(())
}
