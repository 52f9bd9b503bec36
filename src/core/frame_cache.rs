//! Decoded frame textures, keyed by image reference and blur.
//!
//! Decoding (and blurring) runs on the worker pool; finished images come
//! back over a channel and are uploaded as textures in `poll()` on the UI
//! thread. Textures live in an LRU so long sequences don't pin every image.
//!
//! Only local images are decoded: plain paths and `file://` URLs. The
//! placeholder reference is generated in memory. Anything else fails; a
//! failed key is retried once `FAILED_RETRY_AFTER` has passed, so files
//! fixed on disk show up without a `clear()`.

use anyhow::{Context, Result, bail};
use crossbeam_channel::{Receiver, Sender, unbounded};
use eframe::egui;
use log::{debug, warn};
use lru::LruCache;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::workers::Workers;
use crate::entities::frame::{Frame, PLACEHOLDER_IMAGE};

pub const DEFAULT_CAPACITY: usize = 256;
/// Side of the generated placeholder image, px.
pub const PLACEHOLDER_SIZE: u32 = 256;
const PLACEHOLDER_CELL: u32 = 32;
/// Failures remembered at most; older ones are simply retried.
const MAX_FAILED_ENTRIES: usize = 512;
/// Age after which a failed key may be decoded again.
pub const FAILED_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Cache key: same image with a different blur is a different texture.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameKey {
    pub image_url: String,
    /// Blur radius in hundredths of a pixel (0 = sharp)
    pub blur_centi: u32,
}

impl FrameKey {
    pub fn new(image_url: impl Into<String>, blur: Option<f32>) -> Self {
        let blur_centi = blur.map(|b| (b.max(0.0) * 100.0).round() as u32).unwrap_or(0);
        Self {
            image_url: image_url.into(),
            blur_centi,
        }
    }

    pub fn for_frame(frame: &Frame) -> Self {
        Self::new(frame.image_url.clone(), frame.blur())
    }

    pub fn blur(&self) -> Option<f32> {
        (self.blur_centi > 0).then(|| self.blur_centi as f32 / 100.0)
    }
}

/// Lookup result for the canvas and timeline.
#[derive(Clone)]
pub enum FrameImage {
    Ready(egui::TextureHandle),
    Loading,
    Failed(String),
}

/// Map an image reference to a local path, if it is one.
pub fn resolve_image_path(image_url: &str) -> Option<PathBuf> {
    if let Some(rest) = image_url.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    let lower = image_url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:") {
        return None;
    }
    if image_url.is_empty() || image_url.starts_with("builtin:") {
        return None;
    }
    Some(PathBuf::from(image_url))
}

/// Apply gaussian blur (sigma = blur px) and convert to egui image.
fn finish_image(mut rgba: image::RgbaImage, blur: Option<f32>) -> egui::ColorImage {
    if let Some(sigma) = blur.filter(|b| *b > 0.0) {
        rgba = image::imageops::blur(&rgba, sigma);
    }
    let size = [rgba.width() as usize, rgba.height() as usize];
    egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw())
}

/// Decode image file, apply optional blur, convert to egui image.
pub fn decode_frame_image(path: &Path, blur: Option<f32>) -> Result<egui::ColorImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to decode image: {}", path.display()))?;
    Ok(finish_image(img.to_rgba8(), blur))
}

/// Grey checkerboard shown for frames without a source image.
pub fn placeholder_image(blur: Option<f32>) -> egui::ColorImage {
    let rgba = image::RgbaImage::from_fn(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, |x, y| {
        if (x / PLACEHOLDER_CELL + y / PLACEHOLDER_CELL) % 2 == 0 {
            image::Rgba([96, 96, 104, 255])
        } else {
            image::Rgba([64, 64, 70, 255])
        }
    });
    finish_image(rgba, blur)
}

fn load_key(key: &FrameKey) -> Result<egui::ColorImage> {
    if key.image_url == PLACEHOLDER_IMAGE {
        return Ok(placeholder_image(key.blur()));
    }
    let Some(path) = resolve_image_path(&key.image_url) else {
        bail!("Not a local image: {}", key.image_url);
    };
    decode_frame_image(&path, key.blur())
}

type LoadResult = (FrameKey, Result<egui::ColorImage, String>);

struct Failure {
    message: String,
    at: Instant,
}

/// LRU texture cache with background decoding.
pub struct FrameCache {
    textures: LruCache<FrameKey, egui::TextureHandle>,
    pending: HashSet<FrameKey>,
    failed: LruCache<FrameKey, Failure>,
    retry_after: Duration,
    tx: Sender<LoadResult>,
    rx: Receiver<LoadResult>,
    workers: Arc<Workers>,
}

impl FrameCache {
    pub fn new(capacity: usize, workers: Arc<Workers>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            textures: LruCache::new(Self::cap(capacity)),
            pending: HashSet::new(),
            failed: LruCache::new(Self::cap(MAX_FAILED_ENTRIES)),
            retry_after: FAILED_RETRY_AFTER,
            tx,
            rx,
            workers,
        }
    }

    fn cap(capacity: usize) -> NonZeroUsize {
        NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.textures.resize(Self::cap(capacity));
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    fn failed_recently(&self, key: &FrameKey) -> bool {
        self.failed
            .peek(key)
            .is_some_and(|f| f.at.elapsed() < self.retry_after)
    }

    /// Queue a decode unless the key is cached, in flight or failed recently.
    pub fn request(&mut self, key: FrameKey) {
        if self.textures.contains(&key) || self.pending.contains(&key) || self.failed_recently(&key) {
            return;
        }
        self.pending.insert(key.clone());
        let tx = self.tx.clone();
        self.workers.execute(move || {
            let result = load_key(&key).map_err(|e| format!("{:#}", e));
            let _ = tx.send((key, result));
        });
    }

    /// Upload finished decodes as textures. Returns how many results arrived.
    pub fn poll(&mut self, ctx: &egui::Context) -> usize {
        let mut received = 0;
        while let Ok((key, result)) = self.rx.try_recv() {
            received += 1;
            self.pending.remove(&key);
            match result {
                Ok(image) => {
                    let name = format!("frame:{}#{}", key.image_url, key.blur_centi);
                    let texture = ctx.load_texture(name, image, egui::TextureOptions::LINEAR);
                    debug!("Frame texture ready: {}", key.image_url);
                    self.failed.pop(&key);
                    self.textures.put(key, texture);
                }
                Err(message) => {
                    match self.failed.peek(&key) {
                        Some(prev) if prev.message == message => debug!("Still failing: {}", message),
                        _ => warn!("{}", message),
                    }
                    self.failed.put(
                        key,
                        Failure {
                            message,
                            at: Instant::now(),
                        },
                    );
                }
            }
        }
        received
    }

    /// Texture for `frame`, requesting a decode on miss.
    ///
    /// A failed key keeps reporting `Failed` while its retry is in flight.
    pub fn image_for(&mut self, frame: &Frame) -> FrameImage {
        let key = FrameKey::for_frame(frame);
        if let Some(texture) = self.textures.get(&key) {
            return FrameImage::Ready(texture.clone());
        }
        self.request(key.clone());
        match self.failed.peek(&key) {
            Some(failure) => FrameImage::Failed(failure.message.clone()),
            None => FrameImage::Loading,
        }
    }

    /// Drop all textures and forget failures (e.g. after files changed on disk).
    pub fn clear(&mut self) {
        self.textures.clear();
        self.failed.clear();
    }
}
