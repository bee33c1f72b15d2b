//! Aspect-ratio mapping and draw transforms shared by every render target

use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// How a source frame is mapped onto a target of a different shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectRatioMode {
    /// Scale both axes independently to cover the target exactly.
    Stretch,
    /// Letterbox: keep proportions, fit entirely inside the target.
    #[default]
    Fit,
    /// Keep proportions and cover the target, cropping the overflow.
    Crop,
}

/// Quarter-turn rotation applied when drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalises into `[0, 360)` and snaps down to a quarter turn.
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) / 90 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl From<i32> for Rotation {
    fn from(degrees: i32) -> Self {
        Rotation::from_degrees(degrees)
    }
}

impl From<Rotation> for i32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Destination rectangle in target pixels. Offsets go negative when cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const EMPTY: Viewport = Viewport {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Map a `source` sized image onto a `target` sized surface.
    pub fn map(source: (u32, u32), target: (u32, u32), mode: AspectRatioMode) -> Self {
        let (sw, sh) = source;
        let (tw, th) = target;
        if sw == 0 || sh == 0 || tw == 0 || th == 0 {
            return Viewport::EMPTY;
        }

        let scale_x = tw as f64 / sw as f64;
        let scale_y = th as f64 / sh as f64;
        let scale = match mode {
            AspectRatioMode::Stretch => {
                return Viewport {
                    x: 0,
                    y: 0,
                    width: tw,
                    height: th,
                }
            }
            AspectRatioMode::Fit => scale_x.min(scale_y),
            AspectRatioMode::Crop => scale_x.max(scale_y),
        };

        let width = ((sw as f64 * scale).round() as u32).max(1);
        let height = ((sh as f64 * scale).round() as u32).max(1);
        Viewport {
            x: (tw as i64 - width as i64) / 2,
            y: (th as i64 - height as i64) / 2,
            width,
            height,
        }
    }
}

/// The part of a mapped source that lands on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRegion {
    /// Source rectangle, in oriented source pixels.
    pub src_x: u32,
    pub src_y: u32,
    pub src_width: u32,
    pub src_height: u32,
    /// Destination rectangle, entirely inside the target.
    pub dest: Viewport,
}

impl VisibleRegion {
    /// Whether the whole source is visible.
    pub fn covers(&self, source: (u32, u32)) -> bool {
        self.src_x == 0 && self.src_y == 0 && (self.src_width, self.src_height) == source
    }
}

impl Viewport {
    /// Clip this viewport to a `target` surface and find which part of a
    /// `source` sized image remains visible. `None` when nothing is.
    pub fn clip(&self, source: (u32, u32), target: (u32, u32)) -> Option<VisibleRegion> {
        if self.is_empty() || source.0 == 0 || source.1 == 0 {
            return None;
        }
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = (self.x + self.width as i64).min(target.0 as i64);
        let y1 = (self.y + self.height as i64).min(target.1 as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let scale_x = source.0 as f64 / self.width as f64;
        let scale_y = source.1 as f64 / self.height as f64;
        let src_x = ((x0 - self.x) as f64 * scale_x).floor() as u32;
        let src_y = ((y0 - self.y) as f64 * scale_y).floor() as u32;
        let src_right = (((x1 - self.x) as f64 * scale_x).ceil() as u32).min(source.0);
        let src_bottom = (((y1 - self.y) as f64 * scale_y).ceil() as u32).min(source.1);

        Some(VisibleRegion {
            src_x,
            src_y,
            src_width: src_right.saturating_sub(src_x).max(1),
            src_height: src_bottom.saturating_sub(src_y).max(1),
            dest: Viewport {
                x: x0,
                y: y0,
                width: (x1 - x0) as u32,
                height: (y1 - y0) as u32,
            },
        })
    }
}

/// Per-draw request handed to a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawParams {
    pub width: u32,
    pub height: u32,
    pub aspect_mode: AspectRatioMode,
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub antialias: bool,
}

/// Fully resolved transform a surface backend executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawTransform {
    pub target_width: u32,
    pub target_height: u32,
    pub viewport: Viewport,
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub antialias: bool,
}

impl DrawTransform {
    pub fn resolve(source: (u32, u32), params: &DrawParams) -> Self {
        let oriented = if params.rotation.swaps_axes() {
            (source.1, source.0)
        } else {
            source
        };

        Self {
            target_width: params.width,
            target_height: params.height,
            viewport: Viewport::map(oriented, (params.width, params.height), params.aspect_mode),
            rotation: params.rotation,
            flip_horizontal: params.flip_horizontal,
            flip_vertical: params.flip_vertical,
            antialias: params.antialias,
        }
    }

    pub fn filter_type(&self) -> FilterType {
        if self.antialias {
            FilterType::Triangle
        } else {
            FilterType::Nearest
        }
    }
}

/// Rotate, then mirror. Borrows the input when nothing changes.
pub fn orient(image: &RgbaImage, rotation: Rotation, flip_h: bool, flip_v: bool) -> Cow<'_, RgbaImage> {
    let mut oriented = match rotation {
        Rotation::Deg0 if !flip_h && !flip_v => return Cow::Borrowed(image),
        Rotation::Deg0 => image.clone(),
        Rotation::Deg90 => imageops::rotate90(image),
        Rotation::Deg180 => imageops::rotate180(image),
        Rotation::Deg270 => imageops::rotate270(image),
    };
    if flip_h {
        imageops::flip_horizontal_in_place(&mut oriented);
    }
    if flip_v {
        imageops::flip_vertical_in_place(&mut oriented);
    }
    Cow::Owned(oriented)
}

/// Scale `image` to `width` x `height`, borrowing when already that size.
pub fn scale(image: &RgbaImage, width: u32, height: u32, filter: FilterType) -> Cow<'_, RgbaImage> {
    if image.dimensions() == (width, height) {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(imageops::resize(image, width, height, filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_letterboxes_landscape_into_portrait() {
        let vp = Viewport::map((1920, 1080), (1080, 1920), AspectRatioMode::Fit);
        assert_eq!(vp, Viewport { x: 0, y: 656, width: 1080, height: 608 });
    }

    #[test]
    fn crop_overflows_with_negative_offset() {
        let vp = Viewport::map((1920, 1080), (1080, 1920), AspectRatioMode::Crop);
        assert_eq!(vp.height, 1920);
        assert_eq!(vp.width, 3413);
        assert_eq!(vp.x, (1080 - 3413) / 2);
        assert_eq!(vp.y, 0);
    }

    #[test]
    fn crop_clip_keeps_only_the_visible_source() {
        let vp = Viewport::map((1920, 1080), (1080, 1920), AspectRatioMode::Crop);
        let visible = vp.clip((1920, 1080), (1080, 1920)).unwrap();

        assert_eq!(visible.dest, Viewport { x: 0, y: 0, width: 1080, height: 1920 });
        assert_eq!((visible.src_y, visible.src_height), (0, 1080));
        assert!(visible.src_width < 700);
        assert!(visible.src_x > 600);
        assert!(!visible.covers((1920, 1080)));
    }

    #[test]
    fn fit_clip_covers_the_whole_source() {
        let vp = Viewport::map((1920, 1080), (1080, 1920), AspectRatioMode::Fit);
        let visible = vp.clip((1920, 1080), (1080, 1920)).unwrap();
        assert_eq!(visible.dest, vp);
        assert!(visible.covers((1920, 1080)));
        assert!(Viewport::EMPTY.clip((4, 4), (4, 4)).is_none());
    }

    #[test]
    fn stretch_covers_target() {
        let vp = Viewport::map((640, 480), (100, 50), AspectRatioMode::Stretch);
        assert_eq!(vp, Viewport { x: 0, y: 0, width: 100, height: 50 });
    }

    #[test]
    fn zero_sized_target_yields_empty_viewport() {
        assert!(Viewport::map((640, 480), (0, 480), AspectRatioMode::Fit).is_empty());
        assert!(Viewport::map((0, 0), (640, 480), AspectRatioMode::Crop).is_empty());
    }

    #[test]
    fn rotation_snaps_to_quarter_turns() {
        assert_eq!(Rotation::from_degrees(0), Rotation::Deg0);
        assert_eq!(Rotation::from_degrees(90), Rotation::Deg90);
        assert_eq!(Rotation::from_degrees(-90), Rotation::Deg270);
        assert_eq!(Rotation::from_degrees(450), Rotation::Deg90);
        assert_eq!(Rotation::from_degrees(179), Rotation::Deg90);
    }

    #[test]
    fn quarter_turn_swaps_source_axes() {
        let params = DrawParams {
            width: 1080,
            height: 1920,
            aspect_mode: AspectRatioMode::Fit,
            rotation: Rotation::Deg90,
            flip_horizontal: false,
            flip_vertical: false,
            antialias: false,
        };
        let transform = DrawTransform::resolve((1920, 1080), &params);
        assert_eq!(transform.viewport, Viewport { x: 0, y: 0, width: 1080, height: 1920 });
    }

    #[test]
    fn orient_rotates_then_mirrors() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgba([1, 0, 0, 255]));
        image.put_pixel(1, 0, image::Rgba([2, 0, 0, 255]));

        assert!(matches!(orient(&image, Rotation::Deg0, false, false), Cow::Borrowed(_)));

        let rotated = orient(&image, Rotation::Deg90, false, false);
        assert_eq!(rotated.dimensions(), (1, 2));
        assert_eq!(rotated.get_pixel(0, 0).0[0], 1);

        let mirrored = orient(&image, Rotation::Deg90, false, true);
        assert_eq!(mirrored.get_pixel(0, 0).0[0], 2);
    }
}
