use crate::display::{AspectRatioMode, DrawParams, Rotation};
use crate::pipeline::composite::SourceParams;
use crate::Config;

/// Snapshot of every knob the render loop reads once per iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub preview_width: u32,
    pub preview_height: u32,
    pub encoder_width: u32,
    pub encoder_height: u32,
    pub fps: u32,
    pub aspect_ratio_mode: AspectRatioMode,
    pub antialias: bool,
    pub camera_rotation: Rotation,
    pub camera_flip_horizontal: bool,
    pub camera_flip_vertical: bool,
    pub preview_flip_horizontal: bool,
    pub preview_flip_vertical: bool,
    pub stream_rotation: Rotation,
    pub stream_flip_horizontal: bool,
    pub stream_flip_vertical: bool,
    pub mute_video: bool,
    pub force_render: bool,
}

impl RenderSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            preview_width: config.view.width,
            preview_height: config.view.height,
            encoder_width: config.encoder.width,
            encoder_height: config.encoder.height,
            fps: config.encoder.fps,
            aspect_ratio_mode: config.view.aspect_ratio_mode,
            antialias: config.view.aa_enabled,
            camera_rotation: config.view.rotation,
            camera_flip_horizontal: config.view.flip_horizontal,
            camera_flip_vertical: config.view.flip_vertical,
            preview_flip_horizontal: config.view.preview_flip_horizontal,
            preview_flip_vertical: config.view.preview_flip_vertical,
            stream_rotation: config.encoder.rotation,
            stream_flip_horizontal: config.encoder.flip_horizontal,
            stream_flip_vertical: config.encoder.flip_vertical,
            mute_video: config.encoder.mute_video,
            force_render: config.pipeline.force_render,
        }
    }

    pub fn source_params(&self) -> SourceParams {
        SourceParams {
            rotation: self.camera_rotation,
            flip_horizontal: self.camera_flip_horizontal,
            flip_vertical: self.camera_flip_vertical,
            antialias: self.antialias,
        }
    }

    /// Preview is never rotated; only mirrored.
    pub fn preview_params(&self) -> DrawParams {
        DrawParams {
            width: self.preview_width,
            height: self.preview_height,
            aspect_mode: self.aspect_ratio_mode,
            rotation: Rotation::Deg0,
            flip_horizontal: self.preview_flip_horizontal,
            flip_vertical: self.preview_flip_vertical,
            antialias: self.antialias,
        }
    }

    /// Muted video collapses the encoder draw to 0x0 while still presenting.
    pub fn encoder_params(&self) -> DrawParams {
        let (width, height) = if self.mute_video {
            (0, 0)
        } else {
            (self.encoder_width, self.encoder_height)
        };
        DrawParams {
            width,
            height,
            ..self.photo_params()
        }
    }

    pub fn photo_params(&self) -> DrawParams {
        DrawParams {
            width: self.encoder_width,
            height: self.encoder_height,
            aspect_mode: self.aspect_ratio_mode,
            rotation: self.stream_rotation,
            flip_horizontal: self.stream_flip_horizontal,
            flip_vertical: self.stream_flip_vertical,
            antialias: self.antialias,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mute_zeroes_only_the_encoder_draw() {
        let mut settings = RenderSettings::from_config(&Config::default());
        settings.mute_video = true;

        let encoder = settings.encoder_params();
        assert_eq!((encoder.width, encoder.height), (0, 0));
        let photo = settings.photo_params();
        assert_eq!((photo.width, photo.height), (settings.encoder_width, settings.encoder_height));
    }

    #[test]
    fn preview_ignores_stream_rotation() {
        let mut settings = RenderSettings::from_config(&Config::default());
        settings.stream_rotation = Rotation::Deg90;
        settings.preview_flip_horizontal = true;

        assert_eq!(settings.preview_params().rotation, Rotation::Deg0);
        assert!(settings.preview_params().flip_horizontal);
        assert_eq!(settings.encoder_params().rotation, Rotation::Deg90);
    }
}
