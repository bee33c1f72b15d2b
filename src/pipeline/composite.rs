//! Off-screen composite pass: source texture through the filter chain into
//! the buffer every render target draws from

use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

use super::filter::{FilterChain, FilterEdit};
use crate::capture::Frame;
use crate::display::transform::{orient, scale, Rotation};
use crate::error::CompositorResult;

/// How the camera image is oriented before filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceParams {
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub antialias: bool,
}

pub struct CompositePass {
    chain: FilterChain,
    input: Option<RgbaImage>,
    input_sequence: u64,
    output: RgbaImage,
}

impl CompositePass {
    pub fn new(chain: FilterChain, width: u32, height: u32) -> Self {
        let pass = Self {
            chain,
            input: None,
            input_sequence: 0,
            output: blank(width, height),
        };
        pass.chain.prepare_all(pass.output.width(), pass.output.height());
        pass
    }

    /// Change the composite resolution. Filters are re-prepared.
    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if self.output.dimensions() == (width, height) {
            return;
        }
        self.output = blank(width, height);
        self.chain.prepare_all(width, height);
    }

    /// Upload the latest frame into the input texture. Re-uploading the
    /// same published frame is skipped; unpublished frames (sequence 0)
    /// always upload.
    pub fn update_frame(&mut self, frame: Option<&Frame>) -> CompositorResult<()> {
        let Some(frame) = frame else {
            return Ok(());
        };
        if self.input.is_some() && frame.sequence() != 0 && frame.sequence() == self.input_sequence {
            return Ok(());
        }
        self.input = Some(frame.to_rgba()?);
        self.input_sequence = frame.sequence();
        Ok(())
    }

    /// Orient and scale the input to the composite size, then run the chain.
    /// Without any input yet the output stays black.
    pub fn draw_off_screen(&mut self, source: &SourceParams) {
        let Some(input) = self.input.as_ref() else {
            return;
        };
        let (width, height) = self.output.dimensions();
        let filter = if source.antialias {
            FilterType::Triangle
        } else {
            FilterType::Nearest
        };

        let oriented = orient(input, source.rotation, source.flip_horizontal, source.flip_vertical);
        self.output = scale(&oriented, width, height, filter).into_owned();
        self.chain.run(&mut self.output);
    }

    pub fn output(&self) -> &RgbaImage {
        &self.output
    }

    pub fn apply_edit(&mut self, edit: FilterEdit) -> CompositorResult<()> {
        let inserted = edit.inserted().cloned();
        self.chain.apply(edit)?;
        if let Some(filter) = inserted {
            let (width, height) = self.output.dimensions();
            filter.prepare(width, height);
        }
        Ok(())
    }

    pub fn filter_count(&self) -> usize {
        self.chain.len()
    }

    pub fn into_chain(self) -> FilterChain {
        self.chain
    }
}

fn blank(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width.max(1), height.max(1), Rgba([0, 0, 0, 255]))
}
