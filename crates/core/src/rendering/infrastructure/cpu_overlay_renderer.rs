use crate::pipeline::display_state::DisplayState;
use crate::rendering::domain::overlay_renderer::OverlayRenderer;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

use super::bitmap_font::{draw_text, put_pixel, text_size};

pub const GREEN: [u8; 3] = [0, 255, 0];
pub const DEFAULT_THICKNESS: i32 = 3;
pub const DEFAULT_FONT_SCALE: i32 = 2;

/// Draws the face rectangle and emotion label directly into RGB frame bytes.
pub struct CpuOverlayRenderer {
    color: [u8; 3],
    thickness: i32,
    font_scale: i32,
}

impl CpuOverlayRenderer {
    pub fn new(color: [u8; 3], thickness: i32, font_scale: i32) -> Self {
        Self {
            color,
            thickness: thickness.max(1),
            font_scale: font_scale.max(1),
        }
    }

    /// Rectangle outline with the stroke centred on the region's edges.
    fn draw_rect(&self, frame: &mut Frame, region: &Region) {
        let lo = self.thickness / 2;
        let hi = self.thickness - 1 - lo;
        let left = region.x;
        let top = region.y;
        let right = region.right() - 1;
        let bottom = region.bottom() - 1;

        let x0 = left - lo;
        let x1 = right + hi;
        let y0 = top - lo;
        let y1 = bottom + hi;

        self.fill(frame, x0, top - lo, x1, top + hi);
        self.fill(frame, x0, bottom - lo, x1, bottom + hi);
        self.fill(frame, left - lo, y0, left + hi, y1);
        self.fill(frame, right - lo, y0, right + hi, y1);
    }

    /// Fills the inclusive box `[x0, x1] × [y0, y1]`, clipped to the frame.
    fn fill(&self, frame: &mut Frame, x0: i32, y0: i32, x1: i32, y1: i32) {
        let x0 = x0.max(0);
        let y0 = y0.max(0);
        let x1 = x1.min(frame.width() as i32 - 1);
        let y1 = y1.min(frame.height() as i32 - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                put_pixel(frame, x, y, self.color);
            }
        }
    }

    /// Label anchor: `x = left + left/2 - text_width/2`, baseline two pixels
    /// above the rectangle.
    fn label_origin(&self, region: &Region, label: &str) -> (i32, i32) {
        let (text_w, _) = text_size(label, self.font_scale);
        (region.x + region.x / 2 - text_w / 2, region.y - 2)
    }
}

impl Default for CpuOverlayRenderer {
    fn default() -> Self {
        Self::new(GREEN, DEFAULT_THICKNESS, DEFAULT_FONT_SCALE)
    }
}

impl OverlayRenderer for CpuOverlayRenderer {
    fn render(&self, frame: &mut Frame, state: &DisplayState) {
        if frame.is_empty() || frame.channels() < 3 {
            return;
        }
        let Some(region) = state.region() else {
            return;
        };
        self.draw_rect(frame, &region);

        let label = state.label();
        if !label.is_empty() {
            let (x, baseline) = self.label_origin(&region, label);
            draw_text(frame, label, x, baseline, self.color, self.font_scale);
        }
    }
}
