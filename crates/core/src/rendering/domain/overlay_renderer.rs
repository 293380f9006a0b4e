use crate::pipeline::display_state::DisplayState;
use crate::shared::frame::Frame;

/// Draws the current display state onto a frame in place.
///
/// Renderers hold no per-frame state; everything they draw comes from
/// `state`.
pub trait OverlayRenderer: Send {
    fn render(&self, frame: &mut Frame, state: &DisplayState);
}

/// Leaves frames untouched (headless runs).
pub struct NullOverlayRenderer;

impl OverlayRenderer for NullOverlayRenderer {
    fn render(&self, _frame: &mut Frame, _state: &DisplayState) {}
}
