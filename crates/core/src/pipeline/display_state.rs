use crate::inference::domain::emotion::Emotion;
use crate::shared::region::Region;

/// What the overlay currently shows: the latest face rectangle and the
/// last emotion a completed inference produced for it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisplayState {
    region: Option<Region>,
    emotion: Option<Emotion>,
}

impl DisplayState {
    pub fn region(&self) -> Option<Region> {
        self.region
    }

    /// Label text to draw; empty when no emotion is known.
    pub fn label(&self) -> &'static str {
        self.emotion.map_or("", |e| e.label())
    }

    /// Forgets both the rectangle and the label (no face in view).
    pub fn clear(&mut self) {
        self.region = None;
        self.emotion = None;
    }

    /// Moves the rectangle to the newest detection, keeping the label.
    pub fn track(&mut self, region: Region) {
        self.region = Some(region);
    }

    /// Replaces the label with a fresh inference result. `None` means the
    /// winning score had no entry in the category table.
    pub fn set_emotion(&mut self, emotion: Option<Emotion>) {
        self.emotion = emotion;
    }
}
