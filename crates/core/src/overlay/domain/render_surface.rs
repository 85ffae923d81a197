use crate::shared::bounding_box::BoundingBox;
use crate::shared::resolution::Resolution;

/// Domain interface for the drawing target.
///
/// All coordinates are surface pixels; the engine scales from capture
/// resolution before issuing draw commands. Styling is the surface's
/// concern.
pub trait RenderSurface: Send {
    fn resolution(&self) -> Resolution;

    /// Wipes the previous overlay pass.
    fn clear(&mut self);

    fn draw_rect(&mut self, bbox: &BoundingBox);

    fn draw_label(&mut self, x: f64, y: f64, text: &str);
}
