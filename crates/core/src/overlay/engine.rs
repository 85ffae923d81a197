use std::time::Instant;

use crate::overlay::domain::render_surface::RenderSurface;
use crate::overlay::interpolator::{display_box, DisplayParams};
use crate::shared::resolution::Resolution;
use crate::tracking::ingestion::TrackingTable;

/// Vertical gap between a box edge and its labels, in surface pixels.
const LABEL_OFFSET: f64 = 4.0;

/// Renders one overlay pass per display refresh.
///
/// Reads the tracking table, computes each face's display box
/// (interpolated, extrapolated, or exact), scales from capture to
/// surface resolution, and issues draw commands. Whether the data came
/// from the live channel or the fallback generator is invisible here.
pub struct OverlayEngine {
    params: DisplayParams,
    source: Resolution,
}

impl OverlayEngine {
    pub fn new(source: Resolution) -> Self {
        Self {
            params: DisplayParams::default(),
            source,
        }
    }

    pub fn with_params(source: Resolution, params: DisplayParams) -> Self {
        Self { params, source }
    }

    /// Draws the overlay for this refresh. Returns how many boxes were
    /// drawn.
    pub fn render(
        &self,
        table: &TrackingTable,
        now: Instant,
        surface: &mut dyn RenderSurface,
    ) -> usize {
        surface.clear();

        let destination = surface.resolution();
        let mut drawn = 0;
        for face in table.faces_ordered() {
            let Some(bbox) = display_box(face, now, self.source, &self.params) else {
                continue;
            };
            let scaled = bbox.scaled(self.source, destination);

            surface.draw_rect(&scaled);
            surface.draw_label(scaled.x, scaled.y - LABEL_OFFSET, &face.key.to_string());

            let primary = face.primary_emotion();
            surface.draw_label(
                scaled.x,
                scaled.y + scaled.height + LABEL_OFFSET,
                &format!("{} {:.0}%", primary.emotion, primary.percentage),
            );
            drawn += 1;
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{DetectionBatch, FaceObservation};
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::emotion::EmotionScore;
    use approx::assert_relative_eq;
    use std::time::Duration;

    /// Records draw commands for assertions.
    struct FakeSurface {
        resolution: Resolution,
        clears: usize,
        rects: Vec<BoundingBox>,
        labels: Vec<(f64, f64, String)>,
    }

    impl FakeSurface {
        fn new(resolution: Resolution) -> Self {
            Self {
                resolution,
                clears: 0,
                rects: Vec::new(),
                labels: Vec::new(),
            }
        }
    }

    impl RenderSurface for FakeSurface {
        fn resolution(&self) -> Resolution {
            self.resolution
        }

        fn clear(&mut self) {
            self.clears += 1;
        }

        fn draw_rect(&mut self, bbox: &BoundingBox) {
            self.rects.push(*bbox);
        }

        fn draw_label(&mut self, x: f64, y: f64, text: &str) {
            self.labels.push((x, y, text.to_string()));
        }
    }

    fn observation(id: &str, x: f64) -> FaceObservation {
        FaceObservation {
            bbox: [x, 100.0, 50.0, 50.0],
            tracking_id: Some(id.to_string()),
            emotions: vec![EmotionScore::new("happy", 0.87, 87.0)],
        }
    }

    fn batch(faces: Vec<FaceObservation>) -> DetectionBatch {
        DetectionBatch {
            frame_id: 0,
            timestamp: 0,
            processing_time: 10.0,
            face_detected: !faces.is_empty(),
            faces,
        }
    }

    const SOURCE: Resolution = Resolution {
        width: 640,
        height: 480,
    };

    #[test]
    fn test_empty_batch_draws_nothing() {
        let mut table = TrackingTable::new();
        let now = Instant::now();
        table.apply(&batch(vec![]), now);

        let engine = OverlayEngine::new(SOURCE);
        let mut surface = FakeSurface::new(SOURCE);
        let drawn = engine.render(&table, now, &mut surface);

        assert_eq!(drawn, 0);
        assert_eq!(surface.clears, 1);
        assert!(surface.rects.is_empty());
    }

    #[test]
    fn test_draws_rect_and_both_labels_per_face() {
        let mut table = TrackingTable::new();
        let now = Instant::now();
        table.apply(&batch(vec![observation("face_1", 100.0)]), now);

        let engine = OverlayEngine::new(SOURCE);
        let mut surface = FakeSurface::new(SOURCE);
        let drawn = engine.render(&table, now, &mut surface);

        assert_eq!(drawn, 1);
        assert_eq!(surface.rects.len(), 1);
        assert_eq!(surface.labels.len(), 2);
        assert_eq!(surface.labels[0].2, "face_1");
        assert_eq!(surface.labels[1].2, "happy 87%");
    }

    #[test]
    fn test_scales_to_surface_resolution() {
        let mut table = TrackingTable::new();
        let now = Instant::now();
        table.apply(&batch(vec![observation("face_1", 100.0)]), now);

        let engine = OverlayEngine::new(SOURCE);
        // Surface is double the capture resolution.
        let mut surface = FakeSurface::new(Resolution::new(1280, 960));
        engine.render(&table, now, &mut surface);

        let rect = surface.rects[0];
        assert_relative_eq!(rect.x, 200.0);
        assert_relative_eq!(rect.y, 200.0);
        assert_relative_eq!(rect.width, 100.0);
        assert_relative_eq!(rect.height, 100.0);
    }

    #[test]
    fn test_interpolated_position_is_drawn() {
        let mut table = TrackingTable::new();
        let t0 = Instant::now();
        table.apply(&batch(vec![observation("face_1", 100.0)]), t0);
        let t1 = t0 + Duration::from_millis(100);
        table.apply(&batch(vec![observation("face_1", 110.0)]), t1);

        let engine = OverlayEngine::new(SOURCE);
        let mut surface = FakeSurface::new(SOURCE);
        engine.render(&table, t1 + Duration::from_millis(50), &mut surface);

        assert_relative_eq!(surface.rects[0].x, 105.0, epsilon = 1e-6);
    }

    #[test]
    fn test_stale_faces_without_velocity_are_skipped() {
        let mut table = TrackingTable::new();
        let t0 = Instant::now();
        table.apply(&batch(vec![observation("face_1", 100.0)]), t0);

        let engine = OverlayEngine::new(SOURCE);
        let mut surface = FakeSurface::new(SOURCE);
        let drawn = engine.render(&table, t0 + Duration::from_millis(600), &mut surface);

        assert_eq!(drawn, 0);
        // The pass still clears the previous overlay.
        assert_eq!(surface.clears, 1);
    }

    #[test]
    fn test_multiple_faces_render_in_stable_order() {
        let mut table = TrackingTable::new();
        let now = Instant::now();
        table.apply(
            &batch(vec![observation("face_2", 300.0), observation("face_1", 100.0)]),
            now,
        );

        let engine = OverlayEngine::new(SOURCE);
        let mut surface = FakeSurface::new(SOURCE);
        let drawn = engine.render(&table, now, &mut surface);

        assert_eq!(drawn, 2);
        assert_eq!(surface.labels[0].2, "face_1");
        assert_eq!(surface.labels[2].2, "face_2");
    }
}
