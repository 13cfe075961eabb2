use ordered_float::OrderedFloat;

use crate::core::{CanvasConfig, DataPoint};

/// Point of an item closest to the mouse among those drawn on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPoint {
    /// Screen pixel, pan offset included.
    pub screen_x: i64,
    pub screen_y: i64,
    pub point: DataPoint,
}

/// Finds the point nearest to `(mouse_x, mouse_y)` among `points` that land
/// inside the canvas after zoom and pan. Ties go to the earlier point.
#[must_use]
pub fn nearest_visible_point(
    canvas: &CanvasConfig,
    points: &[DataPoint],
    mouse_x: f64,
    mouse_y: f64,
) -> Option<NearestPoint> {
    let x_offset = f64::from(canvas.x_offset());
    let y_offset = f64::from(canvas.y_offset());
    let width = i64::from(canvas.width());
    let height = i64::from(canvas.height());

    points
        .iter()
        .filter_map(|point| {
            let (px, py) = canvas.pixel_coord(*point);
            if !px.is_finite() || !py.is_finite() {
                return None;
            }
            let screen_x = px.round_ties_even() as i64 + i64::from(canvas.x_offset());
            let screen_y = py.round_ties_even() as i64 + i64::from(canvas.y_offset());
            if !(0..width).contains(&screen_x) || !(0..height).contains(&screen_y) {
                return None;
            }
            let dist2 = (mouse_x - x_offset - px).powi(2) + (mouse_y - y_offset - py).powi(2);
            Some((
                OrderedFloat(dist2),
                NearestPoint {
                    screen_x,
                    screen_y,
                    point: *point,
                },
            ))
        })
        .min_by_key(|(dist2, _)| *dist2)
        .map(|(_, nearest)| nearest)
}
