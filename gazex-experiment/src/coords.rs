//! Conversion between surface-normalized gaze and the controller's display
//! frame.
//!
//! The mapper reports `(x, y)` in `[0,1]²` with the origin at the top-left of
//! the display and `y` growing downward. The controller works in display
//! pixels centered on the display with `y` growing upward, so the `y` axis
//! flips exactly once, here.

/// `px = (x - 0.5) * width`, `py = -(y - 0.5) * height`.
pub fn surface_to_display(normalized: (f64, f64), display_size: (u32, u32)) -> (f64, f64) {
    let (w, h) = (display_size.0 as f64, display_size.1 as f64);
    let px = (normalized.0 - 0.5) * w;
    let py = -(normalized.1 - 0.5) * h;
    (px, py)
}

/// Inverse of [`surface_to_display`].
pub fn display_to_surface(position: (f64, f64), display_size: (u32, u32)) -> (f64, f64) {
    let (w, h) = (display_size.0 as f64, display_size.1 as f64);
    let x = position.0 / w + 0.5;
    let y = 0.5 - position.1 / h;
    (x, y)
}
