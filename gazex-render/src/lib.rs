pub mod marker;
pub mod render;
pub mod text;

pub use marker::{marker_pattern, marker_pixmap, MARKER_CELLS};
pub use render::{FrameStats, SceneView, SkiaRenderer};
pub use text::{load_font, render_text_pixmap};
