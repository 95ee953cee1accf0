use crate::marker::marker_pixmap;
use crate::text::render_text_pixmap;
use ab_glyph::FontVec;
use anyhow::{Context, Result, bail};
use gazex_core::{SessionPhase, Stimulus};
use gazex_mapping::ScreenMarker;
use gazex_timing::Timer;
use std::collections::HashMap;
use std::time::Duration;
use tiny_skia::{
    Color, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Transform,
};

const BACKGROUND: [u8; 3] = [128, 128, 128];
const DISTRACTOR: [u8; 3] = [64, 64, 64];
const TARGET: [u8; 3] = [0, 0, 255];
const GAZE_CURSOR: [u8; 3] = [255, 0, 0];
const GAZE_CURSOR_RADIUS: f32 = 8.0;
const STATUS_SIZE_PX: f32 = 32.0;
const PROGRESS_SIZE_PX: f32 = 18.0;

/// Everything one frame shows. Stimulus and cursor positions are display
/// pixels relative to the display center with `y` up; marker origins are
/// top-left display pixels.
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    pub phase: SessionPhase,
    pub status: Option<&'a str>,
    pub markers: &'a [ScreenMarker],
    pub stimuli: &'a [Stimulus],
    pub gaze_cursor: Option<(f32, f32)>,
    pub progress: Option<(usize, usize)>,
}

impl SceneView<'_> {
    pub fn status(phase: SessionPhase, status: &str) -> SceneView<'_> {
        SceneView {
            phase,
            status: Some(status),
            markers: &[],
            stimuli: &[],
            gaze_cursor: None,
            progress: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
}

/// Software renderer drawing into an offscreen canvas, then copying the
/// canvas into the window's RGBA frame buffer.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    canvas: Pixmap,
    font: Option<FontVec>,
    marker_opacity: f32,
    marker_cache: HashMap<(u32, u32), Pixmap>,
    text_cache: HashMap<(String, u32), Pixmap>,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, marker_opacity: f32, font: Option<FontVec>) -> Result<Self> {
        let canvas = Pixmap::new(width, height)
            .with_context(|| format!("cannot allocate a {width}x{height} canvas"))?;
        Ok(Self {
            width,
            height,
            canvas,
            font,
            marker_opacity: marker_opacity.clamp(0.0, 1.0),
            marker_cache: HashMap::new(),
            text_cache: HashMap::new(),
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        self.canvas = Pixmap::new(new_width, new_height)
            .with_context(|| format!("cannot allocate a {new_width}x{new_height} canvas"))?;
        self.width = new_width;
        self.height = new_height;
        // Marker sizes do not depend on the display, the cache stays valid.
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn render_frame<T: Timer>(
        &mut self,
        view: &SceneView<'_>,
        frame_buffer: &mut [u8],
        timer: &mut T,
    ) -> Result<FrameStats> {
        let expected = self.canvas.data().len();
        if frame_buffer.len() != expected {
            bail!(
                "frame buffer holds {} bytes, canvas needs {expected}",
                frame_buffer.len()
            );
        }

        let t_draw = {
            let t = timer.now();
            self.draw(view);
            timer.elapsed(t)
        };

        let t_copy = {
            let t = timer.now();
            frame_buffer.copy_from_slice(self.canvas.data());
            timer.elapsed(t)
        };

        let total = t_draw + t_copy;
        timer.record_frame(total);
        Ok(FrameStats {
            draw: t_draw,
            copy: t_copy,
            total,
        })
    }

    fn draw(&mut self, view: &SceneView<'_>) {
        let [r, g, b] = BACKGROUND;
        self.canvas.fill(Color::from_rgba8(r, g, b, 255));

        if view.phase.shows_markers() {
            for marker in view.markers {
                self.draw_marker(marker);
            }
        }

        // Distractors first so the target is never hidden.
        for s in view.stimuli.iter().filter(|s| !s.is_target()) {
            self.draw_disc(s.position, s.radius, DISTRACTOR);
        }
        for s in view.stimuli.iter().filter(|s| s.is_target()) {
            self.draw_disc(s.position, s.radius, TARGET);
        }

        if let Some(p) = view.gaze_cursor {
            self.draw_disc(p, GAZE_CURSOR_RADIUS, GAZE_CURSOR);
        }

        if let Some(status) = view.status {
            let center = (self.width as f32 / 2.0, self.height as f32 / 2.0);
            self.draw_text(status, STATUS_SIZE_PX, center);
        }
        if let Some((done, total)) = view.progress {
            let label = format!("Trial {}/{}", (done + 1).min(total), total);
            let pos = (self.width as f32 / 2.0, self.height as f32 - 2.0 * PROGRESS_SIZE_PX);
            self.draw_text(&label, PROGRESS_SIZE_PX, pos);
        }
    }

    fn to_canvas(&self, p: (f32, f32)) -> (f32, f32) {
        (
            self.width as f32 / 2.0 + p.0,
            self.height as f32 / 2.0 - p.1,
        )
    }

    fn draw_disc(&mut self, center: (f32, f32), radius: f32, color: [u8; 3]) {
        let (x, y) = self.to_canvas(center);
        let mut paint = Paint::default();
        paint.set_color(Color::from_rgba8(color[0], color[1], color[2], 255));
        paint.anti_alias = true;

        let mut pb = PathBuilder::new();
        pb.push_circle(x, y, radius);
        if let Some(path) = pb.finish() {
            self.canvas
                .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    fn draw_marker(&mut self, marker: &ScreenMarker) {
        let size = marker.size.round().max(1.0) as u32;
        let key = (marker.id, size);
        if !self.marker_cache.contains_key(&key) {
            match marker_pixmap(marker.id, size) {
                Some(pm) => {
                    self.marker_cache.insert(key, pm);
                }
                None => return,
            }
        }
        let Some(pm) = self.marker_cache.get(&key) else {
            return;
        };

        let paint = PixmapPaint {
            opacity: self.marker_opacity,
            quality: FilterQuality::Nearest,
            ..PixmapPaint::default()
        };
        self.canvas.draw_pixmap(
            marker.origin.0.round() as i32,
            marker.origin.1.round() as i32,
            pm.as_ref(),
            &paint,
            Transform::identity(),
            None,
        );
    }

    /// Draws `text` centered on `center` (canvas pixels). A no-op without a
    /// font.
    fn draw_text(&mut self, text: &str, size_px: f32, center: (f32, f32)) {
        let Some(font) = &self.font else {
            return;
        };
        let key = (text.to_owned(), size_px.to_bits());
        if !self.text_cache.contains_key(&key) {
            let Some(pm) = render_text_pixmap(text, size_px, font, Color::WHITE) else {
                return;
            };
            self.text_cache.insert(key.clone(), pm);
        }
        let Some(pm) = self.text_cache.get(&key) else {
            return;
        };

        let x = (center.0 - pm.width() as f32 / 2.0).round() as i32;
        let y = (center.1 - pm.height() as f32 / 2.0).round() as i32;
        self.canvas.draw_pixmap(
            x,
            y,
            pm.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}
