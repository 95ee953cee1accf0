use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};
use std::path::{Path, PathBuf};
use tiny_skia::{Color, Pixmap, PremultipliedColorU8};

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loads the configured font, falling back to common system locations.
/// Without a font the renderer simply draws no text.
pub fn load_font(configured: Option<&Path>) -> Option<FontVec> {
    let candidates = configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(SYSTEM_FONTS.iter().map(PathBuf::from));
    first_usable_font(candidates)
}

fn first_usable_font(candidates: impl IntoIterator<Item = PathBuf>) -> Option<FontVec> {
    for path in candidates {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        match FontVec::try_from_vec(bytes) {
            Ok(font) => {
                log::debug!("using font {}", path.display());
                return Some(font);
            }
            Err(e) => log::warn!("{} is not a usable font: {e}", path.display()),
        }
    }
    log::warn!("no font found, status text disabled");
    None
}

/// Rasterizes one line of text into a tight, transparent, premultiplied
/// pixmap. Returns `None` for text with no visible glyphs.
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Color,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }
    if outlines.is_empty() {
        return None;
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;
    let stride = w as usize;
    let dst = pm.pixels_mut();

    let c = color.to_color_u8();
    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i64;
            let iy = (y as f32 + b.min.y - min_y).floor() as i64;
            if ix < 0 || iy < 0 || ix >= w as i64 || iy >= h as i64 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            // Source over destination, premultiplied.
            let a = (cov * c.alpha() as f32 / 255.0).clamp(0.0, 1.0);
            let bg = dst[i];
            let inv = 1.0 - a;
            let mix = |s: u8, d: u8| ((s as f32 * a) + d as f32 * inv).round().min(255.0) as u8;
            let out_a = (a * 255.0 + bg.alpha() as f32 * inv).round().min(255.0) as u8;
            let (r, g, bl) = (
                mix(c.red(), bg.red()).min(out_a),
                mix(c.green(), bg.green()).min(out_a),
                mix(c.blue(), bg.blue()).min(out_a),
            );
            if let Some(px) = PremultipliedColorU8::from_rgba(r, g, bl, out_a) {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}
