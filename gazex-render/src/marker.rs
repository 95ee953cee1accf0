use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tiny_skia::{Color, Paint, Pixmap, Rect, Transform};

/// Cells per side of a marker pattern, black border included.
pub const MARKER_CELLS: usize = 8;

/// Placeholder fiducial: a black border around a 6x6 bit field derived from
/// the id. `true` is a black cell. Good enough for a display that is only
/// ever "seen" by a detector that already knows the layout.
pub fn marker_pattern(id: u32) -> [[bool; MARKER_CELLS]; MARKER_CELLS] {
    let z: u64 = StdRng::seed_from_u64(id as u64).random();

    let mut cells = [[true; MARKER_CELLS]; MARKER_CELLS];
    for (row, line) in cells.iter_mut().enumerate().take(MARKER_CELLS - 1).skip(1) {
        for (col, cell) in line.iter_mut().enumerate().take(MARKER_CELLS - 1).skip(1) {
            let bit = (row - 1) * (MARKER_CELLS - 2) + (col - 1);
            *cell = (z >> bit) & 1 == 1;
        }
    }
    cells
}

/// Renders the pattern with a one-cell white quiet zone, `size` pixels per
/// side. The quiet zone is why registered marker vertices sit `size / 10`
/// inside the drawn square.
pub fn marker_pixmap(id: u32, size: u32) -> Option<Pixmap> {
    let total_cells = MARKER_CELLS + 2;
    let mut pixmap = Pixmap::new(size, size)?;
    pixmap.fill(Color::WHITE);

    let cell = size as f32 / total_cells as f32;
    let mut black = Paint::default();
    black.set_color(Color::BLACK);
    black.anti_alias = false;

    for (row, line) in marker_pattern(id).iter().enumerate() {
        for (col, &dark) in line.iter().enumerate() {
            if !dark {
                continue;
            }
            let x = (col + 1) as f32 * cell;
            let y = (row + 1) as f32 * cell;
            if let Some(rect) = Rect::from_xywh(x, y, cell, cell) {
                pixmap.fill_rect(rect, &black, Transform::identity(), None);
            }
        }
    }
    Some(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_is_black() {
        let p = marker_pattern(17);
        for i in 0..MARKER_CELLS {
            assert!(p[0][i] && p[MARKER_CELLS - 1][i]);
            assert!(p[i][0] && p[i][MARKER_CELLS - 1]);
        }
    }

    #[test]
    fn pattern_is_stable_per_id() {
        assert_eq!(marker_pattern(3), marker_pattern(3));
    }

    #[test]
    fn corner_ids_get_distinct_patterns() {
        let patterns: Vec<_> = (0..4).map(marker_pattern).collect();
        for a in 0..4 {
            for b in a + 1..4 {
                assert_ne!(patterns[a], patterns[b]);
            }
        }
    }

    #[test]
    fn pixmap_has_quiet_zone() {
        let pm = marker_pixmap(2, 200).unwrap();
        let white = pm.pixel(5, 5).unwrap();
        assert_eq!((white.red(), white.green(), white.blue()), (255, 255, 255));
        // First border cell starts at 20 px.
        let black = pm.pixel(25, 25).unwrap();
        assert_eq!((black.red(), black.green(), black.blue()), (0, 0, 0));
    }

    #[test]
    fn zero_size_is_none() {
        assert!(marker_pixmap(0, 0).is_none());
    }
}
