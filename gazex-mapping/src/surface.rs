use gazex_core::geometry::{is_degenerate, signed_area};
use gazex_core::{Corners, InvalidGeometryError, Point2, SurfaceUid};
use std::collections::BTreeMap;

/// A projective fit needs at least this many distinct markers.
pub const MIN_SURFACE_MARKERS: usize = 3;

/// A fiducial at a fixed display position. Corners are display pixels,
/// top-left origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: u32,
    pub corners: Corners,
}

/// A planar region of the display defined by its markers. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    uid: SurfaceUid,
    markers: BTreeMap<u32, Marker>,
    display_size: (u32, u32),
}

impl Surface {
    pub fn uid(&self) -> SurfaceUid {
        self.uid
    }

    pub fn display_size(&self) -> (u32, u32) {
        self.display_size
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    pub fn marker(&self, id: u32) -> Option<&Marker> {
        self.markers.get(&id)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// A marker's corners in surface-normalized space (display pixels divided
    /// by the display size).
    pub fn normalized_corners(&self, id: u32) -> Option<Corners> {
        let (w, h) = (self.display_size.0 as f64, self.display_size.1 as f64);
        self.markers
            .get(&id)
            .map(|m| m.corners.map(|c| Point2::new(c.x / w, c.y / h)))
    }
}

/// Builds a surface from `marker_id -> corners` and the display size in pixels.
///
/// Fails when fewer than [`MIN_SURFACE_MARKERS`] distinct markers are given,
/// when an id repeats, when a marker's corners are collinear or collapse to
/// zero area, or when markers disagree on winding.
pub fn register_surface<I>(
    markers: I,
    display_size: (u32, u32),
) -> Result<Surface, InvalidGeometryError>
where
    I: IntoIterator<Item = (u32, Corners)>,
{
    let (width, height) = display_size;
    if width == 0 || height == 0 {
        return Err(InvalidGeometryError::EmptyDisplay(width, height));
    }

    let mut registered = BTreeMap::new();
    let mut clockwise: Option<bool> = None;

    for (id, corners) in markers {
        if registered.contains_key(&id) {
            return Err(InvalidGeometryError::DuplicateMarker(id));
        }
        if is_degenerate(&corners) {
            return Err(InvalidGeometryError::DegenerateMarker(id));
        }

        let cw = signed_area(&corners) > 0.0;
        match clockwise {
            None => clockwise = Some(cw),
            Some(expected) if expected != cw => {
                return Err(InvalidGeometryError::InconsistentWinding(id));
            }
            Some(_) => {}
        }

        registered.insert(id, Marker { id, corners });
    }

    if registered.len() < MIN_SURFACE_MARKERS {
        return Err(InvalidGeometryError::TooFewMarkers {
            found: registered.len(),
            required: MIN_SURFACE_MARKERS,
        });
    }

    Ok(Surface {
        uid: SurfaceUid(rand::random()),
        markers: registered,
        display_size,
    })
}

/// One marker drawn on screen: a square of `size` pixels whose top-left sits
/// at `origin` (display pixels, top-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenMarker {
    pub id: u32,
    pub origin: (f32, f32),
    pub size: f32,
}

impl ScreenMarker {
    /// Corners of the pattern proper. The drawn square carries a one-cell
    /// white quiet zone, a tenth of its side, which is not part of the marker.
    pub fn verts(&self) -> Corners {
        let pad = (self.size / 10.0) as f64;
        let (x0, y0) = (self.origin.0 as f64 + pad, self.origin.1 as f64 + pad);
        let (x1, y1) = (
            self.origin.0 as f64 + self.size as f64 - pad,
            self.origin.1 as f64 + self.size as f64 - pad,
        );
        [
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ]
    }
}

/// Four markers in the display corners: top-left, top-right, bottom-right,
/// bottom-left, in the order of `ids`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenMarkerLayout {
    markers: [ScreenMarker; 4],
    display_size: (u32, u32),
}

impl ScreenMarkerLayout {
    pub fn new(ids: [u32; 4], marker_size: f32, display_size: (u32, u32)) -> Self {
        let (w, h) = (display_size.0 as f32, display_size.1 as f32);
        let far_x = w - marker_size;
        let far_y = h - marker_size;
        let origins = [(0.0, 0.0), (far_x, 0.0), (far_x, far_y), (0.0, far_y)];

        let markers = std::array::from_fn(|i| ScreenMarker {
            id: ids[i],
            origin: origins[i],
            size: marker_size,
        });

        Self {
            markers,
            display_size,
        }
    }

    pub fn markers(&self) -> &[ScreenMarker] {
        &self.markers
    }

    pub fn display_size(&self) -> (u32, u32) {
        self.display_size
    }

    pub fn register(&self) -> Result<Surface, InvalidGeometryError> {
        register_surface(
            self.markers.iter().map(|m| (m.id, m.verts())),
            self.display_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, s: f64) -> Corners {
        [
            Point2::new(x, y),
            Point2::new(x + s, y),
            Point2::new(x + s, y + s),
            Point2::new(x, y + s),
        ]
    }

    #[test]
    fn three_markers_register() {
        let surface = register_surface(
            [
                (0, square(0.0, 0.0, 50.0)),
                (1, square(200.0, 0.0, 50.0)),
                (2, square(200.0, 100.0, 50.0)),
            ],
            (250, 150),
        )
        .expect("valid geometry");
        assert_eq!(surface.marker_count(), 3);
        assert_eq!(surface.display_size(), (250, 150));

        let n = surface.normalized_corners(1).expect("marker 1");
        assert!((n[1].x - 1.0).abs() < 1e-3);
        assert_eq!(n[0].y, 0.0);
    }

    #[test]
    fn two_markers_are_too_few() {
        let err = register_surface(
            [(0, square(0.0, 0.0, 10.0)), (1, square(50.0, 0.0, 10.0))],
            (100, 100),
        )
        .unwrap_err();
        assert_eq!(
            err,
            InvalidGeometryError::TooFewMarkers {
                found: 2,
                required: MIN_SURFACE_MARKERS
            }
        );
    }

    #[test]
    fn degenerate_marker_is_rejected() {
        let flat = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(20.0, 0.0),
            Point2::new(30.0, 0.0),
        ];
        let err = register_surface(
            [
                (0, square(0.0, 0.0, 10.0)),
                (1, flat),
                (2, square(50.0, 50.0, 10.0)),
            ],
            (100, 100),
        )
        .unwrap_err();
        assert_eq!(err, InvalidGeometryError::DegenerateMarker(1));
    }

    #[test]
    fn duplicate_ids_and_mixed_winding_are_rejected() {
        let dup = register_surface(
            [
                (0, square(0.0, 0.0, 10.0)),
                (0, square(50.0, 0.0, 10.0)),
                (2, square(50.0, 50.0, 10.0)),
            ],
            (100, 100),
        );
        assert_eq!(dup.unwrap_err(), InvalidGeometryError::DuplicateMarker(0));

        let mut reversed = square(50.0, 0.0, 10.0);
        reversed.reverse();
        let mixed = register_surface(
            [
                (0, square(0.0, 0.0, 10.0)),
                (1, reversed),
                (2, square(50.0, 50.0, 10.0)),
            ],
            (100, 100),
        );
        assert_eq!(
            mixed.unwrap_err(),
            InvalidGeometryError::InconsistentWinding(1)
        );
    }

    #[test]
    fn empty_display_is_rejected() {
        let err = register_surface([(0, square(0.0, 0.0, 10.0))], (0, 1080)).unwrap_err();
        assert_eq!(err, InvalidGeometryError::EmptyDisplay(0, 1080));
    }

    #[test]
    fn layout_places_markers_in_corners_with_inset_verts() {
        let layout = ScreenMarkerLayout::new([0, 1, 2, 3], 200.0, (1920, 1080));
        let origins: Vec<_> = layout.markers().iter().map(|m| m.origin).collect();
        assert_eq!(
            origins,
            vec![(0.0, 0.0), (1720.0, 0.0), (1720.0, 880.0), (0.0, 880.0)]
        );

        let verts = layout.markers()[2].verts();
        assert_eq!(verts[0], Point2::new(1740.0, 900.0));
        assert_eq!(verts[2], Point2::new(1900.0, 1060.0));

        let surface = layout.register().expect("corner layout is valid");
        assert_eq!(surface.marker_count(), 4);
    }

    #[test]
    fn separately_registered_surfaces_get_distinct_uids() {
        let layout = ScreenMarkerLayout::new([0, 1, 2, 3], 200.0, (1920, 1080));
        let a = layout.register().unwrap();
        let b = layout.register().unwrap();
        assert_ne!(a.uid(), b.uid());
    }
}
