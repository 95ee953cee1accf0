use crate::camera::CameraIntrinsics;
use crate::detector::MarkerDetector;
use crate::homography::Homography;
use crate::surface::{register_surface, Surface, MIN_SURFACE_MARKERS};
use gazex_core::geometry::{is_degenerate, perimeter};
use gazex_core::{
    Corners, GazeSample, InvalidGeometryError, MappedGazePoint, Point2, SceneFrame, SurfaceUid,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct MapperConfig {
    /// Markers of a surface that must be localized before it counts as in view.
    pub min_visible_markers: usize,
    /// Detections below this confidence are dropped.
    pub min_detection_confidence: f32,
    /// Detections with a smaller outline (camera pixels) are dropped.
    pub min_marker_perimeter: f64,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            min_visible_markers: MIN_SURFACE_MARKERS,
            min_detection_confidence: 0.0,
            min_marker_perimeter: 60.0,
        }
    }
}

/// Where a surface sits in the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceLocation {
    pub surface_uid: SurfaceUid,
    pub camera_to_surface: Homography,
    pub surface_to_camera: Homography,
    pub visible_markers: Vec<u32>,
}

/// Output of one [`GazeMapper::process_frame`] call. Every registered surface
/// has an entry in `mapped_gaze`, empty when the surface is out of view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapperResult {
    pub mapped_gaze: BTreeMap<SurfaceUid, Vec<MappedGazePoint>>,
    pub located_surfaces: BTreeMap<SurfaceUid, SurfaceLocation>,
}

impl MapperResult {
    pub fn gaze_on(&self, uid: SurfaceUid) -> &[MappedGazePoint] {
        self.mapped_gaze.get(&uid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_located(&self, uid: SurfaceUid) -> bool {
        self.located_surfaces.contains_key(&uid)
    }
}

struct UsableDetection {
    confidence: f32,
    corners: Corners,
}

/// Projects camera-space gaze onto registered surfaces. Holds no per-frame
/// state: identical inputs give identical results.
pub struct GazeMapper<D> {
    detector: D,
    camera: CameraIntrinsics,
    config: MapperConfig,
    surfaces: Vec<Surface>,
}

impl<D: MarkerDetector> GazeMapper<D> {
    pub fn new(detector: D, camera: CameraIntrinsics, config: MapperConfig) -> Self {
        Self {
            detector,
            camera,
            config,
            surfaces: Vec::new(),
        }
    }

    pub fn add_surface<I>(
        &mut self,
        markers: I,
        display_size: (u32, u32),
    ) -> Result<SurfaceUid, InvalidGeometryError>
    where
        I: IntoIterator<Item = (u32, Corners)>,
    {
        let surface = register_surface(markers, display_size)?;
        Ok(self.insert_surface(surface))
    }

    pub fn insert_surface(&mut self, surface: Surface) -> SurfaceUid {
        let uid = surface.uid();
        log::debug!(
            "surface {uid} registered with {} markers on {}x{}",
            surface.marker_count(),
            surface.display_size().0,
            surface.display_size().1
        );
        self.surfaces.push(surface);
        uid
    }

    pub fn remove_surface(&mut self, uid: SurfaceUid) -> Option<Surface> {
        let idx = self.surfaces.iter().position(|s| s.uid() == uid)?;
        Some(self.surfaces.remove(idx))
    }

    pub fn clear_surfaces(&mut self) {
        self.surfaces.clear();
    }

    pub fn surface(&self, uid: SurfaceUid) -> Option<&Surface> {
        self.surfaces.iter().find(|s| s.uid() == uid)
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn camera(&self) -> &CameraIntrinsics {
        &self.camera
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    pub fn process_frame(&self, frame: &SceneFrame, gaze: &GazeSample) -> MapperResult {
        let detections = self.usable_detections(frame);
        let mut result = MapperResult::default();

        for surface in &self.surfaces {
            let uid = surface.uid();
            let mapped = result.mapped_gaze.entry(uid).or_default();

            let Some(location) = self.locate(surface, &detections) else {
                continue;
            };

            if gaze.worn {
                mapped.extend(self.map_gaze(&location, gaze));
            }
            result.located_surfaces.insert(uid, location);
        }

        result
    }

    /// Detections that may anchor a fit, undistorted, one per id (highest
    /// confidence wins).
    fn usable_detections(&self, frame: &SceneFrame) -> BTreeMap<u32, UsableDetection> {
        let mut usable: BTreeMap<u32, UsableDetection> = BTreeMap::new();

        for det in self.detector.detect(frame) {
            // Written so that a NaN confidence is rejected too.
            if !(det.confidence >= self.config.min_detection_confidence) {
                log::trace!("marker {} dropped: confidence {}", det.id, det.confidence);
                continue;
            }
            if is_degenerate(&det.corners) || perimeter(&det.corners) < self.config.min_marker_perimeter
            {
                log::trace!("marker {} dropped: degenerate or too small", det.id);
                continue;
            }

            let corners = det.corners.map(|c| self.camera.undistort_point(c));
            if is_degenerate(&corners) {
                continue;
            }

            match usable.get(&det.id) {
                Some(existing) if existing.confidence >= det.confidence => {}
                _ => {
                    usable.insert(
                        det.id,
                        UsableDetection {
                            confidence: det.confidence,
                            corners,
                        },
                    );
                }
            }
        }

        usable
    }

    fn locate(
        &self,
        surface: &Surface,
        detections: &BTreeMap<u32, UsableDetection>,
    ) -> Option<SurfaceLocation> {
        let mut src = Vec::new();
        let mut dst = Vec::new();
        let mut visible = Vec::new();

        for (id, det) in detections {
            if let Some(normalized) = surface.normalized_corners(*id) {
                src.extend_from_slice(&det.corners);
                dst.extend_from_slice(&normalized);
                visible.push(*id);
            }
        }

        if visible.len() < self.config.min_visible_markers.max(1) {
            return None;
        }

        let camera_to_surface = Homography::from_correspondences(&src, &dst)?;
        let surface_to_camera = camera_to_surface.inverse()?;

        Some(SurfaceLocation {
            surface_uid: surface.uid(),
            camera_to_surface,
            surface_to_camera,
            visible_markers: visible,
        })
    }

    fn map_gaze(&self, location: &SurfaceLocation, gaze: &GazeSample) -> Option<MappedGazePoint> {
        let undistorted = self.camera.undistort_point(Point2::new(gaze.x, gaze.y));
        let on_surface = location.camera_to_surface.project(undistorted)?;
        let point = MappedGazePoint {
            surface_uid: location.surface_uid,
            x: on_surface.x,
            y: on_surface.y,
            timestamp_ns: gaze.timestamp_ns,
        };
        point.is_on_surface().then_some(point)
    }
}
