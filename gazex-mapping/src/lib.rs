//! Camera-to-screen gaze mapping.
//!
//! A [`Surface`] is a set of fiducial markers at known display positions.
//! Each frame the [`GazeMapper`] asks a [`MarkerDetector`] where those markers
//! appear in the scene camera image, fits a [`Homography`] from camera pixels
//! to the surface's normalized `[0, 1]²` space and projects the gaze sample
//! through it.

pub mod camera;
pub mod detector;
pub mod homography;
pub mod mapper;
pub mod surface;

pub use camera::CameraIntrinsics;
pub use detector::{MarkerDetection, MarkerDetector};
pub use homography::Homography;
pub use mapper::{GazeMapper, MapperConfig, MapperResult, SurfaceLocation};
pub use surface::{
    register_surface, Marker, ScreenMarker, ScreenMarkerLayout, Surface, MIN_SURFACE_MARKERS,
};
