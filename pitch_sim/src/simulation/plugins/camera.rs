// pitch_sim/src/simulation/plugins/camera.rs

//! The overhead camera rig: real camera positions, the slightly wrong
//! positions reported in the calibration, and the pinhole projection used for
//! pixel coordinates.

use bevy::prelude::*;
use nalgebra::{Vector2, Vector3};
use pitch_core::{
    camera::{CameraInfo, CameraLayout},
    messages::CameraCalibration,
};
use rand::Rng;
use rand_distr::{Distribution, UnitCircle};

use crate::simulation::core::transforms::ReportFrame;

/// Image size of the emulated cameras, in pixels.
pub const IMAGE_WIDTH: f32 = 780.0;
pub const IMAGE_HEIGHT: f32 = 580.0;

#[derive(Resource, Debug, Clone)]
pub struct CameraRig {
    pub layout: CameraLayout,
    pub focal_length: f32,
    /// Per camera offset of the calibrated position from the real one.
    calibration_offsets: Vec<Vector3<f32>>,
}

impl CameraRig {
    pub fn new(layout: CameraLayout, focal_length: f32) -> Self {
        let count = layout.count() as usize;
        Self {
            layout,
            focal_length,
            calibration_offsets: vec![Vector3::zeros(); count],
        }
    }

    pub fn cameras(&self) -> Vec<CameraInfo> {
        self.layout.cameras().collect()
    }

    /// Draws a new calibration error of length `error` in a random horizontal
    /// direction for every camera.
    pub fn resample_calibration<R: Rng>(&mut self, error: f32, rng: &mut R) {
        for offset in &mut self.calibration_offsets {
            *offset = if error > 0.0 {
                let [x, y]: [f32; 2] = UnitCircle.sample(rng);
                Vector3::new(x, y, 0.0) * error
            } else {
                Vector3::zeros()
            };
        }
    }

    pub fn calibration_offset(&self, id: u32) -> Vector3<f32> {
        self.calibration_offsets
            .get(id as usize)
            .copied()
            .unwrap_or_else(Vector3::zeros)
    }

    /// Calibration packet of one camera, in millimetres.
    pub fn calibration(&self, camera: &CameraInfo, frame: ReportFrame) -> CameraCalibration {
        let position = camera.position + self.calibration_offset(camera.id);
        let reported = frame.point(position.xy()) * 1000.0;
        CameraCalibration {
            camera_id: camera.id,
            focal_length: self.focal_length,
            principal_point_x: IMAGE_WIDTH / 2.0,
            principal_point_y: IMAGE_HEIGHT / 2.0,
            distortion: 0.0,
            q0: 0.0,
            q1: 0.0,
            q2: 0.0,
            q3: 1.0,
            tx: 0.0,
            ty: 0.0,
            tz: position.z * 1000.0,
            derived_camera_world_tx: reported.x,
            derived_camera_world_ty: reported.y,
            derived_camera_world_tz: position.z * 1000.0,
        }
    }

    /// Pixel coordinates of a ground point seen from straight above.
    pub fn pixel_position(&self, camera: &CameraInfo, point: Vector2<f32>) -> Vector2<f32> {
        let height = camera.position.z.max(f32::EPSILON);
        let offset = (point - camera.position.xy()) * (self.focal_length / height);
        Vector2::new(IMAGE_WIDTH / 2.0 + offset.x, IMAGE_HEIGHT / 2.0 - offset.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pitch_core::geometry::FieldGeometry;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rig() -> CameraRig {
        let layout = CameraLayout::new(4, &FieldGeometry::default(), 4.0).expect("layout");
        CameraRig::new(layout, 390.0)
    }

    #[test]
    fn test_calibration_offsets_have_the_requested_length() {
        let mut rig = rig();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        rig.resample_calibration(0.1, &mut rng);
        for id in 0..4 {
            assert_abs_diff_eq!(rig.calibration_offset(id).norm(), 0.1, epsilon = 1e-5);
        }
        rig.resample_calibration(0.0, &mut rng);
        assert_eq!(rig.calibration_offset(2), Vector3::zeros());
    }

    #[test]
    fn test_camera_centre_maps_to_principal_point() {
        let rig = rig();
        let camera = rig.cameras()[0];
        let pixel = rig.pixel_position(&camera, camera.position.xy());
        assert_abs_diff_eq!(pixel.x, IMAGE_WIDTH / 2.0);
        assert_abs_diff_eq!(pixel.y, IMAGE_HEIGHT / 2.0);
    }

    #[test]
    fn test_flipped_calibration_mirrors_position() {
        let rig = rig();
        let camera = rig.cameras()[3];
        let calibration = rig.calibration(&camera, ReportFrame::new(true));
        assert_abs_diff_eq!(calibration.derived_camera_world_tx, -3150.0, epsilon = 1e-2);
        assert_abs_diff_eq!(calibration.derived_camera_world_ty, -2400.0, epsilon = 1e-2);
    }
}
