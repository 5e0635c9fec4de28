// pitch_sim/src/simulation/plugins/ball/projection.rs

//! What one camera reports about the ball.

use nalgebra::Vector3;
use pitch_core::{
    camera::CameraInfo,
    geometry::FieldGeometry,
    messages::DetectionBall,
    models::ball::{disc_samples, is_visible, parallax_correct, pixel_area, visibility},
    noise::NoiseSampler,
    realism::RealismConfig,
    types::BALL_RADIUS,
};
use rand::Rng;

use crate::simulation::core::transforms::ReportFrame;
use crate::simulation::plugins::camera::CameraRig;

/// Shared inputs of all ball projections within one vision frame.
pub struct BallProjection<'a> {
    pub rig: &'a CameraRig,
    pub geometry: &'a FieldGeometry,
    pub realism: &'a RealismConfig,
    pub frame: ReportFrame,
    /// Sample points per axis for the visibility test.
    pub samples: usize,
}

impl BallProjection<'_> {
    /// Fraction of the ball `camera` can see. `occluded` tells whether the
    /// straight line from a point to the camera hits anything but the ball.
    pub fn visibility<F>(&self, ball: &Vector3<f32>, camera: &CameraInfo, occluded: F) -> f32
    where
        F: Fn(&Vector3<f32>, &Vector3<f32>) -> bool,
    {
        if !self.realism.enable_invisible_ball {
            return 1.0;
        }
        let samples = disc_samples(ball, &camera.position, BALL_RADIUS, self.samples);
        let free = samples
            .iter()
            .filter(|sample| !occluded(sample, &camera.position))
            .count();
        visibility(free, samples.len())
    }

    /// The detection of a ball at `ball` (metric, simulation frame) by
    /// `camera`, if it sees the ball at all.
    pub fn detect<R, F>(
        &self,
        ball: &Vector3<f32>,
        camera: &CameraInfo,
        occluded: F,
        noise: &mut NoiseSampler<'_, R>,
    ) -> Option<DetectionBall>
    where
        R: Rng,
        F: Fn(&Vector3<f32>, &Vector3<f32>) -> bool,
    {
        let overlap = self.realism.camera_overlap;
        if !self.rig.layout.sees(camera.id, ball.x, ball.y, overlap) {
            return None;
        }

        let seen = self.visibility(ball, camera, occluded);
        if !is_visible(seen, self.realism.ball_visibility_threshold) {
            return None;
        }

        let corrected = parallax_correct(ball, &camera.position, BALL_RADIUS);
        if !self.geometry.contains(corrected.x, corrected.y, overlap) {
            return None;
        }

        let distance = (camera.position - Vector3::new(corrected.x, corrected.y, BALL_RADIUS)).norm();
        let measured = corrected + noise.gaussian_vector(self.realism.stddev_ball_p);
        let area = pixel_area(seen, distance, self.rig.focal_length, BALL_RADIUS)
            + noise.gaussian(self.realism.stddev_ball_area);

        let pixel = self.rig.pixel_position(camera, measured);
        let reported = self.frame.point(measured) * 1000.0;
        Some(DetectionBall {
            confidence: 1.0,
            area: area.max(0.0).round() as u32,
            x: reported.x,
            y: reported.y,
            pixel_x: pixel.x,
            pixel_y: pixel.y,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pitch_core::camera::CameraLayout;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Fixture {
        rig: CameraRig,
        geometry: FieldGeometry,
        realism: RealismConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let geometry = FieldGeometry::default();
            let layout = CameraLayout::new(4, &geometry, 4.0).expect("layout");
            Self {
                rig: CameraRig::new(layout, 390.0),
                geometry,
                realism: RealismConfig::none(),
            }
        }

        fn projection(&self, flipped: bool) -> BallProjection<'_> {
            BallProjection {
                rig: &self.rig,
                geometry: &self.geometry,
                realism: &self.realism,
                frame: ReportFrame::new(flipped),
                samples: 5,
            }
        }
    }

    #[test]
    fn test_resting_ball_is_reported_in_millimetres() {
        let fixture = Fixture::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut noise = NoiseSampler::new(&mut rng);
        let camera = fixture.rig.cameras()[3];
        let ball = Vector3::new(1.0, 2.0, BALL_RADIUS);

        let detection = fixture
            .projection(false)
            .detect(&ball, &camera, |_, _| false, &mut noise)
            .expect("ball in view");
        assert_abs_diff_eq!(detection.x, 1000.0, epsilon = 1e-2);
        assert_abs_diff_eq!(detection.y, 2000.0, epsilon = 1e-2);
        assert!(detection.area > 0);

        let flipped = fixture
            .projection(true)
            .detect(&ball, &camera, |_, _| false, &mut noise)
            .expect("ball in view");
        assert_abs_diff_eq!(flipped.x, -1000.0, epsilon = 1e-2);
    }

    #[test]
    fn test_area_does_not_follow_position_noise() {
        let mut fixture = Fixture::new();
        fixture.realism.stddev_ball_p = 0.5;
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut noise = NoiseSampler::new(&mut rng);
        let camera = fixture.rig.cameras()[3];
        let ball = Vector3::new(1.0, 2.0, BALL_RADIUS);

        let distance = (camera.position - ball).norm();
        let expected = pixel_area(1.0, distance, fixture.rig.focal_length, BALL_RADIUS).round() as u32;
        for _ in 0..20 {
            let detection = fixture
                .projection(false)
                .detect(&ball, &camera, |_, _| false, &mut noise)
                .expect("ball in view");
            assert_eq!(detection.area, expected);
        }
    }

    #[test]
    fn test_ball_outside_the_cameras_cell_is_ignored() {
        let fixture = Fixture::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut noise = NoiseSampler::new(&mut rng);
        let camera = fixture.rig.cameras()[0];
        let ball = Vector3::new(4.0, 3.0, BALL_RADIUS);
        assert!(fixture
            .projection(false)
            .detect(&ball, &camera, |_, _| false, &mut noise)
            .is_none());
    }

    #[test]
    fn test_occluded_ball_is_invisible_only_when_enabled() {
        let mut fixture = Fixture::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut noise = NoiseSampler::new(&mut rng);
        let camera = fixture.rig.cameras()[3];
        let ball = Vector3::new(1.0, 2.0, BALL_RADIUS);

        // Everything blocked, but occlusion is off.
        assert!(fixture
            .projection(false)
            .detect(&ball, &camera, |_, _| true, &mut noise)
            .is_some());

        fixture.realism.enable_invisible_ball = true;
        assert!(fixture
            .projection(false)
            .detect(&ball, &camera, |_, _| true, &mut noise)
            .is_none());

        // Blocking the left half of the samples leaves more than the threshold.
        let half = fixture
            .projection(false)
            .detect(&ball, &camera, |sample, _| sample.x < ball.x - 1e-4, &mut noise)
            .expect("partially visible");
        let full = fixture
            .projection(false)
            .detect(&ball, &camera, |_, _| false, &mut noise)
            .expect("visible");
        assert!(half.area < full.area);
    }

    #[test]
    fn test_lifted_ball_is_pushed_away_from_the_camera() {
        let fixture = Fixture::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut noise = NoiseSampler::new(&mut rng);
        let camera = fixture.rig.cameras()[3];
        let ball = Vector3::new(camera.position.x + 1.0, camera.position.y, 2.0 + BALL_RADIUS);
        let detection = fixture
            .projection(false)
            .detect(&ball, &camera, |_, _| false, &mut noise)
            .expect("ball in view");
        assert_abs_diff_eq!(detection.x / 1000.0, camera.position.x + 2.0, epsilon = 1e-3);
    }
}
