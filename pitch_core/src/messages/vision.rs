// pitch_core/src/messages/vision.rs

//! Emulated output of an SSL-style overhead camera system.
//! All positions here are in millimetres, following the vision protocol.

use serde::{Deserialize, Serialize};

// =========================================================================
// == Detections ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionBall {
    pub confidence: f32,
    /// Apparent size in pixels, scaled by the visible fraction of the ball.
    pub area: u32,
    pub x: f32,
    pub y: f32,
    pub pixel_x: f32,
    pub pixel_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionRobot {
    pub confidence: f32,
    pub robot_id: u32,
    pub x: f32,
    pub y: f32,
    pub orientation: f32,
    pub pixel_x: f32,
    pub pixel_y: f32,
    pub height: f32,
}

/// Everything one camera saw in one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub frame_number: u32,
    /// Capture time in seconds.
    pub t_capture: f64,
    /// Send time in seconds.
    pub t_sent: f64,
    pub camera_id: u32,
    pub balls: Vec<DetectionBall>,
    pub robots_yellow: Vec<DetectionRobot>,
    pub robots_blue: Vec<DetectionRobot>,
}

impl DetectionFrame {
    pub fn is_empty(&self) -> bool {
        self.balls.is_empty() && self.robots_yellow.is_empty() && self.robots_blue.is_empty()
    }
}

// =========================================================================
// == Geometry ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLineSegment {
    pub name: String,
    pub p1: [f32; 2],
    pub p2: [f32; 2],
    pub thickness: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCircularArc {
    pub name: String,
    pub center: [f32; 2],
    pub radius: f32,
    /// Start angle in radians.
    pub a1: f32,
    /// End angle in radians.
    pub a2: f32,
    pub thickness: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSize {
    pub field_length: f32,
    pub field_width: f32,
    pub goal_width: f32,
    pub goal_depth: f32,
    pub boundary_width: f32,
    pub penalty_area_depth: f32,
    pub penalty_area_width: f32,
    pub center_circle_radius: f32,
    pub line_thickness: f32,
    pub field_lines: Vec<FieldLineSegment>,
    pub field_arcs: Vec<FieldCircularArc>,
}

/// Camera intrinsics and extrinsics. Only the derived world position carries
/// real information, the remaining values are placeholders a consumer must not
/// rely on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    pub camera_id: u32,
    pub focal_length: f32,
    pub principal_point_x: f32,
    pub principal_point_y: f32,
    pub distortion: f32,
    pub q0: f32,
    pub q1: f32,
    pub q2: f32,
    pub q3: f32,
    pub tx: f32,
    pub ty: f32,
    pub tz: f32,
    pub derived_camera_world_tx: f32,
    pub derived_camera_world_ty: f32,
    pub derived_camera_world_tz: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryData {
    pub field: FieldSize,
    pub calib: Vec<CameraCalibration>,
}

/// One camera's packet as it would arrive on the vision multicast group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WrapperPacket {
    pub detection: Option<DetectionFrame>,
    pub geometry: Option<GeometryData>,
}

impl WrapperPacket {
    pub fn camera_id(&self) -> Option<u32> {
        self.detection.as_ref().map(|d| d.camera_id)
    }
}
