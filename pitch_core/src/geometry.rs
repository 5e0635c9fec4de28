// pitch_core/src/geometry.rs

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::errors::CoreError;
use crate::messages::{FieldCircularArc, FieldLineSegment, FieldSize};

/// Dimensions of the playing field in metres.
///
/// The field lies in the x/y plane with x along its length. The boundary is
/// the strip between the field lines and the outer walls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(bevy_ecs::prelude::Resource))]
#[serde(default, deny_unknown_fields)]
pub struct FieldGeometry {
    pub field_length: f32,
    pub field_width: f32,
    pub boundary_width: f32,
    pub line_width: f32,
    pub goal_width: f32,
    pub goal_depth: f32,
    pub goal_height: f32,
    pub goal_wall_width: f32,
    pub center_circle_radius: f32,
    pub penalty_area_depth: f32,
    pub penalty_area_width: f32,
    /// When set, the field corners get triangular blocks with this leg length.
    pub corner_block_cathetus_length: Option<f32>,
}

impl Default for FieldGeometry {
    // Division A
    fn default() -> Self {
        Self {
            field_length: 12.0,
            field_width: 9.0,
            boundary_width: 0.3,
            line_width: 0.01,
            goal_width: 1.8,
            goal_depth: 0.18,
            goal_height: 0.155,
            goal_wall_width: 0.02,
            center_circle_radius: 0.5,
            penalty_area_depth: 1.8,
            penalty_area_width: 3.6,
            corner_block_cathetus_length: None,
        }
    }
}

impl FieldGeometry {
    pub fn validate(&self) -> Result<(), CoreError> {
        let required = [
            ("field_length", self.field_length),
            ("field_width", self.field_width),
            ("goal_width", self.goal_width),
            ("goal_depth", self.goal_depth),
            ("goal_height", self.goal_height),
        ];
        for (name, value) in required {
            if !(value > 0.0) {
                return Err(CoreError::InvalidFieldDimension { name, value });
            }
        }
        if self.boundary_width < 0.0 {
            return Err(CoreError::InvalidFieldDimension {
                name: "boundary_width",
                value: self.boundary_width,
            });
        }
        Ok(())
    }

    /// Half length including the boundary, i.e. the x position of the end walls.
    pub fn total_half_length(&self) -> f32 {
        self.field_length / 2.0 + self.boundary_width
    }

    /// Half width including the boundary, i.e. the y position of the side walls.
    pub fn total_half_width(&self) -> f32 {
        self.field_width / 2.0 + self.boundary_width
    }

    /// True if `(x, y)` lies within the walls, widened by `margin`.
    pub fn contains(&self, x: f32, y: f32, margin: f32) -> bool {
        x.abs() <= self.total_half_length() + margin && y.abs() <= self.total_half_width() + margin
    }

    /// Builds the geometry part of a vision packet, in millimetres.
    pub fn field_size(&self) -> FieldSize {
        let mm = |v: f32| v * 1000.0;
        let thickness = mm(self.line_width);
        let half_length = mm(self.field_length) / 2.0;
        let half_width = mm(self.field_width) / 2.0;
        let penalty_x = half_length - mm(self.penalty_area_depth);
        let penalty_half_width = mm(self.penalty_area_width) / 2.0;

        let line = |name: &str, x1: f32, y1: f32, x2: f32, y2: f32| FieldLineSegment {
            name: name.to_string(),
            p1: [x1, y1],
            p2: [x2, y2],
            thickness,
        };

        let field_lines = vec![
            line("TopTouchLine", -half_length, half_width, half_length, half_width),
            line("BottomTouchLine", -half_length, -half_width, half_length, -half_width),
            line("LeftGoalLine", -half_length, -half_width, -half_length, half_width),
            line("RightGoalLine", half_length, -half_width, half_length, half_width),
            line("HalfwayLine", 0.0, -half_width, 0.0, half_width),
            line("CenterLine", -half_length, 0.0, half_length, 0.0),
            line(
                "LeftPenaltyStretch",
                -penalty_x,
                -penalty_half_width,
                -penalty_x,
                penalty_half_width,
            ),
            line(
                "RightPenaltyStretch",
                penalty_x,
                -penalty_half_width,
                penalty_x,
                penalty_half_width,
            ),
            line(
                "LeftFieldLeftPenaltyStretch",
                -half_length,
                -penalty_half_width,
                -penalty_x,
                -penalty_half_width,
            ),
            line(
                "LeftFieldRightPenaltyStretch",
                -half_length,
                penalty_half_width,
                -penalty_x,
                penalty_half_width,
            ),
            line(
                "RightFieldRightPenaltyStretch",
                half_length,
                -penalty_half_width,
                penalty_x,
                -penalty_half_width,
            ),
            line(
                "RightFieldLeftPenaltyStretch",
                half_length,
                penalty_half_width,
                penalty_x,
                penalty_half_width,
            ),
        ];

        let field_arcs = vec![FieldCircularArc {
            name: "CenterCircle".to_string(),
            center: [0.0, 0.0],
            radius: mm(self.center_circle_radius),
            a1: 0.0,
            a2: 2.0 * PI,
            thickness,
        }];

        FieldSize {
            field_length: mm(self.field_length),
            field_width: mm(self.field_width),
            goal_width: mm(self.goal_width),
            goal_depth: mm(self.goal_depth),
            boundary_width: mm(self.boundary_width),
            penalty_area_depth: mm(self.penalty_area_depth),
            penalty_area_width: mm(self.penalty_area_width),
            center_circle_radius: mm(self.center_circle_radius),
            line_thickness: thickness,
            field_lines,
            field_arcs,
        }
    }

    /// Holding position of the `index`-th robot of a team on its own half.
    /// Robots line up along the bottom touch line, starting near the corner.
    pub fn holding_position(&self, side: f32, index: usize) -> (f32, f32) {
        let x = side * (self.field_length / 2.0 - 0.2 - 0.3 * index as f32);
        let y = -(self.field_width / 2.0 - 0.2);
        (x, y)
    }
}
