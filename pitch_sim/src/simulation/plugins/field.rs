// pitch_sim/src/simulation/plugins/field.rs

//! Static collision geometry of the field: floor, ceiling, boundary walls,
//! goals and the optional corner blocks.

use avian3d::prelude::*;
use bevy::prelude::*;
use pitch_core::geometry::FieldGeometry;
use std::f32::consts::FRAC_PI_2;

use crate::simulation::core::{
    components::{FieldElement, Floor},
    transforms::WorldScale,
};

/// Height of the ceiling above the floor, in metres.
pub const ROOM_HEIGHT: f32 = 8.0;

pub struct FieldPlugin;

impl Plugin for FieldPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_field);
    }
}

/// Restitution and friction of a surface. Both are multiplied with the
/// values of whatever touches it.
pub fn surface(restitution: f32, friction: f32) -> (Restitution, Friction) {
    (
        Restitution::new(restitution).with_combine_rule(CoefficientCombine::Multiply),
        Friction::new(friction).with_combine_rule(CoefficientCombine::Multiply),
    )
}

/// Metric shape of a static part.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    /// Everything behind a plane, given by its outward normal.
    HalfSpace(Vec3),
    /// A box with the given full edge lengths.
    Cuboid(Vec3),
}

impl Shape {
    fn collider(&self, scale: f32) -> Collider {
        match *self {
            Shape::HalfSpace(normal) => Collider::half_space(normal),
            Shape::Cuboid(size) => {
                let size = size * scale;
                Collider::cuboid(size.x, size.y, size.z)
            }
        }
    }
}

/// One static collider, metric pose in the vision frame.
struct FieldPart {
    name: &'static str,
    shape: Shape,
    translation: Vec3,
    rotation: Quat,
    restitution: f32,
    friction: f32,
}

impl FieldPart {
    fn new(name: &'static str, shape: Shape, translation: Vec3) -> Self {
        Self {
            name,
            shape,
            translation,
            rotation: Quat::IDENTITY,
            restitution: 0.3,
            friction: 0.35,
        }
    }

    fn rotated(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    fn surface(mut self, restitution: f32, friction: f32) -> Self {
        self.restitution = restitution;
        self.friction = friction;
        self
    }
}

fn cuboid(x: f32, y: f32, z: f32) -> Shape {
    Shape::Cuboid(Vec3::new(x, y, z))
}

/// Lists every static part of the field. Shapes and translations are still
/// metric and get scaled on spawn.
fn field_parts(geometry: &FieldGeometry) -> Vec<FieldPart> {
    let total_length = geometry.total_half_length();
    let total_width = geometry.total_half_width();
    // The goal line runs along the inner edge of the line.
    let goal_line = geometry.field_length / 2.0 - geometry.line_width;
    // Outer extents of a goal, walls included. The mouth between the side
    // walls is exactly `goal_width` wide.
    let goal_half = geometry.goal_width / 2.0 + geometry.goal_wall_width;
    let goal_depth = geometry.goal_depth + geometry.goal_wall_width;
    let wall_half = geometry.goal_wall_width / 2.0;
    let has_boundary = geometry.boundary_width != 0.0;

    let mut parts = vec![
        FieldPart::new("Floor", Shape::HalfSpace(Vec3::Z), Vec3::ZERO).surface(0.56, 0.35),
        FieldPart::new(
            "Ceiling",
            Shape::HalfSpace(Vec3::NEG_Z),
            Vec3::new(0.0, 0.0, ROOM_HEIGHT),
        ),
        FieldPart::new(
            "Side Wall +y",
            Shape::HalfSpace(Vec3::NEG_Y),
            Vec3::new(0.0, total_width, 0.0),
        ),
        FieldPart::new(
            "Side Wall -y",
            Shape::HalfSpace(Vec3::Y),
            Vec3::new(0.0, -total_width, 0.0),
        ),
    ];

    if has_boundary {
        parts.push(FieldPart::new(
            "Goal Line Wall +x",
            Shape::HalfSpace(Vec3::NEG_X),
            Vec3::new(total_length, 0.0, 0.0),
        ));
        parts.push(FieldPart::new(
            "Goal Line Wall -x",
            Shape::HalfSpace(Vec3::X),
            Vec3::new(-total_length, 0.0, 0.0),
        ));
    } else {
        // Without a boundary the goal line is open between the posts, so the
        // wall is split into two blocks flanking each goal mouth.
        let block_half_width = 0.5 * (total_width - goal_half);
        let block_offset = goal_half + block_half_width;
        for side in [1.0f32, -1.0] {
            for flank in [1.0f32, -1.0] {
                parts.push(FieldPart::new(
                    "Goal Line Block",
                    cuboid(1.0, 2.0 * block_half_width, ROOM_HEIGHT),
                    Vec3::new(
                        side * (total_length + 0.5),
                        flank * block_offset,
                        ROOM_HEIGHT / 2.0,
                    ),
                ));
            }
        }
    }

    if let Some(cathetus) = geometry.corner_block_cathetus_length {
        let hypotenuse = (2.0 * cathetus * cathetus).sqrt();
        // Height of the triangle seen from above.
        let block_offset = cathetus * cathetus / hypotenuse;
        let block = || cuboid(hypotenuse, geometry.goal_wall_width, ROOM_HEIGHT);
        let corner_block = |corner: Vec2, inward: Vec2| {
            let inward = inward.normalize_or_zero();
            let center = corner + inward * block_offset;
            // The block's long side lies across the bisector of the corner.
            let yaw = inward.y.atan2(inward.x) + FRAC_PI_2;
            FieldPart::new(
                "Corner Block",
                block(),
                Vec3::new(center.x, center.y, ROOM_HEIGHT / 2.0),
            )
            .rotated(Quat::from_rotation_z(yaw))
        };

        for sx in [1.0f32, -1.0] {
            for sy in [1.0f32, -1.0] {
                parts.push(corner_block(
                    Vec2::new(sx * total_length, sy * total_width),
                    Vec2::new(-sx, -sy),
                ));
                if has_boundary {
                    parts.push(corner_block(
                        Vec2::new(sx * total_length, sy * goal_half),
                        Vec2::new(-sx, sy),
                    ));
                }
            }
        }
    }

    // Without a boundary the goal stands outside of the line instead of on
    // its centre.
    let line_offset = if has_boundary {
        0.0
    } else {
        geometry.line_width / 2.0
    };
    let goal_height_half = geometry.goal_height / 2.0;
    for side in [1.0f32, -1.0] {
        for flank in [1.0f32, -1.0] {
            parts.push(
                FieldPart::new(
                    "Goal Side",
                    cuboid(goal_depth, geometry.goal_wall_width, geometry.goal_height),
                    Vec3::new(
                        side * (goal_line + goal_depth / 2.0 + line_offset),
                        flank * (goal_half - wall_half),
                        goal_height_half,
                    ),
                )
                .surface(0.3, 0.5),
            );
        }
        parts.push(
            FieldPart::new(
                "Goal Back",
                cuboid(geometry.goal_wall_width, 2.0 * goal_half, geometry.goal_height),
                Vec3::new(
                    side * (goal_line + goal_depth - wall_half + line_offset),
                    0.0,
                    goal_height_half,
                ),
            )
            .surface(0.1, 0.5),
        );
    }

    parts
}

fn spawn_field(mut commands: Commands, geometry: Res<FieldGeometry>, scale: Res<WorldScale>) {
    let parts = field_parts(&geometry);
    debug!("Spawning {} static field colliders", parts.len());
    for part in parts {
        let collider = part.shape.collider(scale.0);
        let translation = part.translation * scale.0;
        let mut entity = commands.spawn((
            Name::new(part.name),
            FieldElement,
            RigidBody::Static,
            collider,
            surface(part.restitution, part.friction),
            Transform::from_translation(translation).with_rotation(part.rotation),
            Position(translation),
            Rotation(part.rotation),
        ));
        if part.name == "Floor" {
            entity.insert(Floor);
        }
    }
}
