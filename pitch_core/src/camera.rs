// pitch_core/src/camera.rs

//! Placement of the overhead cameras and their field-of-view membership test.

use nalgebra::{Vector2, Vector3};

use crate::errors::CoreError;
use crate::geometry::FieldGeometry;

/// One camera of a layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraInfo {
    pub id: u32,
    /// Position in metres, vision frame.
    pub position: Vector3<f32>,
    /// Half size of the ground area this camera is primarily responsible for.
    pub half_extent: Vector2<f32>,
}

/// A regular grid of cameras over the field including its boundary.
///
/// Columns run along the field length, rows along its width. Camera ids are
/// assigned row by row, starting at the negative corner.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraLayout {
    columns: u32,
    rows: u32,
    half_length: f32,
    half_width: f32,
    height: f32,
}

impl CameraLayout {
    /// Grid dimensions `(columns, rows)` for a supported camera count.
    pub fn grid(count: u32) -> Result<(u32, u32), CoreError> {
        match count {
            1 => Ok((1, 1)),
            2 => Ok((2, 1)),
            4 => Ok((2, 2)),
            8 => Ok((4, 2)),
            other => Err(CoreError::UnsupportedCameraCount(other)),
        }
    }

    pub fn new(count: u32, geometry: &FieldGeometry, height: f32) -> Result<Self, CoreError> {
        let (columns, rows) = Self::grid(count)?;
        Ok(Self {
            columns,
            rows,
            half_length: geometry.total_half_length(),
            half_width: geometry.total_half_width(),
            height,
        })
    }

    pub fn count(&self) -> u32 {
        self.columns * self.rows
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    fn cell_half_extent(&self) -> Vector2<f32> {
        Vector2::new(
            self.half_length / self.columns as f32,
            self.half_width / self.rows as f32,
        )
    }

    fn cell_of(&self, id: u32) -> Result<(u32, u32), CoreError> {
        if id >= self.count() {
            return Err(CoreError::CameraOutOfRange {
                id,
                count: self.count(),
            });
        }
        Ok((id % self.columns, id / self.columns))
    }

    pub fn camera(&self, id: u32) -> Result<CameraInfo, CoreError> {
        let (column, row) = self.cell_of(id)?;
        let half = self.cell_half_extent();
        let x = -self.half_length + (2 * column + 1) as f32 * half.x;
        let y = -self.half_width + (2 * row + 1) as f32 * half.y;
        Ok(CameraInfo {
            id,
            position: Vector3::new(x, y, self.height),
            half_extent: half,
        })
    }

    pub fn cameras(&self) -> impl Iterator<Item = CameraInfo> + '_ {
        (0..self.count()).filter_map(move |id| self.camera(id).ok())
    }

    /// Whether camera `id` sees the ground position `(x, y)`.
    ///
    /// Each camera covers its own cell widened by `overlap` towards its
    /// neighbours. Cells on the outside of the grid are unbounded in the
    /// outward direction, so any position is seen by at least one camera.
    pub fn sees(&self, id: u32, x: f32, y: f32, overlap: f32) -> bool {
        let Ok((column, row)) = self.cell_of(id) else {
            return false;
        };
        let Ok(camera) = self.camera(id) else {
            return false;
        };
        let half = camera.half_extent;
        let reach = |value: f32, center: f32, half: f32, index: u32, cells: u32| {
            let lower_ok = index == 0 || value >= center - half - overlap;
            let upper_ok = index + 1 == cells || value <= center + half + overlap;
            lower_ok && upper_ok
        };
        reach(x, camera.position.x, half.x, column, self.columns)
            && reach(y, camera.position.y, half.y, row, self.rows)
    }

    /// All camera ids that see `(x, y)`, in ascending order.
    pub fn cameras_seeing(&self, x: f32, y: f32, overlap: f32) -> Vec<u32> {
        (0..self.count())
            .filter(|&id| self.sees(id, x, y, overlap))
            .collect()
    }
}
