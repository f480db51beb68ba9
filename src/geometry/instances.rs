//! Static per-instance placement along the X axis.

use glam::{Mat4, Vec3};

/// Placement of one instance: a column-major model matrix plus its id.
///
/// Laid out for a per-instance vertex buffer: four `vec4` columns, a `u32`
/// id at byte 64, padded to 80 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceTransform {
    pub model: [[f32; 4]; 4],
    pub instance_id: u32,
    pub _padding: [u32; 3],
}

impl InstanceTransform {
    pub fn new(model: Mat4, instance_id: u32) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            instance_id,
            _padding: [0; 3],
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    pub fn translation(&self) -> Vec3 {
        self.matrix().w_axis.truncate()
    }
}

/// Place `count` instances `spacing` apart, centered on the origin.
pub fn layout_instances(count: u32, spacing: f32) -> Vec<InstanceTransform> {
    let mid = (count as f32 - 1.0) / 2.0;
    (0..count)
        .map(|i| {
            let x = (i as f32 - mid) * spacing;
            InstanceTransform::new(Mat4::from_translation(Vec3::new(x, 0.0, 0.0)), i)
        })
        .collect()
}
