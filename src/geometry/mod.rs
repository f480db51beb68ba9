//! Static capsule mesh and per-instance placement.

pub mod instances;

pub use instances::{layout_instances, InstanceTransform};

use std::f32::consts::PI;

/// Mesh vertex. Shared read-only by every instance.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

impl Vertex {
    fn at(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y, 0.0, 1.0],
            color,
        }
    }
}

/// Flat capsule: a `width` x `height` body capped by two semicircles of
/// diameter `width`, in the XY plane and centered on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleSpec {
    pub width: f32,
    pub height: f32,
    pub segments: u32,
    pub color: [f32; 4],
}

impl Default for CapsuleSpec {
    fn default() -> Self {
        Self {
            width: 0.5,
            height: 0.2,
            segments: 10,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

impl CapsuleSpec {
    /// Vertices produced by [`capsule_vertices`]: two body triangles plus a
    /// fan triangle per cap segment.
    pub fn vertex_count(&self) -> usize {
        6 + 6 * self.segments.max(1) as usize
    }
}

/// Build the capsule as a non-indexed triangle list.
pub fn capsule_vertices(spec: &CapsuleSpec) -> Vec<Vertex> {
    let half_w = spec.width / 2.0;
    let half_h = spec.height / 2.0;
    let segments = spec.segments.max(1);
    let color = spec.color;
    let mut vertices = Vec::with_capacity(spec.vertex_count());

    let top_left = Vertex::at(-half_w, half_h, color);
    let top_right = Vertex::at(half_w, half_h, color);
    let bottom_left = Vertex::at(-half_w, -half_h, color);
    let bottom_right = Vertex::at(half_w, -half_h, color);
    vertices.extend_from_slice(&[
        top_left,
        top_right,
        bottom_left,
        bottom_left,
        top_right,
        bottom_right,
    ]);

    // Top cap sweeps 0..PI around (0, +half_h), bottom cap PI..2PI around (0, -half_h).
    for (center_y, base_angle) in [(half_h, 0.0), (-half_h, PI)] {
        let center = Vertex::at(0.0, center_y, color);
        for i in 0..segments {
            let a1 = base_angle + PI * i as f32 / segments as f32;
            let a2 = base_angle + PI * (i + 1) as f32 / segments as f32;
            vertices.push(center);
            vertices.push(Vertex::at(half_w * a1.cos(), center_y + half_w * a1.sin(), color));
            vertices.push(Vertex::at(half_w * a2.cos(), center_y + half_w * a2.sin(), color));
        }
    }

    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capsule_vertex_count() {
        let spec = CapsuleSpec::default();
        let vertices = capsule_vertices(&spec);
        assert_eq!(vertices.len(), 66);
        assert_eq!(vertices.len(), spec.vertex_count());
        assert_eq!(vertices.len() % 3, 0);
    }

    #[test]
    fn test_capsule_extent() {
        let spec = CapsuleSpec::default();
        let vertices = capsule_vertices(&spec);
        let max_y = vertices.iter().map(|v| v.position[1]).fold(f32::MIN, f32::max);
        let min_y = vertices.iter().map(|v| v.position[1]).fold(f32::MAX, f32::min);
        let max_x = vertices.iter().map(|v| v.position[0]).fold(f32::MIN, f32::max);
        // Body half-height plus cap radius.
        assert!((max_y - 0.35).abs() < 1e-5);
        assert!((min_y + 0.35).abs() < 1e-5);
        assert!((max_x - 0.25).abs() < 1e-5);
        assert!(vertices.iter().all(|v| v.position[2] == 0.0 && v.position[3] == 1.0));
    }

    #[test]
    fn test_vertex_layout_is_32_bytes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }
}
