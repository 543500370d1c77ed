//! Scene-facing record types uploaded to the GPU.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// One corner of the shared sprite quad.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: Vec2,
}

impl MeshVertex {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
        }
    }
}

/// The unit quad every sprite is drawn with, centered on the origin.
pub const QUAD_VERTICES: [MeshVertex; 4] = [
    MeshVertex::new(-0.5, -0.5),
    MeshVertex::new(0.5, -0.5),
    MeshVertex::new(0.5, 0.5),
    MeshVertex::new(-0.5, 0.5),
];

/// Two counter-clockwise triangles over [`QUAD_VERTICES`].
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Per-instance sprite record.
///
/// Laid out exactly as the instance vertex binding expects it: three
/// tightly packed `vec3`s followed by the atlas index.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub texture_index: u32,
}

impl SpriteInstance {
    /// Create an unrotated instance.
    #[must_use]
    pub const fn new(position: Vec3, scale: Vec3, texture_index: u32) -> Self {
        Self {
            position,
            rotation: Vec3::ZERO,
            scale,
            texture_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn instance_layout_is_packed() {
        assert_eq!(size_of::<SpriteInstance>(), 40);
        assert_eq!(offset_of!(SpriteInstance, position), 0);
        assert_eq!(offset_of!(SpriteInstance, rotation), 12);
        assert_eq!(offset_of!(SpriteInstance, scale), 24);
        assert_eq!(offset_of!(SpriteInstance, texture_index), 36);
    }

    #[test]
    fn mesh_vertex_is_two_floats() {
        assert_eq!(size_of::<MeshVertex>(), 8);
    }

    #[test]
    fn quad_indices_reference_quad_vertices() {
        assert!(QUAD_INDICES
            .iter()
            .all(|&i| usize::from(i) < QUAD_VERTICES.len()));
    }
}
