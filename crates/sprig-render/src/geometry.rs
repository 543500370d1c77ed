//! Device-local mesh, instance and index buffers.

use ash::vk;
use sprig_core::limits::MAX_INSTANCES;
use sprig_core::{MeshVertex, SpriteInstance};
use sprig_gpu::{GpuAllocator, GpuBuffer, Result};

use crate::upload::Uploader;

/// Which vertex buffer an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSlot {
    /// Per-vertex mesh data, binding 0.
    Mesh,
    /// Per-instance sprite data, binding 1.
    Instance,
}

impl VertexSlot {
    pub const fn binding(self) -> u32 {
        match self {
            Self::Mesh => 0,
            Self::Instance => 1,
        }
    }
}

/// Byte size of the instance buffer.
pub const fn instance_buffer_size() -> u64 {
    (MAX_INSTANCES * std::mem::size_of::<SpriteInstance>()) as u64
}

/// Static quad mesh, dynamic instance buffer and the index buffer.
pub struct GeometryBuffers {
    pub vertex: GpuBuffer,
    pub instance: GpuBuffer,
    pub index: GpuBuffer,
    index_count: u32,
    instance_count: u32,
}

impl GeometryBuffers {
    /// Upload `vertices` and `indices` and reserve room for
    /// `MAX_INSTANCES` instances, seeded with `instances`.
    pub fn new(
        uploader: &Uploader<'_>,
        vertices: &[MeshVertex],
        indices: &[u16],
        instances: &[SpriteInstance],
    ) -> Result<Self> {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let vertex = uploader.create_buffer(
            vertex_bytes.len() as u64,
            vertex_bytes,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            "mesh_vertices",
        )?;

        let instance = match uploader.create_buffer(
            instance_buffer_size(),
            bytemuck::cast_slice(instances),
            vk::BufferUsageFlags::VERTEX_BUFFER,
            "sprite_instances",
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                uploader.free(vertex);
                return Err(e);
            }
        };

        let index_bytes: &[u8] = bytemuck::cast_slice(indices);
        let index = match uploader.create_buffer(
            index_bytes.len() as u64,
            index_bytes,
            vk::BufferUsageFlags::INDEX_BUFFER,
            "mesh_indices",
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                uploader.free(vertex);
                uploader.free(instance);
                return Err(e);
            }
        };

        Ok(Self {
            vertex,
            instance,
            index,
            index_count: indices.len() as u32,
            instance_count: instances.len() as u32,
        })
    }

    /// Re-upload `data` into the buffer behind `slot`.
    pub fn update_vertex_buffer(
        &mut self,
        uploader: &Uploader<'_>,
        slot: VertexSlot,
        data: &[u8],
    ) -> Result<()> {
        match slot {
            VertexSlot::Mesh => uploader.update_buffer(&self.vertex, data),
            VertexSlot::Instance => uploader.update_buffer(&self.instance, data),
        }
    }

    /// Re-upload the instance array and record its length for drawing.
    pub fn update_instances(
        &mut self,
        uploader: &Uploader<'_>,
        instances: &[SpriteInstance],
    ) -> Result<()> {
        self.update_vertex_buffer(uploader, VertexSlot::Instance, bytemuck::cast_slice(instances))?;
        self.instance_count = instances.len() as u32;
        Ok(())
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Vertex buffers in binding order.
    pub fn vertex_buffers(&self) -> [vk::Buffer; 2] {
        [self.vertex.buffer, self.instance.buffer]
    }

    /// Free all three buffers.
    pub fn destroy(&mut self, allocator: &mut GpuAllocator) -> Result<()> {
        allocator.free_buffer(&mut self.index)?;
        allocator.free_buffer(&mut self.instance)?;
        allocator.free_buffer(&mut self.vertex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_map_to_pipeline_bindings() {
        assert_eq!(VertexSlot::Mesh.binding(), 0);
        assert_eq!(VertexSlot::Instance.binding(), 1);
    }

    #[test]
    fn instance_buffer_holds_every_instance() {
        assert_eq!(instance_buffer_size(), 255 * 40);
    }
}
