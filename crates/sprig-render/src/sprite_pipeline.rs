//! The fixed sprite pipeline: render pass, descriptor layout and pipeline.

use std::mem::{offset_of, size_of};
use std::path::{Path, PathBuf};

use ash::vk;
use sprig_core::limits::SHADER_FILE_BYTES_CAP;
use sprig_core::{MeshVertex, SpriteInstance};
use sprig_gpu::pipeline::vertex_instance_bindings;
use sprig_gpu::{
    create_render_pass, create_sprite_set_layout, read_shader_file, GraphicsPipeline,
    GraphicsPipelineConfig, Result,
};
use tracing::info;

/// Shader inputs: the quad corner from binding 0 and the instance record
/// from binding 1.
pub fn sprite_vertex_attributes() -> Vec<vk::VertexInputAttributeDescription> {
    vec![
        vk::VertexInputAttributeDescription {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32_SFLOAT,
            offset: offset_of!(MeshVertex, position) as u32,
        },
        vk::VertexInputAttributeDescription {
            location: 1,
            binding: 1,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: offset_of!(SpriteInstance, position) as u32,
        },
        vk::VertexInputAttributeDescription {
            location: 2,
            binding: 1,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: offset_of!(SpriteInstance, rotation) as u32,
        },
        vk::VertexInputAttributeDescription {
            location: 3,
            binding: 1,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: offset_of!(SpriteInstance, scale) as u32,
        },
        vk::VertexInputAttributeDescription {
            location: 4,
            binding: 1,
            format: vk::Format::R32_UINT,
            offset: offset_of!(SpriteInstance, texture_index) as u32,
        },
    ]
}

/// Pipeline configuration for the sprite shaders.
pub fn sprite_pipeline_config(vertex_shader: Vec<u32>, fragment_shader: Vec<u32>) -> GraphicsPipelineConfig {
    GraphicsPipelineConfig {
        vertex_shader,
        fragment_shader,
        vertex_bindings: vertex_instance_bindings(
            size_of::<MeshVertex>() as u32,
            size_of::<SpriteInstance>() as u32,
        )
        .to_vec(),
        vertex_attributes: sprite_vertex_attributes(),
        ..GraphicsPipelineConfig::default()
    }
}

/// Render pass, descriptor layout and the linked sprite pipeline.
///
/// The descriptor layout outlives format changes so descriptor sets stay
/// valid; render pass and pipeline are rebuilt with [`Self::rebuild`].
pub struct SpritePipeline {
    pub render_pass: vk::RenderPass,
    pub set_layout: vk::DescriptorSetLayout,
    pub pipeline: GraphicsPipeline,
    pub format: vk::Format,
    vertex_shader: PathBuf,
    fragment_shader: PathBuf,
}

impl SpritePipeline {
    /// Build everything for a swapchain of `format`.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(
        device: &ash::Device,
        format: vk::Format,
        vertex_shader: impl Into<PathBuf>,
        fragment_shader: impl Into<PathBuf>,
    ) -> Result<Self> {
        let vertex_shader = vertex_shader.into();
        let fragment_shader = fragment_shader.into();

        let set_layout = unsafe { create_sprite_set_layout(device) }?;

        let (render_pass, pipeline) = match unsafe {
            link_for_format(device, format, set_layout, &vertex_shader, &fragment_shader)
        } {
            Ok(parts) => parts,
            Err(e) => {
                unsafe { device.destroy_descriptor_set_layout(set_layout, None) };
                return Err(e);
            }
        };

        Ok(Self {
            render_pass,
            set_layout,
            pipeline,
            format,
            vertex_shader,
            fragment_shader,
        })
    }

    /// Rebuild render pass and pipeline for a new swapchain format.
    ///
    /// # Safety
    /// The device must be valid and idle.
    pub unsafe fn rebuild(&mut self, device: &ash::Device, format: vk::Format) -> Result<()> {
        let (render_pass, pipeline) = unsafe {
            link_for_format(
                device,
                format,
                self.set_layout,
                &self.vertex_shader,
                &self.fragment_shader,
            )
        }?;

        unsafe {
            self.pipeline.destroy(device);
            device.destroy_render_pass(self.render_pass, None);
        }
        self.render_pass = render_pass;
        self.pipeline = pipeline;
        self.format = format;
        Ok(())
    }

    /// Destroy pipeline, layout and render pass.
    ///
    /// # Safety
    /// The device must be valid and the pipeline must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            self.pipeline.destroy(device);
            device.destroy_descriptor_set_layout(self.set_layout, None);
            device.destroy_render_pass(self.render_pass, None);
        }
    }
}

unsafe fn link_for_format(
    device: &ash::Device,
    format: vk::Format,
    set_layout: vk::DescriptorSetLayout,
    vertex_shader: &Path,
    fragment_shader: &Path,
) -> Result<(vk::RenderPass, GraphicsPipeline)> {
    let vertex_code = read_shader_file(vertex_shader, SHADER_FILE_BYTES_CAP)?;
    let fragment_code = read_shader_file(fragment_shader, SHADER_FILE_BYTES_CAP)?;
    let config = sprite_pipeline_config(vertex_code, fragment_code);

    let render_pass = unsafe { create_render_pass(device, format) }?;
    match unsafe { GraphicsPipeline::new(device, &config, &[set_layout], render_pass) } {
        Ok(pipeline) => {
            info!("Created sprite pipeline for {format:?}");
            Ok((render_pass, pipeline))
        }
        Err(e) => {
            unsafe { device.destroy_render_pass(render_pass, None) };
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_match_the_instance_record() {
        let attrs = sprite_vertex_attributes();
        let summary: Vec<_> = attrs
            .iter()
            .map(|a| (a.location, a.binding, a.format, a.offset))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, 0, vk::Format::R32G32_SFLOAT, 0),
                (1, 1, vk::Format::R32G32B32_SFLOAT, 0),
                (2, 1, vk::Format::R32G32B32_SFLOAT, 12),
                (3, 1, vk::Format::R32G32B32_SFLOAT, 24),
                (4, 1, vk::Format::R32_UINT, 36),
            ]
        );
    }

    #[test]
    fn config_uses_fixed_sprite_state() {
        let config = sprite_pipeline_config(vec![0x0723_0203], vec![0x0723_0203]);
        assert_eq!(config.vertex_bindings.len(), 2);
        assert_eq!(config.vertex_bindings[0].stride, 8);
        assert_eq!(config.vertex_bindings[1].stride, 40);
        assert_eq!(config.vertex_bindings[1].input_rate, vk::VertexInputRate::INSTANCE);
        assert_eq!(config.topology, vk::PrimitiveTopology::TRIANGLE_LIST);
        assert_eq!(config.cull_mode, vk::CullModeFlags::BACK);
        assert_eq!(config.front_face, vk::FrontFace::COUNTER_CLOCKWISE);
        assert!(config.alpha_blend);
    }
}
