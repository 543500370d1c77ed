//! Shader loading and graphics pipeline creation.

use crate::error::{GpuError, Result, VkResultExt};
use ash::vk;
use std::fs::File;
use std::path::Path;

/// Reject shader binaries larger than `capacity` bytes.
pub fn check_shader_size(path: &Path, size: u64, capacity: u64) -> Result<()> {
    if size > capacity {
        return Err(GpuError::ShaderTooLarge {
            path: path.display().to_string(),
            size,
            capacity,
        });
    }
    Ok(())
}

/// Read a precompiled SPIR-V binary, refusing files over `capacity` bytes.
pub fn read_shader_file(path: impl AsRef<Path>, capacity: u64) -> Result<Vec<u32>> {
    let path = path.as_ref();
    let read_err = |source| GpuError::ShaderRead {
        path: path.display().to_string(),
        source,
    };

    let mut file = File::open(path).map_err(read_err)?;
    let size = file.metadata().map_err(read_err)?.len();
    check_shader_size(path, size, capacity)?;

    let code = ash::util::read_spv(&mut file).map_err(read_err)?;
    tracing::debug!("loaded shader {} ({size} bytes)", path.display());
    Ok(code)
}

/// Binding 0 advances per vertex, binding 1 per instance.
pub fn vertex_instance_bindings(
    vertex_stride: u32,
    instance_stride: u32,
) -> [vk::VertexInputBindingDescription; 2] {
    [
        vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(vertex_stride)
            .input_rate(vk::VertexInputRate::VERTEX),
        vk::VertexInputBindingDescription::default()
            .binding(1)
            .stride(instance_stride)
            .input_rate(vk::VertexInputRate::INSTANCE),
    ]
}

/// Standard "over" blending: `src * srcAlpha + dst * (1 - srcAlpha)`.
pub fn alpha_blend_attachment() -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(true)
        .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
        .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
        .color_blend_op(vk::BlendOp::ADD)
        .src_alpha_blend_factor(vk::BlendFactor::ONE)
        .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
        .alpha_blend_op(vk::BlendOp::ADD)
        .color_write_mask(vk::ColorComponentFlags::RGBA)
}

/// Graphics pipeline configuration.
#[derive(Clone)]
pub struct GraphicsPipelineConfig {
    pub vertex_shader: Vec<u32>,
    pub fragment_shader: Vec<u32>,
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub topology: vk::PrimitiveTopology,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub alpha_blend: bool,
}

impl Default for GraphicsPipelineConfig {
    fn default() -> Self {
        Self {
            vertex_shader: Vec::new(),
            fragment_shader: Vec::new(),
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            alpha_blend: true,
        }
    }
}

/// Graphics pipeline wrapper.
pub struct GraphicsPipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Create a graphics pipeline for subpass 0 of `render_pass`.
    ///
    /// Viewport and scissor are dynamic. Depth and stencil are off.
    ///
    /// # Safety
    /// The device must be valid and shader code must be valid SPIR-V.
    pub unsafe fn new(
        device: &ash::Device,
        config: &GraphicsPipelineConfig,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
        render_pass: vk::RenderPass,
    ) -> Result<Self> {
        let vert_module = unsafe { create_shader_module(device, &config.vertex_shader) }?;
        let frag_module = match unsafe { create_shader_module(device, &config.fragment_shader) } {
            Ok(module) => module,
            Err(e) => {
                unsafe { device.destroy_shader_module(vert_module, None) };
                return Err(e);
            }
        };

        let result = unsafe {
            Self::link(
                device,
                config,
                descriptor_set_layouts,
                render_pass,
                vert_module,
                frag_module,
            )
        };

        // Modules are only needed while linking.
        unsafe {
            device.destroy_shader_module(vert_module, None);
            device.destroy_shader_module(frag_module, None);
        }

        result
    }

    unsafe fn link(
        device: &ash::Device,
        config: &GraphicsPipelineConfig,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
        render_pass: vk::RenderPass,
        vert_module: vk::ShaderModule,
        frag_module: vk::ShaderModule,
    ) -> Result<Self> {
        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vert_module)
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(frag_module)
                .name(c"main"),
        ];

        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&config.vertex_bindings)
            .vertex_attribute_descriptions(&config.vertex_attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(config.topology)
            .primitive_restart_enable(false);

        // Viewport (dynamic)
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(config.polygon_mode)
            .cull_mode(config.cull_mode)
            .front_face(config.front_face)
            .depth_bias_enable(false)
            .line_width(1.0);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .sample_shading_enable(false);

        let blend_attachment = if config.alpha_blend {
            alpha_blend_attachment()
        } else {
            vk::PipelineColorBlendAttachmentState::default()
                .blend_enable(false)
                .color_write_mask(vk::ColorComponentFlags::RGBA)
        };
        let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(std::slice::from_ref(&blend_attachment));

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let layout_info =
            vk::PipelineLayoutCreateInfo::default().set_layouts(descriptor_set_layouts);
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None) }
            .during("vkCreatePipelineLayout")?;

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        };
        match pipelines {
            Ok(pipelines) => Ok(Self {
                pipeline: pipelines[0],
                layout,
            }),
            Err((_, result)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                Err(GpuError::Vulkan {
                    op: "vkCreateGraphicsPipelines",
                    result,
                })
            }
        }
    }

    /// Destroy the pipeline.
    ///
    /// # Safety
    /// The device must be valid and the pipeline must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

unsafe fn create_shader_module(device: &ash::Device, code: &[u32]) -> Result<vk::ShaderModule> {
    let info = vk::ShaderModuleCreateInfo::default().code(code);
    unsafe { device.create_shader_module(&info, None) }.during("vkCreateShaderModule")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    fn temp_shader(name: &str, words: &[u32]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("sprig-{}-{name}", std::process::id()));
        let mut file = File::create(&path).unwrap();
        for word in words {
            file.write_all(&word.to_le_bytes()).unwrap();
        }
        path
    }

    #[test]
    fn size_at_capacity_is_accepted() {
        assert!(check_shader_size(Path::new("a.spv"), 1024, 1024).is_ok());
    }

    #[test]
    fn oversize_shader_is_rejected() {
        let err = check_shader_size(Path::new("big.spv"), 50 * 1024 + 1, 50 * 1024).unwrap_err();
        assert!(matches!(
            err,
            GpuError::ShaderTooLarge {
                size: 51_201,
                capacity: 51_200,
                ..
            }
        ));
    }

    #[test]
    fn reads_spirv_words() {
        let path = temp_shader("ok.spv", &[SPIRV_MAGIC, 0x0001_0000, 7]);
        let code = read_shader_file(&path, 1024).unwrap();
        assert_eq!(code, vec![SPIRV_MAGIC, 0x0001_0000, 7]);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn cap_applies_to_file_reads() {
        let path = temp_shader("large.spv", &[SPIRV_MAGIC; 8]);
        assert!(matches!(
            read_shader_file(&path, 16),
            Err(GpuError::ShaderTooLarge { size: 32, .. })
        ));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_is_a_read_error() {
        assert!(matches!(
            read_shader_file("does/not/exist.spv", 1024),
            Err(GpuError::ShaderRead { .. })
        ));
    }

    #[test]
    fn bindings_split_vertex_and_instance_rates() {
        let [vertex, instance] = vertex_instance_bindings(8, 40);
        assert_eq!((vertex.binding, vertex.stride), (0, 8));
        assert_eq!(vertex.input_rate, vk::VertexInputRate::VERTEX);
        assert_eq!((instance.binding, instance.stride), (1, 40));
        assert_eq!(instance.input_rate, vk::VertexInputRate::INSTANCE);
    }

    #[test]
    fn blend_is_source_over() {
        let blend = alpha_blend_attachment();
        assert_eq!(blend.blend_enable, vk::TRUE);
        assert_eq!(blend.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
        assert_eq!(
            blend.dst_color_blend_factor,
            vk::BlendFactor::ONE_MINUS_SRC_ALPHA
        );
    }
}
