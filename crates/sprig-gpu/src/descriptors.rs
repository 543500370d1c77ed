//! The sprite descriptor set: one camera uniform buffer for the vertex stage
//! and one combined atlas sampler for the fragment stage.

use crate::error::{Result, VkResultExt};
use ash::vk;

/// Binding of the camera uniform buffer.
pub const UNIFORM_BINDING: u32 = 0;
/// Binding of the atlas sampler.
pub const SAMPLER_BINDING: u32 = 1;

/// Layout bindings of a sprite set.
pub fn sprite_set_bindings() -> [vk::DescriptorSetLayoutBinding<'static>; 2] {
    [
        vk::DescriptorSetLayoutBinding::default()
            .binding(UNIFORM_BINDING)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX),
        vk::DescriptorSetLayoutBinding::default()
            .binding(SAMPLER_BINDING)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT),
    ]
}

/// Pool sizes for `sets` sprite sets.
pub fn sprite_pool_sizes(sets: u32) -> [vk::DescriptorPoolSize; 2] {
    [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: sets,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: sets,
        },
    ]
}

/// Create the sprite set layout.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_sprite_set_layout(device: &ash::Device) -> Result<vk::DescriptorSetLayout> {
    let bindings = sprite_set_bindings();
    let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
    unsafe { device.create_descriptor_set_layout(&layout_info, None) }
        .during("vkCreateDescriptorSetLayout")
}

/// Pool sized for a fixed number of sprite sets.
pub struct SpriteDescriptorPool {
    pool: vk::DescriptorPool,
    sets: u32,
}

impl SpriteDescriptorPool {
    /// Create a pool holding exactly `sets` sprite sets.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device, sets: u32) -> Result<Self> {
        let pool_sizes = sprite_pool_sizes(sets);
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(sets)
            .pool_sizes(&pool_sizes);

        let pool = unsafe { device.create_descriptor_pool(&create_info, None) }
            .during("vkCreateDescriptorPool")?;
        Ok(Self { pool, sets })
    }

    /// Allocate every set of the pool with `layout`.
    ///
    /// # Safety
    /// The device must be valid and `layout` must come from
    /// [`create_sprite_set_layout`].
    pub unsafe fn allocate(
        &self,
        device: &ash::Device,
        layout: vk::DescriptorSetLayout,
    ) -> Result<Vec<vk::DescriptorSet>> {
        let layouts = vec![layout; self.sets as usize];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        unsafe { device.allocate_descriptor_sets(&alloc_info) }.during("vkAllocateDescriptorSets")
    }

    /// Destroy the pool, freeing its sets.
    ///
    /// # Safety
    /// The device must be valid and the pool must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe { device.destroy_descriptor_pool(self.pool, None) };
    }
}

/// Point `dst_set` at the camera buffer and the atlas.
///
/// # Safety
/// Device, buffer, view and sampler must be valid.
pub unsafe fn write_sprite_set(
    device: &ash::Device,
    dst_set: vk::DescriptorSet,
    uniform: vk::Buffer,
    uniform_range: u64,
    atlas_view: vk::ImageView,
    atlas_sampler: vk::Sampler,
) {
    let buffer_info = vk::DescriptorBufferInfo::default()
        .buffer(uniform)
        .offset(0)
        .range(uniform_range);
    let image_info = vk::DescriptorImageInfo::default()
        .image_view(atlas_view)
        .sampler(atlas_sampler)
        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);

    let writes = [
        vk::WriteDescriptorSet::default()
            .dst_set(dst_set)
            .dst_binding(UNIFORM_BINDING)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(std::slice::from_ref(&buffer_info)),
        vk::WriteDescriptorSet::default()
            .dst_set(dst_set)
            .dst_binding(SAMPLER_BINDING)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(std::slice::from_ref(&image_info)),
    ];

    unsafe { device.update_descriptor_sets(&writes, &[]) };
}
