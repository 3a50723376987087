//! 资源状态定义
//!
//! 封装 Vulkan 的 pipeline stage、access mask 和 image layout，
//! 提供 demo 中用到的常用状态组合。

use ash::vk;

/// 图像资源状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageState {
    pub stage: vk::PipelineStageFlags2,
    pub access: vk::AccessFlags2,
    pub layout: vk::ImageLayout,
}

impl Default for ImageState {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

// new & 常量定义
impl ImageState {
    #[inline]
    pub const fn new(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2, layout: vk::ImageLayout) -> Self {
        Self { stage, access, layout }
    }

    /// 未定义状态（初始状态或不关心内容）
    pub const UNDEFINED: Self =
        Self::new(vk::PipelineStageFlags2::TOP_OF_PIPE, vk::AccessFlags2::NONE, vk::ImageLayout::UNDEFINED);

    /// 刚 acquire 到的 swapchain image
    ///
    /// 内容不需要保留；stage 与 submit 时等待 image-ready 的 stage 一致
    pub const SWAPCHAIN_ACQUIRED: Self = Self::new(
        vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        vk::AccessFlags2::NONE,
        vk::ImageLayout::UNDEFINED,
    );

    /// 颜色附件输出
    pub const COLOR_ATTACHMENT_WRITE: Self = Self::new(
        vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    );

    /// 片段着色器采样
    pub const SHADER_READ_FRAGMENT: Self = Self::new(
        vk::PipelineStageFlags2::FRAGMENT_SHADER,
        vk::AccessFlags2::SHADER_SAMPLED_READ,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    );

    /// 计算着色器采样
    pub const SHADER_READ_COMPUTE: Self = Self::new(
        vk::PipelineStageFlags2::COMPUTE_SHADER,
        vk::AccessFlags2::SHADER_SAMPLED_READ,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    );

    /// 计算着色器写 storage image
    pub const STORAGE_WRITE_COMPUTE: Self = Self::new(
        vk::PipelineStageFlags2::COMPUTE_SHADER,
        vk::AccessFlags2::SHADER_STORAGE_WRITE,
        vk::ImageLayout::GENERAL,
    );

    pub const TRANSFER_SRC: Self = Self::new(
        vk::PipelineStageFlags2::TRANSFER,
        vk::AccessFlags2::TRANSFER_READ,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
    );

    pub const TRANSFER_DST: Self = Self::new(
        vk::PipelineStageFlags2::TRANSFER,
        vk::AccessFlags2::TRANSFER_WRITE,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    );

    /// 呈现
    ///
    /// stage 需要与 submit 时 signal 的 stage 匹配，access 为空
    pub const PRESENT: Self = Self::new(
        vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        vk::AccessFlags2::NONE,
        vk::ImageLayout::PRESENT_SRC_KHR,
    );

    const WRITE_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
        vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw()
            | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE.as_raw()
            | vk::AccessFlags2::TRANSFER_WRITE.as_raw()
            | vk::AccessFlags2::MEMORY_WRITE.as_raw(),
    );

    #[inline]
    pub fn is_write(&self) -> bool {
        self.access.intersects(Self::WRITE_ACCESS)
    }

    /// 用作 barrier src 的 access：读操作不需要 make available
    #[inline]
    pub fn src_access(&self) -> vk::AccessFlags2 {
        self.access
            & !(vk::AccessFlags2::SHADER_SAMPLED_READ
                | vk::AccessFlags2::SHADER_STORAGE_READ
                | vk::AccessFlags2::TRANSFER_READ
                | vk::AccessFlags2::MEMORY_READ)
    }
}

/// 缓冲区资源状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferState {
    pub stage: vk::PipelineStageFlags2,
    pub access: vk::AccessFlags2,
}

impl Default for BufferState {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

// new & 常量定义
impl BufferState {
    #[inline]
    pub const fn new(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        Self { stage, access }
    }

    pub const UNDEFINED: Self = Self::new(vk::PipelineStageFlags2::TOP_OF_PIPE, vk::AccessFlags2::NONE);

    /// CPU 通过映射内存写入
    pub const HOST_WRITE: Self = Self::new(vk::PipelineStageFlags2::HOST, vk::AccessFlags2::HOST_WRITE);

    pub const UNIFORM_FRAGMENT: Self =
        Self::new(vk::PipelineStageFlags2::FRAGMENT_SHADER, vk::AccessFlags2::UNIFORM_READ);

    pub const UNIFORM_COMPUTE: Self =
        Self::new(vk::PipelineStageFlags2::COMPUTE_SHADER, vk::AccessFlags2::UNIFORM_READ);

    pub const TRANSFER_SRC: Self = Self::new(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_READ);

    pub const TRANSFER_DST: Self = Self::new(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_WRITE);

    const WRITE_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
        vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw()
            | vk::AccessFlags2::TRANSFER_WRITE.as_raw()
            | vk::AccessFlags2::HOST_WRITE.as_raw()
            | vk::AccessFlags2::MEMORY_WRITE.as_raw(),
    );

    #[inline]
    pub fn is_write(&self) -> bool {
        self.access.intersects(Self::WRITE_ACCESS)
    }
}

/// image 或 buffer 的状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Image(ImageState),
    Buffer(BufferState),
}

impl ResourceState {
    #[inline]
    pub fn is_write(&self) -> bool {
        match self {
            ResourceState::Image(state) => state.is_write(),
            ResourceState::Buffer(state) => state.is_write(),
        }
    }

    #[inline]
    pub fn stage(&self) -> vk::PipelineStageFlags2 {
        match self {
            ResourceState::Image(state) => state.stage,
            ResourceState::Buffer(state) => state.stage,
        }
    }

    #[inline]
    pub fn access(&self) -> vk::AccessFlags2 {
        match self {
            ResourceState::Image(state) => state.access,
            ResourceState::Buffer(state) => state.access,
        }
    }

    #[inline]
    pub fn layout(&self) -> Option<vk::ImageLayout> {
        match self {
            ResourceState::Image(state) => Some(state.layout),
            ResourceState::Buffer(_) => None,
        }
    }
}

impl From<ImageState> for ResourceState {
    fn from(state: ImageState) -> Self {
        ResourceState::Image(state)
    }
}

impl From<BufferState> for ResourceState {
    fn from(state: BufferState) -> Self {
        ResourceState::Buffer(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_detection() {
        assert!(ImageState::COLOR_ATTACHMENT_WRITE.is_write());
        assert!(ImageState::STORAGE_WRITE_COMPUTE.is_write());
        assert!(ImageState::TRANSFER_DST.is_write());
        assert!(!ImageState::SHADER_READ_FRAGMENT.is_write());
        assert!(!ImageState::PRESENT.is_write());

        assert!(BufferState::HOST_WRITE.is_write());
        assert!(!BufferState::UNIFORM_FRAGMENT.is_write());
    }

    #[test]
    fn test_src_access_drops_reads() {
        assert_eq!(ImageState::SHADER_READ_FRAGMENT.src_access(), vk::AccessFlags2::NONE);
        assert_eq!(
            ImageState::COLOR_ATTACHMENT_WRITE.src_access(),
            vk::AccessFlags2::COLOR_ATTACHMENT_WRITE
        );
    }

    #[test]
    fn test_resource_state_accessors() {
        let image: ResourceState = ImageState::TRANSFER_SRC.into();
        assert_eq!(image.layout(), Some(vk::ImageLayout::TRANSFER_SRC_OPTIMAL));
        assert_eq!(image.stage(), vk::PipelineStageFlags2::TRANSFER);

        let buffer: ResourceState = BufferState::UNIFORM_COMPUTE.into();
        assert_eq!(buffer.layout(), None);
        assert_eq!(buffer.access(), vk::AccessFlags2::UNIFORM_READ);
    }
}
