//! 资源表
//!
//! 以句柄索引所有长期存在的 GPU 资源（纹理、render target、uniform buffer）。
//! 资源的状态由 `BarrierTracker` 持有，这里只记录初始状态。

use ash::vk;
use slotmap::SlotMap;

use crate::barrier::infer_image_aspect;
use crate::device::GpuDevice;
use crate::handles::{GpuResourceHandle, SamplerHandle};
use crate::resource_state::{BufferState, ImageState, ResourceState};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageDesc {
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub usage: vk::ImageUsageFlags,
    pub mip_levels: u32,
    /// cubemap 为 6
    pub layers: u32,
    pub aspect: vk::ImageAspectFlags,
}

impl ImageDesc {
    pub fn new_2d(extent: vk::Extent2D, format: vk::Format, usage: vk::ImageUsageFlags) -> Self {
        Self {
            extent,
            format,
            usage,
            mip_levels: 1,
            layers: 1,
            aspect: infer_image_aspect(format),
        }
    }

    pub fn new_cube(extent: vk::Extent2D, format: vk::Format, usage: vk::ImageUsageFlags) -> Self {
        Self {
            layers: 6,
            ..Self::new_2d(extent, format, usage)
        }
    }

    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    #[inline]
    pub fn is_cube(&self) -> bool {
        self.layers == 6
    }

    /// 第 `mip` 级的大小，每个维度最小为 1
    pub fn mip_extent(&self, mip: u32) -> vk::Extent2D {
        vk::Extent2D {
            width: (self.extent.width >> mip).max(1),
            height: (self.extent.height >> mip).max(1),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferDesc {
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    /// 是否需要 CPU 可写的映射内存
    pub host_visible: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Image(ImageDesc),
    Buffer(BufferDesc),
}

/// 资源对应的原生 vulkan 对象
///
/// swapchain image 每一帧都会重新绑定
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NativeResource {
    #[default]
    Unbound,
    Image {
        image: vk::Image,
        view: vk::ImageView,
    },
    Buffer(vk::Buffer),
}

#[derive(Clone, Debug)]
pub struct GpuResource {
    pub name: String,
    pub kind: ResourceKind,
    pub native: NativeResource,
    pub initial_state: ResourceState,
}

impl GpuResource {
    #[inline]
    pub fn is_image(&self) -> bool {
        matches!(self.kind, ResourceKind::Image(_))
    }

    pub fn image_desc(&self) -> &ImageDesc {
        match &self.kind {
            ResourceKind::Image(desc) => desc,
            ResourceKind::Buffer(_) => panic!("resource {} is a buffer, not an image", self.name),
        }
    }

    pub fn buffer_desc(&self) -> &BufferDesc {
        match &self.kind {
            ResourceKind::Buffer(desc) => desc,
            ResourceKind::Image(_) => panic!("resource {} is an image, not a buffer", self.name),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SamplerDesc {
    pub name: String,
    pub filter: vk::Filter,
    pub address_mode: vk::SamplerAddressMode,
    pub min_lod: f32,
    pub max_lod: f32,
    pub native: vk::Sampler,
}

impl SamplerDesc {
    /// 线性过滤 + repeat，只采样 mip 0
    pub fn linear_repeat(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter: vk::Filter::LINEAR,
            address_mode: vk::SamplerAddressMode::REPEAT,
            min_lod: 0.0,
            max_lod: 0.0,
            native: vk::Sampler::null(),
        }
    }

    /// 可以访问完整 mip 链的采样器
    pub fn mip_chain(name: impl Into<String>, mip_levels: u32) -> Self {
        Self {
            max_lod: mip_levels as f32,
            ..Self::linear_repeat(name)
        }
    }
}

/// 资源表
#[derive(Default)]
pub struct ResourceTable {
    resources: SlotMap<GpuResourceHandle, GpuResource>,
    samplers: SlotMap<SamplerHandle, SamplerDesc>,
}

// 注册与创建
impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个由外部持有原生对象的资源（例如 swapchain image）
    pub fn register(
        &mut self,
        name: impl Into<String>,
        kind: ResourceKind,
        initial_state: impl Into<ResourceState>,
    ) -> GpuResourceHandle {
        let initial_state = initial_state.into();
        assert_eq!(
            matches!(kind, ResourceKind::Image(_)),
            matches!(initial_state, ResourceState::Image(_)),
            "initial state kind does not match resource kind"
        );
        self.resources.insert(GpuResource {
            name: name.into(),
            kind,
            native: NativeResource::Unbound,
            initial_state,
        })
    }

    /// 由 device 分配原生 image，初始状态为 UNDEFINED
    pub fn create_image(
        &mut self,
        device: &mut dyn GpuDevice,
        name: impl Into<String>,
        desc: ImageDesc,
    ) -> GpuResourceHandle {
        let name = name.into();
        let kind = ResourceKind::Image(desc);
        let native = device.allocate(&name, &kind);
        let handle = self.register(name, kind, ImageState::UNDEFINED);
        self.bind_native(handle, native);
        handle
    }

    pub fn create_buffer(
        &mut self,
        device: &mut dyn GpuDevice,
        name: impl Into<String>,
        desc: BufferDesc,
        initial_state: BufferState,
    ) -> GpuResourceHandle {
        let name = name.into();
        let kind = ResourceKind::Buffer(desc);
        let native = device.allocate(&name, &kind);
        let handle = self.register(name, kind, initial_state);
        self.bind_native(handle, native);
        handle
    }

    pub fn create_sampler(&mut self, device: &mut dyn GpuDevice, mut desc: SamplerDesc) -> SamplerHandle {
        desc.native = device.allocate_sampler(&desc);
        self.samplers.insert(desc)
    }

    /// 移除资源，并让 device 释放对应的原生对象
    pub fn destroy(&mut self, device: &mut dyn GpuDevice, handle: GpuResourceHandle) {
        if let Some(resource) = self.resources.remove(handle) {
            device.release(&resource.name, resource.native);
        }
    }

    /// 释放所有 sampler
    pub fn destroy_samplers(&mut self, device: &mut dyn GpuDevice) {
        for (_, sampler) in self.samplers.drain() {
            device.release_sampler(&sampler);
        }
    }
}

// getters
impl ResourceTable {
    #[inline]
    pub fn get(&self, handle: GpuResourceHandle) -> Option<&GpuResource> {
        self.resources.get(handle)
    }

    /// 句柄无效时 panic
    pub fn resource(&self, handle: GpuResourceHandle) -> &GpuResource {
        self.resources
            .get(handle)
            .unwrap_or_else(|| panic!("unknown gpu resource handle: {handle:?}"))
    }

    pub fn image_desc(&self, handle: GpuResourceHandle) -> &ImageDesc {
        self.resource(handle).image_desc()
    }

    pub fn sampler(&self, handle: SamplerHandle) -> &SamplerDesc {
        self.samplers
            .get(handle)
            .unwrap_or_else(|| panic!("unknown sampler handle: {handle:?}"))
    }

    pub fn handles(&self) -> impl Iterator<Item = GpuResourceHandle> + '_ {
        self.resources.keys()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

// update
impl ResourceTable {
    pub fn bind_native(&mut self, handle: GpuResourceHandle, native: NativeResource) {
        let resource = self
            .resources
            .get_mut(handle)
            .unwrap_or_else(|| panic!("unknown gpu resource handle: {handle:?}"));
        match (&resource.kind, native) {
            (_, NativeResource::Unbound)
            | (ResourceKind::Image(_), NativeResource::Image { .. })
            | (ResourceKind::Buffer(_), NativeResource::Buffer(_)) => resource.native = native,
            _ => panic!("native object kind does not match resource {}", resource.name),
        }
    }

    /// swapchain 重建之后更新 backbuffer 的大小
    pub fn set_image_extent(&mut self, handle: GpuResourceHandle, extent: vk::Extent2D) {
        let resource = self
            .resources
            .get_mut(handle)
            .unwrap_or_else(|| panic!("unknown gpu resource handle: {handle:?}"));
        match &mut resource.kind {
            ResourceKind::Image(desc) => desc.extent = extent,
            ResourceKind::Buffer(_) => panic!("resource {} is a buffer, not an image", resource.name),
        }
    }
}
