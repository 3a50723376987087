//! Pass 描述
//!
//! 一个 pass 由数据描述：用到的资源和状态、color target、shader 绑定，以及一次 draw / dispatch / blit。

use toyframe_gfx::command_recorder::ImageViewKind;
use toyframe_gfx::handles::{GpuResourceHandle, SamplerHandle};
use toyframe_gfx::resource_state::{BufferState, ImageState, ResourceState};

/// pass 中引用的资源
///
/// backbuffer 与帧 uniform 每一帧都不同，在录制时才解析
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    Fixed(GpuResourceHandle),
    Backbuffer,
    FrameUniform,
}

impl From<GpuResourceHandle> for ResourceRef {
    fn from(handle: GpuResourceHandle) -> Self {
        ResourceRef::Fixed(handle)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColorTarget {
    pub target: ResourceRef,
    pub clear: Option<[f32; 4]>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub binding: u32,
    pub resource: ResourceRef,
    pub sampler: Option<SamplerHandle>,
    pub view: ImageViewKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invocation {
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
    Dispatch {
        group_count: [u32; 3],
    },
    /// 整张 mip 0 的拷贝，大小不同时会缩放
    Blit {
        src: ResourceRef,
        dst: ResourceRef,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PassDesc {
    pub name: String,
    /// shader program 的名字；blit 没有 program
    pub program: Option<String>,
    pub usages: Vec<(ResourceRef, ResourceState)>,
    pub color_targets: Vec<ColorTarget>,
    pub bindings: Vec<Binding>,
    pub invocation: Invocation,
}

// new & init
impl PassDesc {
    /// 全屏三角形：3 个顶点，顶点在 vertex shader 中生成
    pub fn fullscreen(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: Some(program.into()),
            usages: vec![],
            color_targets: vec![],
            bindings: vec![],
            invocation: Invocation::Draw {
                vertex_count: 3,
                instance_count: 1,
            },
        }
    }

    pub fn compute(name: impl Into<String>, program: impl Into<String>, group_count: [u32; 3]) -> Self {
        Self {
            name: name.into(),
            program: Some(program.into()),
            usages: vec![],
            color_targets: vec![],
            bindings: vec![],
            invocation: Invocation::Dispatch { group_count },
        }
    }

    pub fn blit(name: impl Into<String>, src: impl Into<ResourceRef>, dst: impl Into<ResourceRef>) -> Self {
        let src = src.into();
        let dst = dst.into();
        Self {
            name: name.into(),
            program: None,
            usages: vec![(src, ImageState::TRANSFER_SRC.into()), (dst, ImageState::TRANSFER_DST.into())],
            color_targets: vec![],
            bindings: vec![],
            invocation: Invocation::Blit { src, dst },
        }
    }
}

// builder
impl PassDesc {
    pub fn usage(mut self, resource: impl Into<ResourceRef>, state: impl Into<ResourceState>) -> Self {
        self.usages.push((resource.into(), state.into()));
        self
    }

    pub fn color_target(mut self, target: impl Into<ResourceRef>, clear: Option<[f32; 4]>) -> Self {
        let target = target.into();
        self.usages.push((target, ImageState::COLOR_ATTACHMENT_WRITE.into()));
        self.color_targets.push(ColorTarget { target, clear });
        self
    }

    /// 绑定本帧的 uniform buffer
    pub fn uniform(mut self, binding: u32, state: BufferState) -> Self {
        self.usages.push((ResourceRef::FrameUniform, state.into()));
        self.bindings.push(Binding {
            binding,
            resource: ResourceRef::FrameUniform,
            sampler: None,
            view: ImageViewKind::Default,
        });
        self
    }

    /// 采样一张 image
    pub fn sampled(
        mut self,
        binding: u32,
        image: impl Into<ResourceRef>,
        sampler: SamplerHandle,
        view: ImageViewKind,
        state: ImageState,
    ) -> Self {
        let image = image.into();
        self.usages.push((image, state.into()));
        self.bindings.push(Binding {
            binding,
            resource: image,
            sampler: Some(sampler),
            view,
        });
        self
    }

    /// storage image
    pub fn storage(mut self, binding: u32, image: impl Into<ResourceRef>, state: ImageState) -> Self {
        let image = image.into();
        self.usages.push((image, state.into()));
        self.bindings.push(Binding {
            binding,
            resource: image,
            sampler: None,
            view: ImageViewKind::Default,
        });
        self
    }
}

// getters
impl PassDesc {
    /// pass 是否写入了资源
    pub fn writes(&self, resource: ResourceRef) -> bool {
        self.usages.iter().any(|(r, state)| *r == resource && state.is_write())
    }

    pub fn uses(&self, resource: ResourceRef) -> bool {
        self.usages.iter().any(|(r, _)| *r == resource)
    }
}
