//! 把 `CommandList` 翻译为 vulkan 命令
//!
//! 分两步：`translate` 从资源表中解析原生对象，生成 `VkCommand`；
//! `VkCommandEncoder` 把它们写入 command buffer，pipeline 与 descriptor 的绑定交给 `VkBindingBackend`。

use ash::vk;
use itertools::Itertools;

use crate::barrier::BarrierBatch;
use crate::command_recorder::{BlitRegion, BufferImageCopy, ColorAttachment, CommandList, GfxCommand, ResolvedBinding};
use crate::handles::{GpuResourceHandle, PipelineHandle};
use crate::resource_table::{NativeResource, ResourceTable};

/// pipeline 与 descriptor 的实际持有者
pub trait VkBindingBackend {
    fn native_pipeline(&self, pipeline: PipelineHandle) -> vk::Pipeline;

    /// 写入并绑定 descriptor set
    fn bind_resources(
        &mut self,
        cmd: vk::CommandBuffer,
        bind_point: vk::PipelineBindPoint,
        pipeline: PipelineHandle,
        bindings: &[ResolvedBinding],
        resources: &ResourceTable,
    );
}

/// 一条已经解析出原生对象的 vulkan 命令
///
/// `translate` 只做翻译，不接触 `ash::Device`；`VkCommandEncoder` 再把结果写入 command buffer
pub enum VkCommand<'a> {
    PipelineBarrier {
        image_barriers: Vec<vk::ImageMemoryBarrier2<'static>>,
        buffer_barriers: Vec<vk::BufferMemoryBarrier2<'static>>,
    },
    BeginRendering {
        attachments: Vec<vk::RenderingAttachmentInfo<'static>>,
        area: vk::Rect2D,
        viewport: vk::Viewport,
    },
    EndRendering,
    BindPipeline {
        pipeline: PipelineHandle,
        bind_point: vk::PipelineBindPoint,
    },
    BindResources {
        pipeline: PipelineHandle,
        bind_point: vk::PipelineBindPoint,
        bindings: &'a [ResolvedBinding],
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
    Dispatch {
        group_count: [u32; 3],
    },
    BlitImage {
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        region: vk::ImageBlit,
        filter: vk::Filter,
    },
    CopyBufferToImage {
        buffer: vk::Buffer,
        image: vk::Image,
        image_layout: vk::ImageLayout,
        region: vk::BufferImageCopy,
    },
}

/// 把 `CommandList` 翻译为 `VkCommand`，原生对象从资源表中读取
///
/// # Panics
/// 命令引用的资源没有绑定原生对象
pub fn translate<'a>(list: &'a CommandList, resources: &ResourceTable) -> Vec<VkCommand<'a>> {
    list.commands()
        .iter()
        .map(|command| match command {
            GfxCommand::PipelineBarrier(batch) => translate_barriers(batch, resources),
            GfxCommand::BeginRendering {
                color_attachments,
                render_area,
            } => translate_begin_rendering(color_attachments, *render_area, resources),
            GfxCommand::EndRendering => VkCommand::EndRendering,
            GfxCommand::BindPipeline { pipeline, bind_point } => VkCommand::BindPipeline {
                pipeline: *pipeline,
                bind_point: *bind_point,
            },
            GfxCommand::BindResources {
                pipeline,
                bind_point,
                bindings,
            } => VkCommand::BindResources {
                pipeline: *pipeline,
                bind_point: *bind_point,
                bindings,
            },
            GfxCommand::Draw {
                vertex_count,
                instance_count,
            } => VkCommand::Draw {
                vertex_count: *vertex_count,
                instance_count: *instance_count,
            },
            GfxCommand::Dispatch { group_count } => VkCommand::Dispatch {
                group_count: *group_count,
            },
            GfxCommand::BlitImage(region) => VkCommand::BlitImage {
                src: native_image(resources, region.src).0,
                src_layout: region.src_layout,
                dst: native_image(resources, region.dst).0,
                dst_layout: region.dst_layout,
                region: vk_image_blit(region),
                filter: region.filter,
            },
            GfxCommand::CopyBufferToImage(copy) => VkCommand::CopyBufferToImage {
                buffer: native_buffer(resources, copy.buffer),
                image: native_image(resources, copy.image).0,
                image_layout: copy.image_layout,
                region: vk_buffer_image_copy(copy),
            },
        })
        .collect()
}

fn translate_barriers(batch: &BarrierBatch, resources: &ResourceTable) -> VkCommand<'static> {
    VkCommand::PipelineBarrier {
        image_barriers: batch
            .image_barriers
            .iter()
            .map(|barrier| barrier.to_vk(native_image(resources, barrier.handle).0))
            .collect_vec(),
        buffer_barriers: batch
            .buffer_barriers
            .iter()
            .map(|barrier| barrier.to_vk(native_buffer(resources, barrier.handle)))
            .collect_vec(),
    }
}

fn translate_begin_rendering(
    color_attachments: &[ColorAttachment],
    render_area: vk::Extent2D,
    resources: &ResourceTable,
) -> VkCommand<'static> {
    let attachments = color_attachments
        .iter()
        .map(|attachment| {
            let info = vk::RenderingAttachmentInfo::default()
                .image_view(native_image(resources, attachment.image).1)
                .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .store_op(vk::AttachmentStoreOp::STORE);
            match attachment.clear {
                Some(color) => info.load_op(vk::AttachmentLoadOp::CLEAR).clear_value(vk::ClearValue {
                    color: vk::ClearColorValue { float32: color },
                }),
                None => info.load_op(vk::AttachmentLoadOp::DONT_CARE),
            }
        })
        .collect_vec();

    VkCommand::BeginRendering {
        attachments,
        area: vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent: render_area,
        },
        viewport: vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: render_area.width as f32,
            height: render_area.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        },
    }
}

fn native_image(resources: &ResourceTable, handle: GpuResourceHandle) -> (vk::Image, vk::ImageView) {
    let resource = resources.resource(handle);
    match resource.native {
        NativeResource::Image { image, view } => (image, view),
        _ => panic!("image {} has no native object bound", resource.name),
    }
}

fn native_buffer(resources: &ResourceTable, handle: GpuResourceHandle) -> vk::Buffer {
    let resource = resources.resource(handle);
    match resource.native {
        NativeResource::Buffer(buffer) => buffer,
        _ => panic!("buffer {} has no native object bound", resource.name),
    }
}

pub struct VkCommandEncoder<'a> {
    device: &'a ash::Device,
    resources: &'a ResourceTable,
}

impl<'a> VkCommandEncoder<'a> {
    pub fn new(device: &'a ash::Device, resources: &'a ResourceTable) -> Self {
        Self { device, resources }
    }

    /// 按顺序编码所有命令；cmd 需要处于 recording 状态
    pub fn encode(&self, cmd: vk::CommandBuffer, list: &CommandList, backend: &mut dyn VkBindingBackend) {
        let _span = toyframe_crate_tools::profile_scope!("VkCommandEncoder::encode");

        for command in translate(list, self.resources) {
            self.record(cmd, &command, backend);
        }
    }

    fn record(&self, cmd: vk::CommandBuffer, command: &VkCommand<'_>, backend: &mut dyn VkBindingBackend) {
        match command {
            VkCommand::PipelineBarrier {
                image_barriers,
                buffer_barriers,
            } => {
                let dependency_info = vk::DependencyInfo::default()
                    .image_memory_barriers(image_barriers)
                    .buffer_memory_barriers(buffer_barriers);
                unsafe { self.device.cmd_pipeline_barrier2(cmd, &dependency_info) };
            }
            VkCommand::BeginRendering {
                attachments,
                area,
                viewport,
            } => {
                let rendering_info = vk::RenderingInfo::default()
                    .render_area(*area)
                    .layer_count(1)
                    .color_attachments(attachments);
                unsafe {
                    self.device.cmd_begin_rendering(cmd, &rendering_info);
                    self.device.cmd_set_viewport(cmd, 0, std::slice::from_ref(viewport));
                    self.device.cmd_set_scissor(cmd, 0, std::slice::from_ref(area));
                }
            }
            VkCommand::EndRendering => unsafe { self.device.cmd_end_rendering(cmd) },
            VkCommand::BindPipeline { pipeline, bind_point } => unsafe {
                self.device.cmd_bind_pipeline(cmd, *bind_point, backend.native_pipeline(*pipeline));
            },
            VkCommand::BindResources {
                pipeline,
                bind_point,
                bindings,
            } => backend.bind_resources(cmd, *bind_point, *pipeline, bindings, self.resources),
            VkCommand::Draw {
                vertex_count,
                instance_count,
            } => unsafe { self.device.cmd_draw(cmd, *vertex_count, *instance_count, 0, 0) },
            VkCommand::Dispatch { group_count } => unsafe {
                self.device.cmd_dispatch(cmd, group_count[0], group_count[1], group_count[2]);
            },
            VkCommand::BlitImage {
                src,
                src_layout,
                dst,
                dst_layout,
                region,
                filter,
            } => unsafe {
                self.device.cmd_blit_image(
                    cmd,
                    *src,
                    *src_layout,
                    *dst,
                    *dst_layout,
                    std::slice::from_ref(region),
                    *filter,
                );
            },
            VkCommand::CopyBufferToImage {
                buffer,
                image,
                image_layout,
                region,
            } => unsafe {
                self.device.cmd_copy_buffer_to_image(
                    cmd,
                    *buffer,
                    *image,
                    *image_layout,
                    std::slice::from_ref(region),
                );
            },
        }
    }
}

fn far_corner(extent: vk::Extent2D) -> vk::Offset3D {
    vk::Offset3D {
        x: extent.width as i32,
        y: extent.height as i32,
        z: 1,
    }
}

pub fn vk_image_blit(region: &BlitRegion) -> vk::ImageBlit {
    vk::ImageBlit {
        src_subresource: vk::ImageSubresourceLayers {
            aspect_mask: region.aspect,
            mip_level: region.src_mip,
            base_array_layer: 0,
            layer_count: region.layer_count,
        },
        src_offsets: [vk::Offset3D::default(), far_corner(region.src_extent)],
        dst_subresource: vk::ImageSubresourceLayers {
            aspect_mask: region.aspect,
            mip_level: region.dst_mip,
            base_array_layer: 0,
            layer_count: region.layer_count,
        },
        dst_offsets: [vk::Offset3D::default(), far_corner(region.dst_extent)],
    }
}

pub fn vk_buffer_image_copy(copy: &BufferImageCopy) -> vk::BufferImageCopy {
    vk::BufferImageCopy {
        buffer_offset: copy.buffer_offset,
        // 0 表示紧密排列
        buffer_row_length: 0,
        buffer_image_height: 0,
        image_subresource: vk::ImageSubresourceLayers {
            aspect_mask: copy.aspect,
            mip_level: copy.mip,
            base_array_layer: copy.layer,
            layer_count: 1,
        },
        image_offset: vk::Offset3D::default(),
        image_extent: vk::Extent3D {
            width: copy.extent.width,
            height: copy.extent.height,
            depth: 1,
        },
    }
}
