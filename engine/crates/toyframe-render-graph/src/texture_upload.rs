//! 纹理上传
//!
//! 通过 staging buffer 上传 RGBA8 像素，生成 mip 链；cubemap 的六个面依次上传到 layer 0..6。

use std::path::Path;

use anyhow::Context;
use ash::vk;

use toyframe_gfx::barrier::{BarrierBatch, ImageBarrierDesc, SubresourceRange};
use toyframe_gfx::barrier_tracker::BarrierTracker;
use toyframe_gfx::command_recorder::{BlitRegion, BufferImageCopy, CommandRecorder};
use toyframe_gfx::device::GpuDevice;
use toyframe_gfx::handles::GpuResourceHandle;
use toyframe_gfx::resource_state::{BufferState, ImageState};
use toyframe_gfx::resource_table::{BufferDesc, ImageDesc, ResourceTable};

/// 解码后的 RGBA8 像素
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// 纯色图片
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            pixels: rgba.repeat((width * height) as usize),
        }
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }

    fn validate(&self, name: &str) -> anyhow::Result<()> {
        anyhow::ensure!(self.width > 0 && self.height > 0, "图片 {name} 的大小为 0");
        let expected = self.width as usize * self.height as usize * 4;
        anyhow::ensure!(
            self.pixels.len() == expected,
            "图片 {name} 的数据长度为 {}，期望 {expected}",
            self.pixels.len()
        );
        Ok(())
    }
}

/// 图片解码
pub trait AssetLoader {
    fn load_rgba8(&self, path: &Path) -> anyhow::Result<DecodedImage>;
}

/// 使用 `image` crate 解码
pub struct ImageCrateLoader;

impl AssetLoader for ImageCrateLoader {
    fn load_rgba8(&self, path: &Path) -> anyhow::Result<DecodedImage> {
        let image = image::open(path).with_context(|| format!("无法加载图片: {}", path.display()))?;
        let rgba = image.into_rgba8();
        Ok(DecodedImage {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        })
    }
}

/// cubemap 六个面的文件名，对应 layer 0..6
pub const CUBEMAP_FACES: [&str; 6] = ["right", "left", "top", "bottom", "front", "back"];

/// 从目录中加载 `<face>.jpg`
pub fn load_cubemap_faces(loader: &dyn AssetLoader, dir: &Path) -> anyhow::Result<[DecodedImage; 6]> {
    let faces = CUBEMAP_FACES
        .iter()
        .map(|face| loader.load_rgba8(&dir.join(format!("{face}.jpg"))))
        .collect::<anyhow::Result<Vec<_>>>()?;
    faces
        .try_into()
        .map_err(|_| anyhow::anyhow!("cubemap 需要 6 个面"))
}

/// 完整 mip 链的层数：`floor(log2(max(w, h))) + 1`
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height);
    assert!(largest > 0, "image extent must not be zero");
    u32::BITS - largest.leading_zeros()
}

pub struct TextureUploader<'a> {
    resources: &'a mut ResourceTable,
    tracker: &'a mut BarrierTracker,
    device: &'a mut dyn GpuDevice,
}

impl<'a> TextureUploader<'a> {
    pub fn new(
        resources: &'a mut ResourceTable,
        tracker: &'a mut BarrierTracker,
        device: &'a mut dyn GpuDevice,
    ) -> Self {
        Self {
            resources,
            tracker,
            device,
        }
    }

    /// 上传 mip 0 并用 blit 生成完整的 mip 链
    ///
    /// 完成后所有 mip 都处于 TRANSFER_SRC
    pub fn upload_mipmapped(
        &mut self,
        name: &str,
        image: &DecodedImage,
        format: vk::Format,
    ) -> anyhow::Result<GpuResourceHandle> {
        image.validate(name)?;

        let mip_levels = mip_level_count(image.width, image.height);
        let desc = ImageDesc::new_2d(
            image.extent(),
            format,
            vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST,
        )
        .with_mip_levels(mip_levels);
        let texture = self.resources.create_image(self.device, name, desc.clone());
        let staging = self.create_staging(name, &image.pixels);

        let mut recorder = CommandRecorder::new(format!("upload {name}"));
        self.tracker.declare_usage(self.resources, texture, ImageState::TRANSFER_DST);
        self.tracker.declare_usage(self.resources, staging, BufferState::TRANSFER_SRC);
        self.tracker.flush(&mut recorder);

        recorder.copy_buffer_to_image(BufferImageCopy {
            buffer: staging,
            buffer_offset: 0,
            image: texture,
            image_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            mip: 0,
            layer: 0,
            extent: image.extent(),
            aspect: desc.aspect,
        });
        Self::record_mip_chain(&mut recorder, texture, &desc);

        // mip 链中的 barrier 是手动录制的
        self.tracker.assume_state(texture, ImageState::TRANSFER_SRC);

        self.device.submit_one_shot(recorder.finish());
        self.destroy_staging(staging);

        log::info!("uploaded {name}: {}x{}, {mip_levels} mip levels", image.width, image.height);
        Ok(texture)
    }

    /// 六个面必须大小相同，按 right, left, top, bottom, front, back 的顺序
    pub fn upload_cubemap(
        &mut self,
        name: &str,
        faces: &[DecodedImage; 6],
        format: vk::Format,
    ) -> anyhow::Result<GpuResourceHandle> {
        for (face, image) in CUBEMAP_FACES.iter().zip(faces) {
            image.validate(&format!("{name}/{face}"))?;
            anyhow::ensure!(
                image.extent() == faces[0].extent(),
                "cubemap {name} 的面 {face} 大小为 {}x{}，与 {}x{} 不一致",
                image.width,
                image.height,
                faces[0].width,
                faces[0].height
            );
        }

        let extent = faces[0].extent();
        let face_bytes = faces[0].pixels.len();
        let desc = ImageDesc::new_cube(
            extent,
            format,
            vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
        );
        let cubemap = self.resources.create_image(self.device, name, desc.clone());
        let staging = self.create_staging(name, &faces.concat_pixels());

        let mut recorder = CommandRecorder::new(format!("upload {name}"));
        self.tracker.declare_usage(self.resources, cubemap, ImageState::TRANSFER_DST);
        self.tracker.declare_usage(self.resources, staging, BufferState::TRANSFER_SRC);
        self.tracker.flush(&mut recorder);

        for layer in 0..6u32 {
            recorder.copy_buffer_to_image(BufferImageCopy {
                buffer: staging,
                buffer_offset: (layer as usize * face_bytes) as vk::DeviceSize,
                image: cubemap,
                image_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                mip: 0,
                layer,
                extent,
                aspect: desc.aspect,
            });
        }

        self.device.submit_one_shot(recorder.finish());
        self.destroy_staging(staging);

        log::info!("prepared cubemap {name}: {}x{}", extent.width, extent.height);
        Ok(cubemap)
    }

    /// 第 i-1 级转换为 TRANSFER_SRC 后 blit 到第 i 级；最后一级单独转换
    fn record_mip_chain(recorder: &mut CommandRecorder, texture: GpuResourceHandle, desc: &ImageDesc) {
        let to_src = |mip: u32| {
            BarrierBatch::image(
                ImageBarrierDesc::new(texture, ImageState::TRANSFER_DST, ImageState::TRANSFER_SRC)
                    .with_aspect(desc.aspect)
                    .with_range(SubresourceRange::mip(mip, desc.layers)),
            )
        };

        for mip in 1..desc.mip_levels {
            recorder.pipeline_barrier(to_src(mip - 1));
            recorder.blit_image(BlitRegion {
                src: texture,
                src_mip: mip - 1,
                src_extent: desc.mip_extent(mip - 1),
                src_layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst: texture,
                dst_mip: mip,
                dst_extent: desc.mip_extent(mip),
                dst_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                layer_count: desc.layers,
                aspect: desc.aspect,
                filter: vk::Filter::LINEAR,
            });
        }
        recorder.pipeline_barrier(to_src(desc.mip_levels - 1));
    }

    fn create_staging(&mut self, name: &str, bytes: &[u8]) -> GpuResourceHandle {
        let staging = self.resources.create_buffer(
            self.device,
            format!("{name}-staging"),
            BufferDesc {
                size: bytes.len() as vk::DeviceSize,
                usage: vk::BufferUsageFlags::TRANSFER_SRC,
                host_visible: true,
            },
            BufferState::HOST_WRITE,
        );
        self.device.write_host_buffer(self.resources.resource(staging), bytes);
        staging
    }

    fn destroy_staging(&mut self, staging: GpuResourceHandle) {
        self.tracker.forget(staging);
        self.resources.destroy(self.device, staging);
    }
}

trait ConcatPixels {
    fn concat_pixels(&self) -> Vec<u8>;
}

impl ConcatPixels for [DecodedImage; 6] {
    fn concat_pixels(&self) -> Vec<u8> {
        self.iter().flat_map(|face| face.pixels.iter().copied()).collect()
    }
}
