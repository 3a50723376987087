//! 两个 pass 的 demo
//!
//! procedural pass 画到一张离屏 image，main pass 采样它、一张带 mip 的纹理和天空盒，
//! 结果写入 backbuffer。

use ash::vk;

use toyframe_crate_tools::toy_path::ToyPath;
use toyframe_gfx::command_recorder::ImageViewKind;
use toyframe_gfx::handles::{GpuResourceHandle, SamplerHandle};
use toyframe_gfx::resource_state::{BufferState, ImageState};
use toyframe_gfx::resource_table::{ImageDesc, SamplerDesc};
use toyframe_render_graph::frame_graph::FrameGraph;
use toyframe_render_graph::pass::{PassDesc, ResourceRef};
use toyframe_render_graph::texture_upload::load_cubemap_faces;

use crate::demos::{DemoInit, ToyDemo};

#[derive(Default)]
pub struct InflightToy {
    resources: Option<InflightResources>,
}

#[derive(Clone, Copy, Debug)]
pub struct InflightResources {
    pub procedural: GpuResourceHandle,
    pub texture: GpuResourceHandle,
    pub skybox: GpuResourceHandle,
    pub default_sampler: SamplerHandle,
    pub texture_sampler: SamplerHandle,
}

impl InflightToy {
    pub const NAME: &'static str = "inflight_toy";
    pub const PROCEDURAL_PROGRAM: &'static str = "toy_graphics_procedural";
    pub const MAIN_PROGRAM: &'static str = "toy_graphics_main";

    #[inline]
    pub fn resources(&self) -> Option<&InflightResources> {
        self.resources.as_ref()
    }

    fn create_resources(init: &mut DemoInit<'_>) -> anyhow::Result<InflightResources> {
        let texture_image = init.assets.load_rgba8(&ToyPath::textures_path(&init.config.texture))?;
        let skybox_faces = load_cubemap_faces(init.assets, &ToyPath::textures_path(&init.config.skybox))?;

        let extent = init.ctx.frame_settings().frame_extent;
        let procedural = init.ctx.resources.create_image(
            init.device,
            "procedural-image",
            ImageDesc::new_2d(
                extent,
                vk::Format::R8G8B8A8_UNORM,
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            ),
        );

        let (texture, skybox) = {
            let mut uploader = init.ctx.texture_uploader(init.device);
            let texture = uploader.upload_mipmapped("texture-image", &texture_image, vk::Format::R8G8B8A8_SRGB)?;
            let skybox = uploader.upload_cubemap("skybox-image", &skybox_faces, vk::Format::R8G8B8A8_SRGB)?;
            (texture, skybox)
        };

        let mip_levels = init.ctx.resources.image_desc(texture).mip_levels;
        let default_sampler = init
            .ctx
            .resources
            .create_sampler(init.device, SamplerDesc::linear_repeat("default-sampler"));
        let texture_sampler = init
            .ctx
            .resources
            .create_sampler(init.device, SamplerDesc::mip_chain("texture-sampler", mip_levels));

        Ok(InflightResources {
            procedural,
            texture,
            skybox,
            default_sampler,
            texture_sampler,
        })
    }
}

impl ToyDemo for InflightToy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn programs(&self) -> &'static [&'static str] {
        &[Self::PROCEDURAL_PROGRAM, Self::MAIN_PROGRAM]
    }

    fn init(&mut self, init: &mut DemoInit<'_>) -> anyhow::Result<FrameGraph> {
        log::info!("inflight toy, {} frames in flight.", init.ctx.frame_settings().frames_in_flight);

        let res = Self::create_resources(init)?;
        self.resources = Some(res);

        let mut graph = FrameGraph::new();
        graph
            .add_pass(
                PassDesc::fullscreen("procedural", Self::PROCEDURAL_PROGRAM)
                    .uniform(0, BufferState::UNIFORM_FRAGMENT)
                    .color_target(res.procedural, None),
            )
            .add_pass(
                PassDesc::fullscreen("main", Self::MAIN_PROGRAM)
                    .uniform(0, BufferState::UNIFORM_FRAGMENT)
                    .sampled(
                        1,
                        res.procedural,
                        res.default_sampler,
                        ImageViewKind::Default,
                        ImageState::SHADER_READ_FRAGMENT,
                    )
                    .sampled(
                        2,
                        res.skybox,
                        res.default_sampler,
                        ImageViewKind::Cube,
                        ImageState::SHADER_READ_FRAGMENT,
                    )
                    .sampled(
                        3,
                        res.texture,
                        res.texture_sampler,
                        ImageViewKind::Default,
                        ImageState::SHADER_READ_FRAGMENT,
                    )
                    .color_target(ResourceRef::Backbuffer, None),
            )
            .present_backbuffer();
        Ok(graph)
    }
}
