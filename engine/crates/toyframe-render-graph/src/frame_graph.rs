//! 帧内的 pass 列表
//!
//! pass 的执行顺序就是添加的顺序，不做重排。录制时依次声明每个 pass 的资源状态，
//! 由 `BarrierTracker` 在 pass 之间插入所需的 barrier。

use ash::vk;
use itertools::Itertools;

use toyframe_gfx::barrier_tracker::BarrierTracker;
use toyframe_gfx::command_recorder::{BlitRegion, ColorAttachment, CommandRecorder, ResolvedBinding};
use toyframe_gfx::handles::GpuResourceHandle;
use toyframe_gfx::resource_state::{ImageState, ResourceState};
use toyframe_gfx::resource_table::ResourceTable;

use crate::pass::{Invocation, PassDesc, ResourceRef};
use crate::pipeline_provider::PipelineProvider;

/// 本帧中 `ResourceRef::Backbuffer` 与 `ResourceRef::FrameUniform` 对应的资源
#[derive(Clone, Copy, Debug)]
pub struct FrameBindings {
    pub backbuffer: GpuResourceHandle,
    pub frame_uniform: GpuResourceHandle,
}

impl FrameBindings {
    #[inline]
    pub fn resolve(&self, resource: ResourceRef) -> GpuResourceHandle {
        match resource {
            ResourceRef::Fixed(handle) => handle,
            ResourceRef::Backbuffer => self.backbuffer,
            ResourceRef::FrameUniform => self.frame_uniform,
        }
    }
}

/// pass 之间的依赖：`consumer` 使用了 `producer` 写入的资源
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassDependency {
    pub producer: usize,
    pub consumer: usize,
    pub resource: ResourceRef,
}

#[derive(Default)]
pub struct FrameGraph {
    passes: Vec<PassDesc>,
    /// 所有 pass 之后资源需要处于的状态
    exports: Vec<(ResourceRef, ResourceState)>,
}

// new & init
impl FrameGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pass(&mut self, pass: PassDesc) -> &mut Self {
        match pass.invocation {
            Invocation::Draw { .. } => {
                assert!(pass.program.is_some(), "draw pass {} has no program", pass.name);
                assert!(!pass.color_targets.is_empty(), "draw pass {} has no color target", pass.name);
            }
            Invocation::Dispatch { .. } => {
                assert!(pass.program.is_some(), "dispatch pass {} has no program", pass.name);
            }
            Invocation::Blit { .. } => {}
        }
        self.passes.push(pass);
        self
    }

    pub fn export(&mut self, resource: ResourceRef, state: impl Into<ResourceState>) -> &mut Self {
        self.exports.push((resource, state.into()));
        self
    }

    /// 帧结束时 backbuffer 转换为 PRESENT
    pub fn present_backbuffer(&mut self) -> &mut Self {
        self.export(ResourceRef::Backbuffer, ImageState::PRESENT)
    }
}

// getters
impl FrameGraph {
    #[inline]
    pub fn passes(&self) -> &[PassDesc] {
        &self.passes
    }

    #[inline]
    pub fn exports(&self) -> &[(ResourceRef, ResourceState)] {
        &self.exports
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name.as_str()).collect()
    }

    /// 所有 producer -> consumer 的依赖
    ///
    /// 对每个 pass 用到的每个资源，找到它之前最近一次写入该资源的 pass
    pub fn dependencies(&self) -> Vec<PassDependency> {
        let mut dependencies = Vec::new();
        for (consumer, pass) in self.passes.iter().enumerate() {
            for resource in pass.usages.iter().map(|(resource, _)| *resource).unique() {
                let producer = self.passes[..consumer].iter().rposition(|earlier| earlier.writes(resource));
                if let Some(producer) = producer {
                    dependencies.push(PassDependency {
                        producer,
                        consumer,
                        resource,
                    });
                }
            }
        }
        dependencies
    }
}

// 录制
impl FrameGraph {
    /// 按顺序录制所有 pass 与最后的导出状态
    pub fn record(
        &self,
        frame: &FrameBindings,
        resources: &ResourceTable,
        tracker: &mut BarrierTracker,
        pipelines: &dyn PipelineProvider,
        recorder: &mut CommandRecorder,
    ) {
        let _span = toyframe_crate_tools::profile_scope!("FrameGraph::record");

        for pass in &self.passes {
            for (resource, state) in &pass.usages {
                tracker.declare_usage(resources, frame.resolve(*resource), *state);
            }
            tracker.flush(recorder);

            match pass.invocation {
                Invocation::Draw {
                    vertex_count,
                    instance_count,
                } => {
                    let pipeline = Self::resolve_pipeline(pass, pipelines);
                    let attachments = pass
                        .color_targets
                        .iter()
                        .map(|target| ColorAttachment {
                            image: frame.resolve(target.target),
                            clear: target.clear,
                        })
                        .collect_vec();
                    let render_area = resources.image_desc(attachments[0].image).extent;

                    recorder.begin_rendering(attachments, render_area);
                    recorder.bind_pipeline(pipeline, vk::PipelineBindPoint::GRAPHICS);
                    if !pass.bindings.is_empty() {
                        let bindings = Self::resolve_bindings(pass, frame, resources, tracker);
                        recorder.bind_resources(pipeline, vk::PipelineBindPoint::GRAPHICS, bindings);
                    }
                    recorder.draw(vertex_count, instance_count);
                    recorder.end_rendering();
                }
                Invocation::Dispatch { group_count } => {
                    let pipeline = Self::resolve_pipeline(pass, pipelines);
                    recorder.bind_pipeline(pipeline, vk::PipelineBindPoint::COMPUTE);
                    if !pass.bindings.is_empty() {
                        let bindings = Self::resolve_bindings(pass, frame, resources, tracker);
                        recorder.bind_resources(pipeline, vk::PipelineBindPoint::COMPUTE, bindings);
                    }
                    recorder.dispatch(group_count);
                }
                Invocation::Blit { src, dst } => {
                    let src = frame.resolve(src);
                    let dst = frame.resolve(dst);
                    let src_desc = resources.image_desc(src);
                    recorder.blit_image(BlitRegion {
                        src,
                        src_mip: 0,
                        src_extent: src_desc.extent,
                        src_layout: tracker.current_image_state(resources, src).layout,
                        dst,
                        dst_mip: 0,
                        dst_extent: resources.image_desc(dst).extent,
                        dst_layout: tracker.current_image_state(resources, dst).layout,
                        layer_count: 1,
                        aspect: src_desc.aspect,
                        filter: vk::Filter::LINEAR,
                    });
                }
            }
        }

        for (resource, state) in &self.exports {
            tracker.declare_usage(resources, frame.resolve(*resource), *state);
        }
        tracker.flush(recorder);
    }

    fn resolve_pipeline(pass: &PassDesc, pipelines: &dyn PipelineProvider) -> toyframe_gfx::handles::PipelineHandle {
        let program = pass.program.as_deref().unwrap_or_default();
        pipelines
            .pipeline(program)
            .unwrap_or_else(|| panic!("no pipeline for program {program} used by pass {}", pass.name))
    }

    fn resolve_bindings(
        pass: &PassDesc,
        frame: &FrameBindings,
        resources: &ResourceTable,
        tracker: &BarrierTracker,
    ) -> Vec<ResolvedBinding> {
        pass.bindings
            .iter()
            .map(|binding| {
                let resource = frame.resolve(binding.resource);
                ResolvedBinding {
                    binding: binding.binding,
                    resource,
                    sampler: binding.sampler,
                    view: binding.view,
                    layout: tracker.current_state(resources, resource).layout(),
                }
            })
            .collect()
    }
}

// debug
impl FrameGraph {
    /// 打印执行计划：pass 顺序、每个 pass 的资源状态和依赖
    pub fn print_execution_plan(&self, frame: &FrameBindings, resources: &ResourceTable) {
        let name_of = |resource: ResourceRef| match resource {
            ResourceRef::Fixed(handle) => {
                resources.get(handle).map(|r| r.name.as_str()).unwrap_or("<unknown>").to_string()
            }
            ResourceRef::Backbuffer => "<backbuffer>".to_string(),
            ResourceRef::FrameUniform => "<frame-uniform>".to_string(),
        };

        log::info!("╔══════════════════════════════════════════════════════════════════╗");
        log::info!("║              FrameGraph Execution Plan                           ║");
        log::info!("╠══════════════════════════════════════════════════════════════════╣");
        log::info!(
            "║ Total Passes: {}  |  Execution Order: [{}]",
            self.passes.len(),
            self.pass_names().join(" → ")
        );
        log::info!("╚══════════════════════════════════════════════════════════════════╝");

        let dependencies = self.dependencies();
        for (index, pass) in self.passes.iter().enumerate() {
            log::info!("┌─────────────────────────────────────────────────────────────────┐");
            log::info!("│ [{}/{}] Pass: \"{}\" {:?}", index + 1, self.passes.len(), pass.name, pass.invocation);
            log::info!("├─────────────────────────────────────────────────────────────────┤");
            for (resource, state) in &pass.usages {
                let mark = if state.is_write() { "✏️ " } else { "📖" };
                log::info!(
                    "│   {mark} \"{}\" layout: {:?}, stage: {:?}, access: {:?}",
                    name_of(*resource),
                    state.layout(),
                    state.stage(),
                    state.access()
                );
            }
            for dependency in dependencies.iter().filter(|d| d.consumer == index) {
                log::info!(
                    "│   ⬅ depends on \"{}\" via \"{}\"",
                    self.passes[dependency.producer].name,
                    name_of(dependency.resource)
                );
            }
            log::info!("└─────────────────────────────────────────────────────────────────┘");
        }

        for (resource, state) in &self.exports {
            let handle = frame.resolve(*resource);
            log::info!(
                "export \"{}\" ({:?}) -> {:?}",
                name_of(*resource),
                handle,
                state.layout()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use toyframe_gfx::command_recorder::{CommandList, GfxCommand};
    use toyframe_gfx::handles::PipelineHandle;
    use toyframe_gfx::resource_state::BufferState;
    use toyframe_gfx::resource_table::{BufferDesc, ImageDesc, ResourceKind};

    struct FixedPipelines {
        handles: SlotMap<PipelineHandle, String>,
    }

    impl FixedPipelines {
        fn new(programs: &[&str]) -> Self {
            let mut handles = SlotMap::with_key();
            for program in programs {
                handles.insert(program.to_string());
            }
            Self { handles }
        }
    }

    impl PipelineProvider for FixedPipelines {
        fn pipeline(&self, program: &str) -> Option<PipelineHandle> {
            self.handles.iter().find(|(_, name)| name.as_str() == program).map(|(handle, _)| handle)
        }

        fn reload(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Scene {
        resources: ResourceTable,
        frame: FrameBindings,
        procedural: GpuResourceHandle,
        sampler: toyframe_gfx::handles::SamplerHandle,
    }

    fn scene() -> Scene {
        let mut resources = ResourceTable::new();
        let extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let backbuffer = resources.register(
            "backbuffer",
            ResourceKind::Image(ImageDesc::new_2d(
                extent,
                vk::Format::B8G8R8A8_SRGB,
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
            )),
            ImageState::SWAPCHAIN_ACQUIRED,
        );
        let frame_uniform = resources.register(
            "frame-uniform",
            ResourceKind::Buffer(BufferDesc {
                size: 32,
                usage: vk::BufferUsageFlags::UNIFORM_BUFFER,
                host_visible: true,
            }),
            BufferState::HOST_WRITE,
        );
        let procedural = resources.register(
            "procedural",
            ResourceKind::Image(ImageDesc::new_2d(
                vk::Extent2D {
                    width: 512,
                    height: 512,
                },
                vk::Format::R8G8B8A8_UNORM,
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            )),
            ImageState::UNDEFINED,
        );
        let mut samplers: SlotMap<toyframe_gfx::handles::SamplerHandle, ()> = SlotMap::with_key();
        Scene {
            resources,
            frame: FrameBindings {
                backbuffer,
                frame_uniform,
            },
            procedural,
            sampler: samplers.insert(()),
        }
    }

    fn two_pass_graph(scene: &Scene) -> FrameGraph {
        let mut graph = FrameGraph::new();
        graph
            .add_pass(
                PassDesc::fullscreen("procedural", "procedural.frag")
                    .color_target(scene.procedural, None)
                    .uniform(0, BufferState::UNIFORM_FRAGMENT),
            )
            .add_pass(
                PassDesc::fullscreen("composite", "composite.frag")
                    .color_target(ResourceRef::Backbuffer, Some([0.0, 0.0, 0.0, 1.0]))
                    .uniform(0, BufferState::UNIFORM_FRAGMENT)
                    .sampled(
                        1,
                        scene.procedural,
                        scene.sampler,
                        toyframe_gfx::command_recorder::ImageViewKind::Default,
                        ImageState::SHADER_READ_FRAGMENT,
                    ),
            )
            .present_backbuffer();
        graph
    }

    fn record(graph: &FrameGraph, scene: &Scene, tracker: &mut BarrierTracker) -> CommandList {
        let pipelines = FixedPipelines::new(&["procedural.frag", "composite.frag", "toy.comp"]);
        let mut recorder = CommandRecorder::new("[F0A]");
        graph.record(&scene.frame, &scene.resources, tracker, &pipelines, &mut recorder);
        recorder.finish()
    }

    #[test]
    fn test_two_pass_transition_between_draws() {
        let scene = scene();
        let graph = two_pass_graph(&scene);
        let mut tracker = BarrierTracker::new();
        let list = record(&graph, &scene, &mut tracker);

        let draw_indices = list
            .commands()
            .iter()
            .positions(|command| matches!(command, GfxCommand::Draw { .. }))
            .collect_vec();
        assert_eq!(draw_indices.len(), 2);

        // 两次 draw 之间恰好一次 procedural: COLOR_ATTACHMENT -> SHADER_READ
        let between = &list.commands()[draw_indices[0]..draw_indices[1]];
        let transitions = between
            .iter()
            .filter_map(|command| match command {
                GfxCommand::PipelineBarrier(batch) => batch.find_image(scene.procedural),
                _ => None,
            })
            .collect_vec();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].src_state, ImageState::COLOR_ATTACHMENT_WRITE);
        assert_eq!(transitions[0].dst_state, ImageState::SHADER_READ_FRAGMENT);

        // 最后一个命令是 backbuffer -> PRESENT
        match list.commands().last() {
            Some(GfxCommand::PipelineBarrier(batch)) => {
                let barrier = batch.find_image(scene.frame.backbuffer).unwrap();
                assert_eq!(barrier.dst_state, ImageState::PRESENT);
            }
            other => panic!("unexpected last command: {other:?}"),
        }
    }

    #[test]
    fn test_bindings_carry_layouts() {
        let scene = scene();
        let graph = two_pass_graph(&scene);
        let mut tracker = BarrierTracker::new();
        let list = record(&graph, &scene, &mut tracker);

        let composite_bindings = list
            .commands()
            .iter()
            .filter_map(|command| match command {
                GfxCommand::BindResources { bindings, .. } => Some(bindings),
                _ => None,
            })
            .nth(1)
            .unwrap();
        assert_eq!(composite_bindings[0].layout, None);
        assert_eq!(composite_bindings[1].resource, scene.procedural);
        assert_eq!(composite_bindings[1].layout, Some(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL));
    }

    #[test]
    fn test_render_area_follows_target() {
        let scene = scene();
        let graph = two_pass_graph(&scene);
        let mut tracker = BarrierTracker::new();
        let list = record(&graph, &scene, &mut tracker);

        let areas = list
            .commands()
            .iter()
            .filter_map(|command| match command {
                GfxCommand::BeginRendering { render_area, .. } => Some(*render_area),
                _ => None,
            })
            .collect_vec();
        assert_eq!(areas[0], vk::Extent2D { width: 512, height: 512 });
        assert_eq!(areas[1], vk::Extent2D { width: 800, height: 600 });
    }

    #[test]
    fn test_dependencies() {
        let scene = scene();
        let graph = two_pass_graph(&scene);
        let dependencies = graph.dependencies();
        assert_eq!(
            dependencies,
            vec![PassDependency {
                producer: 0,
                consumer: 1,
                resource: ResourceRef::Fixed(scene.procedural),
            }]
        );
        assert_eq!(graph.pass_names(), vec!["procedural", "composite"]);
    }

    #[test]
    fn test_compute_then_blit() {
        let scene = scene();
        let mut graph = FrameGraph::new();
        graph
            .add_pass(
                PassDesc::compute("toy", "toy.comp", [64, 64, 1])
                    .storage(0, scene.procedural, ImageState::STORAGE_WRITE_COMPUTE)
                    .uniform(1, BufferState::UNIFORM_COMPUTE),
            )
            .add_pass(PassDesc::blit("to-backbuffer", scene.procedural, ResourceRef::Backbuffer))
            .present_backbuffer();

        let mut tracker = BarrierTracker::new();
        let list = record(&graph, &scene, &mut tracker);
        let blit = list
            .commands()
            .iter()
            .find_map(|command| match command {
                GfxCommand::BlitImage(region) => Some(*region),
                _ => None,
            })
            .unwrap();
        assert_eq!(blit.src_layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        assert_eq!(blit.dst_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(blit.dst_extent, vk::Extent2D { width: 800, height: 600 });
        assert_eq!(
            tracker.current_image_state(&scene.resources, scene.frame.backbuffer),
            ImageState::PRESENT
        );
        assert_eq!(list.draw_count(), 0);
    }

    #[test]
    fn test_second_frame_has_no_redundant_transition() {
        let scene = scene();
        let graph = two_pass_graph(&scene);
        let mut tracker = BarrierTracker::new();
        let _ = record(&graph, &scene, &mut tracker);

        // 第二帧：backbuffer 是新 acquire 的，procedural 从 SHADER_READ 开始
        tracker.assume_state(scene.frame.backbuffer, ImageState::SWAPCHAIN_ACQUIRED);
        let list = record(&graph, &scene, &mut tracker);
        let first_batch = list.barrier_batches().next().unwrap();
        let procedural = first_batch.find_image(scene.procedural).unwrap();
        assert_eq!(procedural.src_state, ImageState::SHADER_READ_FRAGMENT);
        assert_eq!(procedural.dst_state, ImageState::COLOR_ATTACHMENT_WRITE);
        // uniform 已经是 UNIFORM_FRAGMENT，不需要 barrier
        assert!(first_batch.buffer_barriers.is_empty());
    }

    #[test]
    #[should_panic(expected = "no pipeline for program")]
    fn test_missing_pipeline_panics() {
        let scene = scene();
        let mut graph = FrameGraph::new();
        graph.add_pass(PassDesc::fullscreen("toy", "missing.frag").color_target(ResourceRef::Backbuffer, None));
        let mut tracker = BarrierTracker::new();
        let _ = record(&graph, &scene, &mut tracker);
    }
}
