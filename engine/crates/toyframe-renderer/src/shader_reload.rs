//! 着色器热重载
//!
//! 先执行外部的编译步骤；编译失败时继续使用旧的 pipeline，
//! 成功时等待设备空闲，再重新创建所有 pipeline。

use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;
use toyframe_gfx::device::GpuDevice;
use toyframe_render_graph::pipeline_provider::PipelineProvider;

/// 执行外部命令编译着色器，例如 `cmake --build build --target shaders`
#[derive(Clone, Debug)]
pub struct CommandShaderBuilder {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl CommandShaderBuilder {
    pub fn new(command_line: &[String], working_dir: PathBuf) -> anyhow::Result<Self> {
        let (program, args) = command_line.split_first().context("着色器编译命令为空")?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir,
        })
    }

    pub fn build(&self) -> anyhow::Result<()> {
        log::info!("building shaders: {} {}", self.program, self.args.join(" "));
        let status = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .status()
            .with_context(|| format!("无法执行着色器编译命令: {}", self.program))?;
        anyhow::ensure!(status.success(), "着色器编译失败: {status}");
        Ok(())
    }
}

pub struct ShaderReloader {
    build: Box<dyn FnMut() -> anyhow::Result<()>>,
}

impl ShaderReloader {
    pub fn new(build: impl FnMut() -> anyhow::Result<()> + 'static) -> Self {
        Self { build: Box::new(build) }
    }

    pub fn with_command(builder: CommandShaderBuilder) -> Self {
        Self::new(move || builder.build())
    }

    /// 返回是否重新创建了 pipeline
    pub fn reload(&mut self, device: &mut dyn GpuDevice, pipelines: &mut dyn PipelineProvider) -> bool {
        if let Err(e) = (self.build)() {
            log::warn!("shader rebuild failed, keep previous pipelines: {e:#}");
            return false;
        }

        device.wait_idle();
        match pipelines.reload() {
            Ok(()) => {
                log::info!("successfully reloaded shaders");
                true
            }
            Err(e) => {
                log::warn!("pipeline reload failed: {e:#}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use toyframe_gfx::command_recorder::CommandList;
    use toyframe_gfx::handles::PipelineHandle;
    use ash::vk;
    use toyframe_gfx::resource_table::{GpuResource, NativeResource, ResourceKind, SamplerDesc};
    use toyframe_gfx::sync::{CompletionSignal, ReadySignal};

    use super::*;

    type CallLog = Rc<RefCell<Vec<&'static str>>>;

    struct IdleDevice(CallLog);

    impl GpuDevice for IdleDevice {
        fn allocate(&mut self, _name: &str, _kind: &ResourceKind) -> NativeResource {
            NativeResource::Unbound
        }
        fn release(&mut self, _name: &str, _native: NativeResource) {}
        fn allocate_sampler(&mut self, _desc: &SamplerDesc) -> vk::Sampler {
            vk::Sampler::null()
        }
        fn release_sampler(&mut self, _desc: &SamplerDesc) {}
        fn write_host_buffer(&mut self, _buffer: &GpuResource, _bytes: &[u8]) {}
        fn submit(&mut self, _commands: CommandList, _wait: Option<ReadySignal>) -> CompletionSignal {
            CompletionSignal { timeline_value: 0 }
        }
        fn wait_for(&mut self, _signal: CompletionSignal) {}
        fn wait_idle(&mut self) {
            self.0.borrow_mut().push("wait_idle");
        }
    }

    struct Reloadable(CallLog);

    impl PipelineProvider for Reloadable {
        fn pipeline(&self, _program: &str) -> Option<PipelineHandle> {
            None
        }
        fn reload(&mut self) -> anyhow::Result<()> {
            self.0.borrow_mut().push("reload");
            Ok(())
        }
    }

    #[test]
    fn test_build_failure_keeps_pipelines() {
        let log = CallLog::default();
        let mut reloader = ShaderReloader::new(|| anyhow::bail!("exit status 1"));

        let reloaded = reloader.reload(&mut IdleDevice(log.clone()), &mut Reloadable(log.clone()));
        assert!(!reloaded);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_build_success_waits_idle_then_reloads() {
        let log = CallLog::default();
        let builds = Rc::new(RefCell::new(0));
        let counter = builds.clone();
        let mut reloader = ShaderReloader::new(move || {
            *counter.borrow_mut() += 1;
            Ok(())
        });

        assert!(reloader.reload(&mut IdleDevice(log.clone()), &mut Reloadable(log.clone())));
        assert_eq!(*log.borrow(), vec!["wait_idle", "reload"]);
        assert_eq!(*builds.borrow(), 1);
    }

    #[test]
    fn test_empty_command_line() {
        assert!(CommandShaderBuilder::new(&[], PathBuf::from(".")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_exit_status() {
        let ok = CommandShaderBuilder::new(&["true".to_string()], std::env::temp_dir()).unwrap();
        assert!(ok.build().is_ok());

        let failed = CommandShaderBuilder::new(&["false".to_string()], std::env::temp_dir()).unwrap();
        assert!(failed.build().is_err());

        let missing =
            CommandShaderBuilder::new(&["toyframe-no-such-tool".to_string()], std::env::temp_dir()).unwrap();
        assert!(missing.build().is_err());
    }
}
