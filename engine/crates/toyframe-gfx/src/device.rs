use crate::command_recorder::CommandList;
use crate::resource_table::{GpuResource, NativeResource, ResourceKind, SamplerDesc};
use crate::sync::{CompletionSignal, ReadySignal};
use ash::vk;

/// GPU 设备的抽象：资源分配、队列提交与等待
///
/// vulkan 的实例、设备、内存分配由外部实现；测试中使用记录调用的 mock
pub trait GpuDevice {
    /// 为资源分配原生对象
    fn allocate(&mut self, name: &str, kind: &ResourceKind) -> NativeResource;

    fn release(&mut self, name: &str, native: NativeResource);

    fn allocate_sampler(&mut self, desc: &SamplerDesc) -> vk::Sampler;

    fn release_sampler(&mut self, desc: &SamplerDesc);

    /// 通过映射内存写入 host visible buffer
    fn write_host_buffer(&mut self, buffer: &GpuResource, bytes: &[u8]);

    /// 提交一段命令；`wait` 存在时，GPU 在 COLOR_ATTACHMENT_OUTPUT 之前等待该信号
    fn submit(&mut self, commands: CommandList, wait: Option<ReadySignal>) -> CompletionSignal;

    /// 阻塞，直到信号完成
    fn wait_for(&mut self, signal: CompletionSignal);

    fn wait_idle(&mut self);

    /// 提交并阻塞等待完成，用于初始化阶段的上传
    fn submit_one_shot(&mut self, commands: CommandList) {
        let signal = self.submit(commands, None);
        self.wait_for(signal);
    }
}
