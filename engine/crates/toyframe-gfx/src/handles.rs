use slotmap::new_key_type;

new_key_type! {
    /// 资源表中 image 或 buffer 的句柄
    pub struct GpuResourceHandle;
    /// 由 PipelineProvider 分配
    pub struct PipelineHandle;
    pub struct SamplerHandle;
}
