use toyframe_gfx::handles::PipelineHandle;

/// 根据 shader program 的名字提供 pipeline
///
/// pipeline 对象的创建（shader module、layout、descriptor）由外部实现
pub trait PipelineProvider {
    fn pipeline(&self, program: &str) -> Option<PipelineHandle>;

    /// 从编译产物重新创建所有 pipeline；调用前设备必须处于空闲状态
    fn reload(&mut self) -> anyhow::Result<()>;
}
