use crate::input_state::InputState;

/// 窗口的抽象
///
/// 具体的窗口库（winit、glfw 或者 headless）在外部实现这个 trait
pub trait DisplayWindow {
    /// 拉取窗口事件，更新输入状态；每帧调用一次
    fn poll_events(&mut self);

    /// 当前的输出大小（pixel），最小化时为 `[0, 0]`
    fn output_size(&self) -> [u32; 2];

    fn input(&self) -> &InputState;

    /// 窗口创建以来经过的时间，单位秒
    fn time(&self) -> f32;

    fn is_being_closed(&self) -> bool;

    fn ask_to_close(&mut self);
}
