use std::collections::VecDeque;

use crate::input_event::InputEvent;
use crate::input_state::InputState;

/// 输入管理器
///
/// 窗口后端把事件 push 进来，每帧调用一次 `process_events` 更新输入状态
pub struct InputManager {
    state: InputState,
    events: VecDeque<InputEvent>,

    /// 最近一次 Resized 事件给出的大小
    output_size: [u32; 2],
    close_requested: bool,
}

// new & init
impl InputManager {
    pub fn new(initial_size: [u32; 2]) -> Self {
        Self {
            state: InputState::default(),
            events: VecDeque::new(),
            output_size: initial_size,
            close_requested: false,
        }
    }
}

// getters
impl InputManager {
    #[inline]
    pub fn state(&self) -> &InputState {
        &self.state
    }

    #[inline]
    pub fn output_size(&self) -> [u32; 2] {
        self.output_size
    }

    #[inline]
    pub fn close_requested(&self) -> bool {
        self.close_requested
    }
}

// update
impl InputManager {
    pub fn push_event(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    /// 开始新的一帧，并处理队列中的所有事件
    pub fn process_events(&mut self) {
        self.state.begin_frame();

        while let Some(event) = self.events.pop_front() {
            match event {
                InputEvent::KeyboardInput { key_code, state } => {
                    self.state.apply_key(key_code, state);
                }
                InputEvent::MouseButtonInput { button, state } => {
                    self.state.apply_mouse_button(button, state);
                }
                InputEvent::CursorMoved { physical_position } => {
                    self.state.crt_mouse_pos = physical_position;
                }
                InputEvent::Resized {
                    physical_width,
                    physical_height,
                } => {
                    log::debug!("window resized: {physical_width}x{physical_height}");
                    self.output_size = [physical_width, physical_height];
                }
                InputEvent::CloseRequested => {
                    self.close_requested = true;
                }
                InputEvent::Other => {}
            }
        }
    }
}
