use std::collections::HashMap;

use crate::input_event::{ElementState, KeyCode, MouseButton};

/// 按键在一帧内的边沿状态
///
/// ```text
///        press              release
/// Low ---------> Rising --> High ---------> Falling --> Low
///                 (下一帧)                    (下一帧)
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonState {
    #[default]
    Low,
    /// 本帧刚被按下
    Rising,
    /// 持续按住
    High,
    /// 本帧刚被松开
    Falling,
}

impl ButtonState {
    /// 进入新的一帧：边沿状态变为稳定状态
    #[inline]
    pub fn settle(self) -> Self {
        match self {
            ButtonState::Rising => ButtonState::High,
            ButtonState::Falling => ButtonState::Low,
            other => other,
        }
    }

    /// 应用一次按下/松开事件
    #[inline]
    pub fn apply(self, element_state: ElementState) -> Self {
        match (self, element_state) {
            (ButtonState::Low | ButtonState::Falling, ElementState::Pressed) => ButtonState::Rising,
            (ButtonState::High | ButtonState::Rising, ElementState::Released) => ButtonState::Falling,
            // 重复的按下（键盘自动重复）或重复的松开
            (state, _) => state,
        }
    }

    #[inline]
    pub fn is_down(self) -> bool {
        matches!(self, ButtonState::Rising | ButtonState::High)
    }
}

/// 记录输入信息
#[derive(Default, Clone, Debug)]
pub struct InputState {
    /// 当前帧的鼠标位置 pixel
    pub crt_mouse_pos: [f64; 2],
    /// 上一帧的鼠标位置 pixel
    pub last_mouse_pos: [f64; 2],
    pub keys: HashMap<KeyCode, ButtonState>,
    pub mouse_buttons: HashMap<MouseButton, ButtonState>,
}

// 查询
impl InputState {
    #[inline]
    pub fn key(&self, key_code: KeyCode) -> ButtonState {
        self.keys.get(&key_code).copied().unwrap_or_default()
    }

    #[inline]
    pub fn mouse_button(&self, button: MouseButton) -> ButtonState {
        self.mouse_buttons.get(&button).copied().unwrap_or_default()
    }

    /// 本帧刚按下
    pub fn is_key_pressed(&self, key_code: KeyCode) -> bool {
        self.key(key_code) == ButtonState::Rising
    }

    /// 本帧刚松开
    pub fn is_key_released(&self, key_code: KeyCode) -> bool {
        self.key(key_code) == ButtonState::Falling
    }

    /// 持续按住，不包含刚按下的那一帧
    pub fn is_key_held(&self, key_code: KeyCode) -> bool {
        self.key(key_code) == ButtonState::High
    }

    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_button(button) == ButtonState::Rising
    }

    pub fn is_mouse_released(&self, button: MouseButton) -> bool {
        self.mouse_button(button) == ButtonState::Falling
    }

    pub fn is_mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_button(button) == ButtonState::High
    }

    pub fn get_mouse_position(&self) -> [f64; 2] {
        self.crt_mouse_pos
    }

    pub fn get_mouse_delta(&self) -> [f64; 2] {
        [
            self.crt_mouse_pos[0] - self.last_mouse_pos[0],
            self.crt_mouse_pos[1] - self.last_mouse_pos[1],
        ]
    }
}

// 更新
impl InputState {
    /// 新的一帧开始：所有边沿状态变为稳定状态
    pub fn begin_frame(&mut self) {
        self.last_mouse_pos = self.crt_mouse_pos;
        self.keys.values_mut().for_each(|state| *state = state.settle());
        self.mouse_buttons.values_mut().for_each(|state| *state = state.settle());
    }

    pub fn apply_key(&mut self, key_code: KeyCode, element_state: ElementState) {
        let state = self.keys.entry(key_code).or_default();
        *state = state.apply(element_state);
    }

    pub fn apply_mouse_button(&mut self, button: MouseButton, element_state: ElementState) {
        let state = self.mouse_buttons.entry(button).or_default();
        *state = state.apply(element_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_edges() {
        let mut state = InputState::default();
        assert_eq!(state.key(KeyCode::KeyB), ButtonState::Low);

        state.apply_key(KeyCode::KeyB, ElementState::Pressed);
        assert!(state.is_key_pressed(KeyCode::KeyB));
        assert!(!state.is_key_held(KeyCode::KeyB));

        state.begin_frame();
        assert!(state.is_key_held(KeyCode::KeyB));

        // 键盘自动重复不会产生新的上升沿
        state.apply_key(KeyCode::KeyB, ElementState::Pressed);
        assert!(state.is_key_held(KeyCode::KeyB));

        state.apply_key(KeyCode::KeyB, ElementState::Released);
        assert!(state.is_key_released(KeyCode::KeyB));

        state.begin_frame();
        assert_eq!(state.key(KeyCode::KeyB), ButtonState::Low);
    }

    #[test]
    fn test_click_within_one_frame() {
        let mut state = InputState::default();
        state.apply_mouse_button(MouseButton::Left, ElementState::Pressed);
        state.apply_mouse_button(MouseButton::Left, ElementState::Released);
        assert!(state.is_mouse_released(MouseButton::Left));
    }

    #[test]
    fn test_mouse_delta() {
        let mut state = InputState::default();
        state.crt_mouse_pos = [10.0, 20.0];
        state.begin_frame();
        state.crt_mouse_pos = [15.0, 18.0];
        assert_eq!(state.get_mouse_delta(), [5.0, -2.0]);
    }
}
