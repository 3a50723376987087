// 参考 winit::MouseButton
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

// 参考 winit::ElementState
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum ElementState {
    Pressed,
    Released,
}

// 参考 winit::KeyCode，只保留 demo 会用到的按键
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyCode {
    Escape,
    KeyB,
    Space,

    Other,
}

/// 窗口送来的输入事件
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyboardInput {
        key_code: KeyCode,
        state: ElementState,
    },
    MouseButtonInput {
        button: MouseButton,
        state: ElementState,
    },
    /// 鼠标位置，单位 pixel，原点在左上角
    CursorMoved {
        physical_position: [f64; 2],
    },
    /// 窗口输出大小改变，最小化时为 (0, 0)
    Resized {
        physical_width: u32,
        physical_height: u32,
    },
    CloseRequested,

    Other,
}
