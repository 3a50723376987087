//! 帧 uniform
//!
//! shader 中对应的 std140 block：
//!
//! ```glsl
//! layout(binding = 0) uniform Params {
//!     float iTime;
//!     uvec2 iResolution;
//!     vec4  iMouse;
//! };
//! ```

use ash::vk;
use toyframe_gfx::device::GpuDevice;
use toyframe_gfx::handles::GpuResourceHandle;
use toyframe_gfx::resource_state::BufferState;
use toyframe_gfx::resource_table::{BufferDesc, ResourceTable};
use toyframe_platform::input_state::ButtonState;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformParams {
    /// 秒
    pub time: f32,
    pub _padding_0: f32,
    /// pixel
    pub resolution: glam::UVec2,
    /// xy: 按住时的鼠标位置；zw: 按下时的位置，松开后取负
    pub mouse: glam::Vec4,
}

impl UniformParams {
    /// 根据鼠标左键的边沿状态更新 `mouse`
    ///
    /// - Rising: zw = 当前位置
    /// - High: xy = 当前位置
    /// - Falling: zw 取负（保留绝对值）
    /// - Low: 不变
    pub fn apply_pointer(&mut self, button: ButtonState, cursor: [f64; 2]) {
        let x = cursor[0] as f32;
        let y = cursor[1] as f32;
        match button {
            ButtonState::Rising => {
                self.mouse.z = x;
                self.mouse.w = y;
            }
            ButtonState::High => {
                self.mouse.x = x;
                self.mouse.y = y;
            }
            ButtonState::Falling => {
                self.mouse.z = -self.mouse.z.abs();
                self.mouse.w = -self.mouse.w.abs();
            }
            ButtonState::Low => {}
        }
    }
}

/// 帧 uniform 的存储
///
/// 每个 FrameSlot 一个 buffer，CPU 只会写入已经确认 GPU 用完的 buffer
pub struct UniformStore {
    buffers: Vec<GpuResourceHandle>,
    params: UniformParams,
}

// new & init
impl UniformStore {
    pub fn new(resources: &mut ResourceTable, device: &mut dyn GpuDevice, slot_count: usize) -> Self {
        assert!(slot_count > 0, "uniform store needs at least one slot");
        let buffers = (0..slot_count)
            .map(|slot| {
                resources.create_buffer(
                    device,
                    format!("frame-uniform-{slot}"),
                    BufferDesc {
                        size: size_of::<UniformParams>() as vk::DeviceSize,
                        usage: vk::BufferUsageFlags::UNIFORM_BUFFER,
                        host_visible: true,
                    },
                    BufferState::HOST_WRITE,
                )
            })
            .collect();
        Self {
            buffers,
            params: UniformParams::default(),
        }
    }

    pub fn destroy(self, resources: &mut ResourceTable, device: &mut dyn GpuDevice) {
        for buffer in self.buffers {
            resources.destroy(device, buffer);
        }
    }
}

// getters
impl UniformStore {
    #[inline]
    pub fn params(&self) -> &UniformParams {
        &self.params
    }

    #[inline]
    pub fn params_mut(&mut self) -> &mut UniformParams {
        &mut self.params
    }

    #[inline]
    pub fn buffer(&self, slot: usize) -> GpuResourceHandle {
        self.buffers[slot]
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.buffers.len()
    }
}

impl UniformStore {
    /// 把当前的 params 写入 `slot` 的 buffer
    ///
    /// 调用者需要保证该 slot 上一次提交已经完成
    pub fn write(&self, slot: usize, resources: &ResourceTable, device: &mut dyn GpuDevice) -> GpuResourceHandle {
        let buffer = self.buffers[slot];
        device.write_host_buffer(resources.resource(buffer), bytemuck::bytes_of(&self.params));
        buffer
    }
}
