use ash::vk;
use toyframe_crate_tools::app_config::AppConfig;

/// 渲染器默认配置
pub struct DefaultRendererSettings;
impl DefaultRendererSettings {
    pub const DEFAULT_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        // shader 输出会被自动改变： liner -> sRGB
        format: vk::Format::B8G8R8A8_SRGB,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    pub const FRAMES_IN_FLIGHT: usize = 3;
    pub const DEFAULT_EXTENT: vk::Extent2D = vk::Extent2D {
        width: 1280,
        height: 720,
    };
}

/// 帧级渲染配置
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameSettings {
    pub color_format: vk::Format,
    pub frame_extent: vk::Extent2D,
    pub vsync: bool,
    pub frames_in_flight: usize,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            color_format: DefaultRendererSettings::DEFAULT_SURFACE_FORMAT.format,
            frame_extent: DefaultRendererSettings::DEFAULT_EXTENT,
            vsync: true,
            frames_in_flight: DefaultRendererSettings::FRAMES_IN_FLIGHT,
        }
    }
}

impl FrameSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            frame_extent: vk::Extent2D {
                width: config.resolution[0],
                height: config.resolution[1],
            },
            vsync: config.vsync,
            frames_in_flight: config.frames_in_flight,
            ..Default::default()
        }
    }

    /// vsync 时使用 FIFO，否则 MAILBOX
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        if self.vsync {
            vk::PresentModeKHR::FIFO
        } else {
            vk::PresentModeKHR::MAILBOX
        }
    }
}
