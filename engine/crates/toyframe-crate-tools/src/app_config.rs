//! `toyframe.toml` 配置文件
//!
//! 所有字段都是可选的，缺省时使用默认值：
//!
//! ```toml
//! resolution = [1280, 720]
//! vsync = true
//! frames_in_flight = 3
//! shader_build_command = ["cmake", "--build", "build", "--target", "shaders"]
//! texture = "test_tex_1.png"
//! skybox = "skybox"
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 初始窗口大小
    pub resolution: [u32; 2],
    pub vsync: bool,
    pub frames_in_flight: usize,

    /// 热重载时执行的着色器编译命令，第一个元素是程序名
    pub shader_build_command: Vec<String>,

    /// `resources/textures/` 下的纹理文件名
    pub texture: String,
    /// `resources/textures/` 下的目录名，包含 right/left/top/bottom/front/back 六张 jpg
    pub skybox: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            resolution: [1280, 720],
            vsync: true,
            frames_in_flight: 3,
            shader_build_command: vec![
                "cmake".to_string(),
                "--build".to_string(),
                "build".to_string(),
                "--target".to_string(),
                "shaders".to_string(),
            ],
            texture: "test_tex_1.png".to_string(),
            skybox: "skybox".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content).context("解析 toyframe 配置失败")?;
        anyhow::ensure!(config.frames_in_flight > 0, "frames_in_flight 至少为 1");
        anyhow::ensure!(
            config.resolution[0] > 0 && config.resolution[1] > 0,
            "resolution 的宽和高都必须大于 0: {:?}",
            config.resolution
        );
        anyhow::ensure!(!config.shader_build_command.is_empty(), "shader_build_command 不能为空");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("配置文件无效: {}", path.display()))
    }

    /// 文件不存在时使用默认配置；文件存在但无效时打印警告并使用默认配置
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::info!("config file {} not found, use default config", path.display());
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(config) => {
                log::info!("load config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e:#}, fallback to default config");
                Self::default()
            }
        }
    }
}
