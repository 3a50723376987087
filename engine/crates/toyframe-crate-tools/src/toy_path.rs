use std::path::{Path, PathBuf};

/// 统一资源路径管理
///
/// 所有路径都基于工作区根目录（由 `CARGO_MANIFEST_DIR` 推导），
/// 不依赖运行时的当前目录。
///
/// ```ignore
/// let texture = ToyPath::textures_path("test_tex.png");   // resources/textures/test_tex.png
/// let skybox = ToyPath::textures_path("skybox");           // resources/textures/skybox
/// let shader = ToyPath::shader_build_path("toy.frag");    // shaders/.build/toy.frag.spv
/// ```
pub struct ToyPath {}
impl ToyPath {
    /// 工作区根目录
    pub fn workspace_path() -> PathBuf {
        // engine/crates/toyframe-crate-tools -> engine/crates -> engine -> workspace
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        manifest_dir.ancestors().nth(3).unwrap_or(manifest_dir).to_path_buf()
    }

    pub fn resources_path(filename: &str) -> PathBuf {
        Self::workspace_path().join("resources").join(filename)
    }

    pub fn textures_path(filename: &str) -> PathBuf {
        Self::workspace_path().join("resources").join("textures").join(filename)
    }

    /// 编译后的 SPIR-V 路径
    pub fn shader_build_path(program: &str) -> PathBuf {
        Self::workspace_path().join("shaders").join(".build").join(format!("{program}.spv"))
    }

    /// 默认的配置文件：`toyframe.toml`
    pub fn config_path() -> PathBuf {
        Self::workspace_path().join("toyframe.toml")
    }
}
