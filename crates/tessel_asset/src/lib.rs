//! Tessel Asset Loading
//!
//! Compiled shaders live at `shaders/<backend>/<name>.bin` under one of the
//! asset roots. Roots come from `TESSEL_ASSET_PATH` (a platform path list)
//! and are searched in order.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use tessel_core::RendererType;
use thiserror::Error;

/// Environment variable holding the asset roots.
pub const ASSET_PATH_ENV: &str = "TESSEL_ASSET_PATH";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset `{path}` not found in {searched} asset roots")]
    NotFound { path: PathBuf, searched: usize },

    #[error("failed to read `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("asset `{0}` is empty")]
    Empty(PathBuf),
}

/// Shader directory for a backend's bytecode flavor.
pub fn shader_dir(renderer: RendererType) -> &'static str {
    match renderer {
        RendererType::Direct3D9 => "dx9",
        RendererType::Direct3D11 | RendererType::Direct3D12 => "dx11",
        RendererType::Metal => "metal",
        RendererType::OpenGLES => "essl",
        RendererType::Vulkan => "spirv",
        RendererType::OpenGL | RendererType::Null => "glsl",
    }
}

/// Path of a compiled shader relative to an asset root.
pub fn shader_path(renderer: RendererType, name: &str) -> PathBuf {
    Path::new("shaders")
        .join(shader_dir(renderer))
        .join(format!("{name}.bin"))
}

#[derive(Debug, Clone)]
pub struct AssetLoader {
    roots: Vec<PathBuf>,
}

impl AssetLoader {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    /// Roots from `TESSEL_ASSET_PATH`, or the working directory when unset.
    pub fn from_env() -> Self {
        match std::env::var_os(ASSET_PATH_ENV) {
            Some(paths) => Self::from_path_list(&paths),
            None => Self::new([PathBuf::from(".")]),
        }
    }

    pub fn from_path_list(paths: &OsStr) -> Self {
        let roots = std::env::split_paths(paths).filter(|p| !p.as_os_str().is_empty());
        let loader = Self::new(roots);
        tracing::debug!("Asset roots: {:?}", loader.roots);
        loader
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn push_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    /// Full path of the first root that contains `relative`.
    pub fn find(&self, relative: &Path) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(relative))
            .find(|path| path.is_file())
    }

    /// Read `relative` from the first root that has it.
    pub fn load(&self, relative: &Path) -> Result<Vec<u8>, AssetError> {
        let path = self.find(relative).ok_or_else(|| AssetError::NotFound {
            path: relative.to_path_buf(),
            searched: self.roots.len(),
        })?;
        let data = std::fs::read(&path).map_err(|source| AssetError::Io {
            path: path.clone(),
            source,
        })?;
        if data.is_empty() {
            return Err(AssetError::Empty(path));
        }
        tracing::debug!("Loaded {} ({} bytes)", path.display(), data.len());
        Ok(data)
    }

    /// Compiled shader bytecode for `renderer`.
    pub fn load_shader(&self, renderer: RendererType, name: &str) -> Result<Vec<u8>, AssetError> {
        self.load(&shader_path(renderer, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("tessel_asset_{}_{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("shaders/glsl")).unwrap();
        root
    }

    #[test]
    fn shader_paths_per_backend() {
        assert_eq!(
            shader_path(RendererType::Null, "vs_cubes"),
            Path::new("shaders/glsl/vs_cubes.bin")
        );
        assert_eq!(shader_dir(RendererType::Direct3D12), "dx11");
        assert_eq!(shader_dir(RendererType::Vulkan), "spirv");
        assert_eq!(shader_dir(RendererType::OpenGLES), "essl");
    }

    #[test]
    fn path_list_skips_empty_entries() {
        let joined = std::env::join_paths(["/a", "", "/b"].iter()).unwrap();
        let loader = AssetLoader::from_path_list(&joined);
        assert_eq!(loader.roots(), &[PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn first_root_wins() {
        let first = temp_root("first");
        let second = temp_root("second");
        fs::write(second.join("shaders/glsl/vs_cubes.bin"), b"VSH second").unwrap();
        fs::write(second.join("shaders/glsl/fs_cubes.bin"), b"FSH second").unwrap();
        fs::write(first.join("shaders/glsl/fs_cubes.bin"), b"FSH first").unwrap();

        let loader = AssetLoader::new([first.clone(), second.clone()]);
        assert_eq!(
            loader.load_shader(RendererType::Null, "vs_cubes").unwrap(),
            b"VSH second"
        );
        assert_eq!(
            loader.load_shader(RendererType::OpenGL, "fs_cubes").unwrap(),
            b"FSH first"
        );

        let _ = fs::remove_dir_all(first);
        let _ = fs::remove_dir_all(second);
    }

    #[test]
    fn missing_and_empty_assets() {
        let root = temp_root("missing");
        fs::write(root.join("shaders/glsl/empty.bin"), b"").unwrap();
        let loader = AssetLoader::new([root.clone()]);

        assert!(matches!(
            loader.load_shader(RendererType::Null, "nope"),
            Err(AssetError::NotFound { searched: 1, .. })
        ));
        assert!(matches!(
            loader.load_shader(RendererType::Null, "empty"),
            Err(AssetError::Empty(_))
        ));
        let _ = fs::remove_dir_all(root);
    }
}
