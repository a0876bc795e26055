//! 平台抽象层
//!
//! 桥接核心通过这里的窄接口消费外部协作者：
//! - `PathResolver`: 资源包根目录与用户文档根目录
//! - `Filesystem`: stat / 读 / 写 / 枚举 / 建目录 / 删除
//! - `http::RemoteFetcher`: 同步拉取远程文本

pub mod http;

use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::core::{FileError, FileResult};

pub use http::{HttpFetcher, RemoteFetcher};

// ============================================================================
// Path Resolution
// ============================================================================

/// 存储根目录解析
pub trait PathResolver: Send + Sync {
    /// 资源包根目录
    fn bundle_root(&self) -> &Path;

    /// 用户文档根目录
    fn documents_root(&self) -> &Path;
}

/// 固定根目录的路径解析器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoots {
    bundle: PathBuf,
    documents: PathBuf,
}

impl StorageRoots {
    pub fn new(bundle: impl Into<PathBuf>, documents: impl Into<PathBuf>) -> Self {
        Self {
            bundle: bundle.into(),
            documents: documents.into(),
        }
    }

    /// 按配置构建，未配置的根目录使用平台默认值
    pub fn from_config(config: &StorageConfig) -> Self {
        let bundle = config
            .bundle_root
            .clone()
            .unwrap_or_else(default_bundle_root);
        let documents = config
            .documents_root
            .clone()
            .unwrap_or_else(default_documents_root);
        Self { bundle, documents }
    }
}

impl PathResolver for StorageRoots {
    fn bundle_root(&self) -> &Path {
        &self.bundle
    }

    fn documents_root(&self) -> &Path {
        &self.documents
    }
}

fn default_bundle_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_documents_root() -> PathBuf {
    dirs::document_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

// ============================================================================
// Filesystem Abstraction
// ============================================================================

/// 一次 stat 的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStat {
    pub exists: bool,
    pub is_directory: bool,
    /// 字节数；不存在或为目录时为 0
    pub size: u64,
}

/// 文件系统原语
pub trait Filesystem: Send + Sync {
    fn stat(&self, path: &Path) -> FileStat;
    fn read_to_string(&self, path: &Path) -> FileResult<String>;
    fn write(&self, path: &Path, data: &[u8]) -> FileResult<()>;
    /// 只枚举直接子项
    fn list_dir(&self, path: &Path) -> FileResult<Vec<PathBuf>>;
    /// 不创建中间目录
    fn create_dir(&self, path: &Path) -> FileResult<()>;
    fn remove(&self, path: &Path) -> FileResult<()>;
}

// ============================================================================
// Native Filesystem Implementation
// ============================================================================

pub struct NativeFilesystem;

impl Default for NativeFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeFilesystem {
    pub fn new() -> Self {
        Self
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

impl Filesystem for NativeFilesystem {
    fn stat(&self, path: &Path) -> FileStat {
        match std::fs::metadata(path) {
            Ok(meta) => FileStat {
                exists: true,
                is_directory: meta.is_dir(),
                size: if meta.is_dir() { 0 } else { meta.len() },
            },
            Err(_) => FileStat::default(),
        }
    }

    fn read_to_string(&self, path: &Path) -> FileResult<String> {
        let bytes = std::fs::read(path).map_err(|e| FileError::io(display(path), e))?;
        String::from_utf8(bytes).map_err(|_| FileError::Encoding { path: display(path) })
    }

    fn write(&self, path: &Path, data: &[u8]) -> FileResult<()> {
        std::fs::write(path, data).map_err(|e| FileError::io(display(path), e))
    }

    fn list_dir(&self, path: &Path) -> FileResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path).map_err(|e| FileError::io(display(path), e))?;
        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FileError::io(display(path), e))?;
            children.push(entry.path());
        }
        children.sort();
        Ok(children)
    }

    fn create_dir(&self, path: &Path) -> FileResult<()> {
        std::fs::create_dir(path).map_err(|e| FileError::io(display(path), e))
    }

    fn remove(&self, path: &Path) -> FileResult<()> {
        let meta = std::fs::symlink_metadata(path).map_err(|e| FileError::io(display(path), e))?;
        let result = if meta.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        result.map_err(|e| FileError::io(display(path), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roots_from_config() {
        let config = StorageConfig {
            bundle_root: Some(PathBuf::from("/srv/bundle")),
            documents_root: Some(PathBuf::from("/srv/docs")),
        };
        let roots = StorageRoots::from_config(&config);
        assert_eq!(roots.bundle_root(), Path::new("/srv/bundle"));
        assert_eq!(roots.documents_root(), Path::new("/srv/docs"));
    }

    #[test]
    fn test_native_stat_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let fs = NativeFilesystem::new();

        let missing = fs.stat(&dir.path().join("nope"));
        assert_eq!(missing, FileStat::default());

        fs.write(&dir.path().join("b.txt"), b"bb").unwrap();
        fs.write(&dir.path().join("a.txt"), b"a").unwrap();
        fs.create_dir(&dir.path().join("sub")).unwrap();

        let stat = fs.stat(&dir.path().join("b.txt"));
        assert!(stat.exists && !stat.is_directory);
        assert_eq!(stat.size, 2);
        assert_eq!(fs.stat(&dir.path().join("sub")).size, 0);

        let names: Vec<_> = fs
            .list_dir(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
    }

    #[test]
    fn test_native_remove_directory() {
        let dir = tempfile::tempdir().unwrap();
        let fs = NativeFilesystem::new();
        let sub = dir.path().join("nested");
        fs.create_dir(&sub).unwrap();
        fs.write(&sub.join("inner.txt"), b"x").unwrap();

        fs.remove(&sub).unwrap();
        assert!(!fs.stat(&sub).exists);
        assert!(matches!(fs.remove(&sub), Err(FileError::NotFound { .. })));
    }

    #[test]
    fn test_create_dir_is_not_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let fs = NativeFilesystem::new();
        assert!(fs.create_dir(&dir.path().join("a").join("b")).is_err());
    }
}
