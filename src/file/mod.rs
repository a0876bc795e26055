//! 文件抽象
//!
//! `AbstractFile` 是脚本可见 `File` 对象背后的多态能力：
//! - [`LocalFile`]: 资源包或用户文档目录下的本地文件
//! - [`RemoteFile`]: 以 URL 表示的只读远程文件
//!
//! 所有 I/O 都是阻塞的，失败只记录日志并以 `false` / `None` 返回。

mod local;
mod remote;

use std::path::Path;
use std::sync::Arc;

use crate::platform::{Filesystem, PathResolver, RemoteFetcher};

pub use local::LocalFile;
pub use remote::RemoteFile;

/// 存储范围，决定相对路径解析到哪个根目录
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// 资源包目录 (0)
    #[default]
    Bundle,
    /// 用户文档目录 (1)
    Documents,
    /// 远程 URL (2)
    Remote,
}

impl StorageScope {
    /// 脚本侧的数字编码转换，未知值返回 `None`
    pub fn from_script(value: f64) -> Option<Self> {
        if value.fract() != 0.0 {
            return None;
        }
        match value as i64 {
            0 => Some(StorageScope::Bundle),
            1 => Some(StorageScope::Documents),
            2 => Some(StorageScope::Remote),
            _ => None,
        }
    }

    pub fn to_script(self) -> u8 {
        match self {
            StorageScope::Bundle => 0,
            StorageScope::Documents => 1,
            StorageScope::Remote => 2,
        }
    }
}

/// 文件能力
pub trait AbstractFile {
    /// 字节数；不存在或为目录时为 0
    fn size(&self) -> u64;
    fn is_directory(&self) -> bool;
    fn exists(&self) -> bool;
    /// 解析后的绝对路径（远程文件为 URL）
    fn path(&self) -> String;
    fn scope(&self) -> StorageScope;

    fn load_as_text(&self) -> Option<String>;
    fn create_with_text(&mut self, text: &str) -> bool;
    /// 直接子项，非目录返回空
    fn list_files(&self) -> Vec<Box<dyn AbstractFile>>;
    fn delete(&mut self) -> bool;
    fn mkdir(&mut self) -> bool;
}

/// 文件后端集合：按存储范围打开具体实现
#[derive(Clone)]
pub struct FileBackends {
    pub filesystem: Arc<dyn Filesystem>,
    pub resolver: Arc<dyn PathResolver>,
    pub fetcher: Arc<dyn RemoteFetcher>,
}

impl FileBackends {
    pub fn new(
        filesystem: Arc<dyn Filesystem>,
        resolver: Arc<dyn PathResolver>,
        fetcher: Arc<dyn RemoteFetcher>,
    ) -> Self {
        Self {
            filesystem,
            resolver,
            fetcher,
        }
    }

    /// 打开文件：远程范围得到 `RemoteFile`，其余得到 `LocalFile`
    pub fn open(&self, path: &str, scope: StorageScope) -> Box<dyn AbstractFile> {
        match scope {
            StorageScope::Remote => Box::new(RemoteFile::new(path, Arc::clone(&self.fetcher))),
            _ => Box::new(LocalFile::new(
                path,
                scope,
                self.resolver.as_ref(),
                Arc::clone(&self.filesystem),
            )),
        }
    }

    /// 按存储范围解析路径
    pub fn resolve(&self, path: &str, scope: StorageScope) -> String {
        resolve_path(self.resolver.as_ref(), path, scope)
    }
}

pub(crate) fn resolve_path(resolver: &dyn PathResolver, path: &str, scope: StorageScope) -> String {
    let root: &Path = match scope {
        StorageScope::Bundle => resolver.bundle_root(),
        StorageScope::Documents => resolver.documents_root(),
        StorageScope::Remote => return path.to_string(),
    };
    root.join(path.trim_start_matches('/')).display().to_string()
}
