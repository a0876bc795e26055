use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{resolve_path, AbstractFile, StorageScope};
use crate::platform::{FileStat, Filesystem, PathResolver};

/// 本地文件
///
/// 构造时解析绝对路径并同步 stat 一次；每次成功的修改操作后重新 stat。
pub struct LocalFile {
    path: PathBuf,
    scope: StorageScope,
    stat: FileStat,
    fs: Arc<dyn Filesystem>,
}

impl LocalFile {
    /// 按存储范围解析相对路径
    pub fn new(
        path: &str,
        scope: StorageScope,
        resolver: &dyn PathResolver,
        fs: Arc<dyn Filesystem>,
    ) -> Self {
        let resolved = PathBuf::from(resolve_path(resolver, path, scope));
        Self::wrapped(resolved, scope, fs)
    }

    /// 包装一个已解析的绝对路径（用于目录枚举的子项）
    pub fn wrapped(path: PathBuf, scope: StorageScope, fs: Arc<dyn Filesystem>) -> Self {
        let stat = fs.stat(&path);
        Self {
            path,
            scope,
            stat,
            fs,
        }
    }

    pub fn resolved_path(&self) -> &Path {
        &self.path
    }

    fn refresh(&mut self) {
        self.stat = self.fs.stat(&self.path);
    }
}

impl AbstractFile for LocalFile {
    fn size(&self) -> u64 {
        self.stat.size
    }

    fn is_directory(&self) -> bool {
        self.stat.is_directory
    }

    fn exists(&self) -> bool {
        self.stat.exists
    }

    fn path(&self) -> String {
        self.path.display().to_string()
    }

    fn scope(&self) -> StorageScope {
        self.scope
    }

    fn load_as_text(&self) -> Option<String> {
        if !self.stat.exists || self.stat.is_directory {
            return None;
        }
        match self.fs.read_to_string(&self.path) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(target: "file", path = %self.path.display(), "loadAsText failed: {}", e);
                None
            }
        }
    }

    fn create_with_text(&mut self, text: &str) -> bool {
        match self.fs.write(&self.path, text.as_bytes()) {
            Ok(()) => {
                self.refresh();
                true
            }
            Err(e) => {
                tracing::warn!(target: "file", path = %self.path.display(), "createWithText failed: {}", e);
                false
            }
        }
    }

    fn list_files(&self) -> Vec<Box<dyn AbstractFile>> {
        if !self.stat.is_directory {
            return Vec::new();
        }
        match self.fs.list_dir(&self.path) {
            Ok(children) => children
                .into_iter()
                .map(|child| {
                    Box::new(LocalFile::wrapped(child, self.scope, Arc::clone(&self.fs)))
                        as Box<dyn AbstractFile>
                })
                .collect(),
            Err(e) => {
                tracing::warn!(target: "file", path = %self.path.display(), "listFiles failed: {}", e);
                Vec::new()
            }
        }
    }

    fn delete(&mut self) -> bool {
        match self.fs.remove(&self.path) {
            Ok(()) => {
                self.refresh();
                true
            }
            Err(e) => {
                tracing::warn!(target: "file", path = %self.path.display(), "delete failed: {}", e);
                false
            }
        }
    }

    fn mkdir(&mut self) -> bool {
        match self.fs.create_dir(&self.path) {
            Ok(()) => {
                self.refresh();
                true
            }
            Err(e) => {
                tracing::warn!(target: "file", path = %self.path.display(), "mkdir failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{NativeFilesystem, StorageRoots};

    fn open(root: &Path, path: &str) -> LocalFile {
        let roots = StorageRoots::new(root, root.join("docs"));
        LocalFile::new(path, StorageScope::Bundle, &roots, Arc::new(NativeFilesystem::new()))
    }

    #[test]
    fn test_create_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = open(dir.path(), "hello.txt");
        assert!(!file.exists());
        assert_eq!(file.size(), 0);
        assert!(file.load_as_text().is_none());

        assert!(file.create_with_text("hello"));
        assert!(file.exists());
        assert_eq!(file.size(), 5);
        assert_eq!(file.load_as_text().as_deref(), Some("hello"));
    }

    #[test]
    fn test_directory_listing() {
        let dir = tempfile::tempdir().unwrap();
        let mut folder = open(dir.path(), "folder");
        assert!(folder.mkdir());
        assert!(folder.is_directory());
        assert_eq!(folder.size(), 0);
        assert!(folder.list_files().is_empty());
        assert!(folder.load_as_text().is_none());

        let mut child = open(dir.path(), "folder/child.txt");
        assert!(child.create_with_text("x"));

        let listed = folder.list_files();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].path().ends_with("child.txt"));
        assert_eq!(listed[0].scope(), StorageScope::Bundle);
    }

    #[test]
    fn test_failures_return_false() {
        let dir = tempfile::tempdir().unwrap();
        let mut missing = open(dir.path(), "nope/deeper");
        assert!(!missing.mkdir());
        assert!(!missing.delete());
        assert!(!missing.create_with_text("x"));
        assert!(missing.list_files().is_empty());
    }

    #[test]
    fn test_delete_restats() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = open(dir.path(), "gone.txt");
        assert!(file.create_with_text("bye"));
        assert!(file.delete());
        assert!(!file.exists());
        assert_eq!(file.size(), 0);
    }
}
