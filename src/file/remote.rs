use std::sync::Arc;

use super::{AbstractFile, StorageScope};
use crate::core::{FileError, FileResult};
use crate::platform::RemoteFetcher;

/// 远程文件：路径即 URL，只支持读取
pub struct RemoteFile {
    url: String,
    fetcher: Arc<dyn RemoteFetcher>,
}

impl RemoteFile {
    pub fn new(url: impl Into<String>, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        Self {
            url: url.into(),
            fetcher,
        }
    }

    /// 远程文件只读，所有修改操作都返回 [`FileError::Unsupported`]
    pub fn check_writable(&self, operation: &'static str) -> FileResult<()> {
        Err(FileError::Unsupported {
            path: self.url.clone(),
            operation,
        })
    }

    fn mutate(&self, operation: &'static str) -> bool {
        match self.check_writable(operation) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(target: "file", "{}", e);
                false
            }
        }
    }
}

impl AbstractFile for RemoteFile {
    fn size(&self) -> u64 {
        0
    }

    fn is_directory(&self) -> bool {
        false
    }

    fn exists(&self) -> bool {
        false
    }

    fn path(&self) -> String {
        self.url.clone()
    }

    fn scope(&self) -> StorageScope {
        StorageScope::Remote
    }

    fn load_as_text(&self) -> Option<String> {
        match self.fetcher.fetch_text(&self.url) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(target: "file", url = %self.url, "remote loadAsText failed: {}", e);
                None
            }
        }
    }

    fn create_with_text(&mut self, _text: &str) -> bool {
        self.mutate("createWithText")
    }

    fn list_files(&self) -> Vec<Box<dyn AbstractFile>> {
        Vec::new()
    }

    fn delete(&mut self) -> bool {
        self.mutate("delete")
    }

    fn mkdir(&mut self) -> bool {
        self.mutate("mkdir")
    }
}
