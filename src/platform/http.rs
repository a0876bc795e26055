//! 远程文本拉取
//!
//! `RemoteFile` 的网络后端。所有请求都是阻塞的，在脚本线程上执行。

use std::time::Duration;

use crate::config::RemoteConfig;
use crate::core::{FileError, FileResult};

/// 同步拉取远程资源并按 UTF-8 解码
pub trait RemoteFetcher: Send + Sync {
    fn fetch_text(&self, url: &str) -> FileResult<String>;
}

/// 基于 reqwest 阻塞客户端的实现
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn from_config(config: &RemoteConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl RemoteFetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> FileResult<String> {
        let network = |reason: String| FileError::Network {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| network(e.to_string()))?;

        let bytes = response.bytes().map_err(|e| network(e.to_string()))?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FileError::Encoding {
            path: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_network_error() {
        let fetcher = HttpFetcher::from_config(&RemoteConfig::default()).unwrap();
        let err = fetcher.fetch_text("not a url").unwrap_err();
        assert!(matches!(err, FileError::Network { .. }));
    }
}
