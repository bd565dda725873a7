//! 文档来源模块
//!
//! 本地目录（同步读取）与远程URL（并发下载）两种来源。

pub mod local;
pub mod remote;

pub use local::{LocalSource, expand_spine, find_files, unique_output_path};
pub use remote::{FetchPolicy, Fetcher, HttpFetcher, RemoteCoordinator, RemoteOutcome};

/// 是否为http(s) URL
pub fn is_remote(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://")
}

/// 去掉URL的协议部分，得到包内路径（如 `example.com/a.html`）
pub fn strip_scheme(href: &str) -> &str {
    href.strip_prefix("https://")
        .or_else(|| href.strip_prefix("http://"))
        .unwrap_or(href)
}

/// 远程URL在包内的文件路径
///
/// 去掉协议部分；以 `/` 结尾的目录式URL映射为其中的 `index.html`。
pub fn package_href(url: &str) -> String {
    let href = strip_scheme(url);
    if href.ends_with('/') {
        format!("{}index.html", href)
    } else {
        href.to_string()
    }
}

/// 阅读顺序是否全部为远程文档
pub fn is_remote_spine(spine: &[String]) -> bool {
    !spine.is_empty() && spine.iter().all(|href| is_remote(href))
}
