use std::fmt;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EpubError>;

/// 转换过程中的致命错误类型
#[derive(Error, Debug)]
pub enum EpubError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("Zip文件错误: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("配置文件错误: {0}")]
    ConfigError(String),

    #[error("没有找到任何可转换的文档")]
    NoDocuments,

    #[error("不支持或不存在的来源: {0}")]
    UnsupportedSource(String),

    #[error("下载失败 {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("转换已取消")]
    Cancelled,
}

/// 非致命问题：记录后继续处理
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// 标题层级跳跃（例如 h1 之后直接出现 h3）
    NonContiguousHeading { level: usize, title: String },
    /// 清单中出现多个NCX文件
    DuplicateNcx { count: usize },
    /// 来源不存在或协议不受支持
    MissingSource { source: String },
    /// 远程资源在重试后仍然下载失败
    FetchFailed { url: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NonContiguousHeading { level, title } => {
                write!(f, "标题层级不连续 (h{}): {}", level + 1, title)
            }
            Diagnostic::DuplicateNcx { count } => {
                write!(f, "发现了 {} 个NCX文件", count)
            }
            Diagnostic::MissingSource { source } => {
                write!(f, "不支持或不存在的来源: {}", source)
            }
            Diagnostic::FetchFailed { url, reason } => {
                write!(f, "无法下载 {} - {}", url, reason)
            }
        }
    }
}

impl Diagnostic {
    /// 通过tracing输出诊断信息
    pub(crate) fn emit(&self) {
        tracing::warn!("{}", self);
    }
}
