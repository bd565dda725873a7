//! 元数据模块
//!
//! OPF `<metadata>` 部分：Dublin Core 元素与 `dcterms:modified`。

use crate::epub::config::ConversionRequest;
use std::collections::BTreeMap;

/// OPF文件中的元数据信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// 唯一标识符（dc:identifier id="uuid"）
    pub identifier: String,
    /// 书名
    pub title: String,
    /// 语言
    pub language: String,
    /// 最后修改时间
    pub modified: String,
    /// 其他Dublin Core元素，如 creator、publisher
    pub dc: BTreeMap<String, String>,
}

impl Metadata {
    /// 从转换请求中提取元数据
    pub fn from_request(request: &ConversionRequest) -> Self {
        Self {
            identifier: request.identifier.clone(),
            title: request.title.clone(),
            language: request.language.clone(),
            modified: request.modified.clone(),
            dc: request.dc.clone(),
        }
    }

    /// 额外的Dublin Core元素，键不带 `dc:` 前缀
    pub fn extra_elements(&self) -> impl Iterator<Item = (String, &str)> {
        self.dc.iter().map(|(key, value)| {
            let key = key.strip_prefix("dc:").unwrap_or(key);
            (format!("dc:{}", key), value.as_str())
        })
    }
}
