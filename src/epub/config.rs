//! 转换配置模块
//!
//! 定义一次转换请求的全部参数，支持从YAML（或JSON）配置文件加载。

use crate::epub::error::{EpubError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 默认的标题选择器
pub const DEFAULT_HEADINGS: &str = "h1,h2,h3,h4,h5,h6";

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// 完整的EPUB包
    Epub,
    /// 仅输出content.opf
    Opf,
    /// 纯文本目录
    Txt,
    /// JSON结构化目录
    Json,
    /// EPUB2 NCX目录
    Ncx,
    /// EPUB3 XHTML导航文档
    Xhtml,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Epub
    }
}

/// 标题标签选择器
///
/// 标签按从上到下的层级排列，第一个标签的层级为0。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingSelector {
    tags: Vec<String>,
}

impl HeadingSelector {
    /// 从标签列表创建选择器
    pub fn new(tags: Vec<String>) -> Result<Self> {
        if tags.is_empty() {
            return Err(EpubError::ConfigError("标题选择器不能为空".to_string()));
        }
        Ok(Self { tags })
    }

    /// 所有标签（按层级排序）
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// 标签对应的层级；不在选择器中的标签返回None
    pub fn level_of(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| t.eq_ignore_ascii_case(tag))
    }

    /// 生成CSS选择器字符串（用于scraper）
    pub fn css(&self) -> String {
        self.tags.join(", ")
    }
}

impl FromStr for HeadingSelector {
    type Err = EpubError;

    /// 支持 `h1,h2,h3` 与 `h2..h4` 两种写法
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some((top, bottom)) = s.split_once("..") {
            let parse_rank = |tag: &str| -> Result<u32> {
                let tag = tag.trim().to_ascii_lowercase();
                tag.strip_prefix('h')
                    .and_then(|n| n.parse::<u32>().ok())
                    .filter(|n| (1..=6).contains(n))
                    .ok_or_else(|| EpubError::ConfigError(format!("无效的标题标签: {}", tag)))
            };
            let (top, bottom) = (parse_rank(top)?, parse_rank(bottom)?);
            if top > bottom {
                return Err(EpubError::ConfigError(format!("无效的标题范围: {}", s)));
            }
            return Self::new((top..=bottom).map(|n| format!("h{}", n)).collect());
        }

        let tags = s
            .split(',')
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self::new(tags)
    }
}

impl Default for HeadingSelector {
    fn default() -> Self {
        Self {
            tags: (1..=6).map(|n| format!("h{}", n)).collect(),
        }
    }
}

/// 一次转换请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionRequest {
    /// 书名
    pub title: String,
    /// 唯一标识符
    pub identifier: String,
    /// 生成文档的字符集
    pub charset: String,
    /// 书籍语言
    pub language: String,
    /// 额外的Dublin Core元数据
    pub dc: BTreeMap<String, String>,
    /// 最后修改时间（ISO-8601，精确到秒）
    pub modified: String,
    /// 目录深度
    pub depth: usize,
    /// 标题选择器（如 `h1,h2,h3` 或 `h2..h4`）
    pub headings: String,
    /// 是否保留无法生成链接的标题
    #[serde(alias = "keep-all-headings", alias = "keep_all_headings")]
    pub keep_all_headings: bool,
    /// 严格模式：丢弃层级不连续的标题
    pub strict: bool,
    /// 输出格式
    pub format: OutputFormat,
    /// 本地文档的根目录
    pub basedir: PathBuf,
    /// 阅读顺序（本地路径或http(s) URL）
    pub spine: Vec<String>,
    /// 输出文件
    #[serde(alias = "output-file", alias = "output_file")]
    pub output_file: Option<PathBuf>,
}

impl Default for ConversionRequest {
    fn default() -> Self {
        Self {
            title: "Untitled".to_string(),
            identifier: uuid::Uuid::new_v4().to_string(),
            charset: "UTF-8".to_string(),
            language: "en".to_string(),
            dc: BTreeMap::new(),
            modified: now_iso8601(),
            depth: 3,
            headings: DEFAULT_HEADINGS.to_string(),
            keep_all_headings: false,
            strict: false,
            format: OutputFormat::default(),
            basedir: PathBuf::from("."),
            spine: Vec::new(),
            output_file: None,
        }
    }
}

impl ConversionRequest {
    /// 从配置文件加载转换请求
    ///
    /// 未指定输出文件时，使用配置文件名（去掉扩展名）加 `.epub`。
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| EpubError::ConfigError(format!("无法读取配置文件: {}", e)))?;

        let mut request = Self::from_yaml(&content)?;
        if request.output_file.is_none() {
            if let Some(stem) = path.file_stem() {
                let mut name = stem.to_os_string();
                name.push(".epub");
                request.output_file = Some(PathBuf::from(name));
            }
        }
        Ok(request)
    }

    /// 解析YAML/JSON格式的配置内容
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yml::from_str(content)
            .map_err(|e| EpubError::ConfigError(format!("配置文件格式错误: {}", e)))
    }

    /// 解析后的标题选择器
    pub fn heading_selector(&self) -> Result<HeadingSelector> {
        self.headings.parse()
    }

    /// 输出文件路径（默认为根目录名 + `.epub`）
    pub fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output_file {
            return output.clone();
        }
        let name = self
            .basedir
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_os_string()))
            .unwrap_or_else(|| "book".into());
        let mut name = name;
        name.push(".epub");
        PathBuf::from(name)
    }
}

/// 当前UTC时间，格式 `YYYY-MM-DDTHH:MM:SSZ`
pub fn now_iso8601() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_request() {
        let request = ConversionRequest::default();
        assert_eq!(request.title, "Untitled");
        assert_eq!(request.charset, "UTF-8");
        assert_eq!(request.language, "en");
        assert_eq!(request.depth, 3);
        assert_eq!(request.headings, DEFAULT_HEADINGS);
        assert!(!request.keep_all_headings);
        assert!(!request.strict);
        assert_eq!(request.format, OutputFormat::Epub);
    }

    #[test]
    fn test_default_identifier_is_uuid() {
        let request = ConversionRequest::default();
        let parsed = uuid::Uuid::parse_str(&request.identifier);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_modified_format() {
        let modified = now_iso8601();
        assert_eq!(modified.len(), 20);
        assert!(modified.ends_with('Z'));
        assert_eq!(&modified[10..11], "T");
    }

    #[test]
    fn test_selector_from_list() {
        let selector: HeadingSelector = "h2, h3,h4".parse().unwrap();
        assert_eq!(selector.tags(), &["h2", "h3", "h4"]);
        assert_eq!(selector.level_of("h2"), Some(0));
        assert_eq!(selector.level_of("H4"), Some(2));
        assert_eq!(selector.level_of("h1"), None);
    }

    #[test]
    fn test_selector_from_range() {
        let selector: HeadingSelector = "h2..h4".parse().unwrap();
        assert_eq!(selector.tags(), &["h2", "h3", "h4"]);
        assert_eq!(selector.css(), "h2, h3, h4");
    }

    #[test]
    fn test_selector_invalid() {
        assert!("".parse::<HeadingSelector>().is_err());
        assert!("h4..h2".parse::<HeadingSelector>().is_err());
        assert!("h0..h9".parse::<HeadingSelector>().is_err());
    }

    #[test]
    fn test_from_json_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alice.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"title": "Alice", "depth": 2, "keepAllHeadings": true, "format": "txt",
               "spine": ["00.xhtml", "01.xhtml"], "dc": {{"creator": "Lewis Carroll"}}}}"#
        )
        .unwrap();

        let request = ConversionRequest::from_file(&path).unwrap();
        assert_eq!(request.title, "Alice");
        assert_eq!(request.depth, 2);
        assert!(request.keep_all_headings);
        assert_eq!(request.format, OutputFormat::Txt);
        assert_eq!(request.spine, vec!["00.xhtml", "01.xhtml"]);
        assert_eq!(request.dc.get("creator").map(String::as_str), Some("Lewis Carroll"));
        assert_eq!(request.output_file, Some(PathBuf::from("alice.epub")));
        // 未提供的字段使用默认值
        assert_eq!(request.language, "en");
    }

    #[test]
    fn test_kebab_and_snake_field_names() {
        let request = ConversionRequest::from_yaml("keep-all-headings: true\noutput-file: out/book.epub\n").unwrap();
        assert!(request.keep_all_headings);
        assert_eq!(request.output_file, Some(PathBuf::from("out/book.epub")));

        let request = ConversionRequest::from_yaml("keep_all_headings: true\noutput_file: b.epub\n").unwrap();
        assert!(request.keep_all_headings);
        assert_eq!(request.output_file, Some(PathBuf::from("b.epub")));
    }

    #[test]
    fn test_invalid_config() {
        let result = ConversionRequest::from_yaml("depth: [not, a, number]");
        assert!(matches!(result, Err(EpubError::ConfigError(_))));
    }
}
