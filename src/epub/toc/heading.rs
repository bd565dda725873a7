//! 标题提取模块
//!
//! 从单个HTML文档中提取结构化标题及其锚点。

use crate::epub::config::HeadingSelector;
use crate::epub::error::{EpubError, Result};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

/// 文档中的一个标题
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    /// 相对于最顶层标题标签的层级（从0开始）
    pub level: usize,
    /// 规范化后的标题文本
    pub title: String,
    /// 链接目标 `href[#fragment]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl Heading {
    pub fn new(level: usize, title: impl Into<String>, href: Option<String>) -> Self {
        Self {
            level,
            title: title.into(),
            href,
        }
    }
}

/// 一个源文档及其标题序列
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub href: String,
    pub headings: Vec<Heading>,
}

impl Page {
    pub fn new(href: impl Into<String>, headings: Vec<Heading>) -> Self {
        Self {
            href: href.into(),
            headings,
        }
    }

    /// 解析HTML内容并提取标题
    pub fn from_markup(
        href: &str,
        markup: &str,
        selector: &HeadingSelector,
        keep_all_headings: bool,
    ) -> Result<Self> {
        let document = Html::parse_document(markup);
        let headings = extract_headings(&document, href, selector, keep_all_headings)?;
        Ok(Self::new(href, headings))
    }
}

/// 提取文档中的所有标题
///
/// 没有可用锚点的标题会被丢弃，除非 `keep_all_headings` 为真；
/// 文档的第一个标题如果没有锚点，则链接到整个页面。
pub fn extract_headings(
    document: &Html,
    href: &str,
    selector: &HeadingSelector,
    keep_all_headings: bool,
) -> Result<Vec<Heading>> {
    let css = Selector::parse(&selector.css())
        .map_err(|e| EpubError::ConfigError(format!("无效的标题选择器 '{}': {}", selector.css(), e)))?;

    let mut headings = Vec::new();
    for (index, element) in document.select(&css).enumerate() {
        let Some(level) = selector.level_of(element.value().name()) else {
            continue;
        };

        let title = normalize_text(&element.text().collect::<String>());
        let href = match find_anchor_id(element) {
            Some(id) => Some(format!("{}#{}", href, id)),
            None if index == 0 => Some(href.to_string()),
            None => None,
        };

        if href.is_some() || keep_all_headings {
            headings.push(Heading { level, title, href });
        }
    }

    Ok(headings)
}

/// 为标题寻找可用的ID
///
/// 从标题元素开始向上查找：元素本身有id则直接使用；
/// 否则只有在它之前没有任何可见文本时，才继续尝试父元素的id。
pub fn find_anchor_id(element: ElementRef) -> Option<String> {
    let mut current = Some(element);

    while let Some(elt) = current {
        if let Some(id) = elt.value().id() {
            return Some(id.to_string());
        }

        let mut leading = String::new();
        for sibling in elt.prev_siblings() {
            match sibling.value() {
                Node::Text(text) => leading.push_str(text),
                Node::Element(_) => {
                    if let Some(sibling) = ElementRef::wrap(sibling) {
                        leading.extend(sibling.text());
                    }
                }
                _ => {}
            }
        }
        if !leading.trim().is_empty() {
            return None;
        }

        current = elt.parent().and_then(ElementRef::wrap);
    }

    None
}

/// 去掉首尾空白并将连续空白合并为一个空格
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
