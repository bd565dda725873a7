//! 目录渲染模块
//!
//! 四种输出格式：
//!  - txt   : 按文档顺序平铺的缩进文本
//!  - json  : 结构化的目录树
//!  - ncx   : EPUB2 索引（navMap / navPoint）
//!  - xhtml : EPUB3 导航文档（nav / ol / li）
//!
//! 除纯文本外，所有格式都基于同一棵 [`TocTree`]。

use crate::epub::error::Result;
use crate::epub::toc::heading::Page;
use crate::epub::toc::navigation::{DocTitle, NavMap, NavPoint, NcxMetadata};
use crate::epub::toc::tree::{NodeId, TocTree};
use crate::epub::xml::{XmlWriter, empty, end, finish, new_writer, start, text_element};
use serde::Serialize;

const NCX_NAMESPACE: &str = "http://www.daisy.org/z3986/2005/ncx/";
const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
const OPS_NAMESPACE: &str = "http://www.idpf.org/2007/ops";
const NAV_STYLE: &str = " nav ol { list-style-type: none; } ";

/// 纯文本目录：每个标题一行，缩进为4个空格加每级2个空格
pub fn render_text(pages: &[Page], depth: usize) -> String {
    let mut txt = String::new();
    for heading in pages.iter().flat_map(|page| page.headings.iter()) {
        if heading.level < depth {
            txt.push_str("\n    ");
            txt.push_str(&"  ".repeat(heading.level));
            txt.push_str(&heading.title);
        }
    }
    txt.push('\n');
    txt
}

#[derive(Serialize)]
struct JsonNode<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    href: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<JsonNode<'a>>,
}

impl<'a> JsonNode<'a> {
    fn from_tree(tree: &'a TocTree, id: NodeId) -> Self {
        let node = tree.node(id);
        Self {
            title: node.title.as_deref(),
            href: node.href.as_deref(),
            children: node
                .children
                .iter()
                .map(|&child| Self::from_tree(tree, child))
                .collect(),
        }
    }
}

/// JSON目录（两个空格缩进）
pub fn render_json(tree: &TocTree) -> Result<String> {
    let roots: Vec<JsonNode> = tree
        .roots()
        .iter()
        .map(|&root| JsonNode::from_tree(tree, root))
        .collect();
    Ok(serde_json::to_string_pretty(&roots)?)
}

/// EPUB2 NCX索引
pub fn render_ncx(tree: &TocTree, metadata: &NcxMetadata, doc_title: &DocTitle, charset: &str) -> Result<String> {
    let nav_map = NavMap::from_tree(tree);
    let depth = metadata.depth.to_string();

    let mut writer = new_writer(charset)?;
    start(&mut writer, "ncx", &[("xmlns", NCX_NAMESPACE), ("version", "2005-1")])?;

    start(&mut writer, "head", &[])?;
    empty(&mut writer, "meta", &[("name", "dtb:uid"), ("content", metadata.uid.as_str())])?;
    empty(&mut writer, "meta", &[("name", "dtb:depth"), ("content", depth.as_str())])?;
    end(&mut writer, "head")?;

    start(&mut writer, "docTitle", &[])?;
    text_element(&mut writer, "text", &[], &doc_title.text)?;
    end(&mut writer, "docTitle")?;

    start(&mut writer, "navMap", &[])?;
    for point in &nav_map.nav_points {
        write_nav_point(&mut writer, point)?;
    }
    end(&mut writer, "navMap")?;

    end(&mut writer, "ncx")?;
    Ok(finish(writer))
}

fn write_nav_point(writer: &mut XmlWriter, point: &NavPoint) -> Result<()> {
    let play_order = point.play_order.to_string();
    start(writer, "navPoint", &[("id", point.id.as_str()), ("playOrder", play_order.as_str())])?;
    start(writer, "navLabel", &[])?;
    text_element(writer, "text", &[], &point.nav_label.text)?;
    end(writer, "navLabel")?;
    empty(writer, "content", &[("src", point.content.src.as_str())])?;
    for child in &point.children {
        write_nav_point(writer, child)?;
    }
    end(writer, "navPoint")
}

/// EPUB3 导航文档
pub fn render_nav_xhtml(tree: &TocTree, title: &str, charset: &str) -> Result<String> {
    let mut writer = new_writer(charset)?;
    start(&mut writer, "html", &[("xmlns", XHTML_NAMESPACE), ("xmlns:epub", OPS_NAMESPACE)])?;

    start(&mut writer, "head", &[])?;
    empty(&mut writer, "meta", &[("charset", charset)])?;
    text_element(&mut writer, "title", &[], title)?;
    text_element(&mut writer, "style", &[("type", "text/css")], NAV_STYLE)?;
    end(&mut writer, "head")?;

    start(&mut writer, "body", &[])?;
    start(&mut writer, "nav", &[("epub:type", "toc")])?;
    write_nav_list(&mut writer, tree, tree.roots())?;
    end(&mut writer, "nav")?;
    end(&mut writer, "body")?;

    end(&mut writer, "html")?;
    Ok(finish(writer))
}

fn write_nav_list(writer: &mut XmlWriter, tree: &TocTree, ids: &[NodeId]) -> Result<()> {
    start(writer, "ol", &[])?;
    for &id in ids {
        let node = tree.node(id);
        let label = node.title.as_deref().unwrap_or_default();
        start(writer, "li", &[])?;
        match &node.href {
            Some(href) => text_element(writer, "a", &[("href", href.as_str())], label)?,
            None => text_element(writer, "span", &[], label)?,
        }
        if !node.children.is_empty() {
            write_nav_list(writer, tree, &node.children)?;
        }
        end(writer, "li")?;
    }
    end(writer, "ol")
}
