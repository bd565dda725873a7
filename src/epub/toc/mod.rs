//! 目录（Table of Contents）模块
//!
//! 从文档中提取标题，构建目录树，并渲染为txt、json、ncx、xhtml四种格式。

pub mod heading;
pub mod navigation;
pub mod render;
pub mod tree;

pub use heading::{Heading, Page, extract_headings, find_anchor_id, normalize_text};
pub use navigation::{DocTitle, NavContent, NavLabel, NavMap, NavPoint, NcxMetadata};
pub use render::{render_json, render_nav_xhtml, render_ncx, render_text};
pub use tree::{NodeId, TocNode, TocTree};
