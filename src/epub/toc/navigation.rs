//! NCX导航元素数据结构定义
//!
//! EPUB2 NCX索引中的导航点、导航标签、内容引用等，由目录树转换而来。

use crate::epub::toc::tree::{NodeId, TocTree};

/// NCX元数据信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NcxMetadata {
    /// 唯一标识符（dtb:uid）
    pub uid: String,
    /// 导航深度（dtb:depth）
    pub depth: usize,
}

impl NcxMetadata {
    pub fn new(uid: impl Into<String>, depth: usize) -> Self {
        Self {
            uid: uid.into(),
            depth,
        }
    }
}

/// 文档标题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTitle {
    /// 标题文本
    pub text: String,
}

impl DocTitle {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// 导航标签
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLabel {
    /// 标签文本
    pub text: String,
}

/// 导航内容引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavContent {
    /// 源文件路径
    pub src: String,
}

/// 导航点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPoint {
    /// 唯一标识符（`nav_<playOrder>`）
    pub id: String,
    /// 播放顺序
    pub play_order: u32,
    /// 导航标签
    pub nav_label: NavLabel,
    /// 内容引用
    pub content: NavContent,
    /// 子导航点
    pub children: Vec<NavPoint>,
}

/// 导航地图
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavMap {
    /// 导航点列表
    pub nav_points: Vec<NavPoint>,
}

impl NavMap {
    /// 从目录树生成导航地图
    ///
    /// `playOrder` 按先序遍历从1开始递增。占位节点没有标题，
    /// 其内容引用指向子树中第一个带链接的节点；整个子树都没有链接时指向来源页面。
    pub fn from_tree(tree: &TocTree) -> Self {
        let mut play_order = 0;
        let nav_points = tree
            .roots()
            .iter()
            .map(|&root| Self::convert_node(tree, root, &mut play_order))
            .collect();
        Self { nav_points }
    }

    fn convert_node(tree: &TocTree, id: NodeId, play_order: &mut u32) -> NavPoint {
        *play_order += 1;
        let order = *play_order;
        let node = tree.node(id);

        NavPoint {
            id: format!("nav_{}", order),
            play_order: order,
            nav_label: NavLabel {
                text: node.title.clone().unwrap_or_default(),
            },
            content: NavContent {
                src: tree.link(id).to_string(),
            },
            children: node
                .children
                .iter()
                .map(|&child| Self::convert_node(tree, child, play_order))
                .collect(),
        }
    }
}
