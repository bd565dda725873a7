//! 目录树（Table of Contents Tree）模块
//!
//! 将所有页面的标题序列折叠为一棵层级目录树，并修复层级不连续的标题。
//! 目录树以扁平数组（arena）存储，节点通过下标引用父节点和子节点。

use crate::epub::error::Diagnostic;
use crate::epub::toc::heading::Page;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// 节点在目录树数组中的下标
pub type NodeId = usize;

/// 目录树节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocNode {
    /// 标题；占位节点为None
    pub title: Option<String>,
    /// 链接目标
    pub href: Option<String>,
    /// 来源页面
    pub page: String,
    /// 节点深度（等于来源标题的层级）
    pub depth: usize,
    /// 父节点（根节点为None）
    pub parent: Option<NodeId>,
    /// 子节点
    pub children: Vec<NodeId>,
}

impl TocNode {
    /// 是否为修复层级时生成的占位节点
    pub fn is_placeholder(&self) -> bool {
        self.title.is_none()
    }
}

/// 目录树
#[derive(Debug, Clone, Default)]
pub struct TocTree {
    nodes: Vec<TocNode>,
    roots: Vec<NodeId>,
    diagnostics: Vec<Diagnostic>,
}

impl TocTree {
    /// 创建空目录树
    pub fn new() -> Self {
        Self::default()
    }

    /// 根据页面标题构建目录树
    ///
    /// 只处理 `level < depth` 的标题，按文档顺序依次插入。
    /// 层级跳跃超过一级时记录诊断信息：严格模式下丢弃该标题，
    /// 否则为每个缺失的层级插入一个空的占位节点。
    pub fn build(pages: &[Page], depth: usize, strict: bool) -> Self {
        let mut tree = Self::new();
        // 当前插入位置：None 表示虚拟根节点
        let mut current: Option<NodeId> = None;
        let mut current_level = 0;

        for (page, heading) in pages
            .iter()
            .flat_map(|page| page.headings.iter().map(move |heading| (page, heading)))
        {
            if heading.level >= depth {
                continue;
            }
            let level = heading.level;

            if level < current_level {
                current = None;
                for _ in 0..level {
                    current = tree.last_child(current);
                }
            } else if level > current_level {
                let contiguous = level == current_level + 1 && tree.last_child(current).is_some();
                if !contiguous {
                    let diagnostic = Diagnostic::NonContiguousHeading {
                        level,
                        title: heading.title.clone(),
                    };
                    diagnostic.emit();
                    tree.diagnostics.push(diagnostic);
                    if strict {
                        continue;
                    }
                }
                for step in current_level..level {
                    current = Some(match tree.last_child(current) {
                        Some(child) => child,
                        None => tree.push(current, step, None, None, &page.href),
                    });
                }
            }

            tree.push(
                current,
                level,
                Some(heading.title.clone()),
                heading.href.clone(),
                &page.href,
            );
            current_level = level;
        }

        tree
    }

    /// 在 `parent` 下追加一个节点并返回其下标
    fn push(
        &mut self,
        parent: Option<NodeId>,
        depth: usize,
        title: Option<String>,
        href: Option<String>,
        page: &str,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(TocNode {
            title,
            href,
            page: page.to_string(),
            depth,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    fn last_child(&self, parent: Option<NodeId>) -> Option<NodeId> {
        self.children_of(parent).last().copied()
    }

    /// 指定节点的子节点；None 表示根节点
    pub fn children_of(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(id) => &self.nodes[id].children,
            None => &self.roots,
        }
    }

    /// 根节点列表
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// 获取节点
    pub fn node(&self, id: NodeId) -> &TocNode {
        &self.nodes[id]
    }

    /// 节点总数（包括占位节点）
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 构建过程中产生的诊断信息
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// 先序遍历所有节点（即文档顺序）
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        order
    }

    /// 子树中（先序）第一个带链接的节点的链接
    pub fn first_href(&self, id: NodeId) -> Option<&str> {
        let node = &self.nodes[id];
        if let Some(href) = &node.href {
            return Some(href);
        }
        node.children.iter().find_map(|&child| self.first_href(child))
    }

    /// 节点的导航目标：子树中第一个链接，没有时退回到来源页面
    pub fn link(&self, id: NodeId) -> &str {
        self.first_href(id).unwrap_or(self.nodes[id].page.as_str())
    }

    fn render_node(&self, id: NodeId, prefix: &str, is_last: bool, result: &mut String) {
        let node = &self.nodes[id];
        let branch = if is_last { "└── " } else { "├── " };
        let title = node.title.as_deref().unwrap_or("…");
        match &node.href {
            Some(href) => result.push_str(&format!("{}{}{} → {}\n", prefix, branch, title, href)),
            None => result.push_str(&format!("{}{}{}\n", prefix, branch, title)),
        }

        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        for (index, &child) in node.children.iter().enumerate() {
            self.render_node(child, &child_prefix, index == node.children.len() - 1, result);
        }
    }
}

impl Display for TocTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut result = String::new();
        for (index, &root) in self.roots.iter().enumerate() {
            self.render_node(root, "", index == self.roots.len() - 1, &mut result);
        }
        write!(f, "{}", result)
    }
}
