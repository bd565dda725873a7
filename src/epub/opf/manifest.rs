//! 清单模块
//!
//! 为打包的每个文件生成确定且唯一的ID，并输出清单项与脊柱引用。

use crate::epub::error::Diagnostic;
use crate::epub::opf::media_type::{self, guess_media_type};
use crate::epub::opf::spine::SpineItem;
use std::collections::{HashMap, HashSet};

/// EPUB3 导航文档的约定文件名
pub const NAV_DOCUMENT: &str = "toc.xhtml";

/// NCX 清单项的固定ID
pub const NCX_ID: &str = "ncx";

/// 清单项信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    /// 项目ID
    pub id: String,
    /// 文件路径(相对于OPF文件)
    pub href: String,
    /// 媒体类型
    pub media_type: String,
    /// 属性(如nav)
    pub properties: Option<String>,
}

impl ManifestItem {
    /// 创建新的清单项
    pub fn new(id: String, href: String, media_type: String) -> Self {
        Self {
            id,
            href,
            media_type,
            properties: None,
        }
    }

    /// 检查是否包含指定属性
    pub fn has_property(&self, property: &str) -> bool {
        if let Some(properties) = &self.properties {
            properties.split_whitespace().any(|p| p == property)
        } else {
            false
        }
    }

    /// 检查是否为导航文档
    pub fn is_nav(&self) -> bool {
        self.has_property("nav")
    }
}

/// 清单构建结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// 按ID排序的清单项
    pub items: Vec<ManifestItem>,
    /// 按阅读顺序排列的脊柱引用
    pub spine: Vec<SpineItem>,
    /// 脊柱的NCX引用
    pub toc: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

/// 补零编号：`zero_padding("page_", 0, 2)` => `page_01`
fn zero_padding(prefix: &str, index: usize, digits: usize) -> String {
    format!("{}{:0width$}", prefix, index + 1, width = digits)
}

impl Manifest {
    /// 根据文件列表和脊柱构建清单
    ///
    /// # 参数
    /// * `files` - 所有待打包文件（相对于OPF所在目录），重复项只保留第一次出现
    /// * `spine` - 阅读顺序
    ///
    /// 脊柱中的文件ID为 `page_<脊柱序号>`，第一个NCX文件为 `ncx`，
    /// OPF文件本身不进入清单，其余文件为 `res_<文件序号>`。
    /// 只有恰好一个NCX文件时脊柱才引用它。
    pub fn build(files: &[String], spine: &[String]) -> Self {
        let mut seen = HashSet::new();
        let files: Vec<&str> = files
            .iter()
            .map(String::as_str)
            .filter(|f| seen.insert(*f))
            .collect();
        let digits = files.len().to_string().len();

        let mut spine_index: HashMap<&str, usize> = HashMap::new();
        for (index, href) in spine.iter().enumerate() {
            spine_index.entry(href.as_str()).or_insert(index);
        }

        let mut manifest = Manifest::default();
        let mut ncx_count = 0;

        for (index, href) in files.iter().enumerate() {
            let media_type = guess_media_type(href);

            let id = if let Some(&position) = spine_index.get(href) {
                zero_padding("page_", position, digits)
            } else if media_type == media_type::NCX {
                ncx_count += 1;
                if ncx_count == 1 {
                    NCX_ID.to_string()
                } else {
                    zero_padding("res_", index, digits)
                }
            } else if media_type == media_type::OPF {
                continue;
            } else {
                zero_padding("res_", index, digits)
            };

            let mut item = ManifestItem::new(id, href.to_string(), media_type.to_string());
            if *href == NAV_DOCUMENT {
                item.properties = Some("nav".to_string());
            }
            manifest.items.push(item);
        }

        if ncx_count > 1 {
            let diagnostic = Diagnostic::DuplicateNcx { count: ncx_count };
            diagnostic.emit();
            manifest.diagnostics.push(diagnostic);
        }
        if ncx_count == 1 {
            manifest.toc = Some(NCX_ID.to_string());
        }

        manifest.items.sort_by(|a, b| a.id.cmp(&b.id));
        manifest.spine = (0..spine.len())
            .map(|index| SpineItem::new(zero_padding("page_", index, digits)))
            .collect();

        manifest
    }

    /// 构建过程中产生的诊断信息
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
