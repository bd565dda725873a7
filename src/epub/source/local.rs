//! 本地文档来源
//!
//! 遍历根目录、展开阅读顺序，并读取本地HTML文档。

use crate::epub::config::HeadingSelector;
use crate::epub::error::{Diagnostic, EpubError, Result};
use crate::epub::opf::is_markup;
use crate::epub::source::is_remote;
use crate::epub::toc::Page;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 本地目录来源
#[derive(Debug, Clone)]
pub struct LocalSource {
    basedir: PathBuf,
}

impl LocalSource {
    pub fn new<P: AsRef<Path>>(basedir: P) -> Self {
        Self {
            basedir: basedir.as_ref().to_path_buf(),
        }
    }

    /// 根目录下的所有文件（相对路径，已排序）
    pub fn files(&self) -> Result<Vec<String>> {
        find_files(&self.basedir, |_| true)
    }

    /// 根目录下的所有HTML文档
    pub fn markup_files(&self) -> Result<Vec<String>> {
        find_files(&self.basedir, is_markup)
    }

    /// 根目录下是否已存在某个文件
    pub fn exists(&self, href: &str) -> bool {
        self.basedir.join(href).is_file()
    }

    /// 读取文件内容
    pub fn read(&self, href: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.basedir.join(href))?)
    }

    /// 确定阅读顺序：未指定时使用根目录下的所有HTML文档
    pub fn spine(&self, sources: &[String]) -> Result<(Vec<String>, Vec<Diagnostic>)> {
        if sources.is_empty() {
            return Ok((self.markup_files()?, Vec::new()));
        }
        expand_spine(&self.basedir, sources)
    }

    /// 读取阅读顺序中的每个文档并提取标题
    pub fn read_pages(
        &self,
        spine: &[String],
        selector: &HeadingSelector,
        keep_all_headings: bool,
    ) -> Result<Vec<Page>> {
        spine
            .iter()
            .map(|href| {
                debug!("解析文档: {}", href);
                let data = self.read(href)?;
                Page::from_markup(href, &String::from_utf8_lossy(&data), selector, keep_all_headings)
            })
            .collect()
    }
}

/// 递归查找目录下满足条件的文件
///
/// 返回相对于 `basedir` 的路径，使用 `/` 作为分隔符，并按字典序排列。
pub fn find_files<F>(basedir: &Path, filter: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> bool,
{
    fn walk(dir: &Path, basedir: &Path, filter: &dyn Fn(&str) -> bool, files: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                walk(&path, basedir, filter, files)?;
            } else if let Some(href) = relative_href(&path, basedir) {
                if filter(&href) {
                    files.push(href);
                }
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    walk(basedir, basedir, &filter, &mut files)?;
    files.sort();
    Ok(files)
}

fn relative_href(path: &Path, basedir: &Path) -> Option<String> {
    let relative = path.strip_prefix(basedir).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// 把阅读顺序中的本地条目规范化为相对于根目录、以 `/` 分隔的路径
///
/// 去掉 `.` 与空段，`..` 回退一级；越出根目录时返回 `None`。
fn normalize_href(source: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in source.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            _ => parts.push(part),
        }
    }
    Some(parts.join("/"))
}

/// 展开阅读顺序
///
/// http(s) URL 原样保留；目录展开为其中的HTML文档；存在的文件保留；
/// 其余来源记录诊断后跳过。本地条目与 [`find_files`] 使用同一种路径形式，
/// 结果去重且保持首次出现的顺序。
pub fn expand_spine(basedir: &Path, sources: &[String]) -> Result<(Vec<String>, Vec<Diagnostic>)> {
    let mut seen = HashSet::new();
    let mut spine = Vec::new();
    let mut diagnostics = Vec::new();

    let mut push = |href: String| {
        if seen.insert(href.clone()) {
            spine.push(href);
        }
    };

    for source in sources {
        if is_remote(source) {
            push(source.clone());
            continue;
        }

        let href = normalize_href(source);
        let path = href.as_deref().map(|href| basedir.join(href));
        match (href, path) {
            (Some(prefix), Some(path)) if path.is_dir() => {
                for file in find_files(&path, is_markup)? {
                    if prefix.is_empty() {
                        push(file);
                    } else {
                        push(format!("{}/{}", prefix, file));
                    }
                }
            }
            (Some(href), Some(path)) if !href.is_empty() && path.is_file() => push(href),
            _ => {
                let diagnostic = Diagnostic::MissingSource {
                    source: source.clone(),
                };
                diagnostic.emit();
                diagnostics.push(diagnostic);
            }
        }
    }

    Ok((spine, diagnostics))
}

/// 返回一个不存在的输出路径：文件已存在时依次追加 `.1`、`.2`……
pub fn unique_output_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let mut index = 1;
    loop {
        let mut name = path.as_os_str().to_os_string();
        name.push(format!(".{}", index));
        let candidate = PathBuf::from(name);
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}

/// 确保至少有一个文档可供转换
pub fn require_documents(spine: &[String]) -> Result<()> {
    if spine.is_empty() {
        return Err(EpubError::NoDocuments);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("part2/img")).unwrap();
        fs::write(root.join("01.xhtml"), "<html><body><h1>One</h1></body></html>").unwrap();
        fs::write(root.join("00.html"), "<html><body><h1 id=\"z\">Zero</h1><h2>Sub</h2></body></html>").unwrap();
        fs::write(root.join("style.css"), "body {}").unwrap();
        fs::write(root.join("part2/02.htm"), "<html><body><h1>Two</h1></body></html>").unwrap();
        fs::write(root.join("part2/img/cover.png"), [0u8, 1, 2]).unwrap();
        dir
    }

    #[test]
    fn test_find_markup_files() {
        let dir = fixture();
        let source = LocalSource::new(dir.path());
        assert_eq!(
            source.markup_files().unwrap(),
            vec!["00.html", "01.xhtml", "part2/02.htm"]
        );
    }

    #[test]
    fn test_find_all_files() {
        let dir = fixture();
        let files = LocalSource::new(dir.path()).files().unwrap();
        assert_eq!(
            files,
            vec!["00.html", "01.xhtml", "part2/02.htm", "part2/img/cover.png", "style.css"]
        );
    }

    #[test]
    fn test_expand_spine() {
        let dir = fixture();
        let sources: Vec<String> = ["01.xhtml", "part2", "missing.xhtml", "01.xhtml", "https://example.com/a.html"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let (spine, diagnostics) = expand_spine(dir.path(), &sources).unwrap();
        assert_eq!(
            spine,
            vec!["01.xhtml", "part2/02.htm", "https://example.com/a.html"]
        );
        assert_eq!(
            diagnostics,
            vec![Diagnostic::MissingSource {
                source: "missing.xhtml".to_string()
            }]
        );
    }

    #[test]
    fn test_expand_spine_normalizes_local_paths() {
        let dir = fixture();
        let sources: Vec<String> = ["./part2", "part2/", "./01.xhtml", "part2/img/../02.htm", ".", "../outside.xhtml"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let (spine, diagnostics) = expand_spine(dir.path(), &sources).unwrap();
        assert_eq!(spine, vec!["part2/02.htm", "01.xhtml", "00.html"]);
        assert_eq!(
            diagnostics,
            vec![Diagnostic::MissingSource {
                source: "../outside.xhtml".to_string()
            }]
        );

        // 阅读顺序中的每一项都与根目录遍历得到的路径一致
        let files = LocalSource::new(dir.path()).files().unwrap();
        assert!(spine.iter().all(|href| files.contains(href)));
    }

    #[test]
    fn test_default_spine() {
        let dir = fixture();
        let (spine, diagnostics) = LocalSource::new(dir.path()).spine(&[]).unwrap();
        assert_eq!(spine.len(), 3);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_read_pages() {
        let dir = fixture();
        let source = LocalSource::new(dir.path());
        let spine = vec!["00.html".to_string(), "01.xhtml".to_string()];
        let pages = source.read_pages(&spine, &HeadingSelector::default(), false).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].headings.len(), 1);
        assert_eq!(pages[0].headings[0].href.as_deref(), Some("00.html#z"));
        assert_eq!(pages[1].headings[0].href.as_deref(), Some("01.xhtml"));
    }

    #[test]
    fn test_unique_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        assert_eq!(unique_output_path(&path), path);

        fs::write(&path, "").unwrap();
        assert_eq!(unique_output_path(&path), dir.path().join("book.epub.1"));

        fs::write(dir.path().join("book.epub.1"), "").unwrap();
        assert_eq!(unique_output_path(&path), dir.path().join("book.epub.2"));
    }

    #[test]
    fn test_require_documents() {
        assert!(matches!(require_documents(&[]), Err(EpubError::NoDocuments)));
        assert!(require_documents(&["a.xhtml".to_string()]).is_ok());
    }
}
