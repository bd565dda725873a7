pub mod epub;

// === 核心API重新导出 ===

/// 转换器（主要接口）
pub use epub::{ConversionOutput, ConversionReport, Converter};

/// 转换请求与配置
pub use epub::{ConversionRequest, HeadingSelector, OutputFormat};

/// 错误处理
pub use epub::{Diagnostic, EpubError, Result};

// === 数据结构 ===

/// 标题与页面
pub use epub::{Heading, Page};

/// 目录树
pub use epub::{TocNode, TocTree};

// === 底层组件（高级用法） ===

/// 容器组件
pub use epub::{Container, RootFile};

/// OPF组件
pub use epub::{Manifest, ManifestItem, Metadata, Opf, SpineItem};

/// NCX组件
pub use epub::{DocTitle, NavMap, NavPoint};

/// 来源与归档组件
pub use epub::{
    ArchiveSink,
    FetchPolicy,
    Fetcher,
    HttpFetcher,
    LocalSource,
    PackageAssembler,
    RemoteCoordinator,
    ZipSink,
};

// === 库信息 ===

/// html2epub库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// html2epub库的描述
pub const DESCRIPTION: &str = "将一组HTML/XHTML文档（本地或远程）打包为EPUB电子书";

// === 便捷函数 ===

/// 按请求执行一次完整转换
///
/// 这是 `Converter::new(request)?.run(..)` 的便捷包装函数，不支持中途取消。
///
/// # 示例
///
/// ```no_run
/// # async fn demo() -> html2epub::Result<()> {
/// let mut request = html2epub::ConversionRequest::default();
/// request.basedir = "book".into();
/// let report = html2epub::convert(request).await?;
/// println!("{:?}", report.output);
/// # Ok(())
/// # }
/// ```
pub async fn convert(request: ConversionRequest) -> Result<ConversionReport> {
    Converter::new(request)?
        .run(tokio_util::sync::CancellationToken::new())
        .await
}

/// 读取本地目录并以指定格式输出目录
///
/// # 参数
/// * `request` - 转换请求（使用其中的根目录、阅读顺序、深度等）
/// * `format` - 目录格式：txt、json、ncx 或 xhtml
pub fn show_toc(request: &ConversionRequest, format: OutputFormat) -> Result<String> {
    let converter = Converter::new(request.clone())?;
    let source = LocalSource::new(&request.basedir);
    let (spine, _) = source.spine(&request.spine)?;
    let pages = source.read_pages(&spine, converter.selector(), request.keep_all_headings)?;
    converter.show_toc(&pages, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_description() {
        assert!(!DESCRIPTION.is_empty());
    }

    #[test]
    fn test_show_toc() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.xhtml"),
            "<html><body><h1>Intro</h1><h2 id=\"x\">Part</h2></body></html>",
        )
        .unwrap();

        let mut request = ConversionRequest::default();
        request.basedir = dir.path().to_path_buf();

        let txt = show_toc(&request, OutputFormat::Txt).unwrap();
        assert_eq!(txt, "\n    Intro\n      Part\n");

        let json = show_toc(&request, OutputFormat::Json).unwrap();
        assert!(json.contains("\"href\": \"a.xhtml#x\""));
    }
}
