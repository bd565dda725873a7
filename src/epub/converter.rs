//! 转换流程
//!
//! 本地来源：读取文档 → 提取标题 → 构建目录树 → 渲染索引 → 构建清单 → 打包，全程同步。
//! 远程来源：并发下载文档和资源并直接写入归档，全部完成后再追加索引文件。

use crate::epub::config::{ConversionRequest, HeadingSelector, OutputFormat};
use crate::epub::container::Container;
use crate::epub::error::{Diagnostic, EpubError, Result};
use crate::epub::opf::{Manifest, Metadata, NAV_DOCUMENT, Opf};
use crate::epub::source::local::{LocalSource, require_documents, unique_output_path};
use crate::epub::source::remote::{Fetcher, FetchPolicy, HttpFetcher, RemoteCoordinator};
use crate::epub::source::is_remote_spine;
use crate::epub::toc::{
    DocTitle, NcxMetadata, Page, TocTree, render_json, render_nav_xhtml, render_ncx, render_text,
};
use crate::epub::writer::{PackageAssembler, ZipSink};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// EPUB2 索引的约定文件名
pub const NCX_DOCUMENT: &str = "toc.ncx";

/// OPF包文件的约定文件名
pub const OPF_DOCUMENT: &str = "content.opf";

/// 转换产物
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutput {
    /// 已写入的EPUB文件
    Package {
        path: PathBuf,
        documents: usize,
        resources: usize,
    },
    /// 目录或OPF文本
    Text(String),
}

/// 一次转换的结果与诊断信息
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub output: ConversionOutput,
    pub diagnostics: Vec<Diagnostic>,
}

/// 转换器
#[derive(Debug, Clone)]
pub struct Converter {
    request: ConversionRequest,
    selector: HeadingSelector,
    policy: FetchPolicy,
}

impl Converter {
    pub fn new(request: ConversionRequest) -> Result<Self> {
        let selector = request.heading_selector()?;
        Ok(Self {
            request,
            selector,
            policy: FetchPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn request(&self) -> &ConversionRequest {
        &self.request
    }

    pub fn selector(&self) -> &HeadingSelector {
        &self.selector
    }

    fn local_source(&self) -> LocalSource {
        LocalSource::new(&self.request.basedir)
    }

    /// 构建目录树
    pub fn build_tree(&self, pages: &[Page]) -> TocTree {
        let tree = TocTree::build(pages, self.request.depth, self.request.strict);
        debug!("目录树:\n{}", tree);
        tree
    }

    /// 以指定格式输出目录
    pub fn show_toc(&self, pages: &[Page], format: OutputFormat) -> Result<String> {
        let request = &self.request;
        match format {
            OutputFormat::Txt => Ok(render_text(pages, request.depth)),
            OutputFormat::Json => render_json(&self.build_tree(pages)),
            OutputFormat::Ncx => render_ncx(
                &self.build_tree(pages),
                &NcxMetadata::new(&request.identifier, request.depth),
                &DocTitle::new(&request.title),
                &request.charset,
            ),
            OutputFormat::Xhtml => {
                render_nav_xhtml(&self.build_tree(pages), &request.title, &request.charset)
            }
            OutputFormat::Epub | OutputFormat::Opf => Err(EpubError::ConfigError(format!(
                "{:?} 不是目录格式",
                format
            ))),
        }
    }

    /// 根据文件列表和阅读顺序生成OPF包文件
    pub fn show_opf(&self, files: &[String], spine: &[String]) -> Result<(String, Vec<Diagnostic>)> {
        let manifest = Manifest::build(files, spine);
        let diagnostics = manifest.diagnostics().to_vec();
        let opf = Opf::new(Metadata::from_request(&self.request), manifest);
        Ok((opf.to_xml(&self.request.charset)?, diagnostics))
    }

    /// 执行转换
    ///
    /// 阅读顺序全部为http(s) URL时总是生成远程EPUB包；
    /// 否则按请求的格式生成本地EPUB包、OPF或目录文本。
    pub async fn run(&self, cancellation: CancellationToken) -> Result<ConversionReport> {
        let (spine, mut diagnostics) = self.local_source().spine(&self.request.spine)?;
        require_documents(&spine)?;

        let mut report = if is_remote_spine(&spine) {
            if self.request.format != OutputFormat::Epub {
                warn!("远程文档只能打包为EPUB，忽略输出格式 {:?}", self.request.format);
            }
            let fetcher = HttpFetcher::new(self.policy.timeout)?;
            self.convert_remote(&spine, fetcher, cancellation).await?
        } else {
            match self.request.format {
                OutputFormat::Epub => self.convert_local(&spine)?,
                OutputFormat::Opf => {
                    let (mut files, generated) = self.local_files()?;
                    files.extend(generated.iter().map(|index| index.to_string()));
                    let (opf, diagnostics) = self.show_opf(&files, &spine)?;
                    ConversionReport {
                        output: ConversionOutput::Text(opf),
                        diagnostics,
                    }
                }
                format => {
                    let pages = self.read_pages(&spine)?;
                    let tree = self.build_tree(&pages);
                    ConversionReport {
                        output: ConversionOutput::Text(self.show_toc(&pages, format)?),
                        diagnostics: tree.diagnostics().to_vec(),
                    }
                }
            }
        };

        diagnostics.append(&mut report.diagnostics);
        report.diagnostics = diagnostics;
        Ok(report)
    }

    fn read_pages(&self, spine: &[String]) -> Result<Vec<Page>> {
        self.local_source()
            .read_pages(spine, &self.selector, self.request.keep_all_headings)
    }

    /// 根目录下的所有文件，以及需要生成的索引文件名
    fn local_files(&self) -> Result<(Vec<String>, Vec<&'static str>)> {
        let source = self.local_source();
        let content = source.files()?;
        let generated = [NAV_DOCUMENT, NCX_DOCUMENT]
            .into_iter()
            .filter(|index| !source.exists(index))
            .collect();
        Ok((content, generated))
    }

    fn output_path(&self) -> PathBuf {
        unique_output_path(&self.request.output_path())
    }

    /// 打包本地文档
    ///
    /// 根目录中已存在的 `toc.xhtml`、`toc.ncx`、`content.opf` 不会被覆盖。
    pub fn convert_local(&self, spine: &[String]) -> Result<ConversionReport> {
        let source = self.local_source();
        let pages = self.read_pages(spine)?;
        let tree = self.build_tree(&pages);
        let mut diagnostics = tree.diagnostics().to_vec();

        let (content, generated) = self.local_files()?;
        let mut files = content.clone();
        files.extend(generated.iter().map(|index| index.to_string()));
        let output = self.output_path();
        info!("生成EPUB: {}", output.display());

        let sink = ZipSink::temporary_for(&output)?;
        let mut assembler = PackageAssembler::begin(sink, &Container::default())?;

        for index in generated {
            let format = if index == NAV_DOCUMENT {
                OutputFormat::Xhtml
            } else {
                OutputFormat::Ncx
            };
            assembler.append(index, self.show_toc(&pages, format)?.as_bytes())?;
        }
        if !source.exists(OPF_DOCUMENT) {
            let (opf, mut manifest_diagnostics) = self.show_opf(&files, spine)?;
            diagnostics.append(&mut manifest_diagnostics);
            assembler.append(OPF_DOCUMENT, opf.as_bytes())?;
        }

        let mut resources: usize = 0;
        for href in &content {
            assembler.append(href, &source.read(href)?)?;
            resources += 1;
        }

        assembler.into_sink().persist(&output)?;
        info!("{} 个文件已写入 {}", resources, output.display());

        Ok(ConversionReport {
            output: ConversionOutput::Package {
                path: output,
                documents: spine.len(),
                resources: resources.saturating_sub(spine.len()),
            },
            diagnostics,
        })
    }

    /// 打包远程文档
    ///
    /// 内容文件位于 `EPUB/<主机名>/<路径>`，索引文件在全部下载完成后追加。
    pub async fn convert_remote<F: Fetcher>(
        &self,
        spine: &[String],
        fetcher: F,
        cancellation: CancellationToken,
    ) -> Result<ConversionReport> {
        let output = self.output_path();
        info!("生成EPUB: {}", output.display());

        let sink = ZipSink::temporary_for(&output)?;
        let mut assembler = PackageAssembler::begin(sink, &Container::default())?;

        let coordinator = RemoteCoordinator::new(fetcher, self.selector.clone(), self.request.keep_all_headings)
            .with_policy(self.policy)
            .with_cancellation(cancellation);
        let outcome = coordinator.run(spine, &mut assembler).await?;
        if outcome.pages.is_empty() {
            return Err(EpubError::NoDocuments);
        }

        let tree = self.build_tree(&outcome.pages);
        let mut diagnostics = outcome.diagnostics;
        diagnostics.extend_from_slice(tree.diagnostics());

        let mut files = outcome.resources.clone();
        files.extend(outcome.spine.iter().cloned());
        files.push(NAV_DOCUMENT.to_string());
        files.push(NCX_DOCUMENT.to_string());

        let (opf, mut manifest_diagnostics) = self.show_opf(&files, &outcome.spine)?;
        diagnostics.append(&mut manifest_diagnostics);
        assembler.append(OPF_DOCUMENT, opf.as_bytes())?;
        assembler.append(NAV_DOCUMENT, self.show_toc(&outcome.pages, OutputFormat::Xhtml)?.as_bytes())?;
        assembler.append(NCX_DOCUMENT, self.show_toc(&outcome.pages, OutputFormat::Ncx)?.as_bytes())?;

        assembler.into_sink().persist(&output)?;
        info!("{} 个文档, {} 个资源已写入 {}", outcome.pages.len(), outcome.resources.len(), output.display());

        Ok(ConversionReport {
            output: ConversionOutput::Package {
                path: output,
                documents: outcome.pages.len(),
                resources: outcome.resources.len(),
            },
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::io::Read;
    use std::path::Path;
    use zip::ZipArchive;

    fn book_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("00.xhtml"),
            "<html><body><h1>Book</h1><section id=\"c1\"><h2>Ch1</h2></section></body></html>",
        )
        .unwrap();
        fs::write(
            root.join("01.xhtml"),
            "<html><body><h2 id=\"c2\">Ch2</h2><h4 id=\"sub\">Sub</h4></body></html>",
        )
        .unwrap();
        fs::write(root.join("style.css"), "h1 { color: red; }").unwrap();
        dir
    }

    fn request(dir: &Path, output: &Path) -> ConversionRequest {
        let mut request = ConversionRequest::default();
        request.title = "Book".to_string();
        request.identifier = "uuid-1".to_string();
        request.basedir = dir.to_path_buf();
        request.output_file = Some(output.to_path_buf());
        request.depth = 4;
        request
    }

    fn read_entry(archive: &mut ZipArchive<fs::File>, name: &str) -> String {
        let mut content = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_show_toc_text() {
        let dir = book_dir();
        let out = tempfile::tempdir().unwrap();
        let converter = Converter::new(request(dir.path(), &out.path().join("b.epub"))).unwrap();
        let spine = vec!["00.xhtml".to_string(), "01.xhtml".to_string()];
        let pages = converter.read_pages(&spine).unwrap();

        let txt = converter.show_toc(&pages, OutputFormat::Txt).unwrap();
        assert_eq!(txt, "\n    Book\n      Ch1\n      Ch2\n          Sub\n");
        assert!(converter.show_toc(&pages, OutputFormat::Opf).is_err());
    }

    #[tokio::test]
    async fn test_run_json_reports_gap() {
        let dir = book_dir();
        let out = tempfile::tempdir().unwrap();
        let mut request = request(dir.path(), &out.path().join("b.epub"));
        request.format = OutputFormat::Json;

        let report = Converter::new(request).unwrap().run(CancellationToken::new()).await.unwrap();
        let ConversionOutput::Text(json) = report.output else {
            panic!("expected text output");
        };
        assert!(json.contains("\"title\": \"Sub\""));
        assert_eq!(report.diagnostics.len(), 1);
        assert!(!out.path().join("b.epub").exists());
    }

    #[tokio::test]
    async fn test_run_opf_with_directory_spine() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("part")).unwrap();
        fs::write(dir.path().join("part/a.xhtml"), "<html><body><h1>A</h1></body></html>").unwrap();
        fs::write(dir.path().join("part/b.xhtml"), "<html><body><h1>B</h1></body></html>").unwrap();

        for entry in ["./part", "part/"] {
            let out = tempfile::tempdir().unwrap();
            let mut request = request(dir.path(), &out.path().join("b.epub"));
            request.format = OutputFormat::Opf;
            request.spine = vec![entry.to_string()];

            let report = Converter::new(request).unwrap().run(CancellationToken::new()).await.unwrap();
            let ConversionOutput::Text(opf) = report.output else {
                panic!("expected text output");
            };
            assert!(opf.contains("<item id=\"page_1\" href=\"part/a.xhtml\""), "{}", entry);
            assert!(opf.contains("<item id=\"page_2\" href=\"part/b.xhtml\""), "{}", entry);
            assert!(opf.contains("<itemref idref=\"page_2\"/>"));
            assert!(report.diagnostics.is_empty());
        }
    }

    #[tokio::test]
    async fn test_run_local_epub() {
        let dir = book_dir();
        let out = tempfile::tempdir().unwrap();
        let output = out.path().join("book.epub");

        let report = Converter::new(request(dir.path(), &output))
            .unwrap()
            .run(CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            report.output,
            ConversionOutput::Package {
                path: output.clone(),
                documents: 2,
                resources: 1,
            }
        );

        let mut archive = ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
        let order: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            order,
            vec![
                "mimetype",
                "META-INF/container.xml",
                "EPUB/toc.xhtml",
                "EPUB/toc.ncx",
                "EPUB/content.opf",
                "EPUB/00.xhtml",
                "EPUB/01.xhtml",
                "EPUB/style.css",
            ]
        );

        let opf = read_entry(&mut archive, "EPUB/content.opf");
        assert!(opf.contains("<itemref idref=\"page_1\"/>"));
        assert!(opf.contains("href=\"toc.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\""));
        assert!(opf.contains("<spine toc=\"ncx\">"));

        let nav = read_entry(&mut archive, "EPUB/toc.xhtml");
        assert!(nav.contains("<a href=\"00.xhtml#c1\">Ch1</a>"));
        assert!(nav.contains("<a href=\"01.xhtml#sub\">Sub</a>"));
    }

    #[tokio::test]
    async fn test_existing_index_not_overwritten() {
        let dir = book_dir();
        fs::write(dir.path().join("toc.ncx"), "<ncx>custom</ncx>").unwrap();
        let out = tempfile::tempdir().unwrap();
        let output = out.path().join("book.epub");

        Converter::new(request(dir.path(), &output))
            .unwrap()
            .run(CancellationToken::new())
            .await
            .unwrap();

        let mut archive = ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
        assert_eq!(read_entry(&mut archive, "EPUB/toc.ncx"), "<ncx>custom</ncx>");
    }

    #[tokio::test]
    async fn test_output_not_overwritten() {
        let dir = book_dir();
        let out = tempfile::tempdir().unwrap();
        let output = out.path().join("book.epub");
        fs::write(&output, "old").unwrap();

        let report = Converter::new(request(dir.path(), &output))
            .unwrap()
            .run(CancellationToken::new())
            .await
            .unwrap();
        let ConversionOutput::Package { path, .. } = report.output else {
            panic!("expected package output");
        };
        assert_eq!(path, out.path().join("book.epub.1"));
        assert_eq!(fs::read_to_string(&output).unwrap(), "old");
    }

    #[tokio::test]
    async fn test_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let result = Converter::new(request(dir.path(), &out.path().join("b.epub")))
            .unwrap()
            .run(CancellationToken::new())
            .await;
        assert!(matches!(result, Err(EpubError::NoDocuments)));
    }

    struct StaticFetcher(HashMap<&'static str, &'static str>);

    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.0
                .get(url)
                .map(|body| body.as_bytes().to_vec())
                .ok_or_else(|| EpubError::FetchFailed {
                    url: url.to_string(),
                    reason: "HTTP 404".to_string(),
                })
        }
    }

    #[tokio::test]
    async fn test_convert_remote() {
        let fetcher = StaticFetcher(HashMap::from([
            (
                "https://example.com/a.html",
                "<html><head><link rel=\"stylesheet\" href=\"s.css\"></head><body><h1>A</h1></body></html>",
            ),
            ("https://example.com/s.css", "h1 {}"),
        ]));
        let out = tempfile::tempdir().unwrap();
        let output = out.path().join("remote.epub");
        let mut request = request(out.path(), &output);
        request.spine = vec![
            "https://example.com/a.html".to_string(),
            "https://example.com/missing.html".to_string(),
        ];
        let spine = request.spine.clone();

        let report = Converter::new(request)
            .unwrap()
            .with_policy(FetchPolicy {
                timeout: std::time::Duration::from_secs(5),
                retries: 0,
            })
            .convert_remote(&spine, fetcher, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.diagnostics.len(), 1);

        let mut archive = ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names[0], "mimetype");
        assert_eq!(names.last().map(String::as_str), Some("EPUB/toc.ncx"));
        assert!(names.contains(&"EPUB/example.com/a.html".to_string()));
        assert!(names.contains(&"EPUB/example.com/s.css".to_string()));

        let opf = read_entry(&mut archive, "EPUB/content.opf");
        assert!(opf.contains("<item id=\"page_1\" href=\"example.com/a.html\""));
        assert!(opf.contains("<item id=\"res_1\" href=\"example.com/s.css\" media-type=\"text/css\"/>"));
        assert!(!opf.contains("missing.html"));
    }
}
