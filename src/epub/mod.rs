pub mod error;
pub mod config;
pub mod container;
pub mod converter;
pub mod opf;
pub mod source;
pub mod toc;
pub mod writer;
pub(crate) mod xml;

// 重新导出错误处理
pub use error::{Diagnostic, EpubError, Result};

// 重新导出配置
pub use config::{ConversionRequest, HeadingSelector, OutputFormat};

// 重新导出容器相关
pub use container::{Container, RootFile};

// 重新导出转换流程
pub use converter::{ConversionOutput, ConversionReport, Converter};

// 重新导出OPF相关
pub use opf::{Manifest, ManifestItem, Metadata, Opf, SpineItem};

// 重新导出目录相关
pub use toc::{
    DocTitle,
    Heading,
    NavMap,
    NavPoint,
    Page,
    TocNode,
    TocTree,
};

// 重新导出来源与归档
pub use source::{FetchPolicy, Fetcher, HttpFetcher, LocalSource, RemoteCoordinator};
pub use writer::{ArchiveSink, PackageAssembler, ZipSink};
