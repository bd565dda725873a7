//! EPUB归档写入模块
//!
//! 按固定顺序把条目追加到zip归档：`mimetype`（不压缩，且必须是第一个条目）、
//! `META-INF/container.xml`、索引文件、内容文件。

use crate::epub::container::{CONTAINER_PATH, Container};
use crate::epub::error::Result;
use std::collections::HashSet;
use std::io::{Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// `mimetype` 条目的内容
pub const MIMETYPE: &[u8] = b"application/epub+zip";

/// 内容目录（OPF所在目录）
pub const CONTENT_DIR: &str = "EPUB";

/// 归档写入目标：保持追加顺序，并遵守“不压缩”标志
pub trait ArchiveSink {
    /// 追加一个条目
    fn append(&mut self, name: &str, data: &[u8], store: bool) -> Result<()>;
}

/// 基于zip的归档写入器
pub struct ZipSink<W: Write + Seek> {
    zip: ZipWriter<W>,
}

impl<W: Write + Seek> ZipSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
        }
    }

    /// 写入中央目录并返回底层写入器
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}

impl<W: Write + Seek> ArchiveSink for ZipSink<W> {
    fn append(&mut self, name: &str, data: &[u8], store: bool) -> Result<()> {
        let options = if store {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
        };
        self.zip.start_file(name, options)?;
        self.zip.write_all(data)?;
        Ok(())
    }
}

impl ZipSink<NamedTempFile> {
    /// 在输出文件所在目录创建临时归档
    pub fn temporary_for(output: &Path) -> Result<Self> {
        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Ok(Self::new(NamedTempFile::new_in(dir)?))
    }

    /// 完成归档并重命名为最终输出文件
    ///
    /// 在此之前发生的任何错误都会让临时文件随之删除。
    pub fn persist(self, output: &Path) -> Result<()> {
        let file = self.finish()?;
        file.persist(output).map_err(|e| e.error)?;
        Ok(())
    }
}

/// EPUB包组装器
///
/// 创建时即写入 `mimetype` 与 `META-INF/container.xml`，
/// 之后的条目都位于内容目录下，同名条目只写入一次。
pub struct PackageAssembler<S: ArchiveSink> {
    sink: S,
    written: HashSet<String>,
}

impl<S: ArchiveSink> PackageAssembler<S> {
    pub fn begin(mut sink: S, container: &Container) -> Result<Self> {
        sink.append("mimetype", MIMETYPE, true)?;
        sink.append(CONTAINER_PATH, container.to_xml()?.as_bytes(), false)?;
        Ok(Self {
            sink,
            written: HashSet::new(),
        })
    }

    /// 追加内容目录下的文件，返回是否实际写入
    pub fn append(&mut self, href: &str, data: &[u8]) -> Result<bool> {
        let name = format!("{}/{}", CONTENT_DIR, href.trim_start_matches('/'));
        if !self.written.insert(name.clone()) {
            debug!("跳过重复条目: {}", name);
            return Ok(false);
        }
        self.sink.append(&name, data, false)?;
        Ok(true)
    }

    /// 是否已写入某个内容文件
    pub fn contains(&self, href: &str) -> bool {
        self.written
            .contains(&format!("{}/{}", CONTENT_DIR, href.trim_start_matches('/')))
    }

    /// 结束组装，交回写入目标
    pub fn into_sink(self) -> S {
        self.sink
    }
}
