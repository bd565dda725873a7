use crate::epub::error::Result;
use crate::epub::opf::media_type;
use crate::epub::xml::{empty, end, finish, new_writer, start};

/// 容器描述文件在包中的路径
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// OPF包文件在包中的固定路径
pub const ROOTFILE_PATH: &str = "EPUB/content.opf";

const CONTAINER_NAMESPACE: &str = "urn:oasis:names:tc:opendocument:xmlns:container";

/// Container.xml中的rootfile信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFile {
    pub full_path: String,
    pub media_type: String,
}

impl RootFile {
    /// 指向OPF包文件的rootfile
    pub fn package(full_path: &str) -> Self {
        Self {
            full_path: full_path.to_string(),
            media_type: media_type::OPF.to_string(),
        }
    }
}

/// META-INF/container.xml 的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub rootfiles: Vec<RootFile>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new(ROOTFILE_PATH)
    }
}

impl Container {
    /// 创建只包含一个OPF rootfile的容器
    pub fn new(rootfile: &str) -> Self {
        Self {
            rootfiles: vec![RootFile::package(rootfile)],
        }
    }

    /// 生成container.xml
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = new_writer("UTF-8")?;
        start(
            &mut writer,
            "container",
            &[("version", "1.0"), ("xmlns", CONTAINER_NAMESPACE)],
        )?;
        start(&mut writer, "rootfiles", &[])?;
        for rootfile in &self.rootfiles {
            empty(
                &mut writer,
                "rootfile",
                &[
                    ("full-path", rootfile.full_path.as_str()),
                    ("media-type", rootfile.media_type.as_str()),
                ],
            )?;
        }
        end(&mut writer, "rootfiles")?;
        end(&mut writer, "container")?;
        Ok(finish(writer))
    }
}
