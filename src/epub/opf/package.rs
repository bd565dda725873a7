//! OPF包文件生成

use crate::epub::error::Result;
use crate::epub::opf::manifest::Manifest;
use crate::epub::opf::metadata::Metadata;
use crate::epub::xml::{empty, end, finish, new_writer, start, text_element};

const OPF_NAMESPACE: &str = "http://www.idpf.org/2007/opf";
const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
const UNIQUE_IDENTIFIER: &str = "uuid";

/// OPF包文件（元数据 + 清单 + 脊柱）
#[derive(Debug, Clone)]
pub struct Opf {
    pub metadata: Metadata,
    pub manifest: Manifest,
}

impl Opf {
    pub fn new(metadata: Metadata, manifest: Manifest) -> Self {
        Self { metadata, manifest }
    }

    /// 生成 content.opf 的XML内容
    pub fn to_xml(&self, charset: &str) -> Result<String> {
        let mut writer = new_writer(charset)?;
        start(
            &mut writer,
            "package",
            &[
                ("xmlns", OPF_NAMESPACE),
                ("version", "3.0"),
                ("unique-identifier", UNIQUE_IDENTIFIER),
            ],
        )?;

        let metadata = &self.metadata;
        start(&mut writer, "metadata", &[("xmlns:dc", DC_NAMESPACE)])?;
        text_element(&mut writer, "dc:identifier", &[("id", UNIQUE_IDENTIFIER)], &metadata.identifier)?;
        text_element(&mut writer, "dc:title", &[], &metadata.title)?;
        text_element(&mut writer, "dc:language", &[], &metadata.language)?;
        for (name, value) in metadata.extra_elements() {
            text_element(&mut writer, &name, &[], value)?;
        }
        text_element(&mut writer, "meta", &[("property", "dcterms:modified")], &metadata.modified)?;
        end(&mut writer, "metadata")?;

        start(&mut writer, "manifest", &[])?;
        for item in &self.manifest.items {
            let mut attrs = vec![
                ("id", item.id.as_str()),
                ("href", item.href.as_str()),
                ("media-type", item.media_type.as_str()),
            ];
            if let Some(properties) = &item.properties {
                attrs.push(("properties", properties.as_str()));
            }
            empty(&mut writer, "item", &attrs)?;
        }
        end(&mut writer, "manifest")?;

        match &self.manifest.toc {
            Some(toc) => start(&mut writer, "spine", &[("toc", toc.as_str())])?,
            None => start(&mut writer, "spine", &[])?,
        }
        for itemref in &self.manifest.spine {
            empty(&mut writer, "itemref", &[("idref", itemref.idref.as_str())])?;
        }
        end(&mut writer, "spine")?;

        end(&mut writer, "package")?;
        Ok(finish(writer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::config::ConversionRequest;

    fn sample_opf() -> Opf {
        let mut request = ConversionRequest::default();
        request.identifier = "1234".to_string();
        request.title = "Alice & Co".to_string();
        request.modified = "2024-01-01T00:00:00Z".to_string();
        request.dc.insert("creator".to_string(), "Lewis Carroll".to_string());

        let files: Vec<String> = ["00.xhtml", "01.xhtml", "toc.xhtml", "toc.ncx"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let spine = files[..2].to_vec();
        Opf::new(Metadata::from_request(&request), Manifest::build(&files, &spine))
    }

    #[test]
    fn test_opf_xml() {
        let xml = sample_opf().to_xml("UTF-8").unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(
            "<package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\" unique-identifier=\"uuid\">"
        ));
        assert!(xml.contains("<dc:identifier id=\"uuid\">1234</dc:identifier>"));
        assert!(xml.contains("<dc:title>Alice &amp; Co</dc:title>"));
        assert!(xml.contains("<dc:language>en</dc:language>"));
        assert!(xml.contains("<dc:creator>Lewis Carroll</dc:creator>"));
        assert!(xml.contains("<meta property=\"dcterms:modified\">2024-01-01T00:00:00Z</meta>"));
        assert!(xml.contains(
            "<item id=\"res_3\" href=\"toc.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>"
        ));
        assert!(xml.contains("<item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>"));
        assert!(xml.contains("<spine toc=\"ncx\">"));

        let first = xml.find("<itemref idref=\"page_1\"/>").unwrap();
        let second = xml.find("<itemref idref=\"page_2\"/>").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_opf_deterministic() {
        let opf = sample_opf();
        assert_eq!(opf.to_xml("UTF-8").unwrap(), opf.to_xml("UTF-8").unwrap());
    }
}
