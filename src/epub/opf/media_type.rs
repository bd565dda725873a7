//! 根据文件扩展名推断媒体类型

use std::path::Path;

pub const XHTML: &str = "application/xhtml+xml";
pub const NCX: &str = "application/x-dtbncx+xml";
pub const OPF: &str = "application/oebps-package+xml";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// 推断文件的媒体类型，未知扩展名返回 `application/octet-stream`
pub fn guess_media_type(path: &str) -> &'static str {
    // 远程资源可能带有查询参数
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "xhtml" | "xht" | "html" | "htm" => XHTML,
        "css" => "text/css",
        "js" => "application/javascript",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "m4a" | "mp4a" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "smil" => "application/smil+xml",
        "ncx" => NCX,
        "opf" => OPF,
        _ => OCTET_STREAM,
    }
}

/// 是否为可转换的HTML文档
pub fn is_markup(path: &str) -> bool {
    guess_media_type(path) == XHTML
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_media_type() {
        assert_eq!(guess_media_type("00.xhtml"), XHTML);
        assert_eq!(guess_media_type("chapter.HTML"), XHTML);
        assert_eq!(guess_media_type("style/main.css"), "text/css");
        assert_eq!(guess_media_type("toc.ncx"), NCX);
        assert_eq!(guess_media_type("content.opf"), OPF);
        assert_eq!(guess_media_type("img/a.png?v=2"), "image/png");
        assert_eq!(guess_media_type("README"), OCTET_STREAM);
    }

    #[test]
    fn test_is_markup() {
        assert!(is_markup("a/b/c.htm"));
        assert!(!is_markup("a/b/c.css"));
    }
}
