//! OPF（Open Packaging Format）模块
//!
//! 生成EPUB包文件：元数据、清单（manifest）和脊柱（spine）。

pub mod media_type;
mod manifest;
mod metadata;
mod package;
mod spine;

pub use manifest::{Manifest, ManifestItem, NAV_DOCUMENT, NCX_ID};
pub use media_type::{guess_media_type, is_markup};
pub use metadata::Metadata;
pub use package::Opf;
pub use spine::SpineItem;
