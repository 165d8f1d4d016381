//! # heif-format
//!
//! HEIF 容器层中与 HEVC 图像项相关的部分: 属性 Box 的读写与类型注册,
//! 以及 `hvc1` 图像项的编解码适配.
//!
//! ## 使用示例
//!
//! ```rust
//! use heif_format::{BoxRegistry, HevcImageItem, PropertyStore};
//!
//! let registry = BoxRegistry::with_defaults();
//! let store = PropertyStore::new();
//! let mut item = HevcImageItem::new(1);
//! assert!(item.on_load_file(&store).is_err());
//! assert!(!item.is_loaded());
//! # let _ = registry;
//! ```

pub mod boxes;
pub mod item;

// 重导出常用类型
pub use boxes::{BoxHeader, BoxRegistry, FourCc, PropertyBox, read_box_header, write_box};
pub use item::{
    CodedImageData, HEVC_ALPHA_AUX_TYPE, HEVC_ITEM_TYPE, HevcImageItem, ItemPropertySource,
    PropertyStore,
};
