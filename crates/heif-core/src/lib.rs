//! # heif-core
//!
//! HEIF 编解码配置层核心库, 提供错误类型、比特流读写与像素格式定义.
//!
//! 上层的 hvcC 解析、SPS 提取、SEI 解码均建立在本 crate 的
//! [`BitReader`](bitreader::BitReader) / [`BitWriter`](bitwriter::BitWriter) 之上.

pub mod bitreader;
pub mod bitwriter;
pub mod error;
pub mod nclx;
pub mod pixel_format;

/// 容器内图像项标识
pub type ItemId = u32;

// 重导出常用类型
pub use bitreader::BitReader;
pub use bitwriter::BitWriter;
pub use error::{HeifError, HeifResult, ResultExt};
pub use nclx::NclxColorProfile;
pub use pixel_format::PixelFormat;
