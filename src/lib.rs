//! # heif
//!
//! 纯 Rust 实现的 HEIF/HEVC 编解码配置层.
//!
//! 负责 HEIF 容器中 HEVC 图像项的配置数据:
//! - **hvcC**: HEVCDecoderConfigurationRecord 的解析与逐字节一致的写入
//! - **SPS 提取**: 从编码器输出的 SPS 重建 hvcC 配置字段与显示分辨率
//! - **SEI**: 辅助图像 (深度图) 的 depth_representation_info
//! - **图像项适配**: 驱动外部编码器/解码器插件
//!
//! # 快速开始
//!
//! ```rust
//! use heif::codec::parsers::h265::HvccBox;
//!
//! let mut hvcc = HvccBox::new();
//! hvcc.append_nal(&[0x44, 0x01, 0xC1]).unwrap();
//! let headers = hvcc.headers().unwrap();
//! assert_eq!(headers, vec![0, 0, 0, 3, 0x44, 0x01, 0xC1]);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `heif-core` | 错误类型、比特流读写、像素格式 |
//! | `heif-codec` | HEVC 解析器与编解码插件接口 |
//! | `heif-format` | 属性 Box 与图像项适配 |

/// 核心类型与工具
pub use heif_core as core;

/// HEVC 解析器与编解码插件接口
pub use heif_codec as codec;

/// 属性 Box 与图像项适配
pub use heif_format as format;

pub mod logging;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
