//! # heif-codec
//!
//! HEIF 编解码配置层, 提供 HEVC 参数集解析与外部编解码插件的抽象.
//!
//! - [`parsers::h265`]: hvcC 配置记录、SPS 参数提取、辅助图像 SEI 解析
//! - [`Encoder`] / [`Decoder`]: 外部编码器/解码器插件接口
//! - [`HevcDecodeSession`]: 由 hvcC 初始化解码插件的解码会话
//!
//! ## 使用示例
//!
//! ```rust
//! use heif_codec::parsers::h265::HvccBox;
//!
//! let mut hvcc = HvccBox::new();
//! hvcc.append_nal(&[0x40, 0x01, 0x0C, 0x01]).unwrap();
//! let bytes = hvcc.to_bytes().unwrap();
//! assert_eq!(HvccBox::parse(&bytes).unwrap(), hvcc);
//! ```

pub mod codec_id;
pub mod codec_parameters;
pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod packet;
pub mod parsers;
pub mod session;

// 重导出常用类型
pub use codec_id::CodecId;
pub use codec_parameters::{CodecParameters, VideoCodecParams};
pub use decoder::Decoder;
pub use encoder::{Encoder, EncodingOptions, ImageInputClass};
pub use frame::VideoFrame;
pub use packet::Packet;
pub use session::HevcDecodeSession;
