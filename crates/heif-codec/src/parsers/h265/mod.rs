//! H.265/HEVC 码流解析器.
//!
//! 提供 HEIF 图像项所需的 HEVC 解析能力:
//! - NAL 单元头部识别与长度前缀切分
//! - hvcC (HEVCDecoderConfigurationRecord) 解析与写入
//! - SPS 参数提取 (profile/level, 色度格式, 位深, 显示尺寸)
//! - 辅助图像 SEI 解析 (depth_representation_info)
//!
//! # HEVC NAL 头部 (2 字节)
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ forbidden(1) | type(6) | layer_id(6) | tid(3) │
//! └────────────────────────────────────────────┘
//! ```

pub mod hvcc;
pub mod nal;
pub mod sei;
pub mod sps;

pub use hvcc::{HvccBox, HvccConfiguration, NUM_CONSTRAINT_INDICATOR_FLAGS, NalArray};
pub use nal::{HevcNalHeader, HevcNalUnitType, split_length_prefixed, write_length_prefixed};
pub use sei::{
    DepthRepresentationInfo, DepthRepresentationType, SEI_DEPTH_REPRESENTATION_INFO, SeiMessage,
    decode_hevc_aux_sei_messages, decode_hevc_aux_sei_messages_with_length_size, parse_sei_rbsp,
};
pub use sps::{HevcSps, SpsConfiguration, extract_hvcc_configuration, parse_hevc_sps};
