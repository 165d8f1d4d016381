//! 编解码器参数.
//!
//! 打开解码插件时传入, 携带 hvcC 中的参数集头部 (VPS/SPS/PPS).

use heif_core::PixelFormat;

use crate::codec_id::CodecId;

/// 编解码器参数
#[derive(Debug, Clone)]
pub struct CodecParameters {
    /// 编解码器标识
    pub codec_id: CodecId,
    /// 额外数据: 长度前缀的参数集 NAL 单元
    pub extra_data: Vec<u8>,
    /// `extra_data` 与后续码流中 NAL 长度字段的字节数
    pub nal_length_size: u8,
    /// 视频参数
    pub video: VideoCodecParams,
}

/// 视频编解码器参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCodecParams {
    /// 宽度 (像素, 未知时为 0)
    pub width: u32,
    /// 高度 (像素, 未知时为 0)
    pub height: u32,
    /// 亮度位深
    pub bit_depth_luma: u8,
    /// 色度位深
    pub bit_depth_chroma: u8,
    /// 期望的输出像素格式
    pub pixel_format: PixelFormat,
}
