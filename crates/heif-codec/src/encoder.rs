//! 编码器插件接口.
//!
//! 外部 HEVC 编码器 (x265, kvazaar 等的封装) 实现 `Encoder` trait,
//! 由图像项适配层驱动.
//!
//! 编码流程:
//! 1. 调用 `encode_image()` 送入一帧原始图像
//! 2. 反复调用 `receive_nal()` 取出 NAL 单元 (不含起始码与长度前缀)
//! 3. `receive_nal()` 返回 `None` 表示本帧数据已全部取出

use heif_core::HeifResult;

use crate::codec_id::CodecId;
use crate::frame::VideoFrame;
use crate::packet::Packet;

/// 输入图像的用途分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageInputClass {
    /// 普通彩色图像
    #[default]
    Normal,
    /// alpha 通道辅助图像
    Alpha,
    /// 深度辅助图像
    Depth,
    /// 缩略图
    Thumbnail,
}

/// 编码选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingOptions {
    /// 是否同时编码 alpha 通道
    pub save_alpha_channel: bool,
    /// 质量 (0-100)
    pub quality: u8,
    /// 无损模式
    pub lossless: bool,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            save_alpha_channel: true,
            quality: 50,
            lossless: false,
        }
    }
}

/// 编码器插件 trait
pub trait Encoder: Send {
    /// 获取编码器对应的压缩格式
    fn codec_id(&self) -> CodecId;

    /// 获取编码器名称
    fn name(&self) -> &str;

    /// 编码一帧图像
    fn encode_image(
        &mut self,
        image: &VideoFrame,
        options: &EncodingOptions,
        input_class: ImageInputClass,
    ) -> HeifResult<()>;

    /// 取出下一个 NAL 单元
    ///
    /// # 返回
    /// - `Ok(Some(packet))`: 一个完整 NAL 单元 (含 2 字节 NAL 头)
    /// - `Ok(None)`: 所有数据已取出
    fn receive_nal(&mut self) -> HeifResult<Option<Packet>>;

    /// 查询给定输入尺寸下编码器实际输出的图像尺寸
    ///
    /// 编码器可能把尺寸对齐到最小编码块. 默认与输入一致.
    fn query_encoded_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width, height)
    }
}
