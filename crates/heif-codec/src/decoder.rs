//! 解码器插件接口.
//!
//! 外部 HEVC 解码器 (libde265, ffmpeg 等的封装) 实现 `Decoder` trait.
//!
//! 解码流程:
//! 1. 调用 `open()`, 以 hvcC 参数集头部初始化
//! 2. 调用 `send_packet()` 送入长度前缀的压缩数据
//! 3. 送入空包 (flush), 再调用 `receive_frame()` 取出解码图像

use heif_core::HeifResult;

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::frame::VideoFrame;
use crate::packet::Packet;

/// 解码器插件 trait
pub trait Decoder: Send {
    /// 获取解码器对应的压缩格式
    fn codec_id(&self) -> CodecId;

    /// 获取解码器名称
    fn name(&self) -> &str;

    /// 使用参数集头部初始化解码器
    fn open(&mut self, params: &CodecParameters) -> HeifResult<()>;

    /// 送入一个压缩数据包, 空包表示刷新
    fn send_packet(&mut self, packet: &Packet) -> HeifResult<()>;

    /// 取出一帧解码图像, `None` 表示没有可用的帧
    fn receive_frame(&mut self) -> HeifResult<Option<VideoFrame>>;

    /// 清空内部状态
    fn flush(&mut self);
}
