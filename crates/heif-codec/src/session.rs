//! HEVC 解码会话.
//!
//! 由图像项在加载时根据 hvcC 创建, 保存解码器初始化所需的参数集头部.
//! 会话本身不持有解码器插件, 每次解码由调用方借入插件.

use heif_core::{HeifError, HeifResult, PixelFormat};
use log::{debug, warn};

use crate::codec_id::CodecId;
use crate::codec_parameters::{CodecParameters, VideoCodecParams};
use crate::decoder::Decoder;
use crate::frame::VideoFrame;
use crate::packet::Packet;
use crate::parsers::h265::HvccBox;

/// HEVC 解码会话
#[derive(Debug, Clone)]
pub struct HevcDecodeSession {
    /// 长度前缀的 VPS/SPS/PPS
    headers: Vec<u8>,
    nal_length_size: u8,
    chroma_format: u8,
    bit_depth_luma: u8,
    bit_depth_chroma: u8,
    /// SPS 中的显示尺寸, hvcC 没有 SPS 时为 0
    width: u32,
    height: u32,
}

impl HevcDecodeSession {
    /// 从 hvcC 创建会话
    ///
    /// hvcC 不含任何参数集时返回 `MissingConfiguration`.
    pub fn new(hvcc: &HvccBox) -> HeifResult<Self> {
        let headers = hvcc.headers()?;
        let config = hvcc.configuration();

        let (width, height) = match hvcc.sps_configuration() {
            Ok(Some(sps)) => {
                if sps.configuration.bit_depth_luma_minus8 != config.bit_depth_luma_minus8
                    || sps.configuration.chroma_format != config.chroma_format
                {
                    warn!(
                        "HEVC: hvcC 配置 (chroma={}, 位深={}) 与 SPS (chroma={}, 位深={}) 不一致",
                        config.chroma_format,
                        config.bit_depth_luma(),
                        sps.configuration.chroma_format,
                        sps.configuration.bit_depth_luma()
                    );
                }
                (sps.width, sps.height)
            }
            Ok(None) => (0, 0),
            Err(e) => {
                // 解码器自己会解析 SPS, 这里只用于交叉校验
                warn!("HEVC: hvcC 中的 SPS 无法解析: {e}");
                (0, 0)
            }
        };

        debug!(
            "HEVC: 创建解码会话, 头部 {} 字节, {}x{}",
            headers.len(),
            width,
            height
        );
        Ok(Self {
            headers,
            nal_length_size: hvcc.nal_length_size(),
            chroma_format: config.chroma_format,
            bit_depth_luma: config.bit_depth_luma(),
            bit_depth_chroma: config.bit_depth_chroma(),
            width,
            height,
        })
    }

    /// 长度前缀的参数集头部
    pub fn headers(&self) -> &[u8] {
        &self.headers
    }

    /// 亮度位深
    pub fn bit_depth_luma(&self) -> u8 {
        self.bit_depth_luma
    }

    /// 色度位深
    pub fn bit_depth_chroma(&self) -> u8 {
        self.bit_depth_chroma
    }

    /// 打开解码插件所用的参数
    pub fn codec_parameters(&self) -> CodecParameters {
        CodecParameters {
            codec_id: CodecId::H265,
            extra_data: self.headers.clone(),
            nal_length_size: self.nal_length_size,
            video: VideoCodecParams {
                width: self.width,
                height: self.height,
                bit_depth_luma: self.bit_depth_luma,
                bit_depth_chroma: self.bit_depth_chroma,
                pixel_format: PixelFormat::from_hevc(self.chroma_format, self.bit_depth_luma)
                    .unwrap_or(PixelFormat::None),
            },
        }
    }

    /// 解码一个图像项
    ///
    /// `item_data` 为图像项的长度前缀码流. 参数集头部与图像数据拼成一个包送入插件,
    /// 随后送入空包刷新, 取出一帧. 送包或取帧失败时重置插件.
    pub fn decode(&self, decoder: &mut dyn Decoder, item_data: &[u8]) -> HeifResult<VideoFrame> {
        if decoder.codec_id() != CodecId::H265 {
            return Err(HeifError::UnsupportedConfiguration(format!(
                "解码器 {} 不支持 HEVC (codec={})",
                decoder.name(),
                decoder.codec_id()
            )));
        }

        decoder.open(&self.codec_parameters())?;
        let frame = match self.feed(decoder, item_data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("HEVC: 解码器 {} 失败, 已重置: {e}", decoder.name());
                decoder.flush();
                return Err(e);
            }
        };

        if self.width != 0 && (frame.width, frame.height) != (self.width, self.height) {
            warn!(
                "HEVC: 解码输出 {}x{} 与 SPS 尺寸 {}x{} 不一致",
                frame.width, frame.height, self.width, self.height
            );
        }
        debug!(
            "HEVC: 解码完成 {}x{} {}",
            frame.width, frame.height, frame.pixel_format
        );
        Ok(frame)
    }

    fn feed(&self, decoder: &mut dyn Decoder, item_data: &[u8]) -> HeifResult<VideoFrame> {
        let mut stream = Vec::with_capacity(self.headers.len() + item_data.len());
        stream.extend_from_slice(&self.headers);
        stream.extend_from_slice(item_data);
        let packet = Packet {
            data: stream.into(),
            is_keyframe: true,
        };
        decoder.send_packet(&packet)?;
        decoder.send_packet(&Packet::empty())?;

        decoder.receive_frame()?.ok_or_else(|| {
            HeifError::DecoderFailure(format!("解码器 {} 没有输出图像", decoder.name()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 记录收到的数据, 输出固定尺寸帧
    struct RecordingDecoder {
        codec_id: CodecId,
        params: Option<CodecParameters>,
        packets: Vec<Vec<u8>>,
        produce_frame: bool,
        flushed: usize,
    }

    impl RecordingDecoder {
        fn new(codec_id: CodecId, produce_frame: bool) -> Self {
            Self {
                codec_id,
                params: None,
                packets: Vec::new(),
                produce_frame,
                flushed: 0,
            }
        }
    }

    impl Decoder for RecordingDecoder {
        fn codec_id(&self) -> CodecId {
            self.codec_id
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn open(&mut self, params: &CodecParameters) -> HeifResult<()> {
            self.params = Some(params.clone());
            Ok(())
        }

        fn send_packet(&mut self, packet: &Packet) -> HeifResult<()> {
            self.packets.push(packet.data.to_vec());
            Ok(())
        }

        fn receive_frame(&mut self) -> HeifResult<Option<VideoFrame>> {
            Ok(self
                .produce_frame
                .then(|| VideoFrame::new(16, 16, PixelFormat::Yuv420p)))
        }

        fn flush(&mut self) {
            self.flushed += 1;
            self.packets.clear();
        }
    }

    fn hvcc() -> HvccBox {
        let mut hvcc = HvccBox::new();
        hvcc.append_nal(&[0x40, 0x01, 0x0C]).unwrap();
        hvcc.append_nal(&[0x44, 0x01, 0xC1]).unwrap();
        hvcc
    }

    #[test]
    fn test_解码送入头部与数据() {
        let session = HevcDecodeSession::new(&hvcc()).unwrap();
        assert_eq!(session.headers().len(), 14);

        let mut decoder = RecordingDecoder::new(CodecId::H265, true);
        let data = [0, 0, 0, 3, 0x26, 0x01, 0xAF];
        let frame = session.decode(&mut decoder, &data).unwrap();
        assert_eq!(frame.width, 16);

        let params = decoder.params.as_ref().unwrap();
        assert_eq!(params.extra_data, session.headers());
        assert_eq!(params.video.pixel_format, PixelFormat::Yuv420p);
        assert_eq!(decoder.packets.len(), 2);
        assert_eq!(&decoder.packets[0][..14], session.headers());
        assert_eq!(&decoder.packets[0][14..], &data);
        assert!(decoder.packets[1].is_empty());
        assert_eq!(decoder.flushed, 0);
    }

    #[test]
    fn test_解码器错误() {
        let session = HevcDecodeSession::new(&hvcc()).unwrap();
        let mut wrong_codec = RecordingDecoder::new(CodecId::Av1, true);
        assert!(matches!(
            session.decode(&mut wrong_codec, &[]),
            Err(HeifError::UnsupportedConfiguration(_))
        ));

        let mut no_output = RecordingDecoder::new(CodecId::H265, false);
        assert!(matches!(
            session.decode(&mut no_output, &[]),
            Err(HeifError::DecoderFailure(_))
        ));
        // 失败后插件被重置
        assert_eq!(no_output.flushed, 1);
        assert!(no_output.packets.is_empty());

        // codec 不匹配时不触碰插件
        assert!(wrong_codec.params.is_none());
        assert_eq!(wrong_codec.flushed, 0);
    }

    #[test]
    fn test_空_hvcc() {
        assert!(matches!(
            HevcDecodeSession::new(&HvccBox::new()),
            Err(HeifError::MissingConfiguration(_))
        ));
    }
}
