//! HEVC 图像项 (`hvc1`) 编解码适配.
//!
//! 图像项本身只保存 ID 和 (加载后的) 解码会话, 属性由外部的属性源提供.
//!
//! - 加载: 从图像项的 hvcC 创建 [`HevcDecodeSession`]
//! - 解码: 会话把参数集头部和图像数据送入外部解码插件
//! - 编码: 驱动外部编码插件, 参数集写入 hvcC (配置字段取自编码器实际输出的 SPS),
//!   其余 NAL 单元以 4 字节长度前缀组成图像数据

use std::collections::HashMap;

use heif_codec::parsers::h265::{
    HevcNalHeader, HevcNalUnitType, HvccBox, extract_hvcc_configuration, write_length_prefixed,
};
use heif_codec::{
    CodecId, Decoder, Encoder, EncodingOptions, HevcDecodeSession, ImageInputClass, VideoFrame,
};
use heif_core::{HeifError, HeifResult, ItemId, NclxColorProfile, ResultExt};
use log::{debug, warn};

use crate::boxes::PropertyBox;

/// HEVC 图像项类型 (`infe` item_type)
pub const HEVC_ITEM_TYPE: &str = "hvc1";

/// HEVC alpha 辅助图像的 `auxC` 类型
pub const HEVC_ALPHA_AUX_TYPE: &str = "urn:mpeg:hevc:2015:auxid:1";

/// 编码输出图像数据中 NAL 长度前缀的字节数
const ENCODED_NAL_LENGTH_SIZE: usize = 4;

/// 图像项属性源
///
/// 由容器层实现, 按图像项 ID 提供已解析的属性 Box.
pub trait ItemPropertySource {
    /// 图像项是否存在
    fn contains_item(&self, item_id: ItemId) -> bool;

    /// 图像项的全部属性, 图像项不存在时返回 `ItemNotFound`
    fn properties(&self, item_id: ItemId) -> HeifResult<&[PropertyBox]>;

    /// 图像项的 hvcC
    fn hvcc(&self, item_id: ItemId) -> HeifResult<&HvccBox> {
        self.properties(item_id)?
            .iter()
            .find_map(PropertyBox::as_hvcc)
            .ok_or_else(|| {
                HeifError::MissingConfiguration(format!("图像项 {item_id} 没有 hvcC 属性"))
            })
    }
}

/// 内存中的属性表
#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    items: HashMap<ItemId, Vec<PropertyBox>>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记图像项 (无属性)
    pub fn insert_item(&mut self, item_id: ItemId) {
        self.items.entry(item_id).or_default();
    }

    /// 为图像项追加属性, 图像项不存在时自动登记
    pub fn add_property(&mut self, item_id: ItemId, property: PropertyBox) {
        self.items.entry(item_id).or_default().push(property);
    }
}

impl ItemPropertySource for PropertyStore {
    fn contains_item(&self, item_id: ItemId) -> bool {
        self.items.contains_key(&item_id)
    }

    fn properties(&self, item_id: ItemId) -> HeifResult<&[PropertyBox]> {
        self.items
            .get(&item_id)
            .map(Vec::as_slice)
            .ok_or(HeifError::ItemNotFound(item_id))
    }
}

/// 编码结果
#[derive(Debug, Clone)]
pub struct CodedImageData {
    /// 4 字节长度前缀的 NAL 序列 (不含参数集)
    pub bitstream: Vec<u8>,
    /// 需要关联到图像项的属性 (hvcC)
    pub properties: Vec<PropertyBox>,
    /// alpha 辅助图像的 `auxC` 类型
    pub aux_type: Option<&'static str>,
    /// 输入图像尺寸
    pub input_width: u32,
    pub input_height: u32,
    /// SPS 中的显示尺寸
    pub encoded_width: u32,
    pub encoded_height: u32,
}

impl CodedImageData {
    /// 编码尺寸与输入不一致, 需要写入 clap 裁剪
    pub fn needs_crop(&self) -> bool {
        (self.encoded_width, self.encoded_height) != (self.input_width, self.input_height)
    }

    pub fn hvcc(&self) -> Option<&HvccBox> {
        self.properties.iter().find_map(PropertyBox::as_hvcc)
    }
}

/// HEVC 图像项
#[derive(Debug)]
pub struct HevcImageItem {
    id: ItemId,
    decoder: Option<HevcDecodeSession>,
}

impl HevcImageItem {
    pub fn new(id: ItemId) -> Self {
        Self { id, decoder: None }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn item_type(&self) -> &'static str {
        HEVC_ITEM_TYPE
    }

    pub fn compression_format(&self) -> CodecId {
        CodecId::H265
    }

    pub fn auxc_alpha_channel_type(&self) -> &'static str {
        HEVC_ALPHA_AUX_TYPE
    }

    /// 解码输出强制使用的色彩描述
    ///
    /// HEVC 码流自带 VUI 色彩信息, 不强制.
    pub fn forced_output_nclx(&self) -> Option<NclxColorProfile> {
        None
    }

    /// 解码会话是否已创建
    pub fn is_loaded(&self) -> bool {
        self.decoder.is_some()
    }

    /// 加载图像项: 根据 hvcC 创建解码会话
    ///
    /// 已加载时直接返回.
    pub fn on_load_file(&mut self, props: &dyn ItemPropertySource) -> HeifResult<()> {
        if self.decoder.is_some() {
            return Ok(());
        }
        if !props.contains_item(self.id) {
            return Err(HeifError::ItemNotFound(self.id));
        }
        let hvcc = props.hvcc(self.id)?;
        let session = HevcDecodeSession::new(hvcc).stage(&format!("图像项 {}", self.id))?;
        debug!("图像项 {}: hvcC 已加载", self.id);
        self.decoder = Some(session);
        Ok(())
    }

    /// 读取指定图像项的解码器初始化数据 (长度前缀的参数集)
    pub fn read_configuration_bytes(
        props: &dyn ItemPropertySource,
        item_id: ItemId,
    ) -> HeifResult<Vec<u8>> {
        props.hvcc(item_id)?.headers()
    }

    pub fn decoder(&self) -> Option<&HevcDecodeSession> {
        self.decoder.as_ref()
    }

    pub fn decoder_mut(&mut self) -> Option<&mut HevcDecodeSession> {
        self.decoder.as_mut()
    }

    /// 解码图像项, 首次调用时加载
    pub fn decode(
        &mut self,
        props: &dyn ItemPropertySource,
        plugin: &mut dyn Decoder,
        item_data: &[u8],
    ) -> HeifResult<VideoFrame> {
        self.on_load_file(props)?;
        match self.decoder.as_ref() {
            Some(session) => session.decode(plugin, item_data),
            None => Err(HeifError::MissingConfiguration(format!(
                "图像项 {} 没有解码会话",
                self.id
            ))),
        }
    }

    /// hvcC 中的亮度位深
    pub fn luma_bits_per_pixel(&self, props: &dyn ItemPropertySource) -> HeifResult<u8> {
        Ok(props.hvcc(self.id)?.configuration().bit_depth_luma())
    }

    /// hvcC 中的色度位深
    pub fn chroma_bits_per_pixel(&self, props: &dyn ItemPropertySource) -> HeifResult<u8> {
        Ok(props.hvcc(self.id)?.configuration().bit_depth_chroma())
    }

    /// 使用外部编码插件编码一帧图像
    ///
    /// hvcC 的配置字段取自编码器输出的 SPS, 不信任调用方声明的参数.
    pub fn encode(
        &self,
        image: &VideoFrame,
        encoder: &mut dyn Encoder,
        options: &EncodingOptions,
        input_class: ImageInputClass,
    ) -> HeifResult<CodedImageData> {
        let bit_depth = image.luma_bits();
        if image.pixel_format.hevc_chroma_format().is_none() || !(8..=15).contains(&bit_depth) {
            return Err(HeifError::UnsupportedConfiguration(format!(
                "HEVC 无法编码像素格式 {} ({bit_depth} 位)",
                image.pixel_format
            )));
        }
        if image.width == 0 || image.height == 0 {
            return Err(HeifError::InvalidArgument(format!(
                "图像尺寸无效 {}x{}",
                image.width, image.height
            )));
        }
        if encoder.codec_id() != CodecId::H265 {
            return Err(HeifError::UnsupportedConfiguration(format!(
                "编码器 {} 不输出 HEVC (codec={})",
                encoder.name(),
                encoder.codec_id()
            )));
        }

        encoder
            .encode_image(image, options, input_class)
            .map_err(plugin_failure)?;

        let mut hvcc = HvccBox::new();
        let mut bitstream = Vec::new();
        let mut encoded_size = None;

        while let Some(packet) = encoder.receive_nal().map_err(plugin_failure)? {
            let nal = &packet.data[..];
            let header = HevcNalHeader::parse(nal).map_err(plugin_failure)?;
            match header.nal_type {
                HevcNalUnitType::Sps => {
                    if encoded_size.is_none() {
                        let sps = extract_hvcc_configuration(nal).stage("SPS 解析")?;
                        hvcc.set_configuration(sps.configuration);
                        encoded_size = Some((sps.width, sps.height));
                    }
                    hvcc.append_nal_unit(header.nal_type, nal);
                }
                HevcNalUnitType::Vps | HevcNalUnitType::Pps => {
                    hvcc.append_nal_unit(header.nal_type, nal);
                }
                _ => write_length_prefixed(&mut bitstream, nal, ENCODED_NAL_LENGTH_SIZE)?,
            }
        }

        let (encoded_width, encoded_height) = encoded_size.ok_or_else(|| {
            HeifError::EncoderFailure(format!("编码器 {} 没有输出 SPS", encoder.name()))
        })?;

        let expected = encoder.query_encoded_size(image.width, image.height);
        if expected != (encoded_width, encoded_height) {
            return Err(HeifError::EncoderFailure(format!(
                "编码器 {} 报告尺寸 {}x{}, SPS 实际为 {encoded_width}x{encoded_height}",
                encoder.name(),
                expected.0,
                expected.1
            )));
        }

        let sps_bit_depth = hvcc.configuration().bit_depth_luma();
        if u32::from(sps_bit_depth) != bit_depth {
            warn!(
                "图像项 {}: 输入 {bit_depth} 位, 编码器输出 {sps_bit_depth} 位",
                self.id
            );
        }

        debug!(
            "图像项 {}: 编码完成 {}x{} -> {}x{}, 图像数据 {} 字节",
            self.id,
            image.width,
            image.height,
            encoded_width,
            encoded_height,
            bitstream.len()
        );

        Ok(CodedImageData {
            bitstream,
            properties: vec![PropertyBox::Hvcc(hvcc)],
            aux_type: (input_class == ImageInputClass::Alpha).then_some(HEVC_ALPHA_AUX_TYPE),
            input_width: image.width,
            input_height: image.height,
            encoded_width,
            encoded_height,
        })
    }
}

/// 插件错误统一归为编码器失败
fn plugin_failure(err: HeifError) -> HeifError {
    match err {
        HeifError::EncoderFailure(_) => err,
        other => HeifError::EncoderFailure(other.to_string()),
    }
}
