//! 属性 Box 的头部读写与类型注册表.
//!
//! ISO 14496-12 定义的 Box 结构:
//! ```text
//! Size:       4 bytes (big-endian, 含头部本身)
//! Type:       4 bytes (FourCC)
//! [ExtSize]:  8 bytes (仅当 Size==1 时存在, 64-bit 大小)
//! ```
//!
//! 特殊大小值:
//! - 0: Box 延伸到数据末尾
//! - 1: 使用 64-bit 扩展大小
//!
//! 注册表按 FourCC 分派负载的解析/写入函数, 未注册的类型原样保留.

use std::collections::HashMap;
use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use heif_codec::parsers::h265::HvccBox;
use heif_core::{BitReader, HeifError, HeifResult, ResultExt};
use log::debug;

/// 4 字节 Box 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    /// hvcC - HEVC 解码配置记录
    pub const HVCC: Self = Self(*b"hvcC");
    /// auxC - 辅助图像类型
    pub const AUXC: Self = Self(*b"auxC");
    /// ispe - 图像尺寸
    pub const ISPE: Self = Self(*b"ispe");

    pub const fn new(fourcc: &[u8; 4]) -> Self {
        Self(*fourcc)
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = std::str::from_utf8(&self.0).unwrap_or("????");
        write!(f, "{s}")
    }
}

/// 已解析的 Box 头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    /// Box 总大小 (含头部, 0 表示到数据末尾)
    pub size: u64,
    /// Box 类型
    pub box_type: FourCc,
    /// 头部大小 (8 或 16 字节)
    pub header_size: u64,
}

impl BoxHeader {
    /// 内容区域大小 (不含头部), `None` 表示延伸到数据末尾
    pub fn content_size(&self) -> Option<u64> {
        if self.size == 0 {
            None
        } else {
            Some(self.size - self.header_size)
        }
    }
}

/// 读取一个 Box 头部
pub fn read_box_header(br: &mut BitReader) -> HeifResult<BoxHeader> {
    let size32 = br.read_u32()?;
    let mut fourcc = [0u8; 4];
    fourcc.copy_from_slice(br.read_bytes(4)?);
    let box_type = FourCc(fourcc);

    let (size, header_size) = if size32 == 1 {
        // 64-bit 扩展大小
        let hi = u64::from(br.read_u32()?);
        let lo = u64::from(br.read_u32()?);
        ((hi << 32) | lo, 16u64)
    } else {
        (u64::from(size32), 8u64)
    };

    if size != 0 && size < header_size {
        return Err(HeifError::ParseError(format!(
            "Box '{box_type}' 大小 {size} 小于头部 {header_size}"
        )));
    }

    Ok(BoxHeader {
        size,
        box_type,
        header_size,
    })
}

/// 写出完整的 Box (头部 + 负载)
///
/// 总大小超出 32 位时使用 64-bit 扩展大小.
pub fn write_box(box_type: FourCc, payload: &[u8]) -> Vec<u8> {
    let compact_size = 8 + payload.len() as u64;
    let mut out;
    if compact_size <= u64::from(u32::MAX) {
        out = Vec::with_capacity(compact_size as usize);
        let mut header = [0u8; 8];
        BigEndian::write_u32(&mut header[0..4], compact_size as u32);
        header[4..8].copy_from_slice(&box_type.0);
        out.extend_from_slice(&header);
    } else {
        out = Vec::with_capacity(payload.len() + 16);
        let mut header = [0u8; 16];
        BigEndian::write_u32(&mut header[0..4], 1);
        header[4..8].copy_from_slice(&box_type.0);
        BigEndian::write_u64(&mut header[8..16], compact_size + 8);
        out.extend_from_slice(&header);
    }
    out.extend_from_slice(payload);
    out
}

/// 图像项属性 Box
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyBox {
    /// hvcC
    Hvcc(HvccBox),
    /// 未注册的类型, 负载原样保留
    Unknown { box_type: FourCc, payload: Vec<u8> },
}

impl PropertyBox {
    pub fn box_type(&self) -> FourCc {
        match self {
            Self::Hvcc(_) => FourCc::HVCC,
            Self::Unknown { box_type, .. } => *box_type,
        }
    }

    /// 解码该图像项是否必须理解此属性
    pub fn is_essential(&self) -> bool {
        matches!(self, Self::Hvcc(_))
    }

    pub fn as_hvcc(&self) -> Option<&HvccBox> {
        match self {
            Self::Hvcc(hvcc) => Some(hvcc),
            Self::Unknown { .. } => None,
        }
    }
}

/// Box 负载解析函数
pub type BoxParseFn = fn(&[u8]) -> HeifResult<PropertyBox>;

/// Box 负载写入函数
pub type BoxWriteFn = fn(&PropertyBox) -> HeifResult<Vec<u8>>;

/// 一种 Box 类型的解析/写入函数
#[derive(Clone, Copy)]
pub struct BoxCodec {
    pub parse: BoxParseFn,
    pub write: BoxWriteFn,
}

/// Box 类型注册表
///
/// 管理已注册的属性 Box 类型, 按 FourCC 查找解析/写入函数.
pub struct BoxRegistry {
    codecs: HashMap<FourCc, BoxCodec>,
}

impl BoxRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// 创建注册了所有内置类型 (hvcC) 的注册表
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FourCc::HVCC, parse_hvcc_payload, write_hvcc_payload);
        registry
    }

    /// 注册一种 Box 类型, 已注册时覆盖
    pub fn register(&mut self, box_type: FourCc, parse: BoxParseFn, write: BoxWriteFn) {
        self.codecs.insert(box_type, BoxCodec { parse, write });
    }

    pub fn is_registered(&self, box_type: FourCc) -> bool {
        self.codecs.contains_key(&box_type)
    }

    /// 解析 Box 负载, 未注册的类型返回 `PropertyBox::Unknown`
    pub fn parse_payload(&self, box_type: FourCc, payload: &[u8]) -> HeifResult<PropertyBox> {
        match self.codecs.get(&box_type) {
            Some(codec) => (codec.parse)(payload),
            None => {
                debug!("Box '{box_type}' 未注册, 原样保留 {} 字节", payload.len());
                Ok(PropertyBox::Unknown {
                    box_type,
                    payload: payload.to_vec(),
                })
            }
        }
    }

    /// 读取一个完整的属性 Box (头部 + 负载)
    pub fn read_property(&self, br: &mut BitReader) -> HeifResult<PropertyBox> {
        let header = read_box_header(br)?;
        let payload = match header.content_size() {
            Some(size) => {
                let size = usize::try_from(size).map_err(|_| {
                    HeifError::ParseError(format!("Box '{}' 大小 {size} 超出范围", header.box_type))
                })?;
                br.read_bytes(size)
            }
            None => br.read_bytes(br.bytes_left()),
        }
        .stage(&format!("Box '{}'", header.box_type))?;
        self.parse_payload(header.box_type, payload)
    }

    /// 依次读取数据中的所有属性 Box
    pub fn read_properties(&self, data: &[u8]) -> HeifResult<Vec<PropertyBox>> {
        let mut br = BitReader::new(data);
        let mut properties = Vec::new();
        while !br.is_eof() {
            properties.push(self.read_property(&mut br)?);
        }
        Ok(properties)
    }

    /// 写出完整的属性 Box
    pub fn write_property(&self, property: &PropertyBox) -> HeifResult<Vec<u8>> {
        let box_type = property.box_type();
        let payload = match property {
            PropertyBox::Unknown { payload, .. } => payload.clone(),
            _ => {
                let codec = self.codecs.get(&box_type).ok_or_else(|| {
                    HeifError::UnsupportedConfiguration(format!("Box '{box_type}' 未注册"))
                })?;
                (codec.write)(property)?
            }
        };
        Ok(write_box(box_type, &payload))
    }
}

impl Default for BoxRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn parse_hvcc_payload(payload: &[u8]) -> HeifResult<PropertyBox> {
    HvccBox::parse(payload).map(PropertyBox::Hvcc)
}

fn write_hvcc_payload(property: &PropertyBox) -> HeifResult<Vec<u8>> {
    match property {
        PropertyBox::Hvcc(hvcc) => hvcc.to_bytes(),
        other => Err(HeifError::InvalidArgument(format!(
            "hvcC 写入函数收到 '{}'",
            other.box_type()
        ))),
    }
}
