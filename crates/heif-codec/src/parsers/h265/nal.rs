//! H.265/HEVC NAL (Network Abstraction Layer) 单元工具.
//!
//! HEVC NAL 头部为 2 字节:
//! - forbidden_zero_bit (1 bit)
//! - nal_unit_type (6 bits)
//! - nuh_layer_id (6 bits)
//! - nuh_temporal_id_plus1 (3 bits)
//!
//! HEIF 中的码流一律采用长度前缀格式 (不使用 Annex B 起始码).

use heif_core::{HeifError, HeifResult};

/// HEVC NAL 单元类型
///
/// 仅列出配置层需要区分的类型, 其余保存在 `Unknown` 中, 原样往返.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HevcNalUnitType {
    /// IDR_W_RADL (Instantaneous Decoding Refresh)
    IdrWRadl,
    /// IDR_N_LP
    IdrNLp,
    /// CRA_NUT (Clean Random Access)
    Cra,
    /// VPS (Video Parameter Set)
    Vps,
    /// SPS (Sequence Parameter Set)
    Sps,
    /// PPS (Picture Parameter Set)
    Pps,
    /// AUD (Access Unit Delimiter)
    Aud,
    /// PREFIX_SEI
    PrefixSei,
    /// SUFFIX_SEI
    SuffixSei,
    /// 其他类型 (6 位编号, 超出 6 位的无法写入 hvcC)
    Unknown(u8),
}

impl HevcNalUnitType {
    /// 从类型编号创建 (只取低 6 位)
    pub fn from_type_id(id: u8) -> Self {
        match id & 0x3F {
            19 => Self::IdrWRadl,
            20 => Self::IdrNLp,
            21 => Self::Cra,
            32 => Self::Vps,
            33 => Self::Sps,
            34 => Self::Pps,
            35 => Self::Aud,
            39 => Self::PrefixSei,
            40 => Self::SuffixSei,
            other => Self::Unknown(other),
        }
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::IdrWRadl => 19,
            Self::IdrNLp => 20,
            Self::Cra => 21,
            Self::Vps => 32,
            Self::Sps => 33,
            Self::Pps => 34,
            Self::Aud => 35,
            Self::PrefixSei => 39,
            Self::SuffixSei => 40,
            Self::Unknown(id) => *id,
        }
    }

    /// 已知编号的 `Unknown` 转为对应变体, 超出 6 位的保持原样
    pub fn normalized(self) -> Self {
        match self {
            Self::Unknown(id) if id <= 0x3F => Self::from_type_id(id),
            other => other,
        }
    }

    /// 是否为 VCL (Video Coding Layer) NAL
    pub fn is_vcl(&self) -> bool {
        self.type_id() < 32
    }

    /// 是否为参数集 (VPS/SPS/PPS), 这些单元存放在 hvcC 中而不是图像数据中
    pub fn is_parameter_set(&self) -> bool {
        matches!(self, Self::Vps | Self::Sps | Self::Pps)
    }

    /// 是否为 SEI
    pub fn is_sei(&self) -> bool {
        matches!(self, Self::PrefixSei | Self::SuffixSei)
    }
}

/// HEVC NAL 头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HevcNalHeader {
    /// NAL 类型
    pub nal_type: HevcNalUnitType,
    /// nuh_layer_id
    pub layer_id: u8,
    /// nuh_temporal_id_plus1
    pub temporal_id_plus1: u8,
}

impl HevcNalHeader {
    /// NAL 头部长度 (字节)
    pub const SIZE: usize = 2;

    /// 从原始 NAL 数据 (含 2 字节头) 解析头部
    pub fn parse(data: &[u8]) -> HeifResult<Self> {
        if data.len() < Self::SIZE {
            return Err(HeifError::ParseError(format!(
                "HEVC: NAL 数据太短, len={}",
                data.len()
            )));
        }
        Ok(Self {
            nal_type: HevcNalUnitType::from_type_id(data[0] >> 1),
            layer_id: ((data[0] & 1) << 5) | (data[1] >> 3),
            temporal_id_plus1: data[1] & 0x07,
        })
    }
}

/// 按长度前缀切分 NAL 单元
///
/// 与宽松的容错切分不同, 任何长度字段或 NAL 数据超出缓冲区都视为错误.
pub fn split_length_prefixed(data: &[u8], length_size: usize) -> HeifResult<Vec<&[u8]>> {
    check_length_size(length_size)?;

    let mut nalus = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        if pos + length_size > data.len() {
            return Err(HeifError::ParseError(format!(
                "HEVC: NAL 长度字段截断, offset={pos}, remain={}",
                data.len() - pos
            )));
        }
        let len = data[pos..pos + length_size]
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
        pos += length_size;
        if len > data.len() - pos {
            return Err(HeifError::ParseError(format!(
                "HEVC: NAL 数据截断, offset={pos}, len={len}, remain={}",
                data.len() - pos
            )));
        }
        nalus.push(&data[pos..pos + len]);
        pos += len;
    }
    Ok(nalus)
}

/// 追加一个带 `length_size` 字节大端长度前缀的 NAL 单元
pub fn write_length_prefixed(out: &mut Vec<u8>, nal: &[u8], length_size: usize) -> HeifResult<()> {
    check_length_size(length_size)?;
    let max = if length_size == 4 {
        u32::MAX as usize
    } else {
        (1usize << (8 * length_size)) - 1
    };
    if nal.len() > max {
        return Err(HeifError::UnsupportedConfiguration(format!(
            "HEVC: NAL 长度 {} 超出 {} 字节长度前缀的范围",
            nal.len(),
            length_size
        )));
    }
    let len_bytes = (nal.len() as u32).to_be_bytes();
    out.extend_from_slice(&len_bytes[4 - length_size..]);
    out.extend_from_slice(nal);
    Ok(())
}

fn check_length_size(length_size: usize) -> HeifResult<()> {
    if !(1..=4).contains(&length_size) {
        return Err(HeifError::UnsupportedConfiguration(format!(
            "HEVC: NAL 长度前缀必须为 1-4 字节, 实际 {length_size}"
        )));
    }
    Ok(())
}

/// 移除 emulation prevention 字节 (0x000003 中的 0x03)
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if i + 2 < data.len() && data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 3 {
            out.push(0);
            out.push(0);
            i += 3; // 跳过 0x03
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    out
}
