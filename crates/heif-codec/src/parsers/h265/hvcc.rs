//! HEVCDecoderConfigurationRecord (hvcC) 解析与写入.
//!
//! ISO/IEC 14496-15 8.3.3.1 定义的布局:
//! ```text
//! configurationVersion                 8
//! profile_space(2) tier(1) idc(5)      8
//! profile_compatibility_flags          32
//! constraint_indicator_flags           48
//! level_idc                            8
//! reserved(4) min_spatial_seg(12)      16
//! reserved(6) parallelismType(2)       8
//! reserved(6) chromaFormat(2)          8
//! reserved(5) bitDepthLumaMinus8(3)    8
//! reserved(5) bitDepthChromaMinus8(3)  8
//! avgFrameRate                         16
//! constantFrameRate(2) numTemporalLayers(3) temporalIdNested(1) lengthSizeMinusOne(2)
//! numOfArrays                          8
//! [ completeness(1) reserved(1) NAL_unit_type(6)
//!   numNalus(16) [ nalUnitLength(16) nalUnit ] ]
//! ```
//!
//! 写入时数组个数、单元个数与长度均取自当前集合, 保证往返一致.
//! 记录内部的单元长度固定为 16 位, 与 `lengthSizeMinusOne` (采样数据中 NAL 长度字段宽度) 无关.

use std::fmt;

use heif_core::{BitReader, BitWriter, HeifError, HeifResult, ResultExt};
use log::{debug, warn};

use super::nal::{HevcNalHeader, HevcNalUnitType, write_length_prefixed};
use super::sps::{SpsConfiguration, extract_hvcc_configuration};

/// constraint_indicator_flags 的位数
pub const NUM_CONSTRAINT_INDICATOR_FLAGS: usize = 48;

/// hvcC 中唯一支持的 configurationVersion
pub const HVCC_CONFIGURATION_VERSION: u8 = 1;

/// hvcC 配置字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HvccConfiguration {
    /// configurationVersion, 必须为 1
    pub configuration_version: u8,
    /// general_profile_space (2 bit)
    pub general_profile_space: u8,
    /// general_tier_flag
    pub general_tier_flag: bool,
    /// general_profile_idc (5 bit)
    pub general_profile_idc: u8,
    /// general_profile_compatibility_flags
    pub general_profile_compatibility_flags: u32,
    /// general_constraint_indicator_flags, 下标 0 为 48 位字段的最高位
    pub general_constraint_indicator_flags: [bool; NUM_CONSTRAINT_INDICATOR_FLAGS],
    /// general_level_idc
    pub general_level_idc: u8,
    /// min_spatial_segmentation_idc (12 bit)
    pub min_spatial_segmentation_idc: u16,
    /// parallelismType (2 bit)
    pub parallelism_type: u8,
    /// chromaFormat (2 bit), 0=单色 1=4:2:0 2=4:2:2 3=4:4:4
    pub chroma_format: u8,
    /// bitDepthLumaMinus8 (3 bit)
    pub bit_depth_luma_minus8: u8,
    /// bitDepthChromaMinus8 (3 bit)
    pub bit_depth_chroma_minus8: u8,
    /// avgFrameRate (单位: 帧/256 秒)
    pub avg_frame_rate: u16,
    /// constantFrameRate (2 bit)
    pub constant_frame_rate: u8,
    /// numTemporalLayers (3 bit)
    pub num_temporal_layers: u8,
    /// temporalIdNested
    pub temporal_id_nested: bool,
}

impl Default for HvccConfiguration {
    fn default() -> Self {
        Self {
            configuration_version: HVCC_CONFIGURATION_VERSION,
            general_profile_space: 0,
            general_tier_flag: false,
            general_profile_idc: 0,
            general_profile_compatibility_flags: 0,
            general_constraint_indicator_flags: [false; NUM_CONSTRAINT_INDICATOR_FLAGS],
            general_level_idc: 0,
            min_spatial_segmentation_idc: 0,
            parallelism_type: 0,
            chroma_format: 1,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            avg_frame_rate: 0,
            constant_frame_rate: 0,
            num_temporal_layers: 1,
            temporal_id_nested: false,
        }
    }
}

impl HvccConfiguration {
    /// 亮度位深
    pub fn bit_depth_luma(&self) -> u8 {
        self.bit_depth_luma_minus8.saturating_add(8)
    }

    /// 色度位深
    pub fn bit_depth_chroma(&self) -> u8 {
        self.bit_depth_chroma_minus8.saturating_add(8)
    }

    /// 以 48 位整数形式获取 constraint_indicator_flags
    pub fn constraint_indicator_flags_bits(&self) -> u64 {
        self.general_constraint_indicator_flags
            .iter()
            .fold(0u64, |acc, f| (acc << 1) | u64::from(*f))
    }

    /// 从 48 位整数设置 constraint_indicator_flags (高 16 位被忽略)
    pub fn set_constraint_indicator_flags_bits(&mut self, bits: u64) {
        for (i, flag) in self.general_constraint_indicator_flags.iter_mut().enumerate() {
            *flag = (bits >> (NUM_CONSTRAINT_INDICATOR_FLAGS - 1 - i)) & 1 != 0;
        }
    }

    /// 检查每个字段都能放进各自的位宽
    fn validate(&self) -> HeifResult<()> {
        if self.configuration_version != HVCC_CONFIGURATION_VERSION {
            return Err(HeifError::UnsupportedConfiguration(format!(
                "hvcC 版本 {}, 仅支持 {}",
                self.configuration_version, HVCC_CONFIGURATION_VERSION
            )));
        }
        check_field_width("general_profile_space", self.general_profile_space.into(), 2)?;
        check_field_width("general_profile_idc", self.general_profile_idc.into(), 5)?;
        check_field_width(
            "min_spatial_segmentation_idc",
            self.min_spatial_segmentation_idc.into(),
            12,
        )?;
        check_field_width("parallelism_type", self.parallelism_type.into(), 2)?;
        check_field_width("chroma_format", self.chroma_format.into(), 2)?;
        check_field_width("bit_depth_luma_minus8", self.bit_depth_luma_minus8.into(), 3)?;
        check_field_width(
            "bit_depth_chroma_minus8",
            self.bit_depth_chroma_minus8.into(),
            3,
        )?;
        check_field_width("constant_frame_rate", self.constant_frame_rate.into(), 2)?;
        check_field_width("num_temporal_layers", self.num_temporal_layers.into(), 3)?;
        Ok(())
    }
}

fn check_field_width(name: &str, value: u32, bits: u32) -> HeifResult<()> {
    if value >> bits != 0 {
        return Err(HeifError::UnsupportedConfiguration(format!(
            "hvcC 字段 {name}={value} 超出 {bits} 位"
        )));
    }
    Ok(())
}

/// 同类 NAL 单元数组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NalArray {
    /// array_completeness: 该类型的所有 NAL 单元是否都在此数组中
    pub array_completeness: bool,
    /// NAL_unit_type (6 bit)
    pub nal_unit_type: HevcNalUnitType,
    /// 原始 NAL 单元 (含 2 字节 NAL 头)
    pub nal_units: Vec<Vec<u8>>,
}

/// hvcC box 内容: 配置字段 + 参数集数组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HvccBox {
    configuration: HvccConfiguration,
    /// 采样数据中 NAL 长度字段的字节数 (lengthSizeMinusOne + 1)
    nal_length_size: u8,
    nal_arrays: Vec<NalArray>,
}

impl Default for HvccBox {
    fn default() -> Self {
        Self::new()
    }
}

impl HvccBox {
    /// 创建空的 hvcC (默认 4 字节 NAL 长度)
    pub fn new() -> Self {
        Self {
            configuration: HvccConfiguration::default(),
            nal_length_size: 4,
            nal_arrays: Vec::new(),
        }
    }

    /// 以给定配置创建
    pub fn with_configuration(configuration: HvccConfiguration) -> Self {
        Self {
            configuration,
            ..Self::new()
        }
    }

    /// 解析 hvcC box 负载 (不含 box 头部)
    ///
    /// 版本号不为 1 时返回 `UnsupportedConfiguration`, 数据截断时返回 `ParseError`.
    pub fn parse(data: &[u8]) -> HeifResult<Self> {
        let mut br = BitReader::new(data);
        let hvcc = Self::parse_from(&mut br).stage("hvcC")?;
        if !br.is_eof() {
            warn!("hvcC: 记录末尾有 {} 字节多余数据, 已忽略", br.bytes_left());
        }
        debug!(
            "hvcC: profile={} level={} chroma={} 位深={}/{} 数组={}",
            hvcc.configuration.general_profile_idc,
            hvcc.configuration.general_level_idc,
            hvcc.configuration.chroma_format,
            hvcc.configuration.bit_depth_luma(),
            hvcc.configuration.bit_depth_chroma(),
            hvcc.nal_arrays.len()
        );
        Ok(hvcc)
    }

    fn parse_from(br: &mut BitReader) -> HeifResult<Self> {
        let configuration_version = br.read_u8()?;
        if configuration_version != HVCC_CONFIGURATION_VERSION {
            return Err(HeifError::UnsupportedConfiguration(format!(
                "hvcC 版本 {configuration_version}, 仅支持 {HVCC_CONFIGURATION_VERSION}"
            )));
        }

        let general_profile_space = br.read_bits(2)? as u8;
        let general_tier_flag = br.read_flag()?;
        let general_profile_idc = br.read_bits(5)? as u8;
        let general_profile_compatibility_flags = br.read_u32()?;
        let constraint_bits = br.read_bits_u64(NUM_CONSTRAINT_INDICATOR_FLAGS as u32)?;
        let general_level_idc = br.read_u8()?;

        br.skip_bits(4)?; // reserved '1111'
        let min_spatial_segmentation_idc = br.read_bits(12)? as u16;
        br.skip_bits(6)?;
        let parallelism_type = br.read_bits(2)? as u8;
        br.skip_bits(6)?;
        let chroma_format = br.read_bits(2)? as u8;
        br.skip_bits(5)?;
        let bit_depth_luma_minus8 = br.read_bits(3)? as u8;
        br.skip_bits(5)?;
        let bit_depth_chroma_minus8 = br.read_bits(3)? as u8;
        let avg_frame_rate = br.read_u16()?;

        let constant_frame_rate = br.read_bits(2)? as u8;
        let num_temporal_layers = br.read_bits(3)? as u8;
        let temporal_id_nested = br.read_flag()?;
        let nal_length_size = br.read_bits(2)? as u8 + 1;

        let mut configuration = HvccConfiguration {
            configuration_version,
            general_profile_space,
            general_tier_flag,
            general_profile_idc,
            general_profile_compatibility_flags,
            general_constraint_indicator_flags: [false; NUM_CONSTRAINT_INDICATOR_FLAGS],
            general_level_idc,
            min_spatial_segmentation_idc,
            parallelism_type,
            chroma_format,
            bit_depth_luma_minus8,
            bit_depth_chroma_minus8,
            avg_frame_rate,
            constant_frame_rate,
            num_temporal_layers,
            temporal_id_nested,
        };
        configuration.set_constraint_indicator_flags_bits(constraint_bits);

        let num_arrays = br.read_u8()?;
        let mut nal_arrays = Vec::with_capacity(num_arrays as usize);
        for _ in 0..num_arrays {
            let array_completeness = br.read_flag()?;
            br.skip_bits(1)?; // reserved
            let nal_unit_type = HevcNalUnitType::from_type_id(br.read_bits(6)? as u8);
            let num_nalus = br.read_u16()? as usize;

            // 每个单元至少占 2 字节长度字段, 不按声明的个数盲目预分配
            let mut nal_units = Vec::with_capacity(num_nalus.min(br.bytes_left() / 2));
            for _ in 0..num_nalus {
                let len = br.read_u16()? as usize;
                nal_units.push(br.read_bytes(len)?.to_vec());
            }

            nal_arrays.push(NalArray {
                array_completeness,
                nal_unit_type,
                nal_units,
            });
        }

        Ok(Self {
            configuration,
            nal_length_size,
            nal_arrays,
        })
    }

    /// 检查数组和单元都能按 hvcC 的字段宽度写出
    fn check_arrays(&self) -> HeifResult<()> {
        if self.nal_arrays.len() > u8::MAX as usize {
            return Err(HeifError::UnsupportedConfiguration(format!(
                "hvcC: NAL 数组个数 {} 超过 255",
                self.nal_arrays.len()
            )));
        }
        for array in &self.nal_arrays {
            let type_id = array.nal_unit_type.type_id();
            if type_id > 0x3F {
                return Err(HeifError::UnsupportedConfiguration(format!(
                    "hvcC: NAL 类型 {type_id} 超出 6 位"
                )));
            }
            if array.nal_units.len() > u16::MAX as usize {
                return Err(HeifError::UnsupportedConfiguration(format!(
                    "hvcC: 类型 {type_id} 的 NAL 单元个数 {} 超过 65535",
                    array.nal_units.len()
                )));
            }
            if let Some(unit) = array.nal_units.iter().find(|u| u.len() > u16::MAX as usize) {
                return Err(HeifError::UnsupportedConfiguration(format!(
                    "hvcC: NAL 单元长度 {} 超过 65535",
                    unit.len()
                )));
            }
        }
        Ok(())
    }

    /// 写入 hvcC box 负载 (不含 box 头部)
    ///
    /// 先检查全部字段, 失败时不向 `bw` 写入任何内容.
    pub fn write(&self, bw: &mut BitWriter) -> HeifResult<()> {
        let c = &self.configuration;
        c.validate()?;
        self.check_arrays()?;

        bw.write_u8(c.configuration_version);
        bw.write_bits(c.general_profile_space.into(), 2);
        bw.write_flag(c.general_tier_flag);
        bw.write_bits(c.general_profile_idc.into(), 5);
        bw.write_u32(c.general_profile_compatibility_flags);
        bw.write_bits_u64(
            c.constraint_indicator_flags_bits(),
            NUM_CONSTRAINT_INDICATOR_FLAGS as u32,
        );
        bw.write_u8(c.general_level_idc);

        // reserved 位全部写 1
        bw.write_bits(0xF, 4);
        bw.write_bits(c.min_spatial_segmentation_idc.into(), 12);
        bw.write_bits(0x3F, 6);
        bw.write_bits(c.parallelism_type.into(), 2);
        bw.write_bits(0x3F, 6);
        bw.write_bits(c.chroma_format.into(), 2);
        bw.write_bits(0x1F, 5);
        bw.write_bits(c.bit_depth_luma_minus8.into(), 3);
        bw.write_bits(0x1F, 5);
        bw.write_bits(c.bit_depth_chroma_minus8.into(), 3);
        bw.write_u16(c.avg_frame_rate);

        bw.write_bits(c.constant_frame_rate.into(), 2);
        bw.write_bits(c.num_temporal_layers.into(), 3);
        bw.write_flag(c.temporal_id_nested);
        bw.write_bits(u32::from(self.nal_length_size - 1), 2);

        bw.write_u8(self.nal_arrays.len() as u8);
        for array in &self.nal_arrays {
            bw.write_flag(array.array_completeness);
            bw.write_bit(0);
            bw.write_bits(array.nal_unit_type.type_id().into(), 6);
            bw.write_u16(array.nal_units.len() as u16);
            for unit in &array.nal_units {
                bw.write_u16(unit.len() as u16);
                bw.write_bytes(unit);
            }
        }
        Ok(())
    }

    /// 序列化为 hvcC box 负载
    pub fn to_bytes(&self) -> HeifResult<Vec<u8>> {
        let payload_len: usize = self
            .nal_units()
            .map(|unit| unit.len() + 2)
            .sum::<usize>()
            + 23
            + 3 * self.nal_arrays.len();
        let mut bw = BitWriter::with_capacity(payload_len);
        self.write(&mut bw)?;
        Ok(bw.finish())
    }

    /// 拼接所有参数集单元, 每个单元带 `nal_length_size` 字节的大端长度前缀
    ///
    /// 输出可直接用于初始化外部解码器. 没有任何 NAL 单元时返回 `MissingConfiguration`.
    pub fn headers(&self) -> HeifResult<Vec<u8>> {
        self.headers_with_length_size(self.nal_length_size)
    }

    /// 同 [`headers`](Self::headers), 但指定长度前缀字节数 (1-4)
    pub fn headers_with_length_size(&self, length_size: u8) -> HeifResult<Vec<u8>> {
        if self.nal_units().next().is_none() {
            return Err(HeifError::MissingConfiguration(
                "hvcC 中没有参数集 NAL 单元".into(),
            ));
        }
        let mut out = Vec::new();
        for unit in self.nal_units() {
            write_length_prefixed(&mut out, unit, length_size as usize)?;
        }
        Ok(out)
    }

    /// 按数组顺序追加一个 NAL 单元
    ///
    /// 追加到第一个同类型数组末尾; 不存在时在末尾新建数组 (array_completeness=false).
    /// `Unknown` 中的已知编号按对应类型归档.
    pub fn append_nal_unit(&mut self, nal_unit_type: HevcNalUnitType, nal: &[u8]) {
        let nal_unit_type = nal_unit_type.normalized();
        match self
            .nal_arrays
            .iter_mut()
            .find(|array| array.nal_unit_type == nal_unit_type)
        {
            Some(array) => array.nal_units.push(nal.to_vec()),
            None => self.nal_arrays.push(NalArray {
                array_completeness: false,
                nal_unit_type,
                nal_units: vec![nal.to_vec()],
            }),
        }
    }

    /// 追加一个 NAL 单元, 类型取自其 2 字节 NAL 头
    pub fn append_nal(&mut self, nal: &[u8]) -> HeifResult<()> {
        let header = HevcNalHeader::parse(nal)?;
        self.append_nal_unit(header.nal_type, nal);
        Ok(())
    }

    /// 设置某类型数组的 array_completeness, 返回是否找到该数组
    pub fn set_array_completeness(&mut self, nal_unit_type: HevcNalUnitType, complete: bool) -> bool {
        let nal_unit_type = nal_unit_type.normalized();
        let mut found = false;
        for array in self
            .nal_arrays
            .iter_mut()
            .filter(|array| array.nal_unit_type == nal_unit_type)
        {
            array.array_completeness = complete;
            found = true;
        }
        found
    }

    /// 配置字段
    pub fn configuration(&self) -> &HvccConfiguration {
        &self.configuration
    }

    /// 替换配置字段
    pub fn set_configuration(&mut self, configuration: HvccConfiguration) {
        self.configuration = configuration;
    }

    /// 采样数据中 NAL 长度字段的字节数
    pub fn nal_length_size(&self) -> u8 {
        self.nal_length_size
    }

    /// 设置采样数据中 NAL 长度字段的字节数 (1-4)
    pub fn set_nal_length_size(&mut self, nal_length_size: u8) -> HeifResult<()> {
        if !(1..=4).contains(&nal_length_size) {
            return Err(HeifError::UnsupportedConfiguration(format!(
                "hvcC: lengthSizeMinusOne 只能表达 1-4 字节, 实际 {nal_length_size}"
            )));
        }
        self.nal_length_size = nal_length_size;
        Ok(())
    }

    /// 所有 NAL 数组
    pub fn nal_arrays(&self) -> &[NalArray] {
        &self.nal_arrays
    }

    /// 按数组-单元顺序遍历所有 NAL 单元
    pub fn nal_units(&self) -> impl Iterator<Item = &[u8]> {
        self.nal_arrays
            .iter()
            .flat_map(|array| array.nal_units.iter().map(Vec::as_slice))
    }

    /// 从记录内的第一个 SPS 重新提取参数, 用于与配置字段交叉校验
    ///
    /// 没有 SPS 时返回 `Ok(None)`.
    pub fn sps_configuration(&self) -> HeifResult<Option<SpsConfiguration>> {
        let sps = self
            .nal_arrays
            .iter()
            .filter(|array| array.nal_unit_type == HevcNalUnitType::Sps)
            .flat_map(|array| array.nal_units.iter())
            .next();
        sps.map(|nal| extract_hvcc_configuration(nal)).transpose()
    }
}

impl fmt::Display for HvccBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.configuration;
        writeln!(f, "configuration_version: {}", c.configuration_version)?;
        writeln!(f, "general_profile_space: {}", c.general_profile_space)?;
        writeln!(f, "general_tier_flag: {}", u8::from(c.general_tier_flag))?;
        writeln!(f, "general_profile_idc: {}", c.general_profile_idc)?;
        write!(f, "general_profile_compatibility_flags:")?;
        for i in 0..32 {
            write!(f, " {}", (c.general_profile_compatibility_flags >> (31 - i)) & 1)?;
        }
        writeln!(f)?;
        write!(f, "general_constraint_indicator_flags:")?;
        for flag in c.general_constraint_indicator_flags {
            write!(f, " {}", u8::from(flag))?;
        }
        writeln!(f)?;
        writeln!(f, "general_level_idc: {}", c.general_level_idc)?;
        writeln!(
            f,
            "min_spatial_segmentation_idc: {}",
            c.min_spatial_segmentation_idc
        )?;
        writeln!(f, "parallelism_type: {}", c.parallelism_type)?;
        let chroma = match c.chroma_format {
            0 => "monochrome",
            1 => "4:2:0",
            2 => "4:2:2",
            _ => "4:4:4",
        };
        writeln!(f, "chroma_format: {chroma}")?;
        writeln!(f, "bit_depth_luma: {}", c.bit_depth_luma())?;
        writeln!(f, "bit_depth_chroma: {}", c.bit_depth_chroma())?;
        writeln!(f, "avg_frame_rate: {}", c.avg_frame_rate)?;
        writeln!(f, "constant_frame_rate: {}", c.constant_frame_rate)?;
        writeln!(f, "num_temporal_layers: {}", c.num_temporal_layers)?;
        writeln!(f, "temporal_id_nested: {}", u8::from(c.temporal_id_nested))?;
        writeln!(f, "length_size: {}", self.nal_length_size)?;

        for array in &self.nal_arrays {
            writeln!(f, "<array>")?;
            writeln!(
                f,
                "| array_completeness: {}",
                u8::from(array.array_completeness)
            )?;
            writeln!(f, "| NAL_unit_type: {}", array.nal_unit_type.type_id())?;
            for unit in &array.nal_units {
                write!(f, "| |")?;
                for b in unit {
                    write!(f, " {b:02x}")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VPS: [u8; 4] = [0x40, 0x01, 0x0C, 0x01];
    const SPS: [u8; 5] = [0x42, 0x01, 0x01, 0x01, 0x60];
    const PPS: [u8; 3] = [0x44, 0x01, 0xC1];

    fn build_box() -> HvccBox {
        let mut config = HvccConfiguration {
            general_profile_idc: 1,
            general_profile_compatibility_flags: 0x6000_0000,
            general_level_idc: 93,
            temporal_id_nested: true,
            ..HvccConfiguration::default()
        };
        config.set_constraint_indicator_flags_bits(0x9000_0000_0000);
        let mut hvcc = HvccBox::with_configuration(config);
        hvcc.append_nal(&VPS).unwrap();
        hvcc.append_nal(&SPS).unwrap();
        hvcc.append_nal(&PPS).unwrap();
        hvcc
    }

    #[test]
    fn test_hvcc_写入布局() {
        let bytes = build_box().to_bytes().unwrap();
        assert_eq!(
            &bytes[..23],
            &[
                0x01, 0x01, 0x60, 0x00, 0x00, 0x00, 0x90, 0x00, 0x00, 0x00, 0x00, 0x00, 93, 0xF0,
                0x00, 0xFC, 0xFD, 0xF8, 0xF8, 0x00, 0x00, 0x0F, 0x03,
            ]
        );
        // VPS 数组: completeness=0, type=32, 1 个单元, 长度 4
        assert_eq!(&bytes[23..30], &[0x20, 0x00, 0x01, 0x00, 0x04, 0x40, 0x01]);
        assert_eq!(bytes.len(), 23 + 3 * 3 + (2 + 4) + (2 + 5) + (2 + 3));
    }

    #[test]
    fn test_hvcc_构建与解析() {
        let hvcc = build_box();
        let parsed = HvccBox::parse(&hvcc.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, hvcc);
        assert_eq!(parsed.nal_arrays().len(), 3);
        assert_eq!(parsed.nal_arrays()[1].nal_unit_type, HevcNalUnitType::Sps);
        assert_eq!(parsed.nal_arrays()[1].nal_units[0], SPS.to_vec());
        assert!(parsed.configuration().general_constraint_indicator_flags[0]);
        assert!(!parsed.configuration().general_constraint_indicator_flags[1]);
        assert!(parsed.configuration().general_constraint_indicator_flags[3]);
    }

    #[test]
    fn test_hvcc_版本错误() {
        let mut bytes = build_box().to_bytes().unwrap();
        bytes[0] = 2;
        assert!(matches!(
            HvccBox::parse(&bytes),
            Err(HeifError::UnsupportedConfiguration(_))
        ));
        assert!(matches!(
            HvccBox::parse(&[0]),
            Err(HeifError::UnsupportedConfiguration(_))
        ));
        assert!(matches!(HvccBox::parse(&[]), Err(HeifError::ParseError(_))));
    }

    #[test]
    fn test_hvcc_截断() {
        let bytes = build_box().to_bytes().unwrap();
        for len in 1..bytes.len() {
            assert!(
                matches!(HvccBox::parse(&bytes[..len]), Err(HeifError::ParseError(_))),
                "截断到 {len} 字节应返回解析错误"
            );
        }
    }

    #[test]
    fn test_同类型单元追加到已有数组() {
        let mut hvcc = build_box();
        let pps2 = [0x44, 0x01, 0xC2];
        hvcc.append_nal_unit(HevcNalUnitType::Pps, &pps2);
        assert_eq!(hvcc.nal_arrays().len(), 3);
        assert_eq!(hvcc.nal_arrays()[2].nal_units.len(), 2);

        assert!(hvcc.set_array_completeness(HevcNalUnitType::Pps, true));
        assert!(!hvcc.set_array_completeness(HevcNalUnitType::PrefixSei, true));
        let parsed = HvccBox::parse(&hvcc.to_bytes().unwrap()).unwrap();
        assert!(parsed.nal_arrays()[2].array_completeness);
        assert_eq!(parsed, hvcc);
    }

    #[test]
    fn test_headers() {
        let hvcc = build_box();
        let headers = hvcc.headers().unwrap();
        assert_eq!(headers.len(), (4 + 4) + (4 + 5) + (4 + 3));
        assert_eq!(&headers[..8], &[0, 0, 0, 4, 0x40, 0x01, 0x0C, 0x01]);

        let headers2 = hvcc.headers_with_length_size(2).unwrap();
        assert_eq!(headers2.len(), (2 + 4) + (2 + 5) + (2 + 3));
        assert!(hvcc.headers_with_length_size(0).is_err());

        assert!(matches!(
            HvccBox::new().headers(),
            Err(HeifError::MissingConfiguration(_))
        ));
    }

    #[test]
    fn test_length_size_独立于内部长度() {
        let mut hvcc = build_box();
        hvcc.set_nal_length_size(2).unwrap();
        assert!(hvcc.set_nal_length_size(5).is_err());
        let bytes = hvcc.to_bytes().unwrap();
        assert_eq!(bytes[21] & 0x03, 1);
        // 内部单元长度仍为 16 位
        assert_eq!(&bytes[26..28], &[0x00, 0x04]);
        assert_eq!(HvccBox::parse(&bytes).unwrap().nal_length_size(), 2);
    }

    #[test]
    fn test_字段超出位宽() {
        let mut hvcc = build_box();
        let mut config = hvcc.configuration().clone();
        config.chroma_format = 4;
        hvcc.set_configuration(config);
        assert!(matches!(
            hvcc.to_bytes(),
            Err(HeifError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn test_未知类型按编号归档() {
        let mut hvcc = build_box();
        hvcc.append_nal_unit(HevcNalUnitType::Unknown(33), &[0x42, 0x01, 0x02]);
        hvcc.append_nal_unit(HevcNalUnitType::Unknown(48), &[0x60, 0x01]);
        assert_eq!(hvcc.nal_arrays().len(), 4);
        assert_eq!(hvcc.nal_arrays()[1].nal_units.len(), 2);
        assert_eq!(hvcc.nal_arrays()[3].nal_unit_type, HevcNalUnitType::Unknown(48));
        assert!(hvcc.set_array_completeness(HevcNalUnitType::Unknown(34), true));

        let parsed = HvccBox::parse(&hvcc.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, hvcc);
        assert_eq!(parsed.to_bytes().unwrap(), hvcc.to_bytes().unwrap());
    }

    #[test]
    fn test_类型编号超出_6_位() {
        let mut hvcc = build_box();
        hvcc.append_nal_unit(HevcNalUnitType::Unknown(200), &[0x00, 0x01]);
        assert!(matches!(
            hvcc.to_bytes(),
            Err(HeifError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn test_写入失败不留下部分数据() {
        let mut too_long = build_box();
        too_long.append_nal_unit(HevcNalUnitType::Sps, &vec![0u8; 70000]);
        let mut bad_type = build_box();
        bad_type.append_nal_unit(HevcNalUnitType::Unknown(64), &[0x00, 0x01]);

        for hvcc in [too_long, bad_type] {
            let mut bw = BitWriter::new();
            bw.write_u32(0xDEAD_BEEF);
            assert!(matches!(
                hvcc.write(&mut bw),
                Err(HeifError::UnsupportedConfiguration(_))
            ));
            assert_eq!(bw.finish(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
        }
    }

    #[test]
    fn test_dump() {
        let dump = build_box().to_string();
        assert!(dump.contains("general_level_idc: 93"));
        assert!(dump.contains("chroma_format: 4:2:0"));
        assert!(dump.contains("| NAL_unit_type: 33"));
        assert!(dump.contains("| | 44 01 c1"));
    }
}
