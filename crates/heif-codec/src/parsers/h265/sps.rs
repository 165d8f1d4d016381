//! H.265/HEVC SPS 参数提取.
//!
//! 只解析到位深为止: profile_tier_level, 色度格式, 编码尺寸,
//! conformance window 和位深, 这些足以重建 hvcC 配置字段和显示分辨率.

use heif_core::{BitReader, HeifError, HeifResult, ResultExt};
use log::debug;

use super::hvcc::{HVCC_CONFIGURATION_VERSION, HvccConfiguration, NUM_CONSTRAINT_INDICATOR_FLAGS};
use super::nal::{HevcNalHeader, HevcNalUnitType, remove_emulation_prevention};

/// general_profile_tier_level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HevcProfileTierLevel {
    /// general_profile_space
    pub profile_space: u8,
    /// general_tier_flag
    pub tier_flag: bool,
    /// general_profile_idc
    pub profile_idc: u8,
    /// general_profile_compatibility_flag[32]
    pub compatibility_flags: u32,
    /// progressive/interlaced/non_packed/frame_only + 44 位约束标志, 共 48 位
    pub constraint_indicator_flags: u64,
    /// general_level_idc
    pub level_idc: u8,
}

/// SPS 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HevcSps {
    /// SPS 所引用的 VPS ID
    pub vps_id: u8,
    /// 最大子层数
    pub max_sub_layers: u8,
    /// sps_temporal_id_nesting_flag
    pub temporal_id_nesting: bool,
    /// general profile/tier/level
    pub profile_tier_level: HevcProfileTierLevel,
    /// SPS ID
    pub sps_id: u32,
    /// 色度格式 (0=单色, 1=4:2:0, 2=4:2:2, 3=4:4:4)
    pub chroma_format_idc: u8,
    /// separate_colour_plane_flag
    pub separate_colour_plane: bool,
    /// 编码宽度 (未裁剪)
    pub pic_width: u32,
    /// 编码高度 (未裁剪)
    pub pic_height: u32,
    /// conformance window 裁剪 (单位: 色度采样)
    pub conf_win_left: u32,
    pub conf_win_right: u32,
    pub conf_win_top: u32,
    pub conf_win_bottom: u32,
    /// 亮度位深
    pub bit_depth_luma: u8,
    /// 色度位深
    pub bit_depth_chroma: u8,
    /// 显示宽度 (已应用 conformance window)
    pub width: u32,
    /// 显示高度 (已应用 conformance window)
    pub height: u32,
}

/// 从 SPS 重建的 hvcC 配置及显示分辨率
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpsConfiguration {
    /// hvcC 配置字段
    pub configuration: HvccConfiguration,
    /// 显示宽度
    pub width: u32,
    /// 显示高度
    pub height: u32,
}

/// 解析 profile_tier_level(1, max_sub_layers_minus1)
fn parse_profile_tier_level(
    br: &mut BitReader,
    max_sub_layers: u8,
) -> HeifResult<HevcProfileTierLevel> {
    let profile_space = br.read_bits(2)? as u8;
    let tier_flag = br.read_flag()?;
    let profile_idc = br.read_bits(5)? as u8;
    let compatibility_flags = br.read_u32()?;
    let constraint_indicator_flags =
        br.read_bits_u64(NUM_CONSTRAINT_INDICATOR_FLAGS as u32)?;
    let level_idc = br.read_u8()?;

    if max_sub_layers > 1 {
        let mut sub_layer_present = Vec::with_capacity(max_sub_layers as usize - 1);
        for _ in 0..max_sub_layers - 1 {
            let profile_present = br.read_flag()?;
            let level_present = br.read_flag()?;
            sub_layer_present.push((profile_present, level_present));
        }
        // reserved_zero_2bits, 补齐到 8 项
        for _ in max_sub_layers - 1..8 {
            br.skip_bits(2)?;
        }
        for (profile_present, level_present) in sub_layer_present {
            if profile_present {
                // space(2) tier(1) idc(5) compat(32) 约束(48)
                br.skip_bits(88)?;
            }
            if level_present {
                br.skip_bits(8)?;
            }
        }
    }

    Ok(HevcProfileTierLevel {
        profile_space,
        tier_flag,
        profile_idc,
        compatibility_flags,
        constraint_indicator_flags,
        level_idc,
    })
}

/// 解析 HEVC SPS
///
/// `rbsp` 为去掉 2 字节 NAL 头后的 SPS 数据, 可以包含 emulation prevention 字节.
pub fn parse_hevc_sps(rbsp: &[u8]) -> HeifResult<HevcSps> {
    if rbsp.len() < 3 {
        return Err(HeifError::ParseError(format!(
            "HEVC: SPS RBSP 太短, len={}",
            rbsp.len()
        )));
    }

    let clean = remove_emulation_prevention(rbsp);
    let mut br = BitReader::new(&clean);

    let vps_id = br.read_bits(4)? as u8;
    let max_sub_layers = br.read_bits(3)? as u8 + 1;
    let temporal_id_nesting = br.read_flag()?;
    if max_sub_layers > 7 {
        return Err(HeifError::ParseError(format!(
            "HEVC: sps_max_sub_layers_minus1={} 超出范围",
            max_sub_layers - 1
        )));
    }

    let profile_tier_level = parse_profile_tier_level(&mut br, max_sub_layers)?;

    let sps_id = br.read_ue()?;
    let chroma_format_idc = br.read_ue()?;
    if chroma_format_idc > 3 {
        return Err(HeifError::ParseError(format!(
            "HEVC: chroma_format_idc={chroma_format_idc} 超出范围"
        )));
    }
    let chroma_format_idc = chroma_format_idc as u8;
    let separate_colour_plane = if chroma_format_idc == 3 {
        br.read_flag()?
    } else {
        false
    };

    let pic_width = br.read_ue()?;
    let pic_height = br.read_ue()?;
    if pic_width == 0 || pic_height == 0 {
        return Err(HeifError::ParseError(format!(
            "HEVC: SPS 尺寸无效 {pic_width}x{pic_height}"
        )));
    }

    let conformance_window = br.read_flag()?;
    let (conf_win_left, conf_win_right, conf_win_top, conf_win_bottom) = if conformance_window {
        (br.read_ue()?, br.read_ue()?, br.read_ue()?, br.read_ue()?)
    } else {
        (0, 0, 0, 0)
    };

    let bit_depth_luma = read_bit_depth(&mut br)?;
    let bit_depth_chroma = read_bit_depth(&mut br)?;

    // SubWidthC / SubHeightC
    let (sub_width_c, sub_height_c) = match chroma_format_idc {
        1 => (2u32, 2u32),
        2 => (2, 1),
        _ => (1, 1),
    };
    let width = crop(pic_width, sub_width_c, conf_win_left, conf_win_right)
        .ok_or_else(|| {
            HeifError::ParseError(format!(
                "HEVC: conformance window 水平裁剪 {}+{} 超出宽度 {pic_width}",
                conf_win_left, conf_win_right
            ))
        })?;
    let height = crop(pic_height, sub_height_c, conf_win_top, conf_win_bottom)
        .ok_or_else(|| {
            HeifError::ParseError(format!(
                "HEVC: conformance window 垂直裁剪 {}+{} 超出高度 {pic_height}",
                conf_win_top, conf_win_bottom
            ))
        })?;

    Ok(HevcSps {
        vps_id,
        max_sub_layers,
        temporal_id_nesting,
        profile_tier_level,
        sps_id,
        chroma_format_idc,
        separate_colour_plane,
        pic_width,
        pic_height,
        conf_win_left,
        conf_win_right,
        conf_win_top,
        conf_win_bottom,
        bit_depth_luma,
        bit_depth_chroma,
        width,
        height,
    })
}

/// bit_depth_*_minus8, 取值 0..=8
fn read_bit_depth(br: &mut BitReader) -> HeifResult<u8> {
    let minus8 = br.read_ue()?;
    if minus8 > 8 {
        return Err(HeifError::ParseError(format!(
            "HEVC: bit_depth_minus8={minus8} 超出范围"
        )));
    }
    Ok(minus8 as u8 + 8)
}

/// 裁剪后的尺寸, 裁剪量不小于编码尺寸时返回 None
fn crop(size: u32, unit: u32, a: u32, b: u32) -> Option<u32> {
    let total = a.checked_add(b)?.checked_mul(unit)?;
    size.checked_sub(total).filter(|s| *s > 0)
}

/// 从 SPS NAL 单元 (含 2 字节 NAL 头) 提取 hvcC 配置字段和显示分辨率
///
/// SPS 不携带的字段取固定值: min_spatial_segmentation_idc, parallelism_type,
/// avg_frame_rate, constant_frame_rate 为 0, num_temporal_layers 为 1.
pub fn extract_hvcc_configuration(sps_nal: &[u8]) -> HeifResult<SpsConfiguration> {
    let header = HevcNalHeader::parse(sps_nal)?;
    if header.nal_type != HevcNalUnitType::Sps {
        return Err(HeifError::ParseError(format!(
            "HEVC: 期望 SPS NAL (33), 实际类型 {}",
            header.nal_type.type_id()
        )));
    }

    let sps = parse_hevc_sps(&sps_nal[HevcNalHeader::SIZE..]).stage("SPS")?;
    if sps.bit_depth_luma > 15 || sps.bit_depth_chroma > 15 {
        return Err(HeifError::UnsupportedConfiguration(format!(
            "HEVC: hvcC 无法表达位深 {}/{}",
            sps.bit_depth_luma, sps.bit_depth_chroma
        )));
    }

    let ptl = &sps.profile_tier_level;
    let mut configuration = HvccConfiguration {
        configuration_version: HVCC_CONFIGURATION_VERSION,
        general_profile_space: ptl.profile_space,
        general_tier_flag: ptl.tier_flag,
        general_profile_idc: ptl.profile_idc,
        general_profile_compatibility_flags: ptl.compatibility_flags,
        general_level_idc: ptl.level_idc,
        min_spatial_segmentation_idc: 0,
        parallelism_type: 0,
        chroma_format: sps.chroma_format_idc,
        bit_depth_luma_minus8: sps.bit_depth_luma - 8,
        bit_depth_chroma_minus8: sps.bit_depth_chroma - 8,
        avg_frame_rate: 0,
        constant_frame_rate: 0,
        num_temporal_layers: 1,
        temporal_id_nested: sps.temporal_id_nesting,
        ..HvccConfiguration::default()
    };
    configuration.set_constraint_indicator_flags_bits(ptl.constraint_indicator_flags);

    debug!(
        "HEVC SPS: profile={} tier={} level={} chroma={} 位深={}/{} 尺寸={}x{} (编码 {}x{})",
        ptl.profile_idc,
        u8::from(ptl.tier_flag),
        ptl.level_idc,
        sps.chroma_format_idc,
        sps.bit_depth_luma,
        sps.bit_depth_chroma,
        sps.width,
        sps.height,
        sps.pic_width,
        sps.pic_height
    );

    Ok(SpsConfiguration {
        configuration,
        width: sps.width,
        height: sps.height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use heif_core::BitWriter;

    /// 640x480, 4:2:0, 8 位, Main profile, level 2
    const SPS_640X480: [u8; 29] = [
        0x42, 0x01, 0x01, 0x01, 0x60, 0x00, 0x00, 0x03, 0x00, 0x90, 0x00, 0x00, 0x03, 0x00, 0x00,
        0x03, 0x00, 0x3C, 0xA0, 0x05, 0x02, 0x01, 0xE1, 0x65, 0x95, 0xE4, 0x91, 0x22, 0xB2,
    ];

    /// 1920x1088 编码, conf_win_bottom=4 => 1920x1080
    const SPS_1080P_CROP: [u8; 31] = [
        0x42, 0x01, 0x01, 0x01, 0x60, 0x00, 0x00, 0x03, 0x00, 0x90, 0x00, 0x00, 0x03, 0x00, 0x00,
        0x03, 0x00, 0x3C, 0xA0, 0x03, 0xC0, 0x80, 0x11, 0x07, 0xCB, 0x96, 0x57, 0x92, 0x44, 0x8A,
        0xC8,
    ];

    /// 1280x720, 4:4:4, 10 位
    const SPS_444_10BIT: [u8; 31] = [
        0x42, 0x01, 0x01, 0x01, 0x60, 0x00, 0x00, 0x03, 0x00, 0x90, 0x00, 0x00, 0x03, 0x00, 0x00,
        0x03, 0x00, 0x5D, 0x90, 0x00, 0x50, 0x10, 0x05, 0xA2, 0x6C, 0xB2, 0xBC, 0x92, 0x24, 0x56,
        0x40,
    ];

    /// 2 个子层, 子层 0 带 profile/level, high tier, Main 10, 3840x2160
    const SPS_SUB_LAYERS: [u8; 45] = [
        0x42, 0x01, 0x02, 0x22, 0x20, 0x00, 0x00, 0x03, 0x00, 0x80, 0x00, 0x00, 0x03, 0x00, 0x00,
        0x03, 0x00, 0x78, 0xC0, 0x00, 0x00, 0x03, 0x00, 0x00, 0x03, 0x00, 0x00, 0x03, 0x00, 0x00,
        0x03, 0x00, 0x00, 0x03, 0x00, 0x00, 0x5A, 0xA0, 0x01, 0xE0, 0x20, 0x02, 0x1C, 0x4D, 0x96,
    ];

    #[test]
    fn test_sps_640x480_提取() {
        let result = extract_hvcc_configuration(&SPS_640X480).unwrap();
        assert_eq!((result.width, result.height), (640, 480));
        let c = &result.configuration;
        assert_eq!(c.configuration_version, 1);
        assert_eq!(c.chroma_format, 1);
        assert_eq!(c.bit_depth_luma(), 8);
        assert_eq!(c.bit_depth_chroma(), 8);
        assert_eq!(c.general_profile_idc, 1);
        assert!(!c.general_tier_flag);
        assert_eq!(c.general_level_idc, 60);
        assert_eq!(c.general_profile_compatibility_flags, 0x6000_0000);
        assert_eq!(c.constraint_indicator_flags_bits(), 0x9000_0000_0000);
        assert_eq!(c.num_temporal_layers, 1);
        assert!(c.temporal_id_nested);
    }

    #[test]
    fn test_sps_conformance_window_裁剪() {
        let sps = parse_hevc_sps(&SPS_1080P_CROP[2..]).unwrap();
        assert_eq!((sps.pic_width, sps.pic_height), (1920, 1088));
        assert_eq!(sps.conf_win_bottom, 4);
        assert_eq!((sps.width, sps.height), (1920, 1080));
    }

    #[test]
    fn test_sps_444_10bit() {
        let sps = parse_hevc_sps(&SPS_444_10BIT[2..]).unwrap();
        assert_eq!(sps.chroma_format_idc, 3);
        assert!(!sps.separate_colour_plane);
        assert_eq!((sps.width, sps.height), (1280, 720));
        assert_eq!(sps.bit_depth_luma, 10);
        assert_eq!(sps.bit_depth_chroma, 10);
        assert_eq!(sps.profile_tier_level.level_idc, 93);
    }

    #[test]
    fn test_sps_子层_profile_跳过() {
        let sps = parse_hevc_sps(&SPS_SUB_LAYERS[2..]).unwrap();
        assert_eq!(sps.max_sub_layers, 2);
        assert!(!sps.temporal_id_nesting);
        let ptl = &sps.profile_tier_level;
        assert!(ptl.tier_flag);
        assert_eq!(ptl.profile_idc, 2);
        assert_eq!(ptl.compatibility_flags, 0x2000_0000);
        assert_eq!(ptl.constraint_indicator_flags, 0x8000_0000_0000);
        assert_eq!(ptl.level_idc, 120);
        assert_eq!(sps.chroma_format_idc, 1);
        assert_eq!((sps.width, sps.height), (3840, 2160));
        assert_eq!(sps.bit_depth_luma, 10);
    }

    #[test]
    fn test_sps_截断() {
        // 位深字段在第 24 字节内结束, 之后的字段不参与提取
        assert!(extract_hvcc_configuration(&SPS_640X480[..24]).is_ok());
        for len in 2..24 {
            assert!(
                matches!(
                    extract_hvcc_configuration(&SPS_640X480[..len]),
                    Err(HeifError::ParseError(_))
                ),
                "截断到 {len} 字节应返回解析错误"
            );
        }
    }

    #[test]
    fn test_非_sps_nal() {
        let mut pps = SPS_640X480;
        pps[0] = 0x44;
        assert!(matches!(
            extract_hvcc_configuration(&pps),
            Err(HeifError::ParseError(_))
        ));
        assert!(extract_hvcc_configuration(&[0x42]).is_err());
    }

    /// SPS_640X480 的 NAL 头和 PTL, 后接指定的色度格式, 尺寸和 conformance window
    fn sps_with_window(chroma_format_idc: u32, width: u32, height: u32, window: [u32; 4]) -> Vec<u8> {
        fn ue(bw: &mut BitWriter, v: u32) {
            let len = 32 - (v + 1).leading_zeros();
            bw.write_bits(v + 1, 2 * len - 1);
        }

        let mut bw = BitWriter::new();
        ue(&mut bw, 0);
        ue(&mut bw, chroma_format_idc);
        if chroma_format_idc == 3 {
            bw.write_flag(false);
        }
        ue(&mut bw, width);
        ue(&mut bw, height);
        bw.write_flag(true);
        for offset in window {
            ue(&mut bw, offset);
        }
        ue(&mut bw, 0);
        ue(&mut bw, 0);
        bw.write_bit(1);
        bw.align_to_byte();

        let mut nal = SPS_640X480[..18].to_vec();
        nal.extend_from_slice(&bw.finish());
        nal
    }

    #[test]
    fn test_sps_422_裁剪_水平按色度单位() {
        let nal = sps_with_window(2, 1280, 736, [2, 0, 0, 16]);
        let sps = parse_hevc_sps(&nal[2..]).unwrap();
        assert_eq!(sps.chroma_format_idc, 2);
        assert_eq!((sps.pic_width, sps.pic_height), (1280, 736));
        assert_eq!((sps.width, sps.height), (1276, 720));

        let result = extract_hvcc_configuration(&nal).unwrap();
        assert_eq!(result.configuration.chroma_format, 2);
        assert_eq!((result.width, result.height), (1276, 720));
    }

    #[test]
    fn test_sps_444_裁剪_按亮度单位() {
        let nal = sps_with_window(3, 1280, 736, [2, 0, 0, 16]);
        let sps = parse_hevc_sps(&nal[2..]).unwrap();
        assert_eq!(sps.chroma_format_idc, 3);
        assert!(!sps.separate_colour_plane);
        assert_eq!((sps.width, sps.height), (1278, 720));
    }

    #[test]
    fn test_sps_单色_裁剪_按亮度单位() {
        let nal = sps_with_window(0, 640, 496, [0, 1, 0, 16]);
        let sps = parse_hevc_sps(&nal[2..]).unwrap();
        assert_eq!(sps.chroma_format_idc, 0);
        assert_eq!((sps.width, sps.height), (639, 480));
    }

    #[test]
    fn test_crop() {
        assert_eq!(crop(1088, 2, 0, 4), Some(1080));
        assert_eq!(crop(16, 2, 4, 4), None);
        assert_eq!(crop(16, 2, u32::MAX, 1), None);
    }
}
