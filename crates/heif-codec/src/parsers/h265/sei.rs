//! H.265/HEVC 辅助图像 SEI 解析.
//!
//! 辅助图像 (深度图, alpha) 的码流为长度前缀 NAL 序列. 每个 PREFIX_SEI / SUFFIX_SEI
//! NAL 中可包含多条 sei_message, payload_type 与 payload_size 均为 0xFF 扩展编码.
//! 目前识别 depth_representation_info (type 177), 其余类型跳过.

use heif_core::{BitReader, HeifError, HeifResult, ResultExt};
use log::{debug, warn};

use super::nal::{HevcNalHeader, remove_emulation_prevention, split_length_prefixed};

/// depth_representation_info 的 payload_type
pub const SEI_DEPTH_REPRESENTATION_INFO: u32 = 177;

/// 辅助码流默认的 NAL 长度字段字节数
const DEFAULT_NAL_LENGTH_SIZE: usize = 4;

/// 深度表示类型 (depth_representation_type)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthRepresentationType {
    /// 0: 均匀量化的 1/Z
    UniformInverseZ,
    /// 1: 均匀量化的视差
    UniformDisparity,
    /// 2: 均匀量化的 Z
    UniformZ,
    /// 3: 非均匀量化的视差
    NonuniformDisparity,
    /// 保留值
    Other(u32),
}

impl DepthRepresentationType {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::UniformInverseZ,
            1 => Self::UniformDisparity,
            2 => Self::UniformZ,
            3 => Self::NonuniformDisparity,
            other => Self::Other(other),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            Self::UniformInverseZ => 0,
            Self::UniformDisparity => 1,
            Self::UniformZ => 2,
            Self::NonuniformDisparity => 3,
            Self::Other(v) => *v,
        }
    }
}

/// depth_representation_info SEI
#[derive(Debug, Clone, PartialEq)]
pub struct DepthRepresentationInfo {
    /// 结构版本, 当前为 1
    pub version: u8,
    /// 最近深度平面
    pub z_near: Option<f64>,
    /// 最远深度平面
    pub z_far: Option<f64>,
    /// 最小视差
    pub d_min: Option<f64>,
    /// 最大视差
    pub d_max: Option<f64>,
    pub depth_representation_type: DepthRepresentationType,
    /// disparity_ref_view_id, 仅在 d_min 或 d_max 存在时有意义
    pub disparity_reference_view: u32,
    /// 非均匀视差模型 (仅 NonuniformDisparity)
    pub depth_nonlinear_representation_model: Vec<u32>,
}

/// 解析出的 SEI 消息
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SeiMessage {
    DepthRepresentationInfo(DepthRepresentationInfo),
}

impl SeiMessage {
    /// 消息对应的 payload_type
    pub fn payload_type(&self) -> u32 {
        match self {
            Self::DepthRepresentationInfo(_) => SEI_DEPTH_REPRESENTATION_INFO,
        }
    }
}

/// 解析辅助图像码流中的 SEI 消息 (4 字节 NAL 长度前缀)
pub fn decode_hevc_aux_sei_messages(data: &[u8]) -> HeifResult<Vec<SeiMessage>> {
    decode_hevc_aux_sei_messages_with_length_size(data, DEFAULT_NAL_LENGTH_SIZE)
}

/// 同 [`decode_hevc_aux_sei_messages`], 指定 NAL 长度前缀字节数 (1-4)
pub fn decode_hevc_aux_sei_messages_with_length_size(
    data: &[u8],
    length_size: usize,
) -> HeifResult<Vec<SeiMessage>> {
    let mut messages = Vec::new();
    for nal in split_length_prefixed(data, length_size).stage("辅助码流")? {
        let header = HevcNalHeader::parse(nal)?;
        if !header.nal_type.is_sei() {
            continue;
        }
        let rbsp = remove_emulation_prevention(&nal[HevcNalHeader::SIZE..]);
        messages.extend(parse_sei_rbsp(&rbsp)?);
    }
    debug!("HEVC SEI: 解析出 {} 条消息", messages.len());
    Ok(messages)
}

/// 解析一个 SEI RBSP (已去除 NAL 头和 emulation prevention 字节)
pub fn parse_sei_rbsp(rbsp: &[u8]) -> HeifResult<Vec<SeiMessage>> {
    let mut messages = Vec::new();
    let mut offset = 0usize;

    while offset < rbsp.len() {
        if is_rbsp_trailing_bits(&rbsp[offset..]) {
            break;
        }

        let payload_type = read_sei_ff_coded_value(rbsp, &mut offset, "payload_type")?;
        let payload_size = read_sei_ff_coded_value(rbsp, &mut offset, "payload_size")? as usize;
        let payload_end = offset
            .checked_add(payload_size)
            .filter(|end| *end <= rbsp.len())
            .ok_or_else(|| {
                HeifError::ParseError(format!(
                    "HEVC: SEI payload 截断, type={payload_type}, size={payload_size}, remain={}",
                    rbsp.len() - offset
                ))
            })?;
        let payload = &rbsp[offset..payload_end];
        offset = payload_end;

        match payload_type {
            SEI_DEPTH_REPRESENTATION_INFO => {
                let info = parse_depth_representation_info(payload)
                    .stage("SEI depth_representation_info")?;
                messages.push(SeiMessage::DepthRepresentationInfo(info));
            }
            other => {
                warn!("HEVC SEI: 跳过未识别的 payload_type={other}, size={payload_size}");
            }
        }
    }

    Ok(messages)
}

fn is_rbsp_trailing_bits(rest: &[u8]) -> bool {
    if rest.is_empty() {
        return true;
    }
    rest[0] == 0x80 && rest[1..].iter().all(|v| *v == 0)
}

fn read_sei_ff_coded_value(data: &[u8], offset: &mut usize, name: &str) -> HeifResult<u32> {
    let mut value = 0u32;
    loop {
        let byte = *data
            .get(*offset)
            .ok_or_else(|| HeifError::ParseError(format!("HEVC: SEI {name} 截断")))?;
        *offset += 1;
        value = value
            .checked_add(u32::from(byte))
            .ok_or_else(|| HeifError::ParseError(format!("HEVC: SEI {name} 溢出")))?;
        if byte != 0xFF {
            break;
        }
    }
    Ok(value)
}

fn parse_depth_representation_info(payload: &[u8]) -> HeifResult<DepthRepresentationInfo> {
    let mut br = BitReader::new(payload);

    let z_near_flag = br.read_flag()?;
    let z_far_flag = br.read_flag()?;
    let d_min_flag = br.read_flag()?;
    let d_max_flag = br.read_flag()?;
    let depth_representation_type = DepthRepresentationType::from_u32(br.read_ue()?);

    let disparity_reference_view = if d_min_flag || d_max_flag {
        br.read_ue()?
    } else {
        0
    };

    let mut read_optional = |present: bool| -> HeifResult<Option<f64>> {
        if present {
            read_depth_rep_info_element(&mut br).map(Some)
        } else {
            Ok(None)
        }
    };
    let z_near = read_optional(z_near_flag)?;
    let z_far = read_optional(z_far_flag)?;
    let d_min = read_optional(d_min_flag)?;
    let d_max = read_optional(d_max_flag)?;

    let mut depth_nonlinear_representation_model = Vec::new();
    if depth_representation_type == DepthRepresentationType::NonuniformDisparity {
        let num = u64::from(br.read_ue()?) + 1;
        // 每个 ue(v) 至少 1 位
        if num > br.bits_left() as u64 {
            return Err(HeifError::ParseError(format!(
                "非均匀视差模型个数 {num} 超出剩余数据"
            )));
        }
        depth_nonlinear_representation_model.reserve(num as usize);
        for _ in 0..num {
            depth_nonlinear_representation_model.push(br.read_ue()?);
        }
    }

    Ok(DepthRepresentationInfo {
        version: 1,
        z_near,
        z_far,
        d_min,
        d_max,
        depth_representation_type,
        disparity_reference_view,
        depth_nonlinear_representation_model,
    })
}

/// depth_rep_info_element: sign(1) exponent(7) mantissa_len_minus1(5) mantissa(v)
fn read_depth_rep_info_element(br: &mut BitReader) -> HeifResult<f64> {
    let sign = br.read_flag()?;
    let exponent = br.read_bits(7)? as i32;
    let mantissa_len = br.read_bits(5)? + 1;
    let mantissa = f64::from(br.read_bits(mantissa_len)?);
    let len = mantissa_len as i32;

    let value = if exponent > 0 {
        2f64.powi(exponent - 31) * (1.0 + mantissa / 2f64.powi(len))
    } else {
        2f64.powi(-(30 + len)) * mantissa
    };
    Ok(if sign { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// z_near=1.0, z_far=-2.5, 均匀 1/Z
    const DEPTH_Z_PAYLOAD: [u8; 5] = [0xC8, 0xF8, 0x14, 0x01, 0x60];
    /// d_min=0.75, d_max=6.0, 非均匀视差, 参考视图 5, 模型 [7, 9]
    const DEPTH_D_PAYLOAD: [u8; 8] = [0x32, 0x18, 0x78, 0x70, 0x42, 0x0A, 0x10, 0x2A];

    fn sei_rbsp(messages: &[(u8, &[u8])]) -> Vec<u8> {
        let mut rbsp = Vec::new();
        for (payload_type, payload) in messages {
            rbsp.push(*payload_type);
            rbsp.push(payload.len() as u8);
            rbsp.extend_from_slice(payload);
        }
        rbsp.push(0x80);
        rbsp
    }

    #[test]
    fn test_depth_z_解析() {
        let msgs = parse_sei_rbsp(&sei_rbsp(&[(177, &DEPTH_Z_PAYLOAD)])).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].payload_type(), SEI_DEPTH_REPRESENTATION_INFO);
        let SeiMessage::DepthRepresentationInfo(info) = &msgs[0];
        assert_eq!(info.version, 1);
        assert_eq!(info.z_near, Some(1.0));
        assert_eq!(info.z_far, Some(-2.5));
        assert_eq!(info.d_min, None);
        assert_eq!(info.d_max, None);
        assert_eq!(
            info.depth_representation_type,
            DepthRepresentationType::UniformInverseZ
        );
        assert!(info.depth_nonlinear_representation_model.is_empty());
    }

    #[test]
    fn test_depth_视差模型_解析() {
        let msgs = parse_sei_rbsp(&sei_rbsp(&[(177, &DEPTH_D_PAYLOAD)])).unwrap();
        let SeiMessage::DepthRepresentationInfo(info) = &msgs[0];
        assert_eq!(info.z_near, None);
        assert_eq!(info.d_min, Some(0.75));
        assert_eq!(info.d_max, Some(6.0));
        assert_eq!(
            info.depth_representation_type,
            DepthRepresentationType::NonuniformDisparity
        );
        assert_eq!(info.disparity_reference_view, 5);
        assert_eq!(info.depth_nonlinear_representation_model, vec![7, 9]);
    }

    #[test]
    fn test_未识别类型跳过() {
        let msgs = parse_sei_rbsp(&sei_rbsp(&[(5, &[1, 2, 3]), (177, &DEPTH_Z_PAYLOAD)])).unwrap();
        assert_eq!(msgs.len(), 1);
        assert!(parse_sei_rbsp(&sei_rbsp(&[(4, &[0xAA])])).unwrap().is_empty());
    }

    #[test]
    fn test_ff_扩展编码() {
        // payload_type = 0xFF + 0xB2 = 433
        let rbsp = [0xFF, 0xB2, 0x01, 0x00, 0x80];
        assert!(parse_sei_rbsp(&rbsp).unwrap().is_empty());

        let mut offset = 0;
        assert_eq!(
            read_sei_ff_coded_value(&[0xFF, 0xFF, 0x02], &mut offset, "payload_type").unwrap(),
            512
        );
        assert_eq!(offset, 3);
    }

    #[test]
    fn test_payload_截断() {
        let rbsp = [177, 10, 0xC8, 0xF8];
        assert!(matches!(parse_sei_rbsp(&rbsp), Err(HeifError::ParseError(_))));
        // payload_size 字段缺失
        assert!(parse_sei_rbsp(&[0xFF]).is_err());
    }

    #[test]
    fn test_已识别_payload_损坏() {
        let rbsp = sei_rbsp(&[(177, &DEPTH_Z_PAYLOAD[..2])]);
        let err = parse_sei_rbsp(&rbsp).unwrap_err();
        assert!(matches!(err, HeifError::ParseError(_)));
        assert!(err.to_string().contains("depth_representation_info"));
    }

    #[test]
    fn test_depth_element_指数为零() {
        // sign=0 exponent=0 len_minus1=0 mantissa=1 => 2^-31
        let data = [0x00, 0x04];
        let mut br = BitReader::new(&data);
        assert_eq!(read_depth_rep_info_element(&mut br).unwrap(), 2f64.powi(-31));
    }
}
