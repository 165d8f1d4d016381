//! 编解码器标识符.
//!
//! 对应 HEIF 的压缩格式 (compression format), 每种格式有各自的图像项类型 (`infe` item_type).

use std::fmt;

/// 编解码器标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// 未知编解码器
    None,
    /// H.265 / HEVC
    H265,
    /// AV1
    Av1,
}

impl CodecId {
    /// 获取编解码器的人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::H265 => "hevc",
            Self::Av1 => "av1",
        }
    }

    /// 对应的 HEIF 图像项类型 (FourCC)
    pub const fn item_type(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::H265 => Some("hvc1"),
            Self::Av1 => Some("av01"),
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_type() {
        assert_eq!(CodecId::H265.item_type(), Some("hvc1"));
        assert_eq!(CodecId::Av1.item_type(), Some("av01"));
        assert_eq!(CodecId::None.item_type(), None);
        assert_eq!(CodecId::H265.to_string(), "hevc");
    }
}
