//! 像素格式定义.
//!
//! 描述送入编码器 / 解码器输出的原始像素缓冲区的存储格式,
//! 以及它与 HEVC `chroma_format_idc` / 位深之间的对应关系.

use std::fmt;

/// 像素格式
///
/// 命名规则: 颜色空间 + 位深 + 排列方式 (P=Planar, LE=小端).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// 未指定
    None,

    // ========================
    // YUV 平面格式 (Planar)
    // ========================
    /// YUV 4:2:0 平面格式, 8 位 (HEVC Main)
    Yuv420p,
    /// YUV 4:2:2 平面格式, 8 位
    Yuv422p,
    /// YUV 4:4:4 平面格式, 8 位
    Yuv444p,
    /// YUV 4:2:0 平面格式, 10 位小端 (HEVC Main 10)
    Yuv420p10le,
    /// YUV 4:2:2 平面格式, 10 位小端
    Yuv422p10le,
    /// YUV 4:4:4 平面格式, 10 位小端
    Yuv444p10le,
    /// YUV 4:2:0 平面格式, 12 位小端
    Yuv420p12le,

    // ========================
    // 灰度格式 (单色, 深度图/alpha 常用)
    // ========================
    /// 灰度 8 位
    Gray8,
    /// 灰度 10 位小端
    Gray10le,
    /// 灰度 16 位小端
    Gray16le,

    // ========================
    // RGB 打包格式 (Packed)
    // ========================
    /// RGB 各 8 位, 打包
    Rgb24,
    /// RGBA 各 8 位, 打包
    Rgba,
}

impl PixelFormat {
    /// 获取单个分量的位深
    pub const fn bits_per_component(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p | Self::Gray8 => 8,
            Self::Yuv420p10le | Self::Yuv422p10le | Self::Yuv444p10le | Self::Gray10le => 10,
            Self::Yuv420p12le => 12,
            Self::Gray16le => 16,
            Self::Rgb24 | Self::Rgba => 8,
        }
    }

    /// 获取色度子采样 (log2 水平, log2 垂直)
    ///
    /// 例如 YUV420 返回 (1, 1), 表示色度分辨率为亮度的 1/2 x 1/2.
    pub const fn chroma_subsampling(&self) -> (u32, u32) {
        match self {
            Self::Yuv420p | Self::Yuv420p10le | Self::Yuv420p12le => (1, 1),
            Self::Yuv422p | Self::Yuv422p10le => (1, 0),
            _ => (0, 0),
        }
    }

    /// 对应的 HEVC `chroma_format_idc`
    ///
    /// - `Some(0)`: 单色
    /// - `Some(1)`: 4:2:0
    /// - `Some(2)`: 4:2:2
    /// - `Some(3)`: 4:4:4
    /// - `None`: 打包 RGB 等 hvcC 无法直接表达的布局
    pub const fn hevc_chroma_format(&self) -> Option<u8> {
        match self {
            Self::Gray8 | Self::Gray10le | Self::Gray16le => Some(0),
            Self::Yuv420p | Self::Yuv420p10le | Self::Yuv420p12le => Some(1),
            Self::Yuv422p | Self::Yuv422p10le => Some(2),
            Self::Yuv444p | Self::Yuv444p10le => Some(3),
            Self::None | Self::Rgb24 | Self::Rgba => None,
        }
    }

    /// 由 HEVC `chroma_format_idc` 和亮度位深选择平面格式
    ///
    /// 没有对应格式时返回 `None`.
    pub const fn from_hevc(chroma_format: u8, bit_depth: u8) -> Option<Self> {
        Some(match (chroma_format, bit_depth) {
            (0, 8) => Self::Gray8,
            (0, 9..=10) => Self::Gray10le,
            (0, 11..=16) => Self::Gray16le,
            (1, 8) => Self::Yuv420p,
            (1, 9..=10) => Self::Yuv420p10le,
            (1, 11..=12) => Self::Yuv420p12le,
            (2, 8) => Self::Yuv422p,
            (2, 9..=10) => Self::Yuv422p10le,
            (3, 8) => Self::Yuv444p,
            (3, 9..=10) => Self::Yuv444p10le,
            _ => return None,
        })
    }

    /// 平面数量
    pub const fn plane_count(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Yuv420p
            | Self::Yuv422p
            | Self::Yuv444p
            | Self::Yuv420p10le
            | Self::Yuv422p10le
            | Self::Yuv444p10le
            | Self::Yuv420p12le => 3,
            Self::Gray8 | Self::Gray10le | Self::Gray16le => 1,
            Self::Rgb24 | Self::Rgba => 1,
        }
    }

    /// 计算指定平面每行的字节数 (linesize / stride)
    ///
    /// 格式为 None 或平面索引超出范围时返回 `None`.
    pub fn plane_linesize(&self, plane: usize, width: u32) -> Option<usize> {
        if *self == Self::None || plane >= self.plane_count() as usize {
            return None;
        }
        let w = width as usize;
        let (sub_h, _) = self.chroma_subsampling();
        let plane_w = if plane == 0 { w } else { w >> sub_h };
        Some(match self {
            Self::Rgb24 => w * 3,
            Self::Rgba => w * 4,
            _ if self.bits_per_component() > 8 => plane_w * 2,
            _ => plane_w,
        })
    }

    /// 计算指定平面的行数
    pub fn plane_height(&self, plane: usize, height: u32) -> Option<usize> {
        if *self == Self::None || plane >= self.plane_count() as usize {
            return None;
        }
        let h = height as usize;
        let (_, sub_v) = self.chroma_subsampling();
        Some(if plane == 0 { h } else { h >> sub_v })
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Yuv420p => "yuv420p",
            Self::Yuv422p => "yuv422p",
            Self::Yuv444p => "yuv444p",
            Self::Yuv420p10le => "yuv420p10le",
            Self::Yuv422p10le => "yuv422p10le",
            Self::Yuv444p10le => "yuv444p10le",
            Self::Yuv420p12le => "yuv420p12le",
            Self::Gray8 => "gray8",
            Self::Gray10le => "gray10le",
            Self::Gray16le => "gray16le",
            Self::Rgb24 => "rgb24",
            Self::Rgba => "rgba",
        };
        write!(f, "{name}")
    }
}
