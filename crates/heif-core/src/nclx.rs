//! nclx 色彩描述 (ISO/IEC 23091-2 编码值).

/// `colr` box 中 nclx 类型的色彩描述
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NclxColorProfile {
    /// colour_primaries
    pub colour_primaries: u16,
    /// transfer_characteristics
    pub transfer_characteristics: u16,
    /// matrix_coefficients
    pub matrix_coefficients: u16,
    /// full_range_flag
    pub full_range: bool,
}
