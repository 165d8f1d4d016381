//! 有界比特流读取器.
//!
//! 在借用的字节切片上按位或按字节顺序读取, 读取范围严格限定在切片内.
//! 任何越界读取都返回 [`HeifError::ParseError`], 不会 panic, 也不会读到切片之外.
//!
//! 按大端位序读取 (MSB first), 与 hvcC / HEVC 码流的位序一致.

use crate::{HeifError, HeifResult};

/// 有界比特流读取器
///
/// # 示例
/// ```
/// use heif_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4).unwrap(), 0b1011);
/// assert_eq!(br.read_bits(4).unwrap(), 0b0001);
/// assert_eq!(br.read_u8().unwrap(), 0b01010101);
/// assert!(br.read_bits(1).is_err());
/// ```
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前字节索引
    byte_pos: usize,
    /// 当前字节中的位位置 (0-7, 0 表示最高位)
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    /// 获取剩余可读位数
    pub fn bits_left(&self) -> usize {
        if self.byte_pos >= self.data.len() {
            return 0;
        }
        (self.data.len() - self.byte_pos) * 8 - self.bit_pos as usize
    }

    /// 获取剩余完整字节数 (从下一个字节边界算起)
    pub fn bytes_left(&self) -> usize {
        self.bits_left() / 8
    }

    /// 是否已到达末尾
    pub fn is_eof(&self) -> bool {
        self.bits_left() == 0
    }

    fn overrun(&self, wanted: usize) -> HeifError {
        HeifError::ParseError(format!(
            "比特流越界: 需要 {} 位, 剩余 {} 位 (位置 {})",
            wanted,
            self.bits_left(),
            self.bits_read(),
        ))
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> HeifResult<u32> {
        if self.byte_pos >= self.data.len() {
            return Err(self.overrun(1));
        }

        let bit = (self.data[self.byte_pos] >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;
        if self.bit_pos >= 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }

        Ok(u32::from(bit))
    }

    /// 读取 1 位标志
    pub fn read_flag(&mut self) -> HeifResult<bool> {
        Ok(self.read_bit()? != 0)
    }

    /// 读取 N 个位 (最多 32 位)
    ///
    /// 按大端位序读取, 返回值的低 N 位有效.
    pub fn read_bits(&mut self, n: u32) -> HeifResult<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(HeifError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }
        if (n as usize) > self.bits_left() {
            return Err(self.overrun(n as usize));
        }

        let mut result: u32 = 0;
        let mut remaining = n;

        while remaining > 0 {
            let available = 8 - self.bit_pos as u32;
            let to_read = remaining.min(available);

            // 从当前字节中提取位
            let shift = available - to_read;
            let mask = ((1u32 << to_read) - 1) as u8;
            let bits = (self.data[self.byte_pos] >> shift) & mask;

            result = (result << to_read) | u32::from(bits);

            self.bit_pos += to_read as u8;
            if self.bit_pos >= 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
            remaining -= to_read;
        }

        Ok(result)
    }

    /// 读取 N 个位 (最多 64 位)
    pub fn read_bits_u64(&mut self, n: u32) -> HeifResult<u64> {
        if n <= 32 {
            return self.read_bits(n).map(u64::from);
        }
        if n > 64 {
            return Err(HeifError::InvalidArgument(format!(
                "read_bits_u64: n={} 超过 64 位",
                n,
            )));
        }
        if (n as usize) > self.bits_left() {
            return Err(self.overrun(n as usize));
        }

        let high_bits = n - 32;
        let high = self.read_bits(high_bits)? as u64;
        let low = self.read_bits(32)? as u64;
        Ok((high << 32) | low)
    }

    /// 读取 8 位无符号整数
    pub fn read_u8(&mut self) -> HeifResult<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    /// 读取 16 位大端无符号整数
    pub fn read_u16(&mut self) -> HeifResult<u16> {
        Ok(self.read_bits(16)? as u16)
    }

    /// 读取 32 位大端无符号整数
    pub fn read_u32(&mut self) -> HeifResult<u32> {
        self.read_bits(32)
    }

    /// 读取 Exp-Golomb 无符号值 ue(v)
    ///
    /// 前导零超过 31 个时视为损坏的码流.
    pub fn read_ue(&mut self) -> HeifResult<u32> {
        let mut leading_zeros = 0u32;
        while self.read_bit()? == 0 {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(HeifError::ParseError(format!(
                    "Exp-Golomb 过长 (位置 {})",
                    self.bits_read()
                )));
            }
        }
        if leading_zeros == 0 {
            return Ok(0);
        }
        let val = self.read_bits(leading_zeros)?;
        // leading_zeros == 31 时 2^31 - 1 + val 可能溢出 u32
        ((1u64 << leading_zeros) - 1 + u64::from(val))
            .try_into()
            .map_err(|_| HeifError::ParseError("Exp-Golomb 值超出 32 位".into()))
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: usize) -> HeifResult<()> {
        if n > self.bits_left() {
            return Err(self.overrun(n));
        }

        let total_bits = self.bit_pos as usize + n;
        self.byte_pos += total_bits / 8;
        self.bit_pos = (total_bits % 8) as u8;

        Ok(())
    }

    /// 对齐到下一个字节边界
    ///
    /// 如果当前已在字节边界, 则不做任何事.
    pub fn align_to_byte(&mut self) {
        if self.bit_pos > 0 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
    }

    /// 从当前位置读取原始字节切片
    ///
    /// 仅在字节对齐时可用.
    pub fn read_bytes(&mut self, n: usize) -> HeifResult<&'a [u8]> {
        if self.bit_pos != 0 {
            return Err(HeifError::InvalidArgument("read_bytes 需要字节对齐".into()));
        }

        let end = self
            .byte_pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.overrun(n.saturating_mul(8)))?;

        let slice = &self.data[self.byte_pos..end];
        self.byte_pos = end;
        Ok(slice)
    }

    /// 获取底层数据的引用
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}
