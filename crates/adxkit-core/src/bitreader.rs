//! 比特流读取器.
//!
//! 提供从字节缓冲区中按位读取数据的能力, ADX 的块数据和 AHX 的帧数据都以此解析.
//!
//! 按大端位序读取 (MSB first). 读取位置由显式的 [`BitCursor`] 值表示,
//! 解码器在两次调用之间只保存游标, 不持有读取器本身.

use crate::{CriError, CriResult};

/// 比特流游标
///
/// 描述缓冲区中的一个位位置: 字节索引 + 字节内位偏移 (0-7, 0 表示最高位).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BitCursor {
    /// 字节索引
    pub byte: usize,
    /// 字节内位偏移 (0-7)
    pub bit: u8,
}

impl BitCursor {
    /// 指向某个字节起始位置的游标
    pub const fn at_byte(byte: usize) -> Self {
        Self { byte, bit: 0 }
    }

    /// 游标对应的绝对位位置
    pub const fn bit_position(&self) -> usize {
        self.byte * 8 + self.bit as usize
    }

    /// 是否位于字节边界
    pub const fn is_aligned(&self) -> bool {
        self.bit == 0
    }

    /// 向后对齐到下一个字节边界 (已对齐时不变)
    pub const fn aligned(self) -> Self {
        if self.bit == 0 {
            self
        } else {
            Self {
                byte: self.byte + 1,
                bit: 0,
            }
        }
    }
}

/// 从 `data` 的 `cursor` 处读取 `width` 位 (1-32), 返回读取值与新游标.
///
/// `width == 0` 属于调用方错误, 返回 `InvalidArgument`;
/// 越过缓冲区末尾返回 `UnexpectedEof`, 不会 panic.
pub fn read_bits(data: &[u8], cursor: BitCursor, width: u32) -> CriResult<(u32, BitCursor)> {
    if width == 0 || width > 32 {
        return Err(CriError::InvalidArgument(format!(
            "read_bits: 位宽 {} 超出 1..=32",
            width,
        )));
    }
    let total_bits = data.len() * 8;
    if cursor.bit_position() + width as usize > total_bits {
        return Err(CriError::UnexpectedEof);
    }

    let mut result: u32 = 0;
    let mut remaining = width;
    let mut byte = cursor.byte;
    let mut bit = cursor.bit as u32;

    while remaining > 0 {
        let available = 8 - bit;
        let to_read = remaining.min(available);

        // 从当前字节中提取位
        let shift = available - to_read;
        let mask = ((1u32 << to_read) - 1) as u8;
        let bits = (data[byte] >> shift) & mask;

        // to_read == 32 不会发生 (单次最多 8 位), 移位安全
        result = (result << to_read) | u32::from(bits);

        bit += to_read;
        if bit >= 8 {
            bit = 0;
            byte += 1;
        }
        remaining -= to_read;
    }

    Ok((
        result,
        BitCursor {
            byte,
            bit: bit as u8,
        },
    ))
}

/// 把 `width` 位的二进制补码值符号扩展为 i32
pub fn sign_extend(value: u32, width: u32) -> i32 {
    if width >= 32 {
        return value as i32;
    }
    let shift = 32 - width;
    ((value << shift) as i32) >> shift
}

/// 比特流读取器
///
/// 从字节缓冲区中按位读取数据, 使用大端位序 (MSB first).
///
/// # 示例
/// ```
/// use adxkit_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4).unwrap(), 0b1011);
/// assert_eq!(br.read_bits(4).unwrap(), 0b0001);
/// assert_eq!(br.read_bits(8).unwrap(), 0b01010101);
/// ```
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前读取位置
    cursor: BitCursor,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器, 从缓冲区起始处读取
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, BitCursor::default())
    }

    /// 从指定游标处开始读取
    pub fn at(data: &'a [u8], cursor: BitCursor) -> Self {
        Self { data, cursor }
    }

    /// 当前游标
    pub fn cursor(&self) -> BitCursor {
        self.cursor
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.cursor.bit_position()
    }

    /// 获取剩余可读位数
    pub fn bits_left(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.cursor.bit_position())
    }

    /// 是否已到达末尾
    pub fn is_eof(&self) -> bool {
        self.bits_left() == 0
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> CriResult<u32> {
        self.read_bits(1)
    }

    /// 读取 N 个位 (1-32)
    ///
    /// 按大端位序读取, 返回值的低 N 位有效.
    pub fn read_bits(&mut self, n: u32) -> CriResult<u32> {
        let (value, next) = read_bits(self.data, self.cursor, n)?;
        self.cursor = next;
        Ok(value)
    }

    /// 读取有符号整数 (二进制补码)
    pub fn read_bits_signed(&mut self, n: u32) -> CriResult<i32> {
        let val = self.read_bits(n)?;
        Ok(sign_extend(val, n))
    }

    /// 窥视 N 个位 (不移动位置)
    pub fn peek_bits(&self, n: u32) -> CriResult<u32> {
        read_bits(self.data, self.cursor, n).map(|(value, _)| value)
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: usize) -> CriResult<()> {
        if n > self.bits_left() {
            return Err(CriError::UnexpectedEof);
        }

        let total_bits = self.cursor.bit as usize + n;
        self.cursor.byte += total_bits / 8;
        self.cursor.bit = (total_bits % 8) as u8;

        Ok(())
    }

    /// 对齐到下一个字节边界
    ///
    /// 如果当前已在字节边界, 则不做任何事.
    pub fn align_to_byte(&mut self) {
        self.cursor = self.cursor.aligned();
    }

    /// 获取当前字节位置
    pub fn byte_position(&self) -> usize {
        self.cursor.byte
    }

    /// 从当前位置读取原始字节切片
    ///
    /// 仅在字节对齐时可用.
    pub fn read_bytes(&mut self, n: usize) -> CriResult<&'a [u8]> {
        if !self.cursor.is_aligned() {
            return Err(CriError::InvalidArgument("read_bytes 需要字节对齐".into()));
        }

        let end = self.cursor.byte + n;
        if end > self.data.len() {
            return Err(CriError::UnexpectedEof);
        }

        let slice = &self.data[self.cursor.byte..end];
        self.cursor.byte = end;
        Ok(slice)
    }

    /// 获取底层数据的引用
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}
