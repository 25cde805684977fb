//! ADX/AHX 共用文件头模型.
//!
//! 布局 (偏移相对流起始, 多字节字段均为大端):
//!
//! | 偏移 | 字段 |
//! |------|------|
//! | 0x00 | 魔数 0x8000 (u16) |
//! | 0x02 | 数据偏移 data_offset (u16) |
//! | 0x04 | 编码类型 (u8) |
//! | 0x05 | 块大小 (u8) |
//! | 0x06 | 采样位深 (u8) |
//! | 0x07 | 声道数 (u8) |
//! | 0x08 | 采样率 (u32) |
//! | 0x0C | 总采样数 (u32) |
//! | 0x10 | 高通截止频率 (u16) |
//! | 0x12 | 版本 (u8) |
//! | 0x13 | 标志 (u8) |
//!
//! 版本 3 在 0x14 处带循环记录, 版本 4 先保留 16 字节再在 0x24 处带同样的记录.
//! 头部以 `"(c)CRI"` 结尾, 该标记结束于 `data_offset + 4`, 之后即为压缩数据.

use adxkit_core::{CriError, CriResult};
use byteorder::{BigEndian, ByteOrder};
use log::{debug, warn};

use crate::codec_id::CodecId;

/// 文件头魔数
pub const HEADER_MAGIC: u16 = 0x8000;

/// 数据区之前的版权标记
pub const COPYRIGHT_MARKER: &[u8; 6] = b"(c)CRI";

/// 固定字段区长度 (0x00..0x14)
pub const FIXED_FIELDS_SIZE: usize = 0x14;

/// 循环记录长度
pub const LOOP_RECORD_SIZE: usize = 0x18;

/// 允许的最大声道数
pub const MAX_CHANNELS: u8 = 8;

/// 编码类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingType {
    /// ADX, 预设系数
    Preset,
    /// ADX, 标准 (由高通频率推导系数)
    Standard,
    /// ADX, 指数缩放
    Exponential,
    /// AHX (0x10)
    Ahx,
    /// AHX (0x11, 常见于新版工具输出)
    AhxAlt,
}

impl EncodingType {
    /// 从头部字节解析
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x02 => Some(Self::Preset),
            0x03 => Some(Self::Standard),
            0x04 => Some(Self::Exponential),
            0x10 => Some(Self::Ahx),
            0x11 => Some(Self::AhxAlt),
            _ => None,
        }
    }

    /// 头部中的字节值
    pub const fn as_u8(&self) -> u8 {
        match self {
            Self::Preset => 0x02,
            Self::Standard => 0x03,
            Self::Exponential => 0x04,
            Self::Ahx => 0x10,
            Self::AhxAlt => 0x11,
        }
    }

    /// 对应的编解码器
    pub const fn codec_id(&self) -> CodecId {
        match self {
            Self::Preset | Self::Standard | Self::Exponential => CodecId::Adx,
            Self::Ahx | Self::AhxAlt => CodecId::Ahx,
        }
    }
}

/// 循环信息
///
/// 字节偏移为相对流起始的绝对偏移, 指向包含对应采样的块.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopInfo {
    /// 为使循环起点落在块边界而前置的静音采样数
    pub alignment_samples: u16,
    /// 循环是否启用
    pub enabled: bool,
    /// 循环起点 (采样序号)
    pub begin_sample: u32,
    /// 循环起点所在块的字节偏移
    pub begin_byte: u32,
    /// 循环终点 (采样序号, 不含)
    pub end_sample: u32,
    /// 循环终点所在块之后的字节偏移
    pub end_byte: u32,
}

impl LoopInfo {
    fn parse(buf: &[u8]) -> Self {
        let enabled_short = BigEndian::read_u16(&buf[0x02..]);
        let enabled_long = BigEndian::read_u32(&buf[0x04..]);
        Self {
            alignment_samples: BigEndian::read_u16(&buf[0x00..]),
            enabled: enabled_short != 0 || enabled_long != 0,
            begin_sample: BigEndian::read_u32(&buf[0x08..]),
            begin_byte: BigEndian::read_u32(&buf[0x0C..]),
            end_sample: BigEndian::read_u32(&buf[0x10..]),
            end_byte: BigEndian::read_u32(&buf[0x14..]),
        }
    }

    fn write(&self, buf: &mut [u8]) {
        let enabled = u32::from(self.enabled);
        BigEndian::write_u16(&mut buf[0x00..], self.alignment_samples);
        BigEndian::write_u16(&mut buf[0x02..], enabled as u16);
        BigEndian::write_u32(&mut buf[0x04..], enabled);
        BigEndian::write_u32(&mut buf[0x08..], self.begin_sample);
        BigEndian::write_u32(&mut buf[0x0C..], self.begin_byte);
        BigEndian::write_u32(&mut buf[0x10..], self.end_sample);
        BigEndian::write_u32(&mut buf[0x14..], self.end_byte);
    }
}

/// 流头部
///
/// 解析后不可变. 编码器在写完全部数据后才构造最终头部 (总采样数与循环偏移此时已知).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// 数据偏移 (版权标记结束于 `data_offset + 4`)
    pub data_offset: u16,
    /// 编码类型
    pub encoding: EncodingType,
    /// 每声道块大小 (字节, AHX 为 0)
    pub block_size: u8,
    /// 采样位深 (AHX 为 0)
    pub bit_depth: u8,
    /// 声道数
    pub channel_count: u8,
    /// 采样率
    pub sample_rate: u32,
    /// 总采样数 (每声道)
    pub total_samples: u32,
    /// 高通截止频率 (Hz)
    pub highpass_frequency: u16,
    /// 格式版本
    pub version: u8,
    /// 标志
    pub flags: u8,
    /// 循环信息 (仅版本 3/4 且记录完整时存在)
    pub loop_info: Option<LoopInfo>,
}

impl StreamHeader {
    /// 头部总长度, 即压缩数据起始位置
    pub fn header_size(&self) -> usize {
        self.data_offset as usize + 4
    }

    /// 对应的编解码器
    pub fn codec_id(&self) -> CodecId {
        self.encoding.codec_id()
    }

    /// 每个 ADX 块包含的采样数 (AHX 返回 0)
    pub fn samples_per_block(&self) -> u32 {
        if self.bit_depth == 0 || self.block_size < 2 {
            return 0;
        }
        (u32::from(self.block_size) - 2) * 8 / u32::from(self.bit_depth)
    }

    /// 包含第 `sample` 个采样的块在文件中的字节偏移 (向上取整到块边界)
    ///
    /// 偏移超出 u32 范围时返回 None.
    pub fn block_byte_offset(&self, sample: u32) -> Option<u32> {
        let per_block = self.samples_per_block();
        if per_block == 0 {
            return u32::try_from(self.header_size()).ok();
        }
        let blocks = u64::from(sample.div_ceil(per_block));
        let frame_bytes = u64::from(self.block_size) * u64::from(self.channel_count);
        u32::try_from(self.header_size() as u64 + blocks * frame_bytes).ok()
    }

    /// 版本对应的循环记录偏移
    fn loop_record_offset(version: u8) -> Option<usize> {
        match version {
            3 => Some(0x14),
            4 => Some(0x24),
            _ => None,
        }
    }

    /// 从字节流开头解析头部
    ///
    /// 任何校验失败都会记录具体的不符项, 并返回 `CriError::Format`.
    pub fn parse(data: &[u8]) -> CriResult<Self> {
        if data.len() < FIXED_FIELDS_SIZE {
            return Err(format_error(format!(
                "头部过短: {} 字节, 至少需要 {} 字节",
                data.len(),
                FIXED_FIELDS_SIZE,
            )));
        }

        let magic = BigEndian::read_u16(&data[0x00..]);
        if magic != HEADER_MAGIC {
            return Err(format_error(format!(
                "魔数不匹配: 期望 0x{:04X}, 实际 0x{:04X}",
                HEADER_MAGIC, magic,
            )));
        }

        let data_offset = BigEndian::read_u16(&data[0x02..]);
        let header_size = data_offset as usize + 4;
        if header_size < FIXED_FIELDS_SIZE + COPYRIGHT_MARKER.len() {
            return Err(format_error(format!(
                "数据偏移过小: 0x{:04X}",
                data_offset,
            )));
        }
        if data.len() < header_size {
            return Err(format_error(format!(
                "头部被截断: 声明 {} 字节, 实际 {} 字节",
                header_size,
                data.len(),
            )));
        }

        let marker_start = header_size - COPYRIGHT_MARKER.len();
        if &data[marker_start..header_size] != COPYRIGHT_MARKER {
            return Err(format_error(format!(
                "版权标记不匹配: 偏移 0x{:X} 处应为 \"(c)CRI\"",
                marker_start,
            )));
        }

        let encoding = EncodingType::from_u8(data[0x04]).ok_or_else(|| {
            format_error(format!("未知编码类型: 0x{:02X}", data[0x04]))
        })?;

        let channel_count = data[0x07];
        if channel_count == 0 || channel_count > MAX_CHANNELS {
            return Err(format_error(format!(
                "声道数不合法: {} (允许 1..={})",
                channel_count, MAX_CHANNELS,
            )));
        }

        let sample_rate = BigEndian::read_u32(&data[0x08..]);
        if sample_rate == 0 {
            return Err(format_error("采样率为 0".into()));
        }

        let block_size = data[0x05];
        let bit_depth = data[0x06];
        if encoding.codec_id() == CodecId::Adx {
            let payload_bits = u32::from(block_size).saturating_sub(2) * 8;
            if block_size <= 2
                || bit_depth == 0
                || bit_depth > 16
                || payload_bits % u32::from(bit_depth) != 0
            {
                return Err(format_error(format!(
                    "块参数不合法: block_size={}, bit_depth={}",
                    block_size, bit_depth,
                )));
            }
        }

        let version = data[0x12];
        let loop_info = Self::loop_record_offset(version).and_then(|offset| {
            if offset + LOOP_RECORD_SIZE <= marker_start {
                Some(LoopInfo::parse(&data[offset..offset + LOOP_RECORD_SIZE]))
            } else {
                debug!(
                    "版本 {} 的循环记录超出头部范围 (data_offset=0x{:04X}), 忽略",
                    version, data_offset,
                );
                None
            }
        });

        let header = Self {
            data_offset,
            encoding,
            block_size,
            bit_depth,
            channel_count,
            sample_rate,
            total_samples: BigEndian::read_u32(&data[0x0C..]),
            highpass_frequency: BigEndian::read_u16(&data[0x10..]),
            version,
            flags: data[0x13],
            loop_info,
        };
        debug!(
            "解析头部: {:?}, {} 声道, {} Hz, {} 采样, 版本 {}",
            header.encoding,
            header.channel_count,
            header.sample_rate,
            header.total_samples,
            header.version,
        );
        Ok(header)
    }

    /// 序列化头部
    ///
    /// 输出长度恰为 `header_size()`: 固定字段, 版本要求的循环记录, 零填充, 版权标记.
    pub fn to_bytes(&self) -> CriResult<Vec<u8>> {
        let header_size = self.header_size();
        if header_size < FIXED_FIELDS_SIZE + COPYRIGHT_MARKER.len() {
            return Err(CriError::InvalidArgument(format!(
                "数据偏移过小: 0x{:04X}",
                self.data_offset,
            )));
        }
        let marker_start = header_size - COPYRIGHT_MARKER.len();

        let mut buf = vec![0u8; header_size];
        BigEndian::write_u16(&mut buf[0x00..], HEADER_MAGIC);
        BigEndian::write_u16(&mut buf[0x02..], self.data_offset);
        buf[0x04] = self.encoding.as_u8();
        buf[0x05] = self.block_size;
        buf[0x06] = self.bit_depth;
        buf[0x07] = self.channel_count;
        BigEndian::write_u32(&mut buf[0x08..], self.sample_rate);
        BigEndian::write_u32(&mut buf[0x0C..], self.total_samples);
        BigEndian::write_u16(&mut buf[0x10..], self.highpass_frequency);
        buf[0x12] = self.version;
        buf[0x13] = self.flags;

        if let Some(offset) = Self::loop_record_offset(self.version) {
            let fits = offset + LOOP_RECORD_SIZE <= marker_start;
            match (&self.loop_info, fits) {
                (Some(info), true) => info.write(&mut buf[offset..offset + LOOP_RECORD_SIZE]),
                (Some(_), false) => {
                    return Err(CriError::InvalidArgument(format!(
                        "数据偏移 0x{:04X} 容纳不下版本 {} 的循环记录",
                        self.data_offset, self.version,
                    )));
                }
                // 记录保持全零, 表示未启用循环
                (None, _) => {}
            }
        }

        buf[marker_start..].copy_from_slice(COPYRIGHT_MARKER);
        Ok(buf)
    }
}

fn format_error(message: String) -> CriError {
    warn!("头部校验失败: {}", message);
    CriError::Format(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> StreamHeader {
        StreamHeader {
            data_offset: 0x3C,
            encoding: EncodingType::Standard,
            block_size: 18,
            bit_depth: 4,
            channel_count: 2,
            sample_rate: 44100,
            total_samples: 4096,
            highpass_frequency: 500,
            version: 3,
            flags: 0,
            loop_info: Some(LoopInfo {
                alignment_samples: 12,
                enabled: true,
                begin_sample: 64,
                begin_byte: 0x40 + 2 * 36,
                end_sample: 4000,
                end_byte: 0x40 + 125 * 36,
            }),
        }
    }

    #[test]
    fn test_serialize_then_parse() {
        let header = sample_header();
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len(), 0x40);
        assert_eq!(&bytes[0x3A..0x40], COPYRIGHT_MARKER);
        assert_eq!(StreamHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn test_version4_loop_record_offset() {
        let mut header = sample_header();
        header.version = 4;
        header.data_offset = 0x42;
        let bytes = header.to_bytes().unwrap();
        // 0x14..0x24 为保留区
        assert!(bytes[0x14..0x24].iter().all(|&b| b == 0));
        assert_eq!(BigEndian::read_u32(&bytes[0x24 + 0x08..]), 64);
        assert_eq!(StreamHeader::parse(&bytes).unwrap().loop_info, header.loop_info);
    }

    #[test]
    fn test_loop_record_does_not_fit() {
        let mut header = sample_header();
        header.data_offset = 0x20;
        assert!(matches!(header.to_bytes(), Err(CriError::InvalidArgument(_))));

        header.loop_info = None;
        let bytes = header.to_bytes().unwrap();
        assert_eq!(StreamHeader::parse(&bytes).unwrap().loop_info, None);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample_header().to_bytes().unwrap();
        bytes[0] = 0x12;
        assert!(matches!(StreamHeader::parse(&bytes), Err(CriError::Format(_))));
    }

    #[test]
    fn test_bad_copyright_marker() {
        let mut bytes = sample_header().to_bytes().unwrap();
        bytes[0x3B] = b'C';
        assert!(matches!(StreamHeader::parse(&bytes), Err(CriError::Format(_))));
    }

    #[test]
    fn test_bad_channel_count() {
        let mut bytes = sample_header().to_bytes().unwrap();
        bytes[0x07] = 0;
        assert!(matches!(StreamHeader::parse(&bytes), Err(CriError::Format(_))));
        bytes[0x07] = 9;
        assert!(matches!(StreamHeader::parse(&bytes), Err(CriError::Format(_))));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = sample_header().to_bytes().unwrap();
        assert!(matches!(StreamHeader::parse(&bytes[..0x10]), Err(CriError::Format(_))));
        assert!(matches!(StreamHeader::parse(&bytes[..0x30]), Err(CriError::Format(_))));
    }

    #[test]
    fn test_unknown_encoding() {
        let mut bytes = sample_header().to_bytes().unwrap();
        bytes[0x04] = 0x07;
        assert!(matches!(StreamHeader::parse(&bytes), Err(CriError::Format(_))));
    }

    #[test]
    fn test_ahx_skips_block_checks() {
        let header = StreamHeader {
            data_offset: 0x20,
            encoding: EncodingType::AhxAlt,
            block_size: 0,
            bit_depth: 0,
            channel_count: 1,
            sample_rate: 22050,
            total_samples: 1152,
            highpass_frequency: 0,
            version: 6,
            flags: 0,
            loop_info: None,
        };
        let parsed = StreamHeader::parse(&header.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.codec_id(), CodecId::Ahx);
        assert_eq!(parsed.samples_per_block(), 0);
    }

    #[test]
    fn test_block_byte_offset() {
        let header = sample_header();
        assert_eq!(header.samples_per_block(), 32);
        assert_eq!(header.block_byte_offset(0), Some(0x40));
        assert_eq!(header.block_byte_offset(32), Some(0x40 + 36));
        assert_eq!(header.block_byte_offset(33), Some(0x40 + 72));
    }

    #[test]
    fn test_block_byte_offset_overflow() {
        let header = sample_header();
        assert_eq!(header.block_byte_offset(0xFFFF_FFE0), None);
    }
}
