//! 头部探测输出.

use adxkit_codec::StreamHeader;
use serde::Serialize;

/// 探测结果
#[derive(Debug, Serialize)]
pub struct ProbeOutput {
    pub filename: String,
    pub codec_name: String,
    pub encoding: u8,
    pub version: u8,
    pub channels: u8,
    pub sample_rate: u32,
    pub total_samples: u32,
    pub duration: f64,
    pub header_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_size: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_depth: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highpass_frequency: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#loop: Option<LoopOutput>,
}

/// 循环信息
#[derive(Debug, Serialize)]
pub struct LoopOutput {
    pub enabled: bool,
    pub alignment_samples: u16,
    pub begin_sample: u32,
    pub begin_byte: u32,
    pub end_sample: u32,
    pub end_byte: u32,
}

impl ProbeOutput {
    pub fn new(filename: &str, header: &StreamHeader) -> Self {
        let nonzero_u8 = |v: u8| (v != 0).then_some(v);
        let duration = if header.sample_rate > 0 {
            f64::from(header.total_samples) / f64::from(header.sample_rate)
        } else {
            0.0
        };
        Self {
            filename: filename.to_string(),
            codec_name: header.codec_id().name().to_string(),
            encoding: header.encoding.as_u8(),
            version: header.version,
            channels: header.channel_count,
            sample_rate: header.sample_rate,
            total_samples: header.total_samples,
            duration,
            header_size: header.header_size(),
            block_size: nonzero_u8(header.block_size),
            bit_depth: nonzero_u8(header.bit_depth),
            highpass_frequency: (header.highpass_frequency != 0).then_some(header.highpass_frequency),
            r#loop: header.loop_info.map(|info| LoopOutput {
                enabled: info.enabled,
                alignment_samples: info.alignment_samples,
                begin_sample: info.begin_sample,
                begin_byte: info.begin_byte,
                end_sample: info.end_sample,
                end_byte: info.end_byte,
            }),
        }
    }

    /// 文本格式输出
    pub fn print_text(&self) {
        println!("文件: {}", self.filename);
        println!("  编解码器: {} (编码类型 0x{:02X}, 版本 {})", self.codec_name, self.encoding, self.version);
        println!("  采样率: {} Hz", self.sample_rate);
        println!("  声道数: {}", self.channels);
        println!("  总采样数: {} ({:.3} 秒)", self.total_samples, self.duration);
        println!("  头部长度: 0x{:X}", self.header_size);
        if let (Some(block), Some(bits)) = (self.block_size, self.bit_depth) {
            println!("  块大小: {} 字节, {} 位/采样", block, bits);
        }
        if let Some(frequency) = self.highpass_frequency {
            println!("  高通频率: {} Hz", frequency);
        }
        match &self.r#loop {
            Some(info) => println!(
                "  循环: {} [{} → {}], 字节 [0x{:X} → 0x{:X}], 对齐 {}",
                if info.enabled { "启用" } else { "禁用" },
                info.begin_sample,
                info.end_sample,
                info.begin_byte,
                info.end_byte,
                info.alignment_samples,
            ),
            None => println!("  循环: 无"),
        }
    }
}
