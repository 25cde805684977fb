//! 编码器 trait 定义.
//!
//! ADX 与 AHX 编码器都实现 `Encoder` trait.

use adxkit_core::{CancelToken, CriError, CriResult, Sample};

use crate::codec_id::CodecId;

/// ADX 编码默认高通截止频率 (Hz)
pub const DEFAULT_HIGHPASS_FREQUENCY: u16 = 500;

/// 请求的循环区间 (以输入采样计)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopPoints {
    /// 循环起点
    pub start_sample: u32,
    /// 循环终点 (不含)
    pub end_sample: u32,
}

impl LoopPoints {
    /// 创建循环区间, 要求 `end > start`
    pub fn new(start_sample: u32, end_sample: u32) -> CriResult<Self> {
        if end_sample <= start_sample {
            return Err(CriError::InvalidArgument(format!(
                "循环终点 {} 必须大于起点 {}",
                end_sample, start_sample,
            )));
        }
        Ok(Self {
            start_sample,
            end_sample,
        })
    }
}

/// 编码参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSpec {
    /// 声道数
    pub channels: u32,
    /// 采样率
    pub sample_rate: u32,
    /// 高通截止频率 (仅 ADX 使用)
    pub highpass_frequency: u16,
    /// 循环区间 (仅 ADX 支持)
    pub loop_points: Option<LoopPoints>,
}

impl EncoderSpec {
    /// 创建编码参数, 使用默认高通频率且不循环
    pub fn new(channels: u32, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
            highpass_frequency: DEFAULT_HIGHPASS_FREQUENCY,
            loop_points: None,
        }
    }

    /// 设置高通截止频率
    pub fn with_highpass(mut self, frequency: u16) -> Self {
        self.highpass_frequency = frequency;
        self
    }

    /// 设置循环区间
    pub fn with_loop(mut self, points: LoopPoints) -> Self {
        self.loop_points = Some(points);
        self
    }
}

/// 编码器 trait
///
/// 推送式接口:
/// 1. 反复调用 `encode()` 送入采样
/// 2. 调用 `finish()` 写出结束标记并生成完整文件 (头部在此时一次性写出)
///
/// 编码被取消后, 编码器进入不可用状态, 之后的 `encode()`/`finish()` 都返回
/// `CriError::Cancelled`, 不会产生看似有效的输出.
pub trait Encoder: Send {
    /// 获取编码器标识
    fn codec_id(&self) -> CodecId;

    /// 获取编码器名称
    fn name(&self) -> &str;

    /// 已送入的采样数 (含循环对齐前置的静音)
    fn samples_encoded(&self) -> u32;

    /// 送入一批采样
    ///
    /// 每个采样之前检查一次 `cancel`.
    fn encode(&mut self, samples: &[Sample], cancel: &CancelToken) -> CriResult<()>;

    /// 完成编码, 返回完整的文件字节
    fn finish(self: Box<Self>) -> CriResult<Vec<u8>>;
}
