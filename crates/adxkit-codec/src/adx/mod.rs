//! CRI ADX 块式 ADPCM 编解码.
//!
//! 每个声道的块为 18 字节: 16 位缩放因子 + 32 个 4 位有符号差值.
//! 多声道时按块交错 (声道 0 的块, 声道 1 的块, ...).
//! 预测器为二阶 IIR, 系数由高通截止频率推导, 12 位小数定点.
//!
//! 流以缩放因子 0x8001 的结束块收尾.

pub mod decoder;
pub mod encoder;

use std::f64::consts::{PI, SQRT_2};

/// 每块采样数
pub const SAMPLES_PER_BLOCK: usize = 32;

/// 编码器输出的块大小 (字节)
pub const BLOCK_SIZE: u8 = 18;

/// 编码器输出的采样位深
pub const BIT_DEPTH: u8 = 4;

/// 结束块的缩放因子
pub const END_SENTINEL: u16 = 0x8001;

/// 编码器输出的数据偏移 (头部长度 0x40)
pub const ENCODER_DATA_OFFSET: u16 = 0x3C;

/// 编码器输出的格式版本
pub const ENCODER_VERSION: u8 = 3;

/// 由高通截止频率和采样率生成预测系数 (12 位小数定点)
///
/// ```
/// use adxkit_codec::adx::generate_coefficients;
///
/// assert_eq!(generate_coefficients(500, 44100), (7334, -3283));
/// ```
pub fn generate_coefficients(highpass_frequency: u32, sample_rate: u32) -> (i32, i32) {
    let ratio = f64::from(highpass_frequency) / f64::from(sample_rate);
    let a = SQRT_2 - (2.0 * PI * ratio).cos();
    let b = SQRT_2 - 1.0;
    let c = (a - ((a + b) * (a - b)).sqrt()) / b;

    let coeff1 = (2.0 * c * 4096.0).round() as i32;
    let coeff2 = (-(c * c) * 4096.0).round() as i32;
    (coeff1, coeff2)
}

/// 单声道预测历史
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelHistory {
    /// 最近一个输出采样
    pub prev1: i32,
    /// 倒数第二个输出采样
    pub prev2: i32,
}

impl ChannelHistory {
    /// 推入新的输出采样
    #[inline]
    pub fn push(&mut self, sample: i16) {
        self.prev2 = self.prev1;
        self.prev1 = i32::from(sample);
    }
}

/// 二阶预测器
///
/// 编码器和解码器共用同一份整数运算, 保证两端的预测状态逐位一致.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predictor {
    coeff1: i32,
    coeff2: i32,
}

impl Predictor {
    /// 由高通截止频率和采样率构造
    pub fn new(highpass_frequency: u32, sample_rate: u32) -> Self {
        let (coeff1, coeff2) = generate_coefficients(highpass_frequency, sample_rate);
        Self { coeff1, coeff2 }
    }

    /// 系数 (coeff1, coeff2)
    pub fn coefficients(&self) -> (i32, i32) {
        (self.coeff1, self.coeff2)
    }

    /// 根据历史计算预测值
    #[inline]
    pub fn predict(&self, history: &ChannelHistory) -> i32 {
        (self.coeff1 * history.prev1 + self.coeff2 * history.prev2) >> 12
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficients_known_values() {
        assert_eq!(generate_coefficients(500, 44100), (7334, -3283));
        assert_eq!(generate_coefficients(500, 22050), (6569, -2634));
        assert_eq!(generate_coefficients(500, 48000), (7400, -3343));
    }

    #[test]
    fn test_coefficients_deterministic() {
        for (fc, fs) in [(500, 44100), (1000, 32000), (250, 11025), (0, 8000)] {
            assert_eq!(generate_coefficients(fc, fs), generate_coefficients(fc, fs));
        }
    }

    #[test]
    fn test_predict() {
        let predictor = Predictor::new(500, 44100);
        let mut history = ChannelHistory::default();
        assert_eq!(predictor.predict(&history), 0);
        history.push(1000);
        history.push(1000);
        // (7334 - 3283) * 1000 / 4096
        assert_eq!(predictor.predict(&history), 4_051_000 >> 12);
    }
}
