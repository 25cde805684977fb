//! AHX 多相滤波器组 (Polyphase Filterbank)
//!
//! 定点实现, 所有系数为 28 位小数:
//! 1. 分析: 512 点历史 × 窗 → 64 点部分和 → 余弦矩阵 → 32 个子带值
//! 2. 合成: 32 个子带值 → 余弦矩阵 → 1024 点 V 缓冲 → 窗 → 32 个 PCM
//!
//! 两端使用同一个 512 点窗, 分析与合成对称, 重建延迟为 481 个采样.

use std::f64::consts::PI;
use std::sync::OnceLock;

use adxkit_core::sample::clamp_i16;

use super::tables::WINDOW;

/// 子带数
pub const SUBBANDS: usize = 32;

/// 28 位小数的 1.0
const FRAC_ONE: f64 = (1u64 << 28) as f64;

/// 分析余弦矩阵 M[sb][i] = cos((2sb+1)(i-16)π/64)
static ANALYSIS_MATRIX: OnceLock<[[i64; 64]; SUBBANDS]> = OnceLock::new();

/// 合成余弦矩阵 N[i][k] = cos((16+i)(2k+1)π/64)
static SYNTHESIS_MATRIX: OnceLock<[[i64; SUBBANDS]; 64]> = OnceLock::new();

fn analysis_matrix() -> &'static [[i64; 64]; SUBBANDS] {
    ANALYSIS_MATRIX.get_or_init(|| {
        let mut m = [[0; 64]; SUBBANDS];
        for (sb, row) in m.iter_mut().enumerate() {
            for (i, v) in row.iter_mut().enumerate() {
                let angle = ((2 * sb + 1) as f64) * (i as f64 - 16.0) * PI / 64.0;
                *v = (angle.cos() * FRAC_ONE) as i64;
            }
        }
        m
    })
}

fn synthesis_matrix() -> &'static [[i64; SUBBANDS]; 64] {
    SYNTHESIS_MATRIX.get_or_init(|| {
        let mut n = [[0; SUBBANDS]; 64];
        for (i, row) in n.iter_mut().enumerate() {
            for (k, v) in row.iter_mut().enumerate() {
                let angle = ((16 + i) * (2 * k + 1)) as f64 * PI / 64.0;
                *v = (angle.cos() * FRAC_ONE) as i64;
            }
        }
        n
    })
}

/// 分析滤波器 (编码端)
#[derive(Debug, Clone)]
pub struct AnalysisFilter {
    /// 环形历史缓冲
    history: [i16; 512],
    /// 最旧采样的位置
    pos: usize,
}

impl AnalysisFilter {
    pub fn new() -> Self {
        Self {
            history: [0; 512],
            pos: 0,
        }
    }

    /// 第 n 新的采样 (n = 0 为最新)
    #[inline]
    fn newest(&self, n: usize) -> i64 {
        i64::from(self.history[(self.pos + 511 - n) % 512])
    }

    /// 推入 32 个新采样, 返回 32 个子带值
    pub fn process(&mut self, samples: &[i16; SUBBANDS]) -> [i64; SUBBANDS] {
        self.history[self.pos..self.pos + SUBBANDS].copy_from_slice(samples);
        self.pos = (self.pos + SUBBANDS) % 512;

        let mut partial = [0i64; 64];
        for (i, y) in partial.iter_mut().enumerate() {
            for j in 0..8 {
                let n = i + 64 * j;
                *y += (self.newest(n) * WINDOW[n]) >> 15;
            }
        }

        let matrix = analysis_matrix();
        let mut out = [0i64; SUBBANDS];
        for (sb, value) in out.iter_mut().enumerate() {
            *value = matrix[sb]
                .iter()
                .zip(partial.iter())
                .map(|(&m, &y)| (m * y) >> 28)
                .sum();
        }
        out
    }
}

impl Default for AnalysisFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// 合成滤波器 (解码端)
#[derive(Debug, Clone)]
pub struct SynthesisFilter {
    v: [i64; 1024],
}

impl SynthesisFilter {
    pub fn new() -> Self {
        Self { v: [0; 1024] }
    }

    /// 清空 V 缓冲
    pub fn reset(&mut self) {
        self.v = [0; 1024];
    }

    /// 合成 32 个子带值为 32 个 PCM 采样
    pub fn process(&mut self, subbands: &[i64; SUBBANDS]) -> [i16; SUBBANDS] {
        self.v.copy_within(0..960, 64);

        let matrix = synthesis_matrix();
        for (i, row) in matrix.iter().enumerate() {
            self.v[i] = row
                .iter()
                .zip(subbands.iter())
                .map(|(&n, &s)| (n * s) >> 28)
                .sum();
        }

        let mut out = [0i16; SUBBANDS];
        for (j, pcm) in out.iter_mut().enumerate() {
            let mut acc: i64 = 0;
            for k in 0..16 {
                let idx = j + 32 * k;
                // 窗的每 32 项依次取 V 中每 128 项的前半或后半
                let vi = idx + 64 * (idx / 64) + if idx % 64 >= 32 { 64 } else { 0 };
                let product = i128::from(self.v[vi]) * i128::from(WINDOW[idx] * 32);
                acc += (product >> 28) as i64;
            }
            *pcm = clamp_i16((acc >> 13).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32);
        }
        out
    }
}

impl Default for SynthesisFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: usize = 481;

    fn reconstruct(input: &[i16]) -> Vec<i16> {
        let mut analysis = AnalysisFilter::new();
        let mut synthesis = SynthesisFilter::new();
        let mut out = Vec::with_capacity(input.len());
        for chunk in input.chunks_exact(SUBBANDS) {
            let mut block = [0i16; SUBBANDS];
            block.copy_from_slice(chunk);
            let subbands = analysis.process(&block);
            out.extend_from_slice(&synthesis.process(&subbands));
        }
        out
    }

    #[test]
    fn test_silence_stays_silent() {
        let out = reconstruct(&[0; 1024]);
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_perfect_reconstruction_with_delay() {
        let input: Vec<i16> = (0..32 * 64)
            .map(|i| {
                let t = i as f64 / 22050.0;
                ((2.0 * PI * 440.0 * t).sin() * 8000.0 + (2.0 * PI * 3000.0 * t).sin() * 4000.0)
                    as i16
            })
            .collect();
        let out = reconstruct(&input);
        let max_err = (DELAY..input.len())
            .map(|i| (i32::from(out[i]) - i32::from(input[i - DELAY])).abs())
            .max()
            .unwrap();
        assert!(max_err <= 8, "最大误差 {}", max_err);
    }

    #[test]
    fn test_matrices_cached() {
        assert!(std::ptr::eq(analysis_matrix(), analysis_matrix()));
        assert_eq!(synthesis_matrix()[16][0], 0);
        assert_eq!(analysis_matrix()[0][16], 1 << 28);
    }
}
