//! 采样类型.
//!
//! 一个 [`Sample`] 表示同一时刻所有声道的 PCM 值, 每声道一个有符号 16 位整数.

/// 一个时刻的多声道 PCM 采样 (每声道一个 i16)
pub type Sample = Vec<i16>;

/// 生成指定声道数的静音采样
pub fn silence(channels: usize) -> Sample {
    vec![0; channels]
}

/// 把 i32 饱和到 i16 范围
#[inline]
pub fn clamp_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// 把平面排列的声道数据交错为采样序列
///
/// 各声道长度不一致时以最短者为准.
pub fn interleave(planes: &[Vec<i16>]) -> Vec<Sample> {
    let len = planes.iter().map(Vec::len).min().unwrap_or(0);
    (0..len)
        .map(|i| planes.iter().map(|plane| plane[i]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_i16() {
        assert_eq!(clamp_i16(40000), i16::MAX);
        assert_eq!(clamp_i16(-40000), i16::MIN);
        assert_eq!(clamp_i16(-1234), -1234);
    }

    #[test]
    fn test_interleave() {
        let planes = vec![vec![1, 2, 3], vec![-1, -2]];
        let samples = interleave(&planes);
        assert_eq!(samples, vec![vec![1, -1], vec![2, -2]]);
        assert_eq!(silence(3), vec![0, 0, 0]);
    }
}
