//! CRI AHX 子带编解码.
//!
//! 类似 MPEG-1 Layer II: 每帧 1152 个采样 = 3 部分 × 4 颗粒 × 3 采样 × 32 子带,
//! 只有前 30 个子带携带数据. 帧以同步字 0xFFF5E0C0 开头并按字节对齐.
//!
//! 帧结构:
//! 1. 同步字 (32 位)
//! 2. 30 个位分配字段 (4×4, 7×3, 19×2 位)
//! 3. 每个已分配子带的 scfsi (2 位)
//! 4. 缩放因子 (每个 6 位, 个数由 scfsi 决定)
//! 5. 按 部分 → 颗粒 → 子带 顺序排列的量化采样
//!
//! 同步字后紧跟 10 个零字节表示整帧静音. 流以 `00 80 01 00 0C "AHXE(c)CRI" 00 00` 结束.

pub mod decoder;
pub mod encoder;
pub mod filterbank;
pub mod tables;

use tables::{ISF_TABLE, QuantizeSpec, SF_TABLE};

/// 帧同步字
pub const FRAME_SYNC: u32 = 0xFFF5_E0C0;

/// 每帧采样数
pub const SAMPLES_PER_FRAME: usize = 1152;

/// 每帧的部分数 (每部分一组缩放因子)
pub const PARTS: usize = 3;

/// 每部分的颗粒数
pub const GRANULES: usize = 4;

/// 静音帧在同步字之后的零字节数
pub const SILENT_FRAME_BYTES: usize = 10;

/// 流结束标记
pub const CLOSING_MARKER: &[u8; 17] = b"\x00\x80\x01\x00\x0cAHXE(c)CRI\x00\x00";

/// 编码器输出的数据偏移 (头部长度 0x24)
pub const ENCODER_DATA_OFFSET: u16 = 0x20;

/// 编码器输出的格式版本
pub const ENCODER_VERSION: u8 = 6;

/// scfsi 对应的缩放因子共享方式: 每个部分使用第几个已写出的缩放因子
pub fn scfsi_pattern(scfsi: u32) -> [usize; PARTS] {
    match scfsi & 3 {
        // 三个部分各不相同
        0 => [0, 1, 2],
        // 前两部分共用
        1 => [0, 0, 1],
        // 全部共用
        2 => [0, 0, 0],
        // 后两部分共用
        _ => [0, 1, 1],
    }
}

/// 由三个部分的缩放因子推导 scfsi
pub fn scfsi_for(scalefactors: &[usize; PARTS]) -> u32 {
    let [sf0, sf1, sf2] = *scalefactors;
    if sf0 == sf1 && sf1 == sf2 {
        2
    } else if sf0 == sf1 {
        1
    } else if sf1 == sf2 {
        3
    } else {
        0
    }
}

/// 选择不被最大幅度超过的最小缩放因子 (即下标最大者)
pub fn select_scalefactor(max_magnitude: i64) -> usize {
    (0..63)
        .rev()
        .find(|&index| max_magnitude < SF_TABLE[index])
        .unwrap_or(0)
}

/// 反量化一个采样字段
///
/// 符号修正后按 `((r + D) × C) >> 28` 还原, 再乘以缩放因子.
pub fn dequantize(class: &QuantizeSpec, raw: u32, scalefactor: usize) -> i64 {
    let bits = class.bits;
    let msb = 1i64 << (bits - 1);
    let mut requantized = i64::from(raw) ^ msb;
    if requantized & msb != 0 {
        requantized -= 1 << bits;
    }
    requantized <<= 28 - (bits - 1);

    let value = ((requantized + class.d) * class.c) >> 28;
    (value * SF_TABLE[scalefactor & 63]) >> 28
}

/// 量化一个子带值为采样字段
pub fn quantize(class: &QuantizeSpec, value: i64, scalefactor: usize) -> u32 {
    let bits = class.bits;
    let msb = 1i64 << (bits - 1);

    let scaled = (value * ISF_TABLE[scalefactor & 63]) >> 28;
    let transformed = ((scaled * class.quant_scale()) >> 28) + class.quant_offset();
    let quantized = (transformed >> (28 - (bits - 1))).clamp(-msb, i64::from(class.levels) - 1 - msb);

    ((quantized & ((1 << bits) - 1)) ^ msb) as u32
}
