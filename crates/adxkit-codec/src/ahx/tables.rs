//! AHX 常量表.
//!
//! 位分配宽度, 量化类别, 缩放因子表及其倒数, 分析/合成共用的 512 点窗.
//! 全部为模块级不可变常量, 可在线程间自由共享.

/// 编码的子带数 (32 个子带中只有前 30 个携带数据)
pub const CODED_SUBBANDS: usize = 30;

/// 每个子带位分配字段的位宽
pub const ALLOCATION_BITS: [u32; CODED_SUBBANDS] = [
    4, 4, 4, 4, 3, 3, 3, 3, 3, 3, 3, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
];

/// 编码器写出的固定位分配
pub const ENCODER_ALLOCATION: [u32; CODED_SUBBANDS] = [
    6, 6, 6, 6, 4, 4, 3, 3, 3, 3, 3, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
];

/// 量化类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizeSpec {
    /// 量化级数
    pub levels: u32,
    /// 分组编码时 3 个采样共用的字段位宽, 0 表示不分组
    pub group_bits: u32,
    /// 单个采样的位宽
    pub bits: u32,
    /// 反量化缩放常数 C (28 位小数)
    pub c: i64,
    /// 反量化偏移常数 D (28 位小数)
    pub d: i64,
}

impl QuantizeSpec {
    const fn new(levels: u32, group_bits: u32, bits: u32, c: i64, d: i64) -> Self {
        Self {
            levels,
            group_bits,
            bits,
            c,
            d,
        }
    }

    /// 是否 3 个采样合并为一个字段
    pub const fn is_grouped(&self) -> bool {
        self.group_bits != 0
    }

    /// 量化缩放常数 A = levels / 2^bits (28 位小数)
    pub const fn quant_scale(&self) -> i64 {
        (self.levels as i64) << (28 - self.bits)
    }

    /// 量化偏移常数 B = A - 1 (28 位小数)
    pub const fn quant_offset(&self) -> i64 {
        self.quant_scale() - (1 << 28)
    }
}

/// 全部量化类别, 按级数递增
pub const QUANT_CLASSES: [QuantizeSpec; 17] = [
    QuantizeSpec::new(3, 5, 2, 0x15555555, 0x08000000),
    QuantizeSpec::new(5, 7, 3, 0x1999999A, 0x08000000),
    QuantizeSpec::new(7, 0, 3, 0x12492492, 0x04000000),
    QuantizeSpec::new(9, 10, 4, 0x1C71C71C, 0x08000000),
    QuantizeSpec::new(15, 0, 4, 0x11111111, 0x02000000),
    QuantizeSpec::new(31, 0, 5, 0x10842108, 0x01000000),
    QuantizeSpec::new(63, 0, 6, 0x10410410, 0x00800000),
    QuantizeSpec::new(127, 0, 7, 0x10204081, 0x00400000),
    QuantizeSpec::new(255, 0, 8, 0x10101010, 0x00200000),
    QuantizeSpec::new(511, 0, 9, 0x10080402, 0x00100000),
    QuantizeSpec::new(1023, 0, 10, 0x10040100, 0x00080000),
    QuantizeSpec::new(2047, 0, 11, 0x10020040, 0x00040000),
    QuantizeSpec::new(4095, 0, 12, 0x10010010, 0x00020000),
    QuantizeSpec::new(8191, 0, 13, 0x10008004, 0x00010000),
    QuantizeSpec::new(16383, 0, 14, 0x10004001, 0x00008000),
    QuantizeSpec::new(32767, 0, 15, 0x10002000, 0x00004000),
    QuantizeSpec::new(65535, 0, 16, 0x10001000, 0x00002000),
];

/// 低频子带 (4 位分配字段) 的类别下标, 以 `allocation - 1` 索引
pub const LOW_BAND_CLASSES: [u8; 15] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14];

/// 中频子带 (3 位分配字段) 的类别下标
pub const MID_BAND_CLASSES: [u8; 7] = [0, 1, 3, 4, 5, 6, 7];

/// 高频子带 (2 位分配字段) 的类别下标
pub const HIGH_BAND_CLASSES: [u8; 3] = [0, 1, 3];

/// 由子带与位分配值查找量化类别, 分配为 0 时返回 None
pub fn quant_class(subband: usize, allocation: u32) -> Option<&'static QuantizeSpec> {
    let index = (allocation as usize).checked_sub(1)?;
    let class = match ALLOCATION_BITS.get(subband)? {
        4 => LOW_BAND_CLASSES.get(index),
        3 => MID_BAND_CLASSES.get(index),
        _ => HIGH_BAND_CLASSES.get(index),
    }?;
    QUANT_CLASSES.get(*class as usize)
}

/// 缩放因子表 (28 位小数, 第 63 项为 0)
pub const SF_TABLE: [i64; 64] = [
     0x20000000, 0x1965FEA5, 0x1428A2FA, 0x10000000, 0x0CB2FF53, 0x0A14517D, 0x08000000, 0x06597FA9,
     0x050A28BE, 0x04000000, 0x032CBFD5, 0x0285145F, 0x02000000, 0x01965FEA, 0x01428A30, 0x01000000,
     0x00CB2FF5, 0x00A14518, 0x00800000, 0x006597FB, 0x0050A28C, 0x00400000, 0x0032CBFD, 0x00285146,
     0x00200000, 0x001965FF, 0x001428A3, 0x00100000, 0x000CB2FF, 0x000A1451, 0x00080000, 0x00065980,
     0x00050A29, 0x00040000, 0x00032CC0, 0x00028514, 0x00020000, 0x00019660, 0x0001428A, 0x00010000,
     0x0000CB30, 0x0000A145, 0x00008000, 0x00006598, 0x000050A3, 0x00004000, 0x000032CC, 0x00002851,
     0x00002000, 0x00001966, 0x00001429, 0x00001000, 0x00000CB3, 0x00000A14, 0x00000800, 0x00000659,
     0x0000050A, 0x00000400, 0x0000032D, 0x00000285, 0x00000200, 0x00000196, 0x00000143, 0x00000000,
];

/// 缩放因子倒数表 (28 位小数, 第 63 项为 0)
pub const ISF_TABLE: [i64; 64] = [
     0x00000008000000, 0x0000000A14517C, 0x0000000CB2FF52, 0x00000010000000, 0x0000001428A2F8, 0x0000001965FEA4,
     0x00000020000000, 0x000000285145F5, 0x00000032CBFD4E, 0x00000040000000, 0x00000050A28BDD, 0x0000006597FA9C,
     0x00000080000000, 0x000000A14517ED, 0x000000CB2FF4E8, 0x00000100000000, 0x000001428A2FDB, 0x000001965FE9D1,
     0x00000200000000, 0x00000285145C8A, 0x0000032CBFD3A3, 0x00000400000000, 0x0000050A28C5C7, 0x000006597FA747,
     0x00000800000000, 0x00000A145158C2, 0x00000CB2FF4E8E, 0x00001000000000, 0x00001428A37CB4, 0x00001965FFDFA8,
     0x00002000000000, 0x0000285143CCA8, 0x000032CBFAB527, 0x00004000000000, 0x000050A2879951, 0x000065980992F3,
     0x00008000000000, 0x0000A1450F32A2, 0x0000CB301325E7, 0x00010000000000, 0x0001428A1E6544, 0x00019660264BCF,
     0x00020000000000, 0x000285143CCA88, 0x00032CBB427564, 0x00040000000000, 0x00050A28799510, 0x0006598AAD93B4,
     0x00080000000000, 0x000A1450F32A20, 0x000CB2C4B983B2, 0x00100000000000, 0x001428A1E65441, 0x001966CC01966C,
     0x00200000000000, 0x00285470CC2B7B, 0x0032CD98032CD9, 0x00400000000000, 0x00509C2E9A4AF1, 0x00659B300659B3,
     0x00800000000000, 0x00A16B312EA8FC, 0x00CAE5D85F1BBD, 0x00000000000000,
];

/// 512 点多相窗
pub const WINDOW: [i64; 512] = [
     0x000000,-0x000080,-0x000080,-0x000080,-0x000080,-0x000080,-0x000080,-0x000100,
    -0x000100,-0x000100,-0x000100,-0x000180,-0x000180,-0x000200,-0x000200,-0x000280,
    -0x000280,-0x000300,-0x000380,-0x000380,-0x000400,-0x000480,-0x000500,-0x000580,
    -0x000680,-0x000700,-0x000800,-0x000880,-0x000980,-0x000A80,-0x000C00,-0x000D00,
    -0x000E80,-0x000F80,-0x001180,-0x001300,-0x001480,-0x001680,-0x001880,-0x001A80,
    -0x001D00,-0x001F80,-0x002200,-0x002480,-0x002780,-0x002A80,-0x002D80,-0x003080,
    -0x003400,-0x003780,-0x003A80,-0x003E80,-0x004200,-0x004580,-0x004980,-0x004D00,
    -0x005080,-0x005480,-0x005800,-0x005B80,-0x005F00,-0x006200,-0x006500,-0x006800,
     0x006A80, 0x006D00, 0x006F00, 0x007080, 0x007180, 0x007200, 0x007200, 0x007180,
     0x007000, 0x006E80, 0x006B80, 0x006800, 0x006400, 0x005E80, 0x005880, 0x005180,
     0x004900, 0x003F80, 0x003500, 0x002980, 0x001C80, 0x000E80,-0x000100,-0x001200,
    -0x002400,-0x003780,-0x004C80,-0x006280,-0x007A00,-0x009300,-0x00AD80,-0x00C880,
    -0x00E580,-0x010380,-0x012280,-0x014280,-0x016380,-0x018580,-0x01A800,-0x01CB80,
    -0x01EF80,-0x021400,-0x023880,-0x025D00,-0x028180,-0x02A600,-0x02CA00,-0x02ED00,
    -0x030F80,-0x033100,-0x035100,-0x036F80,-0x038C80,-0x03A700,-0x03BF80,-0x03D500,
    -0x03E880,-0x03F800,-0x040480,-0x040D80,-0x041280,-0x041380,-0x041000,-0x040780,
     0x03FA80, 0x03E800, 0x03D000, 0x03B280, 0x038F00, 0x036580, 0x033600, 0x02FF80,
     0x02C300, 0x028000, 0x023580, 0x01E500, 0x018D00, 0x012E80, 0x00C900, 0x005C80,
    -0x001680,-0x009000,-0x011080,-0x019700,-0x022380,-0x02B600,-0x034E00,-0x03EB00,
    -0x048D00,-0x053380,-0x05DE00,-0x068B80,-0x073C80,-0x07EF80,-0x08A480,-0x095A00,
    -0x0A1080,-0x0AC680,-0x0B7B80,-0x0C2E80,-0x0CDE80,-0x0D8B80,-0x0E3380,-0x0ED680,
    -0x0F7300,-0x100880,-0x109580,-0x111980,-0x119300,-0x120180,-0x126400,-0x12B880,
    -0x12FF80,-0x133700,-0x135E00,-0x137380,-0x137700,-0x136780,-0x134380,-0x130B00,
    -0x12BC00,-0x125680,-0x11D980,-0x114400,-0x109600,-0x0FCE00,-0x0EEC00,-0x0DEF00,
     0x0CD700, 0x0BA380, 0x0A5400, 0x08E880, 0x076000, 0x05BB80, 0x03FA80, 0x021D00,
     0x002300,-0x01F300,-0x042500,-0x067200,-0x08DA80,-0x0B5D00,-0x0DF900,-0x10AE00,
    -0x137B80,-0x165F80,-0x195A00,-0x1C6A00,-0x1F8D80,-0x22C380,-0x260B00,-0x296280,
    -0x2CC880,-0x303B00,-0x33B900,-0x374080,-0x3AD000,-0x3E6580,-0x41FF80,-0x459C00,
    -0x493880,-0x4CD400,-0x506C00,-0x53FF00,-0x578A80,-0x5B0C80,-0x5E8300,-0x61EC80,
    -0x654680,-0x688F00,-0x6BC500,-0x6EE500,-0x71EE80,-0x74DF00,-0x77B480,-0x7A6E00,
    -0x7D0980,-0x7F8500,-0x81DF00,-0x841680,-0x862A00,-0x881780,-0x89DF00,-0x8B7E00,
    -0x8CF480,-0x8E4180,-0x8F6380,-0x905A00,-0x912480,-0x91C300,-0x923400,-0x927800,
     0x928F00, 0x927800, 0x923400, 0x91C300, 0x912480, 0x905A00, 0x8F6380, 0x8E4180,
     0x8CF480, 0x8B7E00, 0x89DF00, 0x881780, 0x862A00, 0x841680, 0x81DF00, 0x7F8500,
     0x7D0980, 0x7A6E00, 0x77B480, 0x74DF00, 0x71EE80, 0x6EE500, 0x6BC500, 0x688F00,
     0x654680, 0x61EC80, 0x5E8300, 0x5B0C80, 0x578A80, 0x53FF00, 0x506C00, 0x4CD400,
     0x493880, 0x459C00, 0x41FF80, 0x3E6580, 0x3AD000, 0x374080, 0x33B900, 0x303B00,
     0x2CC880, 0x296280, 0x260B00, 0x22C380, 0x1F8D80, 0x1C6A00, 0x195A00, 0x165F80,
     0x137B80, 0x10AE00, 0x0DF900, 0x0B5D00, 0x08DA80, 0x067200, 0x042500, 0x01F300,
    -0x002300,-0x021D00,-0x03FA80,-0x05BB80,-0x076000,-0x08E880,-0x0A5400,-0x0BA380,
     0x0CD700, 0x0DEF00, 0x0EEC00, 0x0FCE00, 0x109600, 0x114400, 0x11D980, 0x125680,
     0x12BC00, 0x130B00, 0x134380, 0x136780, 0x137700, 0x137380, 0x135E00, 0x133700,
     0x12FF80, 0x12B880, 0x126400, 0x120180, 0x119300, 0x111980, 0x109580, 0x100880,
     0x0F7300, 0x0ED680, 0x0E3380, 0x0D8B80, 0x0CDE80, 0x0C2E80, 0x0B7B80, 0x0AC680,
     0x0A1080, 0x095A00, 0x08A480, 0x07EF80, 0x073C80, 0x068B80, 0x05DE00, 0x053380,
     0x048D00, 0x03EB00, 0x034E00, 0x02B600, 0x022380, 0x019700, 0x011080, 0x009000,
     0x001680,-0x005C80,-0x00C900,-0x012E80,-0x018D00,-0x01E500,-0x023580,-0x028000,
    -0x02C300,-0x02FF80,-0x033600,-0x036580,-0x038F00,-0x03B280,-0x03D000,-0x03E800,
     0x03FA80, 0x040780, 0x041000, 0x041380, 0x041280, 0x040D80, 0x040480, 0x03F800,
     0x03E880, 0x03D500, 0x03BF80, 0x03A700, 0x038C80, 0x036F80, 0x035100, 0x033100,
     0x030F80, 0x02ED00, 0x02CA00, 0x02A600, 0x028180, 0x025D00, 0x023880, 0x021400,
     0x01EF80, 0x01CB80, 0x01A800, 0x018580, 0x016380, 0x014280, 0x012280, 0x010380,
     0x00E580, 0x00C880, 0x00AD80, 0x009300, 0x007A00, 0x006280, 0x004C80, 0x003780,
     0x002400, 0x001200, 0x000100,-0x000E80,-0x001C80,-0x002980,-0x003500,-0x003F80,
    -0x004900,-0x005180,-0x005880,-0x005E80,-0x006400,-0x006800,-0x006B80,-0x006E80,
    -0x007000,-0x007180,-0x007200,-0x007200,-0x007180,-0x007080,-0x006F00,-0x006D00,
     0x006A80, 0x006800, 0x006500, 0x006200, 0x005F00, 0x005B80, 0x005800, 0x005480,
     0x005080, 0x004D00, 0x004980, 0x004580, 0x004200, 0x003E80, 0x003A80, 0x003780,
     0x003400, 0x003080, 0x002D80, 0x002A80, 0x002780, 0x002480, 0x002200, 0x001F80,
     0x001D00, 0x001A80, 0x001880, 0x001680, 0x001480, 0x001300, 0x001180, 0x000F80,
     0x000E80, 0x000D00, 0x000C00, 0x000A80, 0x000980, 0x000880, 0x000800, 0x000700,
     0x000680, 0x000580, 0x000500, 0x000480, 0x000400, 0x000380, 0x000380, 0x000300,
     0x000280, 0x000280, 0x000200, 0x000200, 0x000180, 0x000180, 0x000100, 0x000100,
     0x000100, 0x000100, 0x000080, 0x000080, 0x000080, 0x000080, 0x000080, 0x000080,
];
