//! 解码器 trait 定义.
//!
//! ADX 与 AHX 解码器都实现 `Decoder` trait.

use adxkit_core::{CriResult, Sample};

use crate::codec_id::CodecId;
use crate::header::{LoopInfo, StreamHeader};

/// 解码选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecoderOptions {
    /// 是否按头部循环信息无限循环播放
    pub looping: bool,
}

impl DecoderOptions {
    /// 启用循环
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

/// 解码器 trait
///
/// 拉取式接口: 调用方反复调用 `next_sample()`, 每次取出一个时刻的多声道采样.
///
/// 解码流程:
/// 1. 由注册表解析头部并创建解码器
/// 2. 反复调用 `next_sample()`, 直到返回 `Ok(None)` (流结束)
/// 3. 需要重新播放时调用 `rewind()`
///
/// 流结束 (`Ok(None)`) 与数据截断 (`Err(CriError::UnexpectedEof)`) 始终可区分.
pub trait Decoder: Send {
    /// 获取解码器标识
    fn codec_id(&self) -> CodecId;

    /// 获取解码器名称
    fn name(&self) -> &str;

    /// 获取流头部
    fn header(&self) -> &StreamHeader;

    /// 声道数
    fn channels(&self) -> usize {
        self.header().channel_count as usize
    }

    /// 采样率
    fn sample_rate(&self) -> u32 {
        self.header().sample_rate
    }

    /// 头部声明的总采样数
    fn total_samples(&self) -> u32 {
        self.header().total_samples
    }

    /// 循环信息
    fn loop_info(&self) -> Option<LoopInfo> {
        self.header().loop_info
    }

    /// 取出下一个采样
    ///
    /// # 返回
    /// - `Ok(Some(sample))`: 下一个时刻的采样, 每声道一个值
    /// - `Ok(None)`: 流已结束
    /// - `Err(_)`: 数据截断或码流损坏
    fn next_sample(&mut self) -> CriResult<Option<Sample>>;

    /// 设置是否循环
    ///
    /// 流没有启用的循环信息时, 设置为 true 不起作用.
    fn set_looping(&mut self, looping: bool);

    /// 回到第一个采样, 清空预测/滤波器状态
    fn rewind(&mut self);
}
