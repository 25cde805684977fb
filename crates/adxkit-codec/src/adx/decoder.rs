//! ADX 解码器.
//!
//! 状态: 头部已解析 → 解码中 → 已结束. 每次缓冲区耗尽时解码一组块 (每声道一个),
//! 遇到结束块 (缩放因子 0x8001) 或达到总采样数时结束.

use adxkit_core::bitreader::BitReader;
use adxkit_core::sample::clamp_i16;
use adxkit_core::{BitCursor, CriError, CriResult, Sample};
use bytes::Bytes;
use log::{debug, trace, warn};

use super::{ChannelHistory, END_SENTINEL, Predictor};
use crate::codec_id::CodecId;
use crate::decoder::Decoder;
use crate::header::{EncodingType, LoopInfo, StreamHeader};

/// 解码状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    /// 头部已解析, 尚未输出采样
    Ready,
    /// 正在输出采样
    Streaming,
    /// 已结束
    Exhausted,
}

/// ADX 解码器
pub struct AdxDecoder {
    header: StreamHeader,
    data: Bytes,
    predictor: Predictor,
    samples_per_block: usize,
    /// 下一个块的读取位置
    cursor: BitCursor,
    history: Vec<ChannelHistory>,
    /// 当前块的解码结果, 按声道存放
    block: Vec<Vec<i16>>,
    block_pos: usize,
    block_len: usize,
    /// 下一个输出采样的序号
    sample_index: u32,
    state: StreamState,
    looping: bool,
    /// 有效的循环区间 (校验失败时为 None)
    loop_region: Option<LoopInfo>,
    /// 下一次调用时跳回循环起点
    loop_pending: bool,
    /// 跳回后需要丢弃的块内采样数
    skip_samples: usize,
    /// 首次解码循环起点所在块时的预测历史
    loop_snapshot: Option<Vec<ChannelHistory>>,
}

impl AdxDecoder {
    /// 创建解码器 (供注册表使用)
    pub fn create(header: StreamHeader, data: Bytes) -> CriResult<Box<dyn Decoder>> {
        Ok(Box::new(Self::new(header, data)?))
    }

    /// 由已解析的头部和完整文件数据创建解码器
    pub fn new(header: StreamHeader, data: Bytes) -> CriResult<Self> {
        if header.encoding != EncodingType::Standard {
            return Err(CriError::Unsupported(format!(
                "ADX 编码类型 {:?} 暂不支持",
                header.encoding,
            )));
        }

        let samples_per_block = header.samples_per_block() as usize;
        let channels = header.channel_count as usize;
        let predictor = Predictor::new(
            u32::from(header.highpass_frequency),
            header.sample_rate,
        );
        let loop_region = validate_loop(&header, data.len(), samples_per_block);

        debug!(
            "打开 ADX 解码器: {} 声道, {} Hz, 块 {} 字节/{} 采样, 系数 {:?}",
            channels,
            header.sample_rate,
            header.block_size,
            samples_per_block,
            predictor.coefficients(),
        );

        Ok(Self {
            cursor: BitCursor::at_byte(header.header_size()),
            history: vec![ChannelHistory::default(); channels],
            block: vec![vec![0; samples_per_block]; channels],
            block_pos: 0,
            block_len: 0,
            sample_index: 0,
            state: StreamState::Ready,
            looping: false,
            loop_region,
            loop_pending: false,
            skip_samples: 0,
            loop_snapshot: None,
            header,
            data,
            predictor,
            samples_per_block,
        })
    }

    /// 当前生效的循环区间
    fn active_loop(&self) -> Option<LoopInfo> {
        if self.looping { self.loop_region } else { None }
    }

    /// 解码下一组块, 返回 false 表示遇到结束块
    fn decode_block(&mut self) -> CriResult<bool> {
        // 循环起点所在块第一次解码前, 记录预测历史.
        // 不论是否开启循环都要记录, 中途开启循环时才能正确跳回
        if let Some(region) = self.loop_region {
            let block_start = region.begin_sample - region.begin_sample % self.samples_per_block as u32;
            if self.sample_index == block_start && self.loop_snapshot.is_none() {
                self.loop_snapshot = Some(self.history.clone());
            }
        }

        let block_size = self.header.block_size as usize;
        let bit_depth = u32::from(self.header.bit_depth);
        let start = self.cursor.byte;

        for ch in 0..self.history.len() {
            let mut reader = BitReader::at(&self.data, BitCursor::at_byte(start + ch * block_size));
            let scale = reader.read_bits(16)?;
            if scale == u32::from(END_SENTINEL) {
                trace!("ADX 结束块: 偏移 0x{:X}", start + ch * block_size);
                return Ok(false);
            }

            let scale = scale as i32;
            let history = &mut self.history[ch];
            for slot in self.block[ch].iter_mut() {
                let delta = scale * reader.read_bits_signed(bit_depth)?;
                let sample = clamp_i16(self.predictor.predict(history) + delta);
                history.push(sample);
                *slot = sample;
            }
        }

        self.cursor = BitCursor::at_byte(start + block_size * self.history.len());
        self.block_pos = 0;
        self.block_len = self.samples_per_block;
        Ok(true)
    }

    /// 跳回循环起点
    fn jump_to_loop_begin(&mut self, region: LoopInfo) {
        let per_block = self.samples_per_block as u32;
        let skip = region.begin_sample % per_block;

        trace!(
            "ADX 循环: 采样 {} → {} (偏移 0x{:X})",
            self.sample_index, region.begin_sample, region.begin_byte,
        );
        self.cursor = BitCursor::at_byte(region.begin_byte as usize);
        self.sample_index = region.begin_sample - skip;
        self.skip_samples = skip as usize;
        self.block_pos = 0;
        self.block_len = 0;
        if let Some(snapshot) = &self.loop_snapshot {
            self.history.clone_from(snapshot);
        }
        self.loop_pending = false;
    }
}

/// 校验头部中的循环信息, 不可用时返回 None
fn validate_loop(header: &StreamHeader, data_len: usize, samples_per_block: usize) -> Option<LoopInfo> {
    let info = header.loop_info.filter(|info| info.enabled)?;
    let per_block = samples_per_block as u32;
    // 损坏的循环记录可能给出极大的采样序号, 按 u64 计算避免溢出
    let expected_byte = header.header_size() as u64
        + u64::from(info.begin_sample / per_block)
            * u64::from(header.block_size)
            * u64::from(header.channel_count);

    if info.end_sample <= info.begin_sample
        || info.end_sample > header.total_samples
        || (info.begin_byte as usize) >= data_len
        || (info.begin_byte as usize) < header.header_size()
        || u64::from(info.begin_byte) != expected_byte
    {
        warn!(
            "ADX 循环信息不一致, 已禁用: 起点 {} (0x{:X}), 终点 {}, 总采样 {}",
            info.begin_sample, info.begin_byte, info.end_sample, header.total_samples,
        );
        return None;
    }
    Some(info)
}

impl Decoder for AdxDecoder {
    fn codec_id(&self) -> CodecId {
        CodecId::Adx
    }

    fn name(&self) -> &str {
        "adx"
    }

    fn header(&self) -> &StreamHeader {
        &self.header
    }

    fn next_sample(&mut self) -> CriResult<Option<Sample>> {
        if self.state == StreamState::Exhausted {
            return Ok(None);
        }

        if self.loop_pending {
            match self.active_loop() {
                Some(region) => self.jump_to_loop_begin(region),
                None => self.loop_pending = false,
            }
        }

        if self.active_loop().is_none() && self.sample_index >= self.header.total_samples {
            self.state = StreamState::Exhausted;
            return Ok(None);
        }

        if self.block_pos >= self.block_len {
            if !self.decode_block()? {
                self.state = StreamState::Exhausted;
                return Ok(None);
            }
            if self.skip_samples > 0 {
                self.block_pos = self.skip_samples;
                self.sample_index += self.skip_samples as u32;
                self.skip_samples = 0;
            }
        }

        let pos = self.block_pos;
        let sample: Sample = self.block.iter().map(|channel| channel[pos]).collect();
        self.block_pos += 1;
        self.sample_index += 1;
        self.state = StreamState::Streaming;

        if let Some(region) = self.active_loop() {
            if self.sample_index == region.end_sample {
                self.loop_pending = true;
            }
        }

        Ok(Some(sample))
    }

    fn set_looping(&mut self, looping: bool) {
        if looping && self.loop_region.is_none() {
            debug!("ADX 流没有可用的循环信息, 忽略循环设置");
        }
        self.looping = looping;
    }

    fn rewind(&mut self) {
        self.cursor = BitCursor::at_byte(self.header.header_size());
        self.history.fill(ChannelHistory::default());
        self.block_pos = 0;
        self.block_len = 0;
        self.sample_index = 0;
        self.state = StreamState::Ready;
        self.loop_pending = false;
        self.skip_samples = 0;
        self.loop_snapshot = None;
    }
}
