//! ADX 编码器.
//!
//! 逐采样累积到 32 采样的块. 块满时根据预览差值的范围选定缩放因子,
//! 再从块前的历史出发重新走一遍, 把模拟解码值 (而不是输入值) 回灌到历史中,
//! 使编码端与解码端的预测状态保持逐位一致.

use adxkit_core::sample::clamp_i16;
use adxkit_core::{BitWriter, CancelToken, CriError, CriResult, Sample};
use log::{debug, trace, warn};

use super::{
    BIT_DEPTH, BLOCK_SIZE, ChannelHistory, ENCODER_DATA_OFFSET, ENCODER_VERSION, END_SENTINEL,
    Predictor, SAMPLES_PER_BLOCK,
};
use crate::codec_id::CodecId;
use crate::encoder::{Encoder, EncoderSpec, LoopPoints};
use crate::header::{EncodingType, LoopInfo, MAX_CHANNELS, StreamHeader};

/// 缩放因子上限 (避开结束块标记)
const MAX_SCALE: i32 = 0x7FFF;

/// 单声道的块累积状态
#[derive(Debug, Clone)]
struct ChannelState {
    /// 已提交的历史 (块起点处, 与解码端一致)
    history: ChannelHistory,
    /// 填块过程中用原始采样推进的预览历史
    preview: ChannelHistory,
    samples: [i32; SAMPLES_PER_BLOCK],
    min_delta: i32,
    max_delta: i32,
}

impl ChannelState {
    fn new() -> Self {
        Self {
            history: ChannelHistory::default(),
            preview: ChannelHistory::default(),
            samples: [0; SAMPLES_PER_BLOCK],
            min_delta: 0,
            max_delta: 0,
        }
    }

    fn accumulate(&mut self, predictor: &Predictor, pos: usize, value: i16) {
        let delta = i32::from(value) - predictor.predict(&self.preview);
        self.min_delta = self.min_delta.min(delta);
        self.max_delta = self.max_delta.max(delta);
        self.preview.push(value);
        self.samples[pos] = i32::from(value);
    }

    /// 量化整块并写出, 返回所用缩放因子
    fn encode_block(&mut self, predictor: &Predictor, writer: &mut BitWriter) -> i32 {
        let scale = (self.max_delta / 7)
            .max(self.min_delta / -8)
            .clamp(1, MAX_SCALE);
        writer.write_bits(scale as u32, 16);

        let mut history = self.history;
        for &value in &self.samples {
            let prediction = predictor.predict(&history);
            let nibble = quantize(value - prediction, scale);
            let decoded = clamp_i16(prediction + nibble * scale);
            history.push(decoded);
            writer.write_bits_signed(nibble, u32::from(BIT_DEPTH));
        }

        self.history = history;
        self.preview = history;
        self.min_delta = 0;
        self.max_delta = 0;
        scale
    }
}

/// 差值除以缩放因子, 四舍五入 (远离零) 后限制到 4 位有符号范围
fn quantize(delta: i32, scale: i32) -> i32 {
    let magnitude = (delta.abs() * 2 + scale) / (2 * scale);
    let nibble = if delta < 0 { -magnitude } else { magnitude };
    nibble.clamp(-8, 7)
}

/// ADX 编码器
pub struct AdxEncoder {
    spec: EncoderSpec,
    predictor: Predictor,
    channels: Vec<ChannelState>,
    block_len: usize,
    body: BitWriter,
    /// 已送入的采样数 (含对齐静音)
    samples_encoded: u32,
    /// 为对齐循环起点前置的静音采样数
    alignment: u32,
    cancelled: bool,
}

impl AdxEncoder {
    /// 创建编码器 (供注册表使用)
    pub fn create(spec: &EncoderSpec) -> CriResult<Box<dyn Encoder>> {
        Ok(Box::new(Self::new(spec)?))
    }

    /// 校验参数并创建编码器
    pub fn new(spec: &EncoderSpec) -> CriResult<Self> {
        if spec.channels == 0 || spec.channels > u32::from(MAX_CHANNELS) {
            return Err(CriError::InvalidArgument(format!(
                "ADX 声道数 {} 超出 1..={}",
                spec.channels, MAX_CHANNELS,
            )));
        }
        if spec.sample_rate == 0 {
            return Err(CriError::InvalidArgument("采样率不能为 0".into()));
        }
        if u32::from(spec.highpass_frequency) * 2 >= spec.sample_rate {
            return Err(CriError::InvalidArgument(format!(
                "高通频率 {} Hz 不低于奈奎斯特频率 ({} Hz 采样率)",
                spec.highpass_frequency, spec.sample_rate,
            )));
        }
        if let Some(points) = spec.loop_points {
            LoopPoints::new(points.start_sample, points.end_sample)?;
        }

        let alignment = spec
            .loop_points
            .map_or(0, |points| loop_alignment(points.start_sample));
        let predictor = Predictor::new(u32::from(spec.highpass_frequency), spec.sample_rate);

        debug!(
            "创建 ADX 编码器: {} 声道, {} Hz, 高通 {} Hz, 循环 {:?}, 对齐 {} 采样",
            spec.channels, spec.sample_rate, spec.highpass_frequency, spec.loop_points, alignment,
        );

        let mut encoder = Self {
            spec: spec.clone(),
            predictor,
            channels: vec![ChannelState::new(); spec.channels as usize],
            block_len: 0,
            body: BitWriter::new(),
            samples_encoded: 0,
            alignment,
            cancelled: false,
        };
        for _ in 0..alignment {
            encoder.push_frame(|_| 0);
        }
        Ok(encoder)
    }

    /// 循环对齐前置的静音采样数
    pub fn alignment(&self) -> u32 {
        self.alignment
    }

    /// 推入一个时刻的采样, `value(ch)` 给出各声道的值
    fn push_frame(&mut self, value: impl Fn(usize) -> i16) {
        let pos = self.block_len;
        for (ch, state) in self.channels.iter_mut().enumerate() {
            state.accumulate(&self.predictor, pos, value(ch));
        }
        self.block_len += 1;
        self.samples_encoded += 1;
        if self.block_len == SAMPLES_PER_BLOCK {
            self.flush_block();
        }
    }

    /// 写出当前块组 (每声道一个块), 不足 32 采样时补零
    fn flush_block(&mut self) {
        for pos in self.block_len..SAMPLES_PER_BLOCK {
            for state in &mut self.channels {
                state.accumulate(&self.predictor, pos, 0);
            }
        }
        for (ch, state) in self.channels.iter_mut().enumerate() {
            let scale = state.encode_block(&self.predictor, &mut self.body);
            trace!("ADX 块: 声道 {}, 缩放因子 {}", ch, scale);
        }
        self.block_len = 0;
    }

    /// 根据最终采样数计算头部循环信息
    fn loop_info(&self, header: &StreamHeader) -> Option<LoopInfo> {
        let points = self.spec.loop_points?;
        let begin_sample = points.start_sample.saturating_add(self.alignment);
        let mut end_sample = points.end_sample.saturating_add(self.alignment);
        if end_sample > self.samples_encoded {
            warn!(
                "循环终点 {} 超出总采样数 {}, 截断到末尾",
                end_sample, self.samples_encoded,
            );
            end_sample = self.samples_encoded;
        }
        if end_sample <= begin_sample {
            warn!("循环起点 {} 之后没有采样, 不写入循环信息", begin_sample);
            return None;
        }
        let (Some(begin_byte), Some(end_byte)) = (
            header.block_byte_offset(begin_sample),
            header.block_byte_offset(end_sample),
        ) else {
            warn!("循环区间的字节偏移超出 u32 范围, 不写入循环信息");
            return None;
        };
        Some(LoopInfo {
            alignment_samples: self.alignment as u16,
            enabled: true,
            begin_sample,
            begin_byte,
            end_sample,
            end_byte,
        })
    }
}

/// 使循环起点落在块边界所需的前置静音采样数
pub fn loop_alignment(start_sample: u32) -> u32 {
    let block = SAMPLES_PER_BLOCK as u32;
    (block - start_sample % block) % block
}

impl Encoder for AdxEncoder {
    fn codec_id(&self) -> CodecId {
        CodecId::Adx
    }

    fn name(&self) -> &str {
        "adx"
    }

    fn samples_encoded(&self) -> u32 {
        self.samples_encoded
    }

    fn encode(&mut self, samples: &[Sample], cancel: &CancelToken) -> CriResult<()> {
        if self.cancelled {
            return Err(CriError::Cancelled);
        }
        let channels = self.channels.len();
        for sample in samples {
            if cancel.is_cancelled() {
                debug!("ADX 编码已取消 (已编码 {} 采样)", self.samples_encoded);
                self.cancelled = true;
                return Err(CriError::Cancelled);
            }
            if sample.len() != channels {
                return Err(CriError::InvalidArgument(format!(
                    "采样声道数 {} 与编码器声道数 {} 不一致",
                    sample.len(),
                    channels,
                )));
            }
            self.push_frame(|ch| sample[ch]);
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> CriResult<Vec<u8>> {
        if self.cancelled {
            return Err(CriError::Cancelled);
        }
        if self.block_len > 0 {
            self.flush_block();
        }

        // 结束块: 0x8001, 剩余长度, 零填充
        let trailer_len = u32::from(BLOCK_SIZE) - 4;
        self.body.write_bits(u32::from(END_SENTINEL), 16);
        self.body.write_bits(trailer_len, 16);
        self.body.write_bytes(&vec![0; trailer_len as usize]);

        let mut header = StreamHeader {
            data_offset: ENCODER_DATA_OFFSET,
            encoding: EncodingType::Standard,
            block_size: BLOCK_SIZE,
            bit_depth: BIT_DEPTH,
            channel_count: self.spec.channels as u8,
            sample_rate: self.spec.sample_rate,
            total_samples: self.samples_encoded,
            highpass_frequency: self.spec.highpass_frequency,
            version: ENCODER_VERSION,
            flags: 0,
            loop_info: None,
        };
        header.loop_info = self.loop_info(&header);

        let body = self.body.finish();
        let mut out = header.to_bytes()?;
        out.reserve(body.len());
        out.extend_from_slice(&body);
        debug!(
            "ADX 编码完成: {} 采样, {} 字节",
            header.total_samples,
            out.len(),
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adxkit_core::BitReader;

    #[test]
    fn test_loop_alignment() {
        for start in [0u32, 1, 31, 32, 33, 100, 12345] {
            let a = loop_alignment(start);
            assert!(a < 32);
            assert_eq!((start + a) % 32, 0, "起点 {}", start);
        }
    }

    #[test]
    fn test_quantize_rounding() {
        assert_eq!(quantize(0, 10), 0);
        assert_eq!(quantize(14, 10), 1);
        assert_eq!(quantize(15, 10), 2);
        assert_eq!(quantize(-15, 10), -2);
        assert_eq!(quantize(1000, 10), 7);
        assert_eq!(quantize(-1000, 10), -8);
    }

    #[test]
    fn test_block_layout() {
        let mut enc = Box::new(AdxEncoder::new(&EncoderSpec::new(1, 22050)).unwrap());
        let samples: Vec<Sample> = (0..32).map(|i| vec![(i * 100) as i16]).collect();
        enc.encode(&samples, &CancelToken::new()).unwrap();
        let out = enc.finish().unwrap();

        // 头部 + 1 个数据块 + 结束块
        assert_eq!(out.len(), 0x40 + 18 + 18);
        let mut br = BitReader::new(&out[0x40 + 18..]);
        assert_eq!(br.read_bits(16).unwrap(), 0x8001);
        assert_eq!(br.read_bits(16).unwrap(), 14);
    }

    #[test]
    fn test_scale_never_hits_sentinel() {
        let mut enc = Box::new(AdxEncoder::new(&EncoderSpec::new(1, 44100)).unwrap());
        let samples: Vec<Sample> = (0..64)
            .map(|i| vec![if i % 2 == 0 { i16::MAX } else { i16::MIN }])
            .collect();
        enc.encode(&samples, &CancelToken::new()).unwrap();
        let out = enc.finish().unwrap();
        for block in 0..2 {
            let offset = 0x40 + block * 18;
            let scale = u16::from_be_bytes([out[offset], out[offset + 1]]);
            assert!(scale >= 1 && scale <= 0x7FFF);
        }
    }

    #[test]
    fn test_cancel_poisons_encoder() {
        let mut enc = Box::new(AdxEncoder::new(&EncoderSpec::new(1, 22050)).unwrap());
        let cancel = CancelToken::new();
        cancel.cancel();
        let samples = vec![vec![0i16]; 10];
        assert!(matches!(enc.encode(&samples, &cancel), Err(CriError::Cancelled)));
        assert!(matches!(
            enc.encode(&samples, &CancelToken::new()),
            Err(CriError::Cancelled)
        ));
        assert!(matches!(enc.finish(), Err(CriError::Cancelled)));
    }

    #[test]
    fn test_rejects_bad_spec() {
        assert!(AdxEncoder::new(&EncoderSpec::new(0, 22050)).is_err());
        assert!(AdxEncoder::new(&EncoderSpec::new(9, 22050)).is_err());
        assert!(AdxEncoder::new(&EncoderSpec::new(1, 0)).is_err());
        assert!(AdxEncoder::new(&EncoderSpec::new(1, 800).with_highpass(500)).is_err());

        let mut spec = EncoderSpec::new(1, 22050);
        spec.loop_points = Some(LoopPoints {
            start_sample: 100,
            end_sample: 100,
        });
        assert!(matches!(AdxEncoder::new(&spec), Err(CriError::InvalidArgument(_))));
    }

    #[test]
    fn test_channel_mismatch() {
        let mut enc = AdxEncoder::new(&EncoderSpec::new(2, 22050)).unwrap();
        let err = enc.encode(&[vec![1]], &CancelToken::new()).unwrap_err();
        assert!(matches!(err, CriError::InvalidArgument(_)));
    }

    #[test]
    fn test_loop_header_fields() {
        let points = LoopPoints::new(10, 500).unwrap();
        let spec = EncoderSpec::new(2, 32000).with_loop(points);
        let mut enc = Box::new(AdxEncoder::new(&spec).unwrap());
        assert_eq!(enc.alignment(), 22);
        let samples = vec![vec![0i16, 0]; 600];
        enc.encode(&samples, &CancelToken::new()).unwrap();
        let out = enc.finish().unwrap();

        let header = StreamHeader::parse(&out).unwrap();
        assert_eq!(header.total_samples, 622);
        let info = header.loop_info.unwrap();
        assert!(info.enabled);
        assert_eq!(info.alignment_samples, 22);
        assert_eq!(info.begin_sample, 32);
        assert_eq!(info.end_sample, 522);
        assert_eq!(info.begin_byte, 0x40 + 36);
        assert_eq!(info.end_byte, 0x40 + 17 * 36);
    }

    #[test]
    fn test_loop_end_clamped_to_total() {
        let spec = EncoderSpec::new(1, 22050).with_loop(LoopPoints::new(0, 5000).unwrap());
        let mut enc = Box::new(AdxEncoder::new(&spec).unwrap());
        enc.encode(&vec![vec![0i16]; 100], &CancelToken::new()).unwrap();
        let header = StreamHeader::parse(&enc.finish().unwrap()).unwrap();
        assert_eq!(header.loop_info.unwrap().end_sample, 100);
    }
}
