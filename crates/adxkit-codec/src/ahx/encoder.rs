//! AHX 编码器.
//!
//! 累积满 1152 个采样后编码一帧. 位分配固定 (见 `ENCODER_ALLOCATION`),
//! 每个子带每个部分选择最小的可用缩放因子, 再按量化类别量化.

use adxkit_core::{BitWriter, CancelToken, CriError, CriResult, Sample};
use log::{debug, trace};

use super::filterbank::{AnalysisFilter, SUBBANDS};
use super::tables::{ALLOCATION_BITS, CODED_SUBBANDS, ENCODER_ALLOCATION, quant_class};
use super::{
    CLOSING_MARKER, ENCODER_DATA_OFFSET, ENCODER_VERSION, FRAME_SYNC, GRANULES, PARTS,
    SAMPLES_PER_FRAME, SILENT_FRAME_BYTES, quantize, scfsi_for, scfsi_pattern, select_scalefactor,
};
use crate::codec_id::CodecId;
use crate::encoder::{Encoder, EncoderSpec};
use crate::header::{EncodingType, StreamHeader};

/// 一帧的子带值, 按 [部分][颗粒][子带][采样] 排列
type FrameSubbands = [[[[i64; 3]; SUBBANDS]; GRANULES]; PARTS];

/// AHX 编码器
pub struct AhxEncoder {
    spec: EncoderSpec,
    analysis: AnalysisFilter,
    pending: Vec<i16>,
    body: BitWriter,
    samples_encoded: u32,
    frames_encoded: u32,
    cancelled: bool,
}

impl AhxEncoder {
    /// 创建编码器 (供注册表使用)
    pub fn create(spec: &EncoderSpec) -> CriResult<Box<dyn Encoder>> {
        Ok(Box::new(Self::new(spec)?))
    }

    /// 校验参数并创建编码器
    pub fn new(spec: &EncoderSpec) -> CriResult<Self> {
        if spec.channels != 1 {
            return Err(CriError::Unsupported(format!(
                "AHX 只支持单声道, 请求 {} 声道",
                spec.channels,
            )));
        }
        if spec.sample_rate == 0 {
            return Err(CriError::InvalidArgument("采样率不能为 0".into()));
        }
        if spec.loop_points.is_some() {
            return Err(CriError::Unsupported("AHX 不支持循环信息".into()));
        }

        debug!("创建 AHX 编码器: {} Hz", spec.sample_rate);
        Ok(Self {
            spec: spec.clone(),
            analysis: AnalysisFilter::new(),
            pending: Vec::with_capacity(SAMPLES_PER_FRAME),
            body: BitWriter::new(),
            samples_encoded: 0,
            frames_encoded: 0,
            cancelled: false,
        })
    }

    /// 对 `pending` 中的 1152 个采样做子带分析
    fn analyze(&mut self) -> FrameSubbands {
        let mut subbands = [[[[0i64; 3]; SUBBANDS]; GRANULES]; PARTS];
        for (index, chunk) in self.pending.chunks_exact(SUBBANDS).enumerate() {
            let mut block = [0i16; SUBBANDS];
            block.copy_from_slice(chunk);
            let values = self.analysis.process(&block);

            let part = index / (GRANULES * 3);
            let granule = (index / 3) % GRANULES;
            let slot = index % 3;
            for (sb, &value) in values.iter().enumerate() {
                subbands[part][granule][sb][slot] = value;
            }
        }
        subbands
    }

    /// 编码 `pending` 中的一整帧
    fn encode_frame(&mut self) {
        self.body.write_bits(FRAME_SYNC, 32);

        // 输入全零但分析窗口里仍有上一帧的余量时, 必须按普通帧编码
        let subbands = self.analyze();
        if subbands.iter().flatten().flatten().flatten().all(|&v| v == 0) {
            trace!("AHX 静音帧 #{}", self.frames_encoded);
            self.body.write_bytes(&[0; SILENT_FRAME_BYTES]);
            self.frames_encoded += 1;
            return;
        }

        let mut scalefactors = [[0usize; PARTS]; CODED_SUBBANDS];
        for (sb, factors) in scalefactors.iter_mut().enumerate() {
            for (part, factor) in factors.iter_mut().enumerate() {
                let max = subbands[part]
                    .iter()
                    .flat_map(|granule| granule[sb].iter())
                    .map(|v| v.abs())
                    .max()
                    .unwrap_or(0);
                *factor = select_scalefactor(max);
            }
        }

        for (sb, &alloc) in ENCODER_ALLOCATION.iter().enumerate() {
            self.body.write_bits(alloc, ALLOCATION_BITS[sb]);
        }

        let scfsi: Vec<u32> = scalefactors.iter().map(scfsi_for).collect();
        for &selector in &scfsi {
            self.body.write_bits(selector, 2);
        }
        for (sb, factors) in scalefactors.iter().enumerate() {
            let pattern = scfsi_pattern(scfsi[sb]);
            for part in 0..PARTS {
                // 只写出每个共享组的第一个
                if part == 0 || pattern[part] != pattern[part - 1] {
                    self.body.write_bits(factors[part] as u32, 6);
                }
            }
        }

        for part in 0..PARTS {
            for granule in 0..GRANULES {
                for sb in 0..CODED_SUBBANDS {
                    let Some(class) = quant_class(sb, ENCODER_ALLOCATION[sb]) else {
                        continue;
                    };
                    let sf = scalefactors[sb][part];
                    let raw = subbands[part][granule][sb].map(|value| quantize(class, value, sf));
                    if class.is_grouped() {
                        let code = raw[0] + raw[1] * class.levels + raw[2] * class.levels * class.levels;
                        self.body.write_bits(code, class.group_bits);
                    } else {
                        for value in raw {
                            self.body.write_bits(value, class.bits);
                        }
                    }
                }
            }
        }

        self.body.align_to_byte();
        self.frames_encoded += 1;
    }
}

impl Encoder for AhxEncoder {
    fn codec_id(&self) -> CodecId {
        CodecId::Ahx
    }

    fn name(&self) -> &str {
        "ahx"
    }

    fn samples_encoded(&self) -> u32 {
        self.samples_encoded
    }

    fn encode(&mut self, samples: &[Sample], cancel: &CancelToken) -> CriResult<()> {
        if self.cancelled {
            return Err(CriError::Cancelled);
        }
        for sample in samples {
            if cancel.is_cancelled() {
                debug!("AHX 编码已取消 (已编码 {} 采样)", self.samples_encoded);
                self.cancelled = true;
                return Err(CriError::Cancelled);
            }
            let [value] = sample.as_slice() else {
                return Err(CriError::InvalidArgument(format!(
                    "AHX 采样应为单声道, 实际 {} 声道",
                    sample.len(),
                )));
            };
            self.pending.push(*value);
            self.samples_encoded += 1;
            if self.pending.len() == SAMPLES_PER_FRAME {
                self.encode_frame();
                self.pending.clear();
            }
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> CriResult<Vec<u8>> {
        if self.cancelled {
            return Err(CriError::Cancelled);
        }
        if !self.pending.is_empty() {
            self.pending.resize(SAMPLES_PER_FRAME, 0);
            self.encode_frame();
            self.pending.clear();
        }
        self.body.write_bytes(CLOSING_MARKER);

        let header = StreamHeader {
            data_offset: ENCODER_DATA_OFFSET,
            encoding: EncodingType::AhxAlt,
            block_size: 0,
            bit_depth: 0,
            channel_count: 1,
            sample_rate: self.spec.sample_rate,
            total_samples: self.samples_encoded,
            highpass_frequency: 0,
            version: ENCODER_VERSION,
            flags: 0,
            loop_info: None,
        };

        let frames = self.frames_encoded;
        let body = self.body.finish();
        let mut out = header.to_bytes()?;
        out.extend_from_slice(&body);
        debug!(
            "AHX 编码完成: {} 采样, {} 帧, {} 字节",
            header.total_samples,
            frames,
            out.len(),
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::LoopPoints;

    fn encode(samples: &[i16]) -> Vec<u8> {
        let mut enc = Box::new(AhxEncoder::new(&EncoderSpec::new(1, 22050)).unwrap());
        let input: Vec<Sample> = samples.iter().map(|&s| vec![s]).collect();
        enc.encode(&input, &CancelToken::new()).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_silence_uses_shorthand() {
        let out = encode(&[0; 1000]);
        assert_eq!(out.len(), 0x24 + 4 + SILENT_FRAME_BYTES + CLOSING_MARKER.len());
        assert_eq!(&out[0x24..0x28], &[0xFF, 0xF5, 0xE0, 0xC0]);
        assert!(out[0x28..0x32].iter().all(|&b| b == 0));
        assert!(out.ends_with(CLOSING_MARKER));
    }

    fn count_silent_frames(out: &[u8]) -> usize {
        out.windows(4 + SILENT_FRAME_BYTES)
            .filter(|w| w[..4] == [0xFF, 0xF5, 0xE0, 0xC0] && w[4..].iter().all(|&b| b == 0))
            .count()
    }

    #[test]
    fn test_silence_after_tone_keeps_filter_tail() {
        let tone: Vec<i16> = (0..SAMPLES_PER_FRAME)
            .map(|i| ((i as f64 * 0.125).sin() * 6000.0) as i16)
            .collect();

        // 紧跟在有声帧之后的静音帧仍带有滤波器余量
        let mut one = tone.clone();
        one.extend(std::iter::repeat_n(0, SAMPLES_PER_FRAME));
        assert_eq!(count_silent_frames(&encode(&one)), 0);

        let mut two = tone;
        two.extend(std::iter::repeat_n(0, 2 * SAMPLES_PER_FRAME));
        assert_eq!(count_silent_frames(&encode(&two)), 1);
    }

    #[test]
    fn test_frame_starts_with_sync_and_allocation() {
        let tone: Vec<i16> = (0..SAMPLES_PER_FRAME)
            .map(|i| ((i as f64 * 0.125).sin() * 6000.0) as i16)
            .collect();
        let out = encode(&tone);
        assert_eq!(&out[0x24..0x28], &[0xFF, 0xF5, 0xE0, 0xC0]);
        // 子带 0/1 的分配字段均为 6
        assert_eq!(out[0x28], 0x66);

        let header = StreamHeader::parse(&out).unwrap();
        assert_eq!(header.total_samples, SAMPLES_PER_FRAME as u32);
        assert_eq!(header.encoding, EncodingType::AhxAlt);
    }

    #[test]
    fn test_rejects_unsupported_spec() {
        assert!(matches!(
            AhxEncoder::new(&EncoderSpec::new(2, 22050)),
            Err(CriError::Unsupported(_))
        ));
        let looped = EncoderSpec::new(1, 22050).with_loop(LoopPoints::new(0, 100).unwrap());
        assert!(matches!(AhxEncoder::new(&looped), Err(CriError::Unsupported(_))));
        assert!(AhxEncoder::new(&EncoderSpec::new(1, 0)).is_err());
    }

    #[test]
    fn test_cancel() {
        let mut enc = Box::new(AhxEncoder::new(&EncoderSpec::new(1, 22050)).unwrap());
        let cancel = CancelToken::new();
        enc.encode(&vec![vec![1i16]; 100], &cancel).unwrap();
        cancel.cancel();
        assert!(matches!(enc.encode(&vec![vec![1i16]; 100], &cancel), Err(CriError::Cancelled)));
        assert_eq!(enc.samples_encoded(), 100);
        assert!(matches!(enc.finish(), Err(CriError::Cancelled)));
    }
}
