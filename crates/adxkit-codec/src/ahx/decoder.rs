//! AHX 解码器.
//!
//! 每次缓冲区耗尽时解码一帧 (1152 个采样). 输出在达到头部声明的总采样数时截止,
//! 最后一帧中的填充采样不会输出.

use adxkit_core::bitreader::BitReader;
use adxkit_core::{BitCursor, CriError, CriResult, Sample};
use bytes::Bytes;
use log::{debug, trace};

use super::filterbank::{SUBBANDS, SynthesisFilter};
use super::tables::{ALLOCATION_BITS, CODED_SUBBANDS, QuantizeSpec, quant_class};
use super::{
    FRAME_SYNC, GRANULES, PARTS, SAMPLES_PER_FRAME, SILENT_FRAME_BYTES, dequantize, scfsi_pattern,
};
use crate::codec_id::CodecId;
use crate::decoder::Decoder;
use crate::header::StreamHeader;

/// 结束标记的前 16 位
const CLOSING_MARKER_PREFIX: u32 = 0x0080;

/// AHX 解码器
pub struct AhxDecoder {
    header: StreamHeader,
    data: Bytes,
    /// 下一帧的起始位置 (字节对齐)
    cursor: BitCursor,
    synthesis: SynthesisFilter,
    frame: Vec<i16>,
    frame_pos: usize,
    frame_len: usize,
    sample_index: u32,
    exhausted: bool,
    frames_decoded: u32,
}

impl AhxDecoder {
    /// 创建解码器 (供注册表使用)
    pub fn create(header: StreamHeader, data: Bytes) -> CriResult<Box<dyn Decoder>> {
        Ok(Box::new(Self::new(header, data)?))
    }

    /// 由已解析的头部和完整文件数据创建解码器
    pub fn new(header: StreamHeader, data: Bytes) -> CriResult<Self> {
        if header.channel_count != 1 {
            return Err(CriError::Format(format!(
                "AHX 只支持单声道, 实际 {} 声道",
                header.channel_count,
            )));
        }

        debug!(
            "打开 AHX 解码器: {} Hz, {} 采样, 版本 {}",
            header.sample_rate, header.total_samples, header.version,
        );

        Ok(Self {
            cursor: BitCursor::at_byte(header.header_size()),
            synthesis: SynthesisFilter::new(),
            frame: vec![0; SAMPLES_PER_FRAME],
            frame_pos: 0,
            frame_len: 0,
            sample_index: 0,
            exhausted: false,
            frames_decoded: 0,
            header,
            data,
        })
    }

    /// 已解码的帧数
    pub fn frames_decoded(&self) -> u32 {
        self.frames_decoded
    }

    /// 解码下一帧, 返回 false 表示流结束
    fn decode_frame(&mut self) -> CriResult<bool> {
        let mut reader = BitReader::at(&self.data, self.cursor);
        if reader.is_eof() {
            debug!("AHX 数据已读完, 未遇到结束标记");
            return Ok(false);
        }

        let sync = reader.read_bits(32)?;
        if sync != FRAME_SYNC {
            if sync >> 16 == CLOSING_MARKER_PREFIX {
                trace!("AHX 结束标记: 偏移 0x{:X}", self.cursor.byte);
                return Ok(false);
            }
            return Err(CriError::InvalidData(format!(
                "AHX 帧同步字错误: 0x{:08X} (偏移 0x{:X})",
                sync, self.cursor.byte,
            )));
        }

        if is_silent_frame(&reader) {
            trace!("AHX 静音帧 #{}", self.frames_decoded);
            reader.skip_bits(SILENT_FRAME_BYTES * 8)?;
            // 子带全零也要经过合成滤波器, 上一帧的余音才能完整输出
            let silence = [0i64; SUBBANDS];
            for chunk in self.frame.chunks_exact_mut(SUBBANDS) {
                chunk.copy_from_slice(&self.synthesis.process(&silence));
            }
        } else {
            read_frame(&mut reader, &mut self.synthesis, &mut self.frame)?;
        }

        self.cursor = reader.cursor().aligned();
        self.frame_pos = 0;
        self.frame_len = SAMPLES_PER_FRAME;
        self.frames_decoded += 1;
        Ok(true)
    }
}

/// 同步字之后是否紧跟 10 个零字节
fn is_silent_frame(reader: &BitReader<'_>) -> bool {
    let start = reader.byte_position();
    reader
        .data()
        .get(start..start + SILENT_FRAME_BYTES)
        .is_some_and(|bytes| bytes.iter().all(|&b| b == 0))
}

/// 读取一个已分配子带的 3 个采样字段
fn read_triplet(reader: &mut BitReader<'_>, class: &QuantizeSpec) -> CriResult<[u32; 3]> {
    let mut raw = [0u32; 3];
    if class.is_grouped() {
        let mut code = reader.read_bits(class.group_bits)?;
        for value in raw.iter_mut() {
            *value = code % class.levels;
            code /= class.levels;
        }
    } else {
        for value in raw.iter_mut() {
            *value = reader.read_bits(class.bits)?;
        }
    }
    Ok(raw)
}

/// 读取同步字之后的帧内容, 合成 1152 个 PCM 采样到 `out`
fn read_frame(
    reader: &mut BitReader<'_>,
    synthesis: &mut SynthesisFilter,
    out: &mut [i16],
) -> CriResult<()> {
    let mut allocation = [0u32; CODED_SUBBANDS];
    for (sb, alloc) in allocation.iter_mut().enumerate() {
        *alloc = reader.read_bits(ALLOCATION_BITS[sb])?;
    }

    let mut scfsi = [0u32; CODED_SUBBANDS];
    for (sb, selector) in scfsi.iter_mut().enumerate() {
        if allocation[sb] != 0 {
            *selector = reader.read_bits(2)?;
        }
    }

    let mut scalefactors = [[0usize; PARTS]; CODED_SUBBANDS];
    for sb in 0..CODED_SUBBANDS {
        if allocation[sb] == 0 {
            continue;
        }
        let pattern = scfsi_pattern(scfsi[sb]);
        let count = pattern[PARTS - 1] + 1;
        let mut written = [0usize; PARTS];
        for value in written.iter_mut().take(count) {
            *value = reader.read_bits(6)? as usize;
        }
        for part in 0..PARTS {
            scalefactors[sb][part] = written[pattern[part]];
        }
    }

    let mut pos = 0;
    for part in 0..PARTS {
        for _ in 0..GRANULES {
            let mut subbands = [[0i64; SUBBANDS]; 3];
            for sb in 0..CODED_SUBBANDS {
                let Some(class) = quant_class(sb, allocation[sb]) else {
                    continue;
                };
                let raw = read_triplet(reader, class)?;
                for (s, &value) in raw.iter().enumerate() {
                    subbands[s][sb] = dequantize(class, value, scalefactors[sb][part]);
                }
            }
            for values in &subbands {
                out[pos..pos + SUBBANDS].copy_from_slice(&synthesis.process(values));
                pos += SUBBANDS;
            }
        }
    }
    Ok(())
}

impl Decoder for AhxDecoder {
    fn codec_id(&self) -> CodecId {
        CodecId::Ahx
    }

    fn name(&self) -> &str {
        "ahx"
    }

    fn header(&self) -> &StreamHeader {
        &self.header
    }

    fn next_sample(&mut self) -> CriResult<Option<Sample>> {
        if self.exhausted {
            return Ok(None);
        }
        if self.sample_index >= self.header.total_samples {
            self.exhausted = true;
            return Ok(None);
        }
        if self.frame_pos >= self.frame_len && !self.decode_frame()? {
            self.exhausted = true;
            return Ok(None);
        }

        let sample = self.frame[self.frame_pos];
        self.frame_pos += 1;
        self.sample_index += 1;
        Ok(Some(vec![sample]))
    }

    fn set_looping(&mut self, looping: bool) {
        if looping {
            debug!("AHX 流不支持循环, 忽略循环设置");
        }
    }

    fn rewind(&mut self) {
        self.cursor = BitCursor::at_byte(self.header.header_size());
        self.synthesis.reset();
        self.frame_pos = 0;
        self.frame_len = 0;
        self.sample_index = 0;
        self.exhausted = false;
        self.frames_decoded = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ahx::{CLOSING_MARKER, ENCODER_DATA_OFFSET};
    use crate::header::EncodingType;
    use adxkit_core::BitWriter;

    fn header(total_samples: u32) -> StreamHeader {
        StreamHeader {
            data_offset: ENCODER_DATA_OFFSET,
            encoding: EncodingType::AhxAlt,
            block_size: 0,
            bit_depth: 0,
            channel_count: 1,
            sample_rate: 22050,
            total_samples,
            highpass_frequency: 0,
            version: 6,
            flags: 0,
            loop_info: None,
        }
    }

    fn stream(total_samples: u32, frames: &[&[u8]]) -> (StreamHeader, Bytes) {
        let header = header(total_samples);
        let mut bw = BitWriter::new();
        bw.write_bytes(&header.to_bytes().unwrap());
        for frame in frames {
            bw.write_bytes(frame);
        }
        bw.write_bytes(CLOSING_MARKER);
        (header, Bytes::from(bw.finish()))
    }

    const SILENT: [u8; 14] = [0xFF, 0xF5, 0xE0, 0xC0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

    #[test]
    fn test_silent_frames() {
        let (header, data) = stream(2000, &[&SILENT, &SILENT]);
        let mut dec = AhxDecoder::new(header, data).unwrap();
        let mut count = 0;
        while let Some(sample) = dec.next_sample().unwrap() {
            assert_eq!(sample, vec![0]);
            count += 1;
        }
        assert_eq!(count, 2000);
        assert_eq!(dec.frames_decoded(), 2);
    }

    #[test]
    fn test_silent_frame_flushes_previous_tail() {
        use crate::ahx::encoder::AhxEncoder;
        use crate::encoder::{Encoder, EncoderSpec};
        use adxkit_core::CancelToken;

        let tone: Vec<Sample> = (0..SAMPLES_PER_FRAME)
            .map(|i| vec![((i as f64 * 0.125).sin() * 6000.0) as i16])
            .collect();
        let mut enc = Box::new(AhxEncoder::new(&EncoderSpec::new(1, 22050)).unwrap());
        enc.encode(&tone, &CancelToken::new()).unwrap();
        let mut bytes = enc.finish().unwrap();

        // 在有声帧后接一个静音帧, 并把总采样数改为两帧
        bytes.truncate(bytes.len() - CLOSING_MARKER.len());
        bytes.extend_from_slice(&SILENT);
        bytes.extend_from_slice(CLOSING_MARKER);
        bytes[0x0C..0x10].copy_from_slice(&(2 * SAMPLES_PER_FRAME as u32).to_be_bytes());

        let header = StreamHeader::parse(&bytes).unwrap();
        let mut dec = AhxDecoder::new(header, Bytes::from(bytes)).unwrap();
        let mut output = Vec::new();
        while let Some(sample) = dec.next_sample().unwrap() {
            output.push(sample[0]);
        }
        assert_eq!(output.len(), 2 * SAMPLES_PER_FRAME);

        let peak = output[SAMPLES_PER_FRAME..SAMPLES_PER_FRAME + 481]
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap();
        assert!(peak > 1000, "余音峰值 {}", peak);
    }

    #[test]
    fn test_closing_marker_ends_stream() {
        let (header, data) = stream(5000, &[&SILENT]);
        let mut dec = AhxDecoder::new(header, data).unwrap();
        let mut count = 0;
        while dec.next_sample().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, SAMPLES_PER_FRAME);
    }

    #[test]
    fn test_bad_sync_word() {
        let mut broken = SILENT;
        broken[1] = 0x00;
        let (header, data) = stream(1152, &[&broken]);
        let mut dec = AhxDecoder::new(header, data).unwrap();
        assert!(matches!(dec.next_sample(), Err(CriError::InvalidData(_))));
    }

    #[test]
    fn test_truncated_frame() {
        // 同步字 + 第一个子带分配非零, 但后续数据缺失
        let (header, mut data) = stream(1152, &[&[0xFF, 0xF5, 0xE0, 0xC0, 0x60, 0x00]]);
        data.truncate(data.len() - CLOSING_MARKER.len());
        let mut dec = AhxDecoder::new(header, data).unwrap();
        assert!(matches!(dec.next_sample(), Err(CriError::UnexpectedEof)));
    }

    #[test]
    fn test_rejects_stereo() {
        let mut stereo = header(1152);
        stereo.channel_count = 2;
        assert!(matches!(
            AhxDecoder::new(stereo, Bytes::new()),
            Err(CriError::Format(_))
        ));
    }
}
