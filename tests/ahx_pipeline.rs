//! AHX 端到端集成测试.
//!
//! 测试流程: 生成 PCM → AHX 编码 → 解码 → 按滤波器组延迟对齐后比较.

use adxkit::codec::ahx::{CLOSING_MARKER, FRAME_SYNC, SAMPLES_PER_FRAME, SILENT_FRAME_BYTES};
use adxkit::codec::{CodecId, EncoderSpec, StreamHeader};
use adxkit::core::{CancelToken, Sample};

/// 分析 + 合成滤波器组的总延迟
const FILTERBANK_DELAY: usize = 481;

fn tone(count: usize, freq: f64, amplitude: f64) -> Vec<i16> {
    (0..count)
        .map(|i| {
            let t = i as f64 / 22050.0;
            ((t * freq * 2.0 * std::f64::consts::PI).sin() * amplitude) as i16
        })
        .collect()
}

fn encode(samples: &[i16]) -> Vec<u8> {
    let mut encoder =
        adxkit::codec::create_encoder(CodecId::Ahx, &EncoderSpec::new(1, 22050)).unwrap();
    let input: Vec<Sample> = samples.iter().map(|&s| vec![s]).collect();
    encoder.encode(&input, &CancelToken::new()).unwrap();
    encoder.finish().unwrap()
}

fn decode(bytes: Vec<u8>) -> Vec<i16> {
    let mut decoder = adxkit::codec::open_decoder(bytes).unwrap();
    assert_eq!(decoder.codec_id(), CodecId::Ahx);
    let mut out = Vec::new();
    while let Some(sample) = decoder.next_sample().unwrap() {
        out.push(sample[0]);
    }
    out
}

#[test]
fn test_tone_round_trip() {
    let input = tone(SAMPLES_PER_FRAME * 3, 440.0, 8000.0);
    let bytes = encode(&input);

    let header = StreamHeader::parse(&bytes).unwrap();
    assert_eq!(header.codec_id(), CodecId::Ahx);
    assert_eq!(&bytes[header.header_size()..header.header_size() + 4], &FRAME_SYNC.to_be_bytes());
    assert!(bytes.ends_with(CLOSING_MARKER));

    let output = decode(bytes);
    assert_eq!(output.len(), input.len());

    let range = 1200..2800;
    let mut sum = 0.0;
    let mut peak = 0;
    for i in range.clone() {
        let err = i32::from(output[i + FILTERBANK_DELAY]) - i32::from(input[i]);
        sum += f64::from(err * err);
        peak = peak.max(err.abs());
    }
    let rms = (sum / range.len() as f64).sqrt();
    assert!(rms < 400.0, "RMS 误差 {}", rms);
    assert!(peak < 1500, "峰值误差 {}", peak);
}

#[test]
fn test_partial_frame_trimmed_to_total() {
    let input = tone(2000, 1000.0, 12000.0);
    let bytes = encode(&input);
    assert_eq!(decode(bytes).len(), 2000);
}

#[test]
fn test_silence_shorthand_between_tones() {
    let mut input = tone(SAMPLES_PER_FRAME, 600.0, 10000.0);
    input.extend(std::iter::repeat_n(0i16, 2 * SAMPLES_PER_FRAME));
    input.extend(tone(SAMPLES_PER_FRAME, 600.0, 10000.0));
    let bytes = encode(&input);

    // 静音帧: 同步字后紧跟 10 个零字节
    let mut pattern = FRAME_SYNC.to_be_bytes().to_vec();
    pattern.extend_from_slice(&[0; SILENT_FRAME_BYTES]);
    assert!(bytes.windows(pattern.len()).any(|w| w == pattern.as_slice()));

    let output = decode(bytes);
    assert_eq!(output.len(), input.len());

    // 第一个静音帧开头仍输出上一段音调的余音
    let tail_peak = output[SAMPLES_PER_FRAME..SAMPLES_PER_FRAME + FILTERBANK_DELAY]
        .iter()
        .map(|s| s.unsigned_abs())
        .max()
        .unwrap();
    assert!(tail_peak > 5000, "余音峰值 {}", tail_peak);

    let quiet_peak = output[SAMPLES_PER_FRAME * 2..SAMPLES_PER_FRAME * 3]
        .iter()
        .map(|s| s.unsigned_abs())
        .max()
        .unwrap();
    assert!(quiet_peak < 16, "静音段峰值 {}", quiet_peak);
}

#[test]
fn test_all_silent_stream() {
    let bytes = encode(&[0; SAMPLES_PER_FRAME * 2]);
    let header_size = StreamHeader::parse(&bytes).unwrap().header_size();
    assert_eq!(bytes.len(), header_size + 2 * (4 + SILENT_FRAME_BYTES) + CLOSING_MARKER.len());
    assert!(decode(bytes).iter().all(|&s| s == 0));
}
