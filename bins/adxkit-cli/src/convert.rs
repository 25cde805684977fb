//! 单个文件的解码与编码.

use std::path::Path;

use adxkit_codec::{CodecId, Decoder, EncoderSpec, LoopPoints};
use adxkit_core::{CancelToken, Sample};
use anyhow::{Context, bail};
use log::{debug, info};

use crate::wav::{WavAudio, read_wav, write_wav};

/// 编码参数
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    /// 输出格式, 为空时按输出文件扩展名推断 (默认 ADX)
    pub format: Option<String>,
    pub loop_start: Option<u32>,
    pub loop_end: Option<u32>,
    /// 高通截止频率, 为空时使用默认值
    pub highpass: Option<u16>,
}

/// 确定输出的编解码器
pub fn resolve_codec(format: Option<&str>, output: &Path) -> anyhow::Result<CodecId> {
    if let Some(name) = format {
        return CodecId::from_name(name).with_context(|| format!("未知的输出格式: {name}"));
    }
    let by_extension = output
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(CodecId::from_name);
    Ok(by_extension.unwrap_or(CodecId::Adx))
}

/// 读出解码器的全部采样
///
/// `loops > 0` 且流带有循环信息时, 循环区间额外播放 `loops` 次.
pub fn drain_decoder(decoder: &mut dyn Decoder, loops: u32) -> anyhow::Result<Vec<Sample>> {
    let mut samples = Vec::with_capacity(decoder.total_samples() as usize);

    let looped = decoder.loop_info().filter(|info| info.enabled && loops > 0);
    if let Some(info) = looped {
        let region = u64::from(info.end_sample - info.begin_sample);
        let target = u64::from(info.end_sample) + region * u64::from(loops);
        decoder.set_looping(true);
        while (samples.len() as u64) < target {
            match decoder.next_sample()? {
                Some(sample) => samples.push(sample),
                None => break,
            }
        }
        decoder.set_looping(false);
    }

    while let Some(sample) = decoder.next_sample()? {
        samples.push(sample);
    }
    Ok(samples)
}

/// ADX/AHX → WAV, 返回写出的采样数
pub fn decode_file(input: &Path, output: &Path, loops: u32) -> anyhow::Result<usize> {
    let data = std::fs::read(input).with_context(|| format!("读取输入文件失败: {}", input.display()))?;
    let mut decoder = adxkit_codec::open_decoder(data)
        .with_context(|| format!("无法打开 {}", input.display()))?;
    debug!(
        "解码 {}: {}, {} Hz, {} 声道",
        input.display(),
        decoder.name(),
        decoder.sample_rate(),
        decoder.channels(),
    );

    let samples = drain_decoder(decoder.as_mut(), loops)
        .with_context(|| format!("解码 {} 失败", input.display()))?;
    let count = samples.len();
    let audio = WavAudio {
        channels: u16::from(decoder.header().channel_count),
        sample_rate: decoder.sample_rate(),
        samples,
    };
    write_wav(output, &audio)?;

    info!("{} → {} ({} 采样)", input.display(), output.display(), count);
    Ok(count)
}

/// WAV → ADX/AHX, 返回写出的字节数
pub fn encode_file(input: &Path, output: &Path, options: &EncodeOptions) -> anyhow::Result<usize> {
    let codec_id = resolve_codec(options.format.as_deref(), output)?;
    let audio = read_wav(input)?;

    let mut spec = EncoderSpec::new(u32::from(audio.channels), audio.sample_rate);
    if let Some(frequency) = options.highpass {
        spec = spec.with_highpass(frequency);
    }
    match (options.loop_start, options.loop_end) {
        (Some(start), Some(end)) => spec = spec.with_loop(LoopPoints::new(start, end)?),
        (None, None) => {}
        _ => bail!("循环起点和终点必须同时指定"),
    }

    let mut encoder = adxkit_codec::create_encoder(codec_id, &spec)?;
    encoder.encode(&audio.samples, &CancelToken::new())?;
    let bytes = encoder.finish()?;
    std::fs::write(output, &bytes)
        .with_context(|| format!("写入输出文件失败: {}", output.display()))?;

    info!(
        "{} → {} ({}, {} 采样, {} 字节)",
        input.display(),
        output.display(),
        codec_id,
        audio.samples.len(),
        bytes.len(),
    );
    Ok(bytes.len())
}
