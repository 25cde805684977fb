//! WAV (RIFF WAVE) 读写.
//!
//! 只处理 16 位 PCM. 读取时跳过未知块, 写入时一次性生成完整文件.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use adxkit_core::Sample;
use anyhow::{Context, bail};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};

/// WAV 音频格式码: PCM 整数
const WAV_FORMAT_PCM: u16 = 0x0001;
/// WAV 音频格式码: 扩展格式
const WAV_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// 解析后的 PCM 音频
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavAudio {
    pub channels: u16,
    pub sample_rate: u32,
    /// 每个元素是一个时刻的各声道采样
    pub samples: Vec<Sample>,
}

/// 读取 WAV 文件
pub fn read_wav(path: &Path) -> anyhow::Result<WavAudio> {
    let file = File::open(path).with_context(|| format!("打开 WAV 文件失败: {}", path.display()))?;
    parse_wav(BufReader::new(file)).with_context(|| format!("解析 WAV 文件失败: {}", path.display()))
}

/// 从任意输入流解析 WAV
pub fn parse_wav<R: Read>(mut reader: R) -> anyhow::Result<WavAudio> {
    let mut tag = [0u8; 4];
    reader.read_exact(&mut tag)?;
    if &tag != b"RIFF" {
        bail!("不是有效的 RIFF 文件");
    }
    let _riff_size = reader.read_u32::<LittleEndian>()?;
    reader.read_exact(&mut tag)?;
    if &tag != b"WAVE" {
        bail!("不是有效的 WAVE 文件");
    }

    let mut format: Option<(u16, u32)> = None;
    loop {
        if let Err(e) = reader.read_exact(&mut tag) {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                bail!("未找到 data 块");
            }
            return Err(e.into());
        }
        let chunk_size = reader.read_u32::<LittleEndian>()?;

        match &tag {
            b"fmt " => {
                if chunk_size < 16 {
                    bail!("fmt 块大小不足 16 字节");
                }
                let audio_format = reader.read_u16::<LittleEndian>()?;
                let channels = reader.read_u16::<LittleEndian>()?;
                let sample_rate = reader.read_u32::<LittleEndian>()?;
                let _byte_rate = reader.read_u32::<LittleEndian>()?;
                let _block_align = reader.read_u16::<LittleEndian>()?;
                let bits_per_sample = reader.read_u16::<LittleEndian>()?;
                debug!(
                    "fmt: format=0x{:04X}, channels={}, rate={}, bits={}",
                    audio_format, channels, sample_rate, bits_per_sample,
                );

                if audio_format != WAV_FORMAT_PCM && audio_format != WAV_FORMAT_EXTENSIBLE {
                    bail!("不支持的 WAV 格式码: 0x{:04X}", audio_format);
                }
                if bits_per_sample != 16 {
                    bail!("只支持 16 位 PCM, 实际 {} 位", bits_per_sample);
                }
                if channels == 0 {
                    bail!("声道数不能为 0");
                }
                skip(&mut reader, u64::from(chunk_size - 16) + u64::from(chunk_size % 2))?;
                format = Some((channels, sample_rate));
            }
            b"data" => {
                let Some((channels, sample_rate)) = format else {
                    bail!("data 块出现在 fmt 块之前");
                };
                let frame_count = chunk_size as usize / (usize::from(channels) * 2);
                let mut samples = Vec::with_capacity(frame_count);
                for _ in 0..frame_count {
                    let mut sample = Vec::with_capacity(usize::from(channels));
                    for _ in 0..channels {
                        sample.push(reader.read_i16::<LittleEndian>()?);
                    }
                    samples.push(sample);
                }
                debug!("WAV 读取完成: {} Hz, {} 声道, {} 采样", sample_rate, channels, samples.len());
                return Ok(WavAudio {
                    channels,
                    sample_rate,
                    samples,
                });
            }
            _ => {
                warn!(
                    "跳过未知块: '{}', 大小={}",
                    String::from_utf8_lossy(&tag),
                    chunk_size,
                );
                // 奇数大小的块后有 1 个填充字节
                skip(&mut reader, u64::from(chunk_size) + u64::from(chunk_size % 2))?;
            }
        }
    }
}

fn skip<R: Read>(reader: &mut R, count: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(count), &mut io::sink())?;
    if skipped < count {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

/// 写入 16 位 PCM WAV 文件
pub fn write_wav(path: &Path, audio: &WavAudio) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("创建 WAV 文件失败: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_wav_to(&mut writer, audio)?;
    writer.flush()?;
    Ok(())
}

/// 把 WAV 写入任意输出流
pub fn write_wav_to<W: Write>(writer: &mut W, audio: &WavAudio) -> anyhow::Result<()> {
    let channels = audio.channels;
    let block_align = u32::from(channels) * 2;
    let data_size = u32::try_from(audio.samples.len() as u64 * u64::from(block_align))
        .context("音频数据超过 WAV 的 4 GiB 上限")?;

    writer.write_all(b"RIFF")?;
    writer.write_u32::<LittleEndian>(36 + data_size)?;
    writer.write_all(b"WAVE")?;

    writer.write_all(b"fmt ")?;
    writer.write_u32::<LittleEndian>(16)?;
    writer.write_u16::<LittleEndian>(WAV_FORMAT_PCM)?;
    writer.write_u16::<LittleEndian>(channels)?;
    writer.write_u32::<LittleEndian>(audio.sample_rate)?;
    writer.write_u32::<LittleEndian>(audio.sample_rate * block_align)?;
    writer.write_u16::<LittleEndian>(block_align as u16)?;
    writer.write_u16::<LittleEndian>(16)?;

    writer.write_all(b"data")?;
    writer.write_u32::<LittleEndian>(data_size)?;
    for sample in &audio.samples {
        if sample.len() != usize::from(channels) {
            bail!("采样声道数 {} 与 WAV 声道数 {} 不一致", sample.len(), channels);
        }
        for &value in sample {
            writer.write_i16::<LittleEndian>(value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo() -> WavAudio {
        WavAudio {
            channels: 2,
            sample_rate: 22050,
            samples: (0..100i16).map(|i| vec![i * 3, -i]).collect(),
        }
    }

    #[test]
    fn test_写入并读取_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wav");
        write_wav(&path, &stereo()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 44 + 400);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[36..40], b"data");

        assert_eq!(read_wav(&path).unwrap(), stereo());
    }

    #[test]
    fn test_跳过未知块() {
        let mut bytes = Vec::new();
        write_wav_to(&mut bytes, &stereo()).unwrap();
        // 在 fmt 块之后插入一个奇数大小的 LIST 块
        let mut patched = bytes[..36].to_vec();
        patched.extend_from_slice(b"LIST");
        patched.extend_from_slice(&3u32.to_le_bytes());
        patched.extend_from_slice(&[1, 2, 3, 0]);
        patched.extend_from_slice(&bytes[36..]);

        let audio = parse_wav(patched.as_slice()).unwrap();
        assert_eq!(audio, stereo());
    }

    #[test]
    fn test_非_riff_文件报错() {
        assert!(parse_wav(&b"RIFX\0\0\0\0WAVE"[..]).is_err());
    }

    #[test]
    fn test_拒绝非_16_位() {
        let mut bytes = Vec::new();
        write_wav_to(&mut bytes, &stereo()).unwrap();
        bytes[34] = 8;
        assert!(parse_wav(bytes.as_slice()).is_err());
    }

    #[test]
    fn test_缺少_data_块() {
        let mut bytes = Vec::new();
        write_wav_to(&mut bytes, &stereo()).unwrap();
        assert!(parse_wav(&bytes[..36]).is_err());
    }
}
