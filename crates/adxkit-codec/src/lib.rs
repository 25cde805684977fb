//! # adxkit-codec
//!
//! CRI ADX/AHX 音频编解码库.
//!
//! - **ADX**: 块式 4 位 ADPCM, 支持 1-8 声道与循环信息
//! - **AHX**: MPEG 风格的 30 子带编码, 单声道, 每帧 1152 采样
//!
//! 解码为拉取式 (`next_sample()`), 编码为推送式 (`encode()` 后 `finish()`).
//! 实例之间不共享可变状态, 常量表只读, 可以每线程一个实例并行使用.
//!
//! ## 使用示例
//!
//! ```rust
//! use adxkit_codec::{CodecId, EncoderSpec};
//! use adxkit_core::CancelToken;
//!
//! let mut encoder = adxkit_codec::create_encoder(CodecId::Adx, &EncoderSpec::new(1, 22050)).unwrap();
//! let samples: Vec<Vec<i16>> = (0..100).map(|i| vec![(i * 50) as i16]).collect();
//! encoder.encode(&samples, &CancelToken::new()).unwrap();
//! let bytes = encoder.finish().unwrap();
//!
//! let mut decoder = adxkit_codec::open_decoder(bytes).unwrap();
//! let mut count = 0;
//! while decoder.next_sample().unwrap().is_some() {
//!     count += 1;
//! }
//! assert_eq!(count, 100);
//! ```

pub mod adx;
pub mod ahx;
pub mod codec_id;
pub mod decoder;
pub mod encoder;
pub mod header;
pub mod registry;

use adxkit_core::CriResult;
use bytes::Bytes;

// 重导出常用类型
pub use codec_id::CodecId;
pub use decoder::{Decoder, DecoderOptions};
pub use encoder::{Encoder, EncoderSpec, LoopPoints};
pub use header::{EncodingType, LoopInfo, StreamHeader};
pub use registry::CodecRegistry;

/// 注册所有内置编解码器
pub fn register_all(registry: &mut CodecRegistry) {
    registry.register_decoder(CodecId::Adx, "adx", adx::decoder::AdxDecoder::create);
    registry.register_decoder(CodecId::Ahx, "ahx", ahx::decoder::AhxDecoder::create);
    registry.register_encoder(CodecId::Adx, "adx", adx::encoder::AdxEncoder::create);
    registry.register_encoder(CodecId::Ahx, "ahx", ahx::encoder::AhxEncoder::create);
}

/// 创建注册了全部内置编解码器的注册表
pub fn default_registry() -> CodecRegistry {
    let mut registry = CodecRegistry::new();
    register_all(&mut registry);
    registry
}

/// 打开 ADX/AHX 流 (不循环)
pub fn open_decoder(data: impl Into<Bytes>) -> CriResult<Box<dyn Decoder>> {
    open_decoder_with(data, &DecoderOptions::default())
}

/// 按选项打开 ADX/AHX 流
pub fn open_decoder_with(
    data: impl Into<Bytes>,
    options: &DecoderOptions,
) -> CriResult<Box<dyn Decoder>> {
    default_registry().open_decoder(data, options)
}

/// 创建编码器
pub fn create_encoder(codec_id: CodecId, spec: &EncoderSpec) -> CriResult<Box<dyn Encoder>> {
    default_registry().create_encoder(codec_id, spec)
}
