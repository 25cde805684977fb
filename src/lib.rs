//! # adxkit
//!
//! 纯 Rust 实现的 CRI ADX/AHX 音频编解码库.
//!
//! - **ADX**: 块式 4 位 ADPCM, 带循环信息, 常用于游戏 BGM
//! - **AHX**: 子带编码, 码率更低, 常用于语音
//!
//! # 快速开始
//!
//! ```rust
//! use adxkit::codec::{CodecId, EncoderSpec};
//! use adxkit::core::CancelToken;
//!
//! let spec = EncoderSpec::new(1, 22050);
//! let mut encoder = adxkit::codec::create_encoder(CodecId::Adx, &spec).unwrap();
//! encoder.encode(&vec![vec![0i16]; 64], &CancelToken::new()).unwrap();
//! let bytes = encoder.finish().unwrap();
//! assert_eq!(&bytes[..2], &[0x80, 0x00]);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `adxkit-core` | 比特流读写, 错误类型, 采样类型, 取消令牌 |
//! | `adxkit-codec` | 头部模型, ADX/AHX 编解码器, 注册表 |

/// 核心类型与工具
pub use adxkit_core as core;

/// 编解码器
pub use adxkit_codec as codec;

/// 获取 adxkit 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置编解码器的注册表
pub fn default_codec_registry() -> adxkit_codec::CodecRegistry {
    adxkit_codec::default_registry()
}
