//! # adxkit-core
//!
//! adxkit 核心库, 提供比特流读写、统一错误类型、采样类型和取消令牌.
//!
//! 上层的 ADX/AHX 编解码器都构建在这些基础设施之上.

pub mod bitreader;
pub mod bitwriter;
pub mod cancel;
pub mod error;
pub mod sample;

// 重导出常用类型
pub use bitreader::{BitCursor, BitReader};
pub use bitwriter::BitWriter;
pub use cancel::CancelToken;
pub use error::{CriError, CriResult};
pub use sample::Sample;
