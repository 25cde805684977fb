//! 统一错误类型定义.
//!
//! 所有 adxkit crate 共用的错误类型, 支持跨模块传播.
//!
//! 注意: 流结束不是错误. 解码器用 `Ok(None)` 表示流结束,
//! `UnexpectedEof` 只表示数据在块/帧中途被截断.

use thiserror::Error;

/// adxkit 统一错误类型
#[derive(Debug, Error)]
pub enum CriError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 文件格式错误 (魔数、版权标记、声道数等不符合预期)
    #[error("格式错误: {0}")]
    Format(String),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 读取越过数据末尾 (块或帧被截断)
    #[error("数据意外截断")]
    UnexpectedEof,

    /// 编码被取消
    #[error("操作已取消")]
    Cancelled,

    /// 未找到指定的编解码器
    #[error("未找到编解码器: {0}")]
    CodecNotFound(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

/// adxkit 统一 Result 类型
pub type CriResult<T> = Result<T, CriError>;
