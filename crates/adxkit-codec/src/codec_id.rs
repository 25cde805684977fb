//! 编解码器标识符.
//!
//! 为每种编解码算法分配唯一标识, 供注册表查找解码器/编码器.

use std::fmt;

/// 编解码器标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// CRI ADX (块式 ADPCM)
    Adx,
    /// CRI AHX (MPEG 风格子带编码)
    Ahx,
}

impl CodecId {
    /// 获取编解码器的人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Adx => "adx",
            Self::Ahx => "ahx",
        }
    }

    /// 按名称查找 (不区分大小写)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "adx" => Some(Self::Adx),
            "ahx" => Some(Self::Ahx),
            _ => None,
        }
    }

    /// 输出文件的常用扩展名
    pub const fn extension(&self) -> &'static str {
        self.name()
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_lookup() {
        assert_eq!(CodecId::from_name("ADX"), Some(CodecId::Adx));
        assert_eq!(CodecId::from_name("ahx"), Some(CodecId::Ahx));
        assert_eq!(CodecId::from_name("mp3"), None);
        assert_eq!(CodecId::Ahx.to_string(), "ahx");
    }
}
