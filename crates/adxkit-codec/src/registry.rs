//! 编解码器注册表.
//!
//! 按 CodecId 查找并实例化解码器/编码器. 解码器在打开时已拿到解析好的头部.

use std::collections::HashMap;

use adxkit_core::{CriError, CriResult};
use bytes::Bytes;
use log::debug;

use crate::codec_id::CodecId;
use crate::decoder::{Decoder, DecoderOptions};
use crate::encoder::{Encoder, EncoderSpec};
use crate::header::StreamHeader;

/// 解码器工厂函数类型
pub type DecoderFactory = fn(StreamHeader, Bytes) -> CriResult<Box<dyn Decoder>>;

/// 编码器工厂函数类型
pub type EncoderFactory = fn(&EncoderSpec) -> CriResult<Box<dyn Encoder>>;

/// 编解码器注册表
///
/// 管理所有已注册的编解码器, 支持按 CodecId 查找并创建实例.
pub struct CodecRegistry {
    /// 解码器工厂映射
    decoders: HashMap<CodecId, Vec<DecoderEntry>>,
    /// 编码器工厂映射
    encoders: HashMap<CodecId, Vec<EncoderEntry>>,
}

/// 解码器注册条目
struct DecoderEntry {
    name: String,
    factory: DecoderFactory,
}

/// 编码器注册条目
struct EncoderEntry {
    name: String,
    factory: EncoderFactory,
}

impl CodecRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
            encoders: HashMap::new(),
        }
    }

    /// 注册一个解码器
    pub fn register_decoder(
        &mut self,
        codec_id: CodecId,
        name: impl Into<String>,
        factory: DecoderFactory,
    ) {
        self.decoders
            .entry(codec_id)
            .or_default()
            .push(DecoderEntry {
                name: name.into(),
                factory,
            });
    }

    /// 注册一个编码器
    pub fn register_encoder(
        &mut self,
        codec_id: CodecId,
        name: impl Into<String>,
        factory: EncoderFactory,
    ) {
        self.encoders
            .entry(codec_id)
            .or_default()
            .push(EncoderEntry {
                name: name.into(),
                factory,
            });
    }

    /// 用已解析的头部创建解码器
    pub fn create_decoder(&self, header: StreamHeader, data: Bytes) -> CriResult<Box<dyn Decoder>> {
        let codec_id = header.codec_id();
        let entry = self
            .decoders
            .get(&codec_id)
            .and_then(|entries| entries.first())
            .ok_or_else(|| CriError::CodecNotFound(format!("未找到 {} 的解码器", codec_id)))?;
        (entry.factory)(header, data)
    }

    /// 创建指定编解码器的编码器实例
    pub fn create_encoder(&self, codec_id: CodecId, spec: &EncoderSpec) -> CriResult<Box<dyn Encoder>> {
        let entry = self
            .encoders
            .get(&codec_id)
            .and_then(|entries| entries.first())
            .ok_or_else(|| CriError::CodecNotFound(format!("未找到 {} 的编码器", codec_id)))?;
        (entry.factory)(spec)
    }

    /// 解析头部并打开对应的解码器
    pub fn open_decoder(
        &self,
        data: impl Into<Bytes>,
        options: &DecoderOptions,
    ) -> CriResult<Box<dyn Decoder>> {
        let data = data.into();
        let header = StreamHeader::parse(&data)?;
        let mut decoder = self.create_decoder(header, data)?;
        decoder.set_looping(options.looping);
        debug!(
            "打开 {} 流: {} 声道, {} Hz, 循环 {}",
            decoder.name(),
            decoder.channels(),
            decoder.sample_rate(),
            options.looping,
        );
        Ok(decoder)
    }

    /// 获取所有已注册的解码器名称
    pub fn list_decoders(&self) -> Vec<(CodecId, &str)> {
        let mut result = Vec::new();
        for (id, entries) in &self.decoders {
            for entry in entries {
                result.push((*id, entry.name.as_str()));
            }
        }
        result
    }

    /// 获取所有已注册的编码器名称
    pub fn list_encoders(&self) -> Vec<(CodecId, &str)> {
        let mut result = Vec::new();
        for (id, entries) in &self.encoders {
            for entry in entries {
                result.push((*id, entry.name.as_str()));
            }
        }
        result
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{EncodingType, HEADER_MAGIC};

    fn registry() -> CodecRegistry {
        let mut registry = CodecRegistry::new();
        crate::register_all(&mut registry);
        registry
    }

    #[test]
    fn test_注册所有编解码器() {
        let registry = registry();
        assert_eq!(registry.list_decoders().len(), 2);
        assert_eq!(registry.list_encoders().len(), 2);
    }

    #[test]
    fn test_按codec_id创建编码器() {
        let registry = registry();
        for id in [CodecId::Adx, CodecId::Ahx] {
            let enc = registry.create_encoder(id, &EncoderSpec::new(1, 22050));
            assert!(enc.is_ok(), "创建 {} 编码器失败", id);
            assert_eq!(enc.unwrap().codec_id(), id);
        }
    }

    #[test]
    fn test_按头部打开解码器() {
        let registry = registry();
        let header = StreamHeader {
            data_offset: 0x20,
            encoding: EncodingType::Ahx,
            block_size: 0,
            bit_depth: 0,
            channel_count: 1,
            sample_rate: 22050,
            total_samples: 0,
            highpass_frequency: 0,
            version: 6,
            flags: 0,
            loop_info: None,
        };
        let bytes = header.to_bytes().unwrap();
        let mut dec = registry.open_decoder(bytes, &DecoderOptions::default()).unwrap();
        assert_eq!(dec.codec_id(), CodecId::Ahx);
        assert_eq!(dec.next_sample().unwrap(), None);
    }

    #[test]
    fn test_未注册的编解码器返回错误() {
        let registry = CodecRegistry::new();
        assert!(matches!(
            registry.create_encoder(CodecId::Adx, &EncoderSpec::new(1, 22050)),
            Err(CriError::CodecNotFound(_))
        ));
        let mut bytes = vec![0u8; 0x24];
        bytes[..2].copy_from_slice(&HEADER_MAGIC.to_be_bytes());
        assert!(registry.open_decoder(bytes, &DecoderOptions::default()).is_err());
    }
}
