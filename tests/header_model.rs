//! 头部模型集成测试.

use adxkit::codec::header::{COPYRIGHT_MARKER, HEADER_MAGIC};
use adxkit::codec::{CodecId, EncodingType, LoopInfo, StreamHeader};
use adxkit::core::CriError;

/// 手工构造的版本 3 头部, data_offset = 0x20
fn scenario_bytes() -> Vec<u8> {
    let mut bytes = vec![0u8; 0x24];
    bytes[0x00..0x02].copy_from_slice(&HEADER_MAGIC.to_be_bytes());
    bytes[0x02..0x04].copy_from_slice(&0x20u16.to_be_bytes());
    bytes[0x04] = 3;
    bytes[0x05] = 18;
    bytes[0x06] = 4;
    bytes[0x07] = 1;
    bytes[0x08..0x0C].copy_from_slice(&22050u32.to_be_bytes());
    bytes[0x0C..0x10].copy_from_slice(&1000u32.to_be_bytes());
    bytes[0x10..0x12].copy_from_slice(&500u16.to_be_bytes());
    bytes[0x12] = 3;
    bytes[0x1E..0x24].copy_from_slice(COPYRIGHT_MARKER);
    bytes
}

#[test]
fn test_scenario_header_fields() {
    let header = StreamHeader::parse(&scenario_bytes()).unwrap();
    assert_eq!(header.data_offset, 0x20);
    assert_eq!(header.encoding, EncodingType::Standard);
    assert_eq!(header.block_size, 18);
    assert_eq!(header.bit_depth, 4);
    assert_eq!(header.channel_count, 1);
    assert_eq!(header.sample_rate, 22050);
    assert_eq!(header.total_samples, 1000);
    assert_eq!(header.highpass_frequency, 500);
    assert_eq!(header.version, 3);
    assert_eq!(header.header_size(), 0x24);
    assert_eq!(header.codec_id(), CodecId::Adx);
    // 循环记录放不进 0x20 的数据偏移
    assert_eq!(header.loop_info, None);
}

#[test]
fn test_scenario_serializes_identically() {
    let bytes = scenario_bytes();
    let header = StreamHeader::parse(&bytes).unwrap();
    assert_eq!(header.to_bytes().unwrap(), bytes);
}

#[test]
fn test_format_errors_are_reported() {
    let mut bad_magic = scenario_bytes();
    bad_magic[0] = 0x00;
    let mut bad_marker = scenario_bytes();
    bad_marker[0x1F] = b'C';
    let mut bad_channels = scenario_bytes();
    bad_channels[0x07] = 0;

    for bytes in [bad_magic, bad_marker, bad_channels] {
        assert!(matches!(StreamHeader::parse(&bytes), Err(CriError::Format(_))));
        assert!(adxkit::codec::open_decoder(bytes).is_err());
    }
}

#[test]
fn test_loop_byte_offsets_follow_samples() {
    let mut header = StreamHeader::parse(&scenario_bytes()).unwrap();
    header.data_offset = 0x3C;
    header.channel_count = 2;
    let begin_sample = 64;
    let end_sample = 900;
    header.loop_info = Some(LoopInfo {
        alignment_samples: 0,
        enabled: true,
        begin_sample,
        begin_byte: header.block_byte_offset(begin_sample).unwrap(),
        end_sample,
        end_byte: header.block_byte_offset(end_sample).unwrap(),
    });

    let parsed = StreamHeader::parse(&header.to_bytes().unwrap()).unwrap();
    let info = parsed.loop_info.unwrap();
    assert_eq!(info.begin_byte, 0x40 + 2 * 36);
    // ⌈900 / 32⌉ = 29
    assert_eq!(info.end_byte, 0x40 + 29 * 36);
}
