/// End-to-end behaviour of the codec and the containers built on it.
///
/// Covers:
///  1. Round trips for both bit splits across empty, tiny, repetitive, and
///     high-entropy inputs, through both section framings
///  2. Exact operation streams for the boundary cases (maximum match, window
///     edge, overlapping run, the ABCABCABC scenario)
///  3. Rejection of malformed blocks without panics or partial output
///  4. Independent encode/decode of many blocks on separate threads
use lzb_containers::{
    table_to_bytes, Container, ContainerKind, Font, FunctionEntry, GrVersion, Image, Script,
};
use lzb_core::bits::control_bit;
use lzb_core::{
    compress, decompress, decompress_with_mode, Codec, CodecConfig, CodecError, CompressedBlock,
    DecodeMode, Framing, SectionReader, StreamSection,
};

/// Generate `len` deterministic bytes using a simple LCG.
fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (rng >> 56) as u8
        })
        .collect()
}

/// Generate `len` highly compressible bytes (repeating pattern).
fn compressible_bytes(len: usize) -> Vec<u8> {
    let pattern = b"the quick brown fox jumps over the lazy dog. ";
    (0..len).map(|i| pattern[i % pattern.len()]).collect()
}

const CONFIGS: [CodecConfig; 2] = [CodecConfig::OFFSET11_LENGTH5, CodecConfig::OFFSET13_LENGTH3];

// ── round trips ─────────────────────────────────────────────────────────────

#[test]
fn test_roundtrip_edge_sizes() {
    for config in CONFIGS {
        for input in [
            Vec::new(),
            vec![0x42],
            b"ab".to_vec(),
            b"abc".to_vec(),
            vec![0u8; 1],
            vec![0u8; config.max_match_length() * 3 + 1],
        ] {
            let block = compress(&input, config);
            assert_eq!(
                decompress_with_mode(&block, config, DecodeMode::Strict).unwrap(),
                input
            );
        }
    }
}

#[test]
fn test_roundtrip_compressible_shrinks() {
    let data = compressible_bytes(64 * 1024 + 17);
    for config in CONFIGS {
        let block = compress(&data, config);
        let stats = block.stats();
        assert!(
            stats.payload_len() < data.len() / 3,
            "{config:?} should compress repeating text: payload={} raw={}",
            stats.payload_len(),
            data.len()
        );
        assert_eq!(decompress(&block, config).unwrap(), data);
        eprintln!("{config:?} ratio: {:.2}x", stats.ratio());
    }
}

#[test]
fn test_roundtrip_incompressible_through_framings() {
    let data = pseudo_random_bytes(32 * 1024, 0xDEAD_BEEF);
    for config in CONFIGS {
        let codec = Codec::new(config).strict();
        for framing in [Framing::Prefixed, Framing::Remainder] {
            let bytes = codec.compress_to_bytes(&data, framing).unwrap();
            assert_eq!(codec.decompress_bytes(&bytes, framing).unwrap(), data);
        }
        // Mostly literals: one byte plus one flag bit each.
        let stats = codec.compress(&data).stats();
        assert!(stats.literals > stats.back_references * 50);
    }
}

#[test]
fn test_compress_is_deterministic() {
    let data = compressible_bytes(10_000);
    for config in CONFIGS {
        let a = compress(&data, config).to_bytes(Framing::Prefixed).unwrap();
        let b = compress(&data, config).to_bytes(Framing::Prefixed).unwrap();
        assert_eq!(a, b);
    }
}

// ── operation streams at the boundaries ─────────────────────────────────────

/// `(is_back_reference, field)` per operation; `field` is the literal byte or
/// the packed u16.
fn ops(block: &CompressedBlock) -> Vec<(bool, u16)> {
    let stream = block.field_stream();
    let mut at = 0;
    (0..block.operation_count())
        .map(|i| {
            if control_bit(block.control_bitmap(), i).unwrap() {
                at += 2;
                (true, u16::from_le_bytes([stream[at - 2], stream[at - 1]]))
            } else {
                at += 1;
                (false, stream[at - 1] as u16)
            }
        })
        .collect()
}

#[test]
fn test_abcabcabc_scenario() {
    let config = CodecConfig::OFFSET11_LENGTH5;
    let block = compress(b"ABCABCABC", config);
    // offset 3, length 6 → ((3-1) << 5) | (6-1)
    assert_eq!(
        ops(&block),
        vec![(false, 'A' as u16), (false, 'B' as u16), (false, 'C' as u16), (true, (2 << 5) | 5)]
    );
    assert_eq!(block.uncompressed_size(), 9);
}

#[test]
fn test_max_match_boundary() {
    for config in CONFIGS {
        let max = config.max_match_length();
        let block = compress(&vec![0x11; max + 1], config);
        let field = (max - 1) as u16; // offset 1 → (0 << length_bits) | (max - 1)
        assert_eq!(ops(&block), vec![(false, 0x11), (true, field)]);
    }
}

#[test]
fn test_window_edge_falls_back_to_literals() {
    let window = 32;
    let config = CodecConfig::OFFSET13_LENGTH3.with_window_size(window).unwrap();
    let mut input = b"QRS".to_vec();
    input.extend((0..window as u8 - 2).map(|b| b.wrapping_mul(7) ^ 0xA0));
    input.extend_from_slice(b"QRS");
    assert_eq!(input.len() - 3, window + 1);

    let block = compress(&input, config);
    assert!(ops(&block).iter().all(|(is_ref, _)| !is_ref));
    assert_eq!(decompress(&block, config).unwrap(), input);
}

#[test]
fn test_overlap_run_decodes_sequentially() {
    let config = CodecConfig::OFFSET11_LENGTH5;
    let block = compress(&[0xAA; 10], config);
    assert_eq!(ops(&block), vec![(false, 0xAA), (true, 8)]); // offset 1, length 9
    assert_eq!(decompress(&block, config).unwrap(), vec![0xAA; 10]);
}

// ── malformed input ─────────────────────────────────────────────────────────

#[test]
fn test_operation_count_beyond_bitmap() {
    let block = CompressedBlock::from_parts(64, 64, vec![0; 2], vec![b'.'; 64]);
    assert!(matches!(
        decompress(&block, CodecConfig::default()),
        Err(CodecError::TruncatedStream {
            section: StreamSection::Bitmap,
            op_index: 16,
            ..
        })
    ));
}

#[test]
fn test_corrupted_sections_fail_cleanly() {
    let data = compressible_bytes(4096);
    let codec = Codec::new(CodecConfig::OFFSET11_LENGTH5);
    let bytes = codec.compress_to_bytes(&data, Framing::Prefixed).unwrap();

    // Prefixed sections carry every length, so any cut is detected.
    for cut in 0..bytes.len() {
        assert!(
            codec.decompress_bytes(&bytes[..cut], Framing::Prefixed).is_err(),
            "truncated at {cut} should fail"
        );
    }

    // Flipping bytes may decode to garbage but must not panic.
    for i in (0..bytes.len()).step_by(7) {
        let mut corrupt = bytes.clone();
        corrupt[i] ^= 0x5A;
        let _ = codec.strict().decompress_bytes(&corrupt, Framing::Prefixed);
    }
}

#[test]
fn test_oversized_header_is_truncated_input() {
    // Claims 4 GiB of operations in a 12-byte buffer.
    let bytes = [0, 1, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0];
    let err = CompressedBlock::parse(&bytes, Framing::Remainder).unwrap_err();
    assert!(matches!(err, CodecError::TruncatedInput { offset: 8, .. }));
    assert!(err.to_string().contains("byte 8"));
}

#[test]
fn test_huge_declared_size_is_rejected_in_strict_mode() {
    // Prefixed section: ~4 GiB declared, no operations, empty field stream.
    let bytes = [0xF0, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0, 0, 0, 0, 0];
    let codec = Codec::new(CodecConfig::OFFSET11_LENGTH5).strict();
    assert!(matches!(
        codec.decompress_bytes(&bytes, Framing::Prefixed),
        Err(CodecError::SizeMismatch {
            expected: 0xFFFF_FFF0,
            actual: 0
        })
    ));
}

// ── concurrency ─────────────────────────────────────────────────────────────

#[test]
fn test_blocks_encode_and_decode_on_separate_threads() {
    let inputs: Vec<Vec<u8>> = (0..8)
        .map(|i| {
            let mut v = compressible_bytes(5000 + i * 311);
            v.extend(pseudo_random_bytes(700, i as u64));
            v
        })
        .collect();
    let codec = Codec::new(CodecConfig::OFFSET13_LENGTH3).strict();

    std::thread::scope(|s| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|input| s.spawn(move || codec.decompress(&codec.compress(input))))
            .collect();
        for (handle, input) in handles.into_iter().zip(&inputs) {
            assert_eq!(&handle.join().unwrap().unwrap(), input);
        }
    });
}

// ── containers ──────────────────────────────────────────────────────────────

#[test]
fn test_containers_detect_and_round_trip() {
    let script = Script {
        code: compressible_bytes(3000),
        functions: b"entry\0".repeat(20),
        variables: vec![0xFF; 34],
        resources: Vec::new(),
    };
    let font = Font {
        width: 16,
        height: 16,
        glyphs: compressible_bytes(94 * 64),
    };
    let image = Image {
        version: GrVersion::Gr3,
        bpp: 24,
        width: 40,
        height: 30,
        pixels: compressible_bytes(40 * 30 * 3),
    };

    let script_bytes = script.encode().unwrap();
    let font_bytes = font.encode().unwrap();
    let image_bytes = image.encode().unwrap();

    assert_eq!(ContainerKind::detect(&script_bytes).unwrap(), ContainerKind::Script);
    assert_eq!(ContainerKind::detect(&font_bytes).unwrap(), ContainerKind::Font);
    assert_eq!(ContainerKind::detect(&image_bytes).unwrap(), ContainerKind::Image);

    assert_eq!(Script::decode(&script_bytes).unwrap(), script);
    assert_eq!(Font::decode(&font_bytes).unwrap(), font);
    assert_eq!(Image::decode(&image_bytes).unwrap(), image);

    let unpacked = ContainerKind::Font.unpack(&font_bytes).unwrap();
    assert_eq!(unpacked.sections, vec![("glyphs", font.glyphs.clone())]);
    assert!(unpacked.listings.is_empty());

    let script = Script {
        functions: table_to_bytes(&[FunctionEntry {
            name: "start".into(),
            data: 16,
        }])
        .unwrap(),
        variables: Vec::new(),
        ..script
    };
    let unpacked = ContainerKind::Script
        .unpack(&script.encode().unwrap())
        .unwrap();
    let labels: Vec<_> = unpacked.sections.iter().map(|(label, _)| *label).collect();
    assert_eq!(labels, ["code", "functions", "variables", "resources"]);
    assert_eq!(unpacked.sections[0].1, script.code);
    assert_eq!(unpacked.listings[0], ("functions", "count: 1\n\n[0] name: start, data: 16\n".to_string()));
}

#[test]
fn test_script_sections_are_consecutive_prefixed_blocks() {
    let script = Script {
        code: b"abc".to_vec(),
        functions: b"def".to_vec(),
        variables: b"ghi".to_vec(),
        resources: b"jkl".to_vec(),
    };
    let bytes = script.encode().unwrap();
    let mut reader = SectionReader::new(&bytes[3..]);
    let codec = Codec::new(CodecConfig::OFFSET11_LENGTH5);
    for expected in [b"abc", b"def", b"ghi", b"jkl"] {
        let block = reader.read_block(Framing::Prefixed).unwrap();
        let inverted: Vec<u8> = expected.iter().map(|b| !b).collect();
        assert_eq!(codec.decompress(&block).unwrap(), inverted);
    }
    assert!(reader.is_empty());
}
