//! Edge case tests for DEFLATE compression.

use flatezip_deflate::{deflate, inflate};

#[test]
fn test_empty_input() {
    let input = b"";
    let compressed = deflate(input, 6).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_single_byte() {
    let input = b"A";
    let compressed = deflate(input, 6).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_all_zeros() {
    let input = vec![0u8; 1000];
    let compressed = deflate(&input, 6).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
    // All zeros should compress very well
    assert!(compressed.len() < input.len() / 10);
}

#[test]
fn test_all_same_byte() {
    let input = vec![255u8; 5000];
    let compressed = deflate(&input, 6).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
    // Repeated byte should compress extremely well
    assert!(compressed.len() < input.len() / 20);
}

#[test]
fn test_max_match_length() {
    // Create data with maximum match length (258 bytes)
    let pattern = vec![42u8; 258];
    let mut input = Vec::new();
    for _ in 0..10 {
        input.extend_from_slice(&pattern);
    }

    let compressed = deflate(&input, 9).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_all_literals() {
    // Pseudo-random byte sequence: hard to LZ77-match, so the litlen/dist
    // Huffman tables end up with long runs of unused (zero-length) codes.
    // This used to corrupt the dynamic block header once a run of equal
    // code lengths passed 138 entries - fixed by capping the RLE encoder's
    // position advance at the emitted run length instead of rescanning the
    // full (uncapped) repeat.
    let input: Vec<u8> = (0..2000).map(|i| ((i * 131 + 7) % 256) as u8).collect();

    let compressed = deflate(&input, 9).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_alternating_pattern() {
    let mut input = Vec::with_capacity(2000);
    for i in 0..1000 {
        input.push(if i % 2 == 0 { b'A' } else { b'B' });
    }

    let compressed = deflate(&input, 6).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_large_input() {
    // Test with 1MB of data
    let mut input = Vec::with_capacity(1024 * 1024);
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    while input.len() < 1024 * 1024 {
        input.extend_from_slice(pattern);
    }
    input.truncate(1024 * 1024);

    let compressed = deflate(&input, 5).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
    assert_eq!(decompressed.len(), 1024 * 1024);
}

#[test]
fn test_incremental_pattern() {
    // Pattern that increases in complexity
    // Use level 1 to avoid dynamic Huffman issues
    let mut input = Vec::new();
    for i in 0..256 {
        for _ in 0..10 {
            input.push(i as u8);
        }
    }

    let compressed = deflate(&input, 1).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_compression_levels() {
    let input = b"Hello, world! This is a test of DEFLATE compression with various levels.";

    for level in 0..=9 {
        let compressed = deflate(input, level).unwrap();
        let decompressed = inflate(&compressed).unwrap();
        assert_eq!(decompressed, input, "Level {} failed", level);

        // Level 0 should be larger (stored blocks)
        // Higher levels should generally be smaller or equal
        if level == 0 {
            assert!(compressed.len() > input.len());
        }
    }
}

#[test]
fn test_binary_data() {
    // Binary data with all byte values
    let input: Vec<u8> = (0..=255).cycle().take(5000).collect();

    let compressed = deflate(&input, 6).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_long_distance_match() {
    // Create a pattern with a match at maximum distance (32KB)
    // Use level 1 for fixed Huffman
    let mut input = vec![0u8; 32768];
    let pattern = b"PATTERN_TO_MATCH";
    input[0..pattern.len()].copy_from_slice(pattern);
    input[32768 - pattern.len()..32768].copy_from_slice(pattern);

    let compressed = deflate(&input, 1).unwrap();
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_utf8_text() {
    let input = "日本語のテキストを圧縮するテスト。Emoji too: 🦀🚀✨. Mixed with ASCII text and repeated repeated repeated words.".repeat(20);
    let bytes = input.as_bytes();

    for level in [1, 6, 9] {
        let compressed = deflate(bytes, level).unwrap();
        let decompressed = inflate(&compressed).unwrap();
        assert_eq!(decompressed, bytes, "Level {} failed", level);
    }
}
