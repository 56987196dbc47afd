//! Resumable, incrementally-fed DEFLATE decompression.
//!
//! [`Inflater`](crate::inflate::Inflater) decodes a complete buffer in one
//! call. [`StreamingInflater`] instead accepts input across multiple `feed`
//! calls and returns whatever output it was able to produce from the bytes
//! seen so far. It follows the same block grammar as the one-shot inflater,
//! but every primitive that might run out of input reports that fact
//! (`None`) instead of erroring, and the reader's position is snapshotted
//! before each speculative read so a starved read leaves no partial state
//! behind to undo. A Huffman decode that exhausts all of a code's bits
//! without matching any symbol is not starvation, though, and is reported
//! as a hard error rather than retried forever.
//!
//! Dynamic-block headers (HLIT/HDIST/HCLEN, the code-length tree, and the
//! RLE-expanded length vector) are treated as a single atomic unit: if the
//! whole header isn't yet buffered, the attempt rolls back to the
//! pre-header snapshot and is retried in full on the next `feed`. Literal
//! and length/distance symbols in the Huffman body are each atomic at the
//! granularity of one symbol (plus its extra bits), so the body decoder can
//! resume between symbols.

use crate::huffman::{BitSource, END_OF_BLOCK, HuffmanTree};
use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_EXTRA_BITS, LENGTH_EXTRA_BITS, decode_distance, decode_length,
    fixed_distance_tree, fixed_litlen_tree,
};
use flatezip_core::error::{FlateZipError, Result};
use flatezip_core::ringbuffer::sizes::DEFLATE as MAX_BACKWARD_LENGTH;
use flatezip_core::OutputRingBuffer;

/// A resumable LSB-first bit reader over a retained, append-only byte buffer.
///
/// Unlike [`flatezip_core::BitReader`], which wraps a blocking
/// [`std::io::Read`], this reader owns its input and can be fed more bytes
/// after running dry; reads that would otherwise block instead return
/// `None`, leaving the reader's position untouched.
#[derive(Debug, Clone)]
struct StreamBitReader {
    input: Vec<u8>,
    /// Index of the next byte in `input` not yet folded into `bit_buf`.
    byte_pos: usize,
    bit_buf: u64,
    bit_count: u32,
}

/// A checkpoint of [`StreamBitReader`]'s position, for rollback on starvation.
#[derive(Debug, Clone, Copy)]
struct BitSnapshot {
    byte_pos: usize,
    bit_buf: u64,
    bit_count: u32,
}

impl StreamBitReader {
    fn new() -> Self {
        Self {
            input: Vec::new(),
            byte_pos: 0,
            bit_buf: 0,
            bit_count: 0,
        }
    }

    /// Append more input, compacting already-consumed bytes out of the front
    /// of the buffer so it doesn't grow without bound across a long stream.
    fn feed(&mut self, bytes: &[u8]) {
        if self.byte_pos > 0 {
            self.input.drain(..self.byte_pos);
            self.byte_pos = 0;
        }
        self.input.extend_from_slice(bytes);
    }

    fn fill(&mut self) {
        while self.bit_count <= 56 && self.byte_pos < self.input.len() {
            self.bit_buf |= (self.input[self.byte_pos] as u64) << self.bit_count;
            self.byte_pos += 1;
            self.bit_count += 8;
        }
    }

    fn snapshot(&self) -> BitSnapshot {
        BitSnapshot {
            byte_pos: self.byte_pos,
            bit_buf: self.bit_buf,
            bit_count: self.bit_count,
        }
    }

    fn restore(&mut self, snap: BitSnapshot) {
        self.byte_pos = snap.byte_pos;
        self.bit_buf = snap.bit_buf;
        self.bit_count = snap.bit_count;
    }

    fn peek_bits_u32(&mut self, n: u8) -> Option<u32> {
        if n == 0 {
            return Some(0);
        }
        self.fill();
        if (self.bit_count as u8) < n {
            return None;
        }
        Some((self.bit_buf & ((1u64 << n) - 1)) as u32)
    }

    fn skip_bits_u32(&mut self, n: u8) {
        self.bit_buf >>= n;
        self.bit_count -= n as u32;
    }

    fn read_bits(&mut self, n: u8) -> Option<u32> {
        let bits = self.peek_bits_u32(n)?;
        self.skip_bits_u32(n);
        Some(bits)
    }

    /// Discard the remaining bits of the current partially-consumed byte.
    fn align_to_byte(&mut self) {
        let drop = (self.bit_count % 8) as u8;
        self.skip_bits_u32(drop);
    }

    /// Number of whole bytes available without consuming anything.
    fn bytes_available(&self) -> usize {
        (self.input.len() - self.byte_pos) + (self.bit_count as usize) / 8
    }

    /// Copy `len` raw bytes out (used for stored blocks), honoring the
    /// current bit-buffer byte-alignment. Returns `None` if not enough
    /// bytes are currently buffered.
    fn read_bytes(&mut self, len: usize) -> Option<Vec<u8>> {
        debug_assert_eq!(self.bit_count % 8, 0);
        if self.bytes_available() < len {
            return None;
        }

        let mut out = Vec::with_capacity(len);
        while out.len() < len && self.bit_count > 0 {
            out.push((self.bit_buf & 0xFF) as u8);
            self.bit_buf >>= 8;
            self.bit_count -= 8;
        }
        let remaining = len - out.len();
        out.extend_from_slice(&self.input[self.byte_pos..self.byte_pos + remaining]);
        self.byte_pos += remaining;
        Some(out)
    }
}

impl BitSource for StreamBitReader {
    fn peek_bits(&mut self, n: u8) -> Option<u32> {
        self.peek_bits_u32(n)
    }

    fn skip_bits(&mut self, n: u8) {
        self.skip_bits_u32(n);
    }

    fn read_bit(&mut self) -> Option<u32> {
        self.read_bits(1)
    }
}

/// Checkpoint granularity for the resumable block-level state machine,
/// named after the grammar states a transition consumes bits between.
#[derive(Debug, Clone)]
enum State {
    /// No block header has been read yet for the current block.
    BlockHeaderStart,
    /// Block header consumed; dispatching to a body decoder.
    BlockBodyStart {
        bfinal: bool,
        btype: u8,
    },
    /// Decoding a stored block's literal byte run.
    StoredBody {
        bfinal: bool,
        remaining: usize,
    },
    /// Decoding a fixed- or dynamic-Huffman block body.
    HuffmanBody {
        bfinal: bool,
        litlen_tree: std::sync::Arc<HuffmanTree>,
        dist_tree: std::sync::Arc<HuffmanTree>,
    },
    Done,
}

/// A DEFLATE decompressor that can be fed input incrementally.
///
/// Mirrors [`crate::inflate::Inflater`]'s grammar, but `feed` never blocks:
/// it returns whatever output the bytes seen so far allow, and retains
/// enough state to resume cleanly when more input arrives.
#[derive(Debug)]
pub struct StreamingInflater {
    reader: StreamBitReader,
    output: OutputRingBuffer,
    state: State,
    /// Position in `output.output()` up to which bytes have already been
    /// handed back to the caller by a previous `feed`/`finish` call.
    returned_up_to: usize,
}

impl StreamingInflater {
    /// Create a new streaming inflater with no input yet.
    pub fn new() -> Self {
        Self {
            reader: StreamBitReader::new(),
            output: OutputRingBuffer::with_capacity(MAX_BACKWARD_LENGTH, 65536),
            state: State::BlockHeaderStart,
            returned_up_to: 0,
        }
    }

    /// Feed additional compressed bytes and return any newly decodable
    /// output. May return an empty vector if `bytes` wasn't enough to make
    /// progress past the last checkpoint.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.reader.feed(bytes);
        self.run()?;
        Ok(self.drain())
    }

    /// Signal that no more input will arrive and return any remaining
    /// output. Errors if the stream ended mid-block (truncated input).
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        self.run()?;
        if !matches!(self.state, State::Done) {
            return Err(FlateZipError::unexpected_eof(1));
        }
        Ok(self.drain())
    }

    /// Whether a final block has been fully decoded.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Done)
    }

    fn drain(&mut self) -> Vec<u8> {
        let all = self.output.output();
        let fresh = all[self.returned_up_to..].to_vec();
        self.returned_up_to = all.len();
        fresh
    }

    /// Drive the state machine as far forward as the currently buffered
    /// input allows, then stop (on starvation or completion).
    ///
    /// Takes ownership of `self.state` up front via `mem::replace` so each
    /// arm below can freely call back into `&mut self` without fighting the
    /// borrow checker over a scrutinee still borrowed from `self`.
    fn run(&mut self) -> Result<()> {
        loop {
            let current = std::mem::replace(&mut self.state, State::Done);

            match current {
                State::Done => {
                    self.state = State::Done;
                    return Ok(());
                }
                State::BlockHeaderStart => {
                    let snap = self.reader.snapshot();
                    let Some(bfinal_bit) = self.reader.read_bit() else {
                        self.reader.restore(snap);
                        self.state = State::BlockHeaderStart;
                        return Ok(());
                    };
                    let Some(btype) = self.reader.read_bits(2) else {
                        self.reader.restore(snap);
                        self.state = State::BlockHeaderStart;
                        return Ok(());
                    };
                    if btype == 3 {
                        return Err(FlateZipError::invalid_header("Reserved block type 3"));
                    }
                    self.state = State::BlockBodyStart {
                        bfinal: bfinal_bit != 0,
                        btype: btype as u8,
                    };
                }
                State::BlockBodyStart { bfinal, btype } => match btype {
                    0 => {
                        let snap = self.reader.snapshot();
                        self.reader.align_to_byte();
                        let Some(len) = self.reader.read_bits(16) else {
                            self.reader.restore(snap);
                            self.state = State::BlockBodyStart { bfinal, btype };
                            return Ok(());
                        };
                        let Some(nlen) = self.reader.read_bits(16) else {
                            self.reader.restore(snap);
                            self.state = State::BlockBodyStart { bfinal, btype };
                            return Ok(());
                        };
                        if (len as u16) != !(nlen as u16) {
                            return Err(FlateZipError::corrupted(
                                0,
                                format!("LEN/NLEN mismatch: {} vs {}", len, !(nlen as u16)),
                            ));
                        }
                        self.state = State::StoredBody {
                            bfinal,
                            remaining: len as usize,
                        };
                    }
                    1 => {
                        self.state = State::HuffmanBody {
                            bfinal,
                            litlen_tree: std::sync::Arc::new(fixed_litlen_tree()?.clone()),
                            dist_tree: std::sync::Arc::new(fixed_distance_tree()?.clone()),
                        };
                    }
                    2 => {
                        let snap = self.reader.snapshot();
                        match self.read_dynamic_header()? {
                            Some((litlen_tree, dist_tree)) => {
                                self.state = State::HuffmanBody {
                                    bfinal,
                                    litlen_tree: std::sync::Arc::new(litlen_tree),
                                    dist_tree: std::sync::Arc::new(dist_tree),
                                };
                            }
                            None => {
                                self.reader.restore(snap);
                                self.state = State::BlockBodyStart { bfinal, btype };
                                return Ok(());
                            }
                        }
                    }
                    _ => unreachable!(),
                },
                State::StoredBody { bfinal, remaining } => {
                    if remaining == 0 {
                        self.state = if bfinal {
                            State::Done
                        } else {
                            State::BlockHeaderStart
                        };
                        continue;
                    }
                    let Some(chunk) = self.reader.read_bytes(remaining) else {
                        self.state = State::StoredBody { bfinal, remaining };
                        return Ok(());
                    };
                    self.output.write_literals(&chunk);
                    self.state = State::StoredBody {
                        bfinal,
                        remaining: 0,
                    };
                }
                State::HuffmanBody {
                    bfinal,
                    litlen_tree,
                    dist_tree,
                } => match self.decode_one_symbol(&litlen_tree, &dist_tree)? {
                    SymbolOutcome::Starved => {
                        self.state = State::HuffmanBody {
                            bfinal,
                            litlen_tree,
                            dist_tree,
                        };
                        return Ok(());
                    }
                    SymbolOutcome::EndOfBlock => {
                        self.state = if bfinal {
                            State::Done
                        } else {
                            State::BlockHeaderStart
                        };
                    }
                    SymbolOutcome::Consumed => {
                        self.state = State::HuffmanBody {
                            bfinal,
                            litlen_tree,
                            dist_tree,
                        };
                    }
                },
            }
        }
    }

    /// Decode exactly one literal, or one length/distance pair, or the
    /// end-of-block marker; rolls back and reports starvation if the bits
    /// needed aren't fully buffered yet.
    fn decode_one_symbol(
        &mut self,
        litlen_tree: &HuffmanTree,
        dist_tree: &HuffmanTree,
    ) -> Result<SymbolOutcome> {
        let snap = self.reader.snapshot();

        let code = match litlen_tree.decode_resumable(&mut self.reader) {
            Ok(Some(code)) => code,
            Ok(None) => {
                self.reader.restore(snap);
                return Ok(SymbolOutcome::Starved);
            }
            Err(e) => {
                self.reader.restore(snap);
                return Err(e);
            }
        };

        if code < 256 {
            self.output.write_literal(code as u8);
            return Ok(SymbolOutcome::Consumed);
        }
        if code == END_OF_BLOCK {
            return Ok(SymbolOutcome::EndOfBlock);
        }
        if code > 285 {
            return Err(FlateZipError::corrupted(
                0,
                format!("Invalid literal/length code: {}", code),
            ));
        }

        let length_idx = (code - 257) as usize;
        let extra_bits = LENGTH_EXTRA_BITS[length_idx];
        let Some(extra) = self.reader.read_bits(extra_bits) else {
            self.reader.restore(snap);
            return Ok(SymbolOutcome::Starved);
        };
        let length = decode_length(code, extra as u16);

        let dist_code = match dist_tree.decode_resumable(&mut self.reader) {
            Ok(Some(code)) => code,
            Ok(None) => {
                self.reader.restore(snap);
                return Ok(SymbolOutcome::Starved);
            }
            Err(e) => {
                self.reader.restore(snap);
                return Err(e);
            }
        };
        if dist_code >= 30 {
            return Err(FlateZipError::corrupted(
                0,
                format!("Invalid distance code: {}", dist_code),
            ));
        }
        let dist_extra_bits = DISTANCE_EXTRA_BITS[dist_code as usize];
        let Some(dist_extra) = self.reader.read_bits(dist_extra_bits) else {
            self.reader.restore(snap);
            return Ok(SymbolOutcome::Starved);
        };
        let distance = decode_distance(dist_code, dist_extra as u16);

        self.output.copy_match(distance as usize, length as usize)?;
        Ok(SymbolOutcome::Consumed)
    }

    /// Attempt to read a complete dynamic-block header (HLIT/HDIST/HCLEN,
    /// the code-length tree, and the RLE-expanded length vector) as one
    /// atomic unit. Returns `Ok(None)` on starvation with no side effects
    /// on the bit reader (the caller restores the pre-call snapshot).
    fn read_dynamic_header(&mut self) -> Result<Option<(HuffmanTree, HuffmanTree)>> {
        let Some(hlit_raw) = self.reader.read_bits(5) else {
            return Ok(None);
        };
        let hlit = hlit_raw as usize + 257;
        let Some(hdist_raw) = self.reader.read_bits(5) else {
            return Ok(None);
        };
        let hdist = hdist_raw as usize + 1;
        let Some(hclen_raw) = self.reader.read_bits(4) else {
            return Ok(None);
        };
        let hclen = hclen_raw as usize + 4;

        let mut code_length_lengths = [0u8; 19];
        for i in 0..hclen {
            let Some(len) = self.reader.read_bits(3) else {
                return Ok(None);
            };
            code_length_lengths[CODE_LENGTH_ORDER[i]] = len as u8;
        }

        let code_length_tree = HuffmanTree::from_code_lengths(&code_length_lengths)?;

        let mut all_lengths = vec![0u8; hlit + hdist];
        let mut i = 0;
        while i < all_lengths.len() {
            let code = match code_length_tree.decode_resumable(&mut self.reader) {
                Ok(Some(code)) => code,
                Ok(None) => return Ok(None),
                Err(e) => return Err(e),
            };

            match code {
                0..=15 => {
                    all_lengths[i] = code as u8;
                    i += 1;
                }
                16 => {
                    if i == 0 {
                        return Err(FlateZipError::corrupted(0, "Code 16 at start of lengths"));
                    }
                    let Some(extra) = self.reader.read_bits(2) else {
                        return Ok(None);
                    };
                    let repeat = extra as usize + 3;
                    let prev = all_lengths[i - 1];
                    for _ in 0..repeat {
                        if i >= all_lengths.len() {
                            return Err(FlateZipError::corrupted(0, "Code length overflow"));
                        }
                        all_lengths[i] = prev;
                        i += 1;
                    }
                }
                17 => {
                    let Some(extra) = self.reader.read_bits(3) else {
                        return Ok(None);
                    };
                    let repeat = extra as usize + 3;
                    for _ in 0..repeat {
                        if i >= all_lengths.len() {
                            return Err(FlateZipError::corrupted(0, "Code length overflow"));
                        }
                        all_lengths[i] = 0;
                        i += 1;
                    }
                }
                18 => {
                    let Some(extra) = self.reader.read_bits(7) else {
                        return Ok(None);
                    };
                    let repeat = extra as usize + 11;
                    for _ in 0..repeat {
                        if i >= all_lengths.len() {
                            return Err(FlateZipError::corrupted(0, "Code length overflow"));
                        }
                        all_lengths[i] = 0;
                        i += 1;
                    }
                }
                _ => return Err(FlateZipError::invalid_huffman(0)),
            }
        }

        let litlen_tree = HuffmanTree::from_code_lengths(&all_lengths[..hlit])?;
        let dist_tree = HuffmanTree::from_code_lengths(&all_lengths[hlit..])?;
        Ok(Some((litlen_tree, dist_tree)))
    }
}

impl Default for StreamingInflater {
    fn default() -> Self {
        Self::new()
    }
}

enum SymbolOutcome {
    Consumed,
    EndOfBlock,
    Starved,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deflate::deflate;
    use crate::inflate::inflate;

    fn roundtrip_in_chunks(data: &[u8], chunk_size: usize, level: u8) -> Vec<u8> {
        let compressed = deflate(data, level).unwrap();
        let mut inflater = StreamingInflater::new();
        let mut output = Vec::new();

        for chunk in compressed.chunks(chunk_size.max(1)) {
            output.extend(inflater.feed(chunk).unwrap());
        }
        output.extend(inflater.finish().unwrap());
        output
    }

    #[test]
    fn test_streaming_matches_one_shot_byte_at_a_time() {
        let data = b"Hello, Hello, Hello, World! This is a streaming test.".repeat(20);
        let one_shot = inflate(&deflate(&data, 6).unwrap()).unwrap();
        let streamed = roundtrip_in_chunks(&data, 1, 6);
        assert_eq!(one_shot, data.as_slice());
        assert_eq!(streamed, data);
    }

    #[test]
    fn test_streaming_matches_one_shot_various_chunk_sizes() {
        let data: Vec<u8> = (0u32..5000).map(|i| (i % 251) as u8).collect();
        for level in [0u8, 1, 6, 9] {
            for chunk_size in [1usize, 2, 3, 7, 64, 4096] {
                let streamed = roundtrip_in_chunks(&data, chunk_size, level);
                assert_eq!(
                    streamed, data,
                    "level={} chunk_size={} mismatch",
                    level, chunk_size
                );
            }
        }
    }

    #[test]
    fn test_streaming_empty_input() {
        let compressed = deflate(b"", 6).unwrap();
        let mut inflater = StreamingInflater::new();
        let mut output = inflater.feed(&compressed).unwrap();
        output.extend(inflater.finish().unwrap());
        assert!(output.is_empty());
    }

    #[test]
    fn test_streaming_single_feed_whole_stream() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let compressed = deflate(data, 6).unwrap();
        let mut inflater = StreamingInflater::new();
        let mut output = inflater.feed(&compressed).unwrap();
        output.extend(inflater.finish().unwrap());
        assert_eq!(output, data);
    }

    #[test]
    fn test_streaming_starved_returns_empty_not_error() {
        let data = b"abcabcabcabcabcabcabcabcabc".repeat(10);
        let compressed = deflate(&data, 6).unwrap();
        let mut inflater = StreamingInflater::new();
        // Feed just one byte: never enough to complete even the block header
        // plus a symbol in a dynamic block; should not error.
        let out = inflater.feed(&compressed[..1]).unwrap();
        assert!(out.is_empty());
        assert!(!inflater.is_finished());
    }

    #[test]
    fn test_finish_without_enough_input_errors() {
        let data = b"some data to compress for a truncation test".repeat(5);
        let compressed = deflate(&data, 6).unwrap();
        let mut inflater = StreamingInflater::new();
        inflater.feed(&compressed[..compressed.len() / 2]).unwrap();
        assert!(inflater.finish().is_err());
    }
}
