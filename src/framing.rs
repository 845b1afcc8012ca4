// Copyright 2020 Joyent, Inc.

//! NETCONF message framing (RFC 6242).
//!
//! Two framing mechanisms delimit messages on the byte stream:
//!
//! * End-of-message: every message is followed by the literal `]]>]]>`. The
//!   marker is not escaped if it appears inside a payload, so only chunked
//!   framing is safe for arbitrary payloads.
//!
//! * Chunked: a message is a sequence of chunks `\n#<len>\n<bytes>` closed by
//!   `\n##\n`. The chunk length is an ASCII decimal without sign or leading
//!   zeros.
//!
//! A session always starts in end-of-message mode. The mode is switched to
//! chunked by the negotiator, between two frames, once both peers advertised
//! `base:1.1`.

use std::fmt;
use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FramingError;

pub const EOM_MARKER: &[u8] = b"]]>]]>";
pub const CHUNK_END: &[u8] = b"\n##\n";

pub const DEFAULT_CHUNK_SIZE: usize = 8192;
pub const MIN_CHUNK_SIZE: usize = 128;
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

// u32::MAX has ten decimal digits
const MAX_CHUNK_SIZE_DIGITS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    EndOfMessage,
    Chunked,
}

impl fmt::Display for FramingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramingMode::EndOfMessage => write!(f, "end-of-message"),
            FramingMode::Chunked => write!(f, "chunked"),
        }
    }
}

/// Splits a byte stream on the end-of-message marker.
#[derive(Debug, Default)]
pub struct EomDecoder {
    // Bytes already searched without finding a marker.
    scanned: usize,
}

impl EomDecoder {
    pub fn new() -> EomDecoder {
        EomDecoder::default()
    }

    /// Extract the next frame from `buf`, leaving any trailing bytes in place.
    pub fn decode(
        &mut self,
        buf: &mut BytesMut,
        max_message_size: usize,
    ) -> Result<Option<BytesMut>, FramingError> {
        let start = self.scanned.min(buf.len());
        match find_marker(&buf[start..]) {
            Some(pos) => {
                let end = start + pos;
                if end > max_message_size {
                    return Err(FramingError::MessageTooLarge {
                        size: end as u64,
                        limit: max_message_size,
                    });
                }
                let frame = buf.split_to(end);
                buf.advance(EOM_MARKER.len());
                self.scanned = 0;
                Ok(Some(frame))
            }
            None => {
                // The tail may hold the first bytes of a split marker.
                let searched = buf.len().saturating_sub(EOM_MARKER.len() - 1);
                if searched > max_message_size {
                    return Err(FramingError::MessageTooLarge {
                        size: buf.len() as u64,
                        limit: max_message_size,
                    });
                }
                self.scanned = searched;
                Ok(None)
            }
        }
    }

    pub fn reset(&mut self) {
        self.scanned = 0;
    }
}

fn find_marker(buf: &[u8]) -> Option<usize> {
    buf.windows(EOM_MARKER.len()).position(|w| w == EOM_MARKER)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    HeaderNewline, // \n
    HeaderHash,    // #
    HeaderFirst,   // [1-9] or # for end of chunks
    HeaderDigits,  // [0-9]* \n
    Data,
    EndNewline, // \n
}

/// Reassembles chunked messages, keeping its parse position between calls so
/// that headers and payloads may be split at any byte.
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: ChunkState,
    chunk_len: u64,
    digits: usize,
    remaining: usize,
    message: BytesMut,
}

impl ChunkedDecoder {
    pub fn new() -> ChunkedDecoder {
        ChunkedDecoder {
            state: ChunkState::HeaderNewline,
            chunk_len: 0,
            digits: 0,
            remaining: 0,
            message: BytesMut::new(),
        }
    }

    pub fn decode(
        &mut self,
        buf: &mut BytesMut,
        max_message_size: usize,
    ) -> Result<Option<BytesMut>, FramingError> {
        while buf.has_remaining() {
            if self.state == ChunkState::Data {
                let n = self.remaining.min(buf.len());
                self.message.extend_from_slice(&buf[..n]);
                buf.advance(n);
                self.remaining -= n;
                if self.remaining == 0 {
                    self.state = ChunkState::HeaderNewline;
                }
                continue;
            }

            let byte = buf.get_u8();
            self.state = match self.state {
                ChunkState::HeaderNewline => {
                    verify_byte(byte, b'\n', "'\\n'")?;
                    ChunkState::HeaderHash
                }
                ChunkState::HeaderHash => {
                    verify_byte(byte, b'#', "'#'")?;
                    ChunkState::HeaderFirst
                }
                ChunkState::HeaderFirst => match byte {
                    b'1'..=b'9' => {
                        self.chunk_len = u64::from(byte - b'0');
                        self.digits = 1;
                        ChunkState::HeaderDigits
                    }
                    b'#' => ChunkState::EndNewline,
                    _ => return Err(malformed(byte, "chunk size [1-9] or '#'")),
                },
                ChunkState::HeaderDigits => match byte {
                    b'\n' => {
                        let size = self.message.len() as u64 + self.chunk_len;
                        if size > max_message_size as u64 {
                            return Err(FramingError::MessageTooLarge {
                                size,
                                limit: max_message_size,
                            });
                        }
                        self.remaining = self.chunk_len as usize;
                        ChunkState::Data
                    }
                    b'0'..=b'9' => {
                        self.digits += 1;
                        if self.digits > MAX_CHUNK_SIZE_DIGITS {
                            return Err(malformed(byte, "'\\n' after at most 10 digits"));
                        }
                        self.chunk_len = self.chunk_len * 10 + u64::from(byte - b'0');
                        ChunkState::HeaderDigits
                    }
                    _ => return Err(malformed(byte, "chunk size [0-9] or '\\n'")),
                },
                ChunkState::EndNewline => {
                    verify_byte(byte, b'\n', "'\\n'")?;
                    self.state = ChunkState::HeaderNewline;
                    return Ok(Some(self.message.split()));
                }
                ChunkState::Data => ChunkState::Data,
            };
        }

        Ok(None)
    }

    pub fn reset(&mut self) {
        self.state = ChunkState::HeaderNewline;
        self.chunk_len = 0;
        self.digits = 0;
        self.remaining = 0;
        self.message.clear();
    }

    fn is_idle(&self) -> bool {
        self.state == ChunkState::HeaderNewline && self.message.is_empty()
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn verify_byte(found: u8, expected: u8, what: &'static str) -> Result<(), FramingError> {
    if found == expected {
        Ok(())
    } else {
        Err(malformed(found, what))
    }
}

fn malformed(found: u8, expected: &'static str) -> FramingError {
    FramingError::MalformedChunkHeader { found, expected }
}

pub fn check_chunk_size(chunk_size: usize) -> Result<(), FramingError> {
    if chunk_size < MIN_CHUNK_SIZE || chunk_size > MAX_CHUNK_SIZE {
        Err(FramingError::InvalidChunkSize(chunk_size))
    } else {
        Ok(())
    }
}

/// Append `payload` followed by the end-of-message marker.
pub fn encode_eom(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(payload.len() + EOM_MARKER.len());
    dst.put_slice(payload);
    dst.put_slice(EOM_MARKER);
}

/// Append `payload` as `ceil(len / chunk_size)` chunks and the end-of-chunks
/// footer.
pub fn encode_chunked(
    payload: &[u8],
    chunk_size: usize,
    dst: &mut BytesMut,
) -> Result<(), FramingError> {
    check_chunk_size(chunk_size)?;

    let chunks = (payload.len() + chunk_size - 1) / chunk_size;
    dst.reserve(payload.len() + chunks * (MAX_CHUNK_SIZE_DIGITS + 3) + CHUNK_END.len());
    for chunk in payload.chunks(chunk_size) {
        dst.put_slice(format!("\n#{}\n", chunk.len()).as_bytes());
        dst.put_slice(chunk);
    }
    dst.put_slice(CHUNK_END);
    Ok(())
}

/// Bidirectional frame codec whose framing mode can be replaced between two
/// frames without losing buffered bytes.
#[derive(Debug)]
pub struct FrameCodec {
    mode: FramingMode,
    eom: EomDecoder,
    chunked: ChunkedDecoder,
    chunk_size: usize,
    max_message_size: usize,
    failed: bool,
}

impl FrameCodec {
    pub fn new() -> FrameCodec {
        FrameCodec {
            mode: FramingMode::EndOfMessage,
            eom: EomDecoder::new(),
            chunked: ChunkedDecoder::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            failed: false,
        }
    }

    pub fn with_limits(
        chunk_size: usize,
        max_message_size: usize,
    ) -> Result<FrameCodec, FramingError> {
        check_chunk_size(chunk_size)?;
        let mut codec = FrameCodec::new();
        codec.chunk_size = chunk_size;
        codec.max_message_size = max_message_size;
        Ok(codec)
    }

    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Replace the framing mode. Must only be called between two frames.
    pub fn set_mode(&mut self, mode: FramingMode) {
        debug_assert!(self.chunked.is_idle());
        self.mode = mode;
        self.eom.reset();
        self.chunked.reset();
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Decode every complete frame in `buf`. Incomplete trailing bytes stay in
    /// `buf` (or in the chunk reassembly state) for the next call.
    pub fn decode_frames(&mut self, buf: &mut BytesMut) -> Result<Vec<BytesMut>, FramingError> {
        let mut frames = Vec::new();
        while let Some(frame) = self.decode_frame(buf)? {
            frames.push(frame);
        }
        Ok(frames)
    }

    pub fn decode_frame(&mut self, buf: &mut BytesMut) -> Result<Option<BytesMut>, FramingError> {
        if self.failed {
            return Err(FramingError::Poisoned);
        }

        let result = match self.mode {
            FramingMode::EndOfMessage => self.eom.decode(buf, self.max_message_size),
            FramingMode::Chunked => self.chunked.decode(buf, self.max_message_size),
        };
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    /// True while a chunked message has been partly consumed from the input.
    pub fn has_partial_frame(&self) -> bool {
        self.mode == FramingMode::Chunked && !self.chunked.is_idle()
    }

    /// Decode the last frame of a stream. Leftover input, or a chunked
    /// message missing its end marker, is an unexpected end of stream.
    pub fn decode_frame_eof(
        &mut self,
        buf: &mut BytesMut,
    ) -> Result<Option<BytesMut>, FramingError> {
        if let Some(frame) = self.decode_frame(buf)? {
            return Ok(Some(frame));
        }
        if buf.is_empty() && !self.has_partial_frame() {
            return Ok(None);
        }
        let held = buf.len() + self.chunked.message.len();
        Err(FramingError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("{} bytes of partial frame at end of stream", held),
        )))
    }

    pub fn encode_frame(&mut self, payload: &[u8], dst: &mut BytesMut) -> Result<(), FramingError> {
        match self.mode {
            FramingMode::EndOfMessage => {
                encode_eom(payload, dst);
                Ok(())
            }
            FramingMode::Chunked => encode_chunked(payload, self.chunk_size, dst),
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = FramingError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<BytesMut>, FramingError> {
        self.decode_frame(buf)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<BytesMut>, FramingError> {
        self.decode_frame_eof(buf)
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FramingError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), FramingError> {
        self.encode_frame(&item, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Gen, QuickCheck, TestResult};

    fn chunked_codec(chunk_size: usize) -> FrameCodec {
        let mut codec = FrameCodec::with_limits(chunk_size, DEFAULT_MAX_MESSAGE_SIZE).unwrap();
        codec.set_mode(FramingMode::Chunked);
        codec
    }

    fn feed_in_pieces(codec: &mut FrameCodec, bytes: &[u8], splits: &[usize]) -> Vec<BytesMut> {
        let mut buf = BytesMut::new();
        let mut frames = Vec::new();
        let mut offset = 0;
        for split in splits {
            if offset >= bytes.len() {
                break;
            }
            let end = (offset + 1 + split % 64).min(bytes.len());
            buf.extend_from_slice(&bytes[offset..end]);
            frames.extend(codec.decode_frames(&mut buf).unwrap());
            offset = end;
        }
        buf.extend_from_slice(&bytes[offset..]);
        frames.extend(codec.decode_frames(&mut buf).unwrap());
        frames
    }

    #[test]
    fn eom_single_message() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"<hello/>]]>]]>"[..]);
        let frames = codec.decode_frames(&mut buf).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"<hello/>");
        assert!(buf.is_empty());
    }

    #[test]
    fn chunked_eof_inside_header_or_data_is_an_error() {
        for input in [&b"\n#1"[..], &b"\n#3\nab"[..], &b"\n#3\nabc"[..], &b"\n#3\nabc\n#"[..]] {
            let mut codec = chunked_codec(DEFAULT_CHUNK_SIZE);
            let mut buf = BytesMut::from(input);
            assert_eq!(codec.decode_frame(&mut buf).unwrap(), None);
            assert!(codec.has_partial_frame());
            assert!(codec.decode_frame_eof(&mut buf).is_err(), "{:?}", input);
        }

        let mut codec = chunked_codec(DEFAULT_CHUNK_SIZE);
        let mut buf = BytesMut::from(&b"\n#3\nabc\n##\n"[..]);
        assert_eq!(&codec.decode_frame_eof(&mut buf).unwrap().unwrap()[..], b"abc");
        assert!(!codec.has_partial_frame());
        assert_eq!(codec.decode_frame_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn eom_marker_split_across_reads() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"<rpc/>]]>"[..]);
        assert!(codec.decode_frames(&mut buf).unwrap().is_empty());
        buf.extend_from_slice(b"]]");
        assert!(codec.decode_frames(&mut buf).unwrap().is_empty());
        buf.extend_from_slice(b">next");
        let frames = codec.decode_frames(&mut buf).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"<rpc/>");
        assert_eq!(&buf[..], b"next");
    }

    #[test]
    fn eom_marker_alone_is_empty_message() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(EOM_MARKER);
        let frames = codec.decode_frames(&mut buf).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_empty());
    }

    #[test]
    fn eom_back_to_back_markers() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"<a/>]]>]]>]]>]]><b/>]]>]]>"[..]);
        let frames = codec.decode_frames(&mut buf).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(&frames[0][..], b"<a/>");
        assert!(frames[1].is_empty());
        assert_eq!(&frames[2][..], b"<b/>");
    }

    #[test]
    fn eom_rejects_oversized_message() {
        let mut codec = FrameCodec::with_limits(DEFAULT_CHUNK_SIZE, 16).unwrap();
        let mut buf = BytesMut::from(&[b'x'; 64][..]);
        match codec.decode_frames(&mut buf) {
            Err(FramingError::MessageTooLarge { limit, .. }) => assert_eq!(limit, 16),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn eom_encoder_does_not_escape_marker() {
        let mut codec = FrameCodec::new();
        let mut dst = BytesMut::new();
        codec.encode_frame(b"a]]>]]>b", &mut dst).unwrap();
        assert_eq!(&dst[..], b"a]]>]]>b]]>]]>");
    }

    #[test]
    fn chunked_example_1044_bytes() {
        let payload: Vec<u8> = (0..1044).map(|i| (i % 251) as u8).collect();
        let mut dst = BytesMut::new();
        encode_chunked(&payload, 256, &mut dst).unwrap();
        assert_eq!(dst.len(), 1077);

        let text = String::from_utf8_lossy(&dst);
        assert_eq!(text.matches("\n#256\n").count(), 4);
        assert_eq!(text.matches("\n#20\n").count(), 1);
        assert!(dst.ends_with(CHUNK_END));

        let mut codec = chunked_codec(256);
        let frames = codec.decode_frames(&mut dst).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], &payload[..]);
    }

    #[test]
    fn chunked_byte_at_a_time() {
        let payload = b"<rpc message-id=\"1\"><get/></rpc>".repeat(20);
        let mut encoded = BytesMut::new();
        encode_chunked(&payload, 128, &mut encoded).unwrap();

        let mut codec = chunked_codec(128);
        let mut buf = BytesMut::new();
        let mut frames = Vec::new();
        for byte in encoded.iter() {
            buf.put_u8(*byte);
            frames.extend(codec.decode_frames(&mut buf).unwrap());
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], &payload[..]);
    }

    #[test]
    fn chunked_multiple_messages_in_one_read() {
        let mut encoded = BytesMut::new();
        encode_chunked(b"first", 128, &mut encoded).unwrap();
        encode_chunked(b"second", 128, &mut encoded).unwrap();
        encoded.extend_from_slice(b"\n#4\nthi");

        let mut codec = chunked_codec(128);
        let frames = codec.decode_frames(&mut encoded).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..], b"first");
        assert_eq!(&frames[1][..], b"second");

        encoded.extend_from_slice(b"rd\n##\n");
        let frames = codec.decode_frames(&mut encoded).unwrap();
        assert_eq!(&frames[0][..], b"thir");
        assert_eq!(&encoded[..], b"d\n##\n");
    }

    #[test]
    fn chunked_empty_payload() {
        let mut encoded = BytesMut::new();
        encode_chunked(b"", 128, &mut encoded).unwrap();
        assert_eq!(&encoded[..], CHUNK_END);

        let mut codec = chunked_codec(128);
        let frames = codec.decode_frames(&mut encoded).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_empty());
    }

    #[test]
    fn chunked_rejects_non_numeric_size() {
        let mut codec = chunked_codec(128);
        let mut buf = BytesMut::from(&b"\n#1x\nabc"[..]);
        match codec.decode_frames(&mut buf) {
            Err(FramingError::MalformedChunkHeader { found, .. }) => assert_eq!(found, b'x'),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn chunked_rejects_leading_zero() {
        let mut codec = chunked_codec(128);
        let mut buf = BytesMut::from(&b"\n#012\n"[..]);
        assert!(matches!(
            codec.decode_frames(&mut buf),
            Err(FramingError::MalformedChunkHeader { found: b'0', .. })
        ));
    }

    #[test]
    fn chunked_rejects_cumulative_size_over_ceiling() {
        let mut codec = FrameCodec::with_limits(MIN_CHUNK_SIZE, 10).unwrap();
        codec.set_mode(FramingMode::Chunked);
        let mut buf = BytesMut::from(&b"\n#6\nabcdef\n#5\n"[..]);
        match codec.decode_frames(&mut buf) {
            Err(FramingError::MessageTooLarge { size, limit }) => {
                assert_eq!(size, 11);
                assert_eq!(limit, 10);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn chunked_rejects_oversized_header_digits() {
        let mut codec = chunked_codec(128);
        let mut buf = BytesMut::from(&b"\n#12345678901\n"[..]);
        assert!(codec.decode_frames(&mut buf).is_err());
    }

    #[test]
    fn decoder_stays_failed_after_fatal_error() {
        let mut codec = chunked_codec(128);
        let mut buf = BytesMut::from(&b"garbage"[..]);
        assert!(codec.decode_frames(&mut buf).is_err());

        let mut good = BytesMut::new();
        encode_chunked(b"ok", 128, &mut good).unwrap();
        assert!(matches!(
            codec.decode_frames(&mut good),
            Err(FramingError::Poisoned)
        ));
    }

    #[test]
    fn encoder_rejects_out_of_range_chunk_size() {
        let mut dst = BytesMut::new();
        assert!(encode_chunked(b"x", MIN_CHUNK_SIZE - 1, &mut dst).is_err());
        assert!(encode_chunked(b"x", MAX_CHUNK_SIZE + 1, &mut dst).is_err());
        assert!(FrameCodec::with_limits(0, DEFAULT_MAX_MESSAGE_SIZE).is_err());
    }

    #[test]
    fn mode_switch_between_frames() {
        let mut buf = BytesMut::new();
        encode_eom(b"<hello/>", &mut buf);
        encode_chunked(b"<rpc/>", 128, &mut buf).unwrap();

        let mut codec = FrameCodec::new();
        let hello = codec.decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(&hello[..], b"<hello/>");

        codec.set_mode(FramingMode::Chunked);
        let rpc = codec.decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(&rpc[..], b"<rpc/>");
        assert!(buf.is_empty());
    }

    #[test]
    fn chunk_integrity_under_arbitrary_splits() {
        fn prop(payload: Vec<u8>, size_seed: u16, splits: Vec<usize>) -> TestResult {
            let chunk_size = MIN_CHUNK_SIZE + (size_seed as usize % 512);
            let mut encoded = BytesMut::new();
            encode_chunked(&payload, chunk_size, &mut encoded).unwrap();

            let mut whole = chunked_codec(chunk_size);
            let mut all = encoded.clone();
            let at_once = whole.decode_frames(&mut all).unwrap();

            let mut pieces = chunked_codec(chunk_size);
            let split = feed_in_pieces(&mut pieces, &encoded, &splits);

            TestResult::from_bool(
                at_once.len() == 1 && at_once == split && at_once[0][..] == payload[..],
            )
        }

        QuickCheck::new()
            .gen(Gen::new(2048))
            .quickcheck(prop as fn(Vec<u8>, u16, Vec<usize>) -> TestResult);
    }

    #[test]
    fn eom_integrity_under_arbitrary_splits() {
        fn prop(payloads: Vec<Vec<u8>>, splits: Vec<usize>) -> TestResult {
            let ambiguous = payloads.iter().any(|p| {
                let mut framed = p.clone();
                framed.extend_from_slice(EOM_MARKER);
                find_marker(&framed) != Some(p.len())
            });
            if ambiguous {
                return TestResult::discard();
            }

            let mut encoded = BytesMut::new();
            for p in &payloads {
                encode_eom(p, &mut encoded);
            }

            let mut codec = FrameCodec::new();
            let frames = feed_in_pieces(&mut codec, &encoded, &splits);
            let frames: Vec<Vec<u8>> = frames.iter().map(|f| f.to_vec()).collect();
            TestResult::from_bool(frames == payloads)
        }

        QuickCheck::new().quickcheck(prop as fn(Vec<Vec<u8>>, Vec<usize>) -> TestResult);
    }
}
