//! Validating scanner for HTTP chunked transfer encoding.
//!
//! This module tracks a message framed with the chunked coding described in
//! [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112.html#name-chunked-transfer-coding).
//!
//! A proxy relays the chunk framing as-is, so the decoder does not copy or
//! rewrite anything: it walks a byte slice, reports how many bytes belong to the
//! chunked body and where the chunk data sits, and notices the end of the body
//! (last chunk plus trailer section).

use std::ops::Range;

use tracing::trace;
use ChunkedState::*;

use crate::ensure;
use crate::protocol::ParseError;

/// Maximum length of a chunk size line or a trailer line.
const MAX_CHUNK_LINE_BYTES: usize = 64 * 1024;

/// A decoder for HTTP chunked transfer encoding.
///
/// The decoder processes incoming bytes according to the chunked format:
/// - Each chunk starts with its size in hexadecimal
/// - Followed by optional extensions and CRLF
/// - Then the chunk data and CRLF
/// - A zero-sized chunk, optional trailer fields and a final CRLF end the message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
    size_digits: usize,
    line_len: usize,
}

/// Outcome of one [`ChunkedDecoder::decode`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Bytes of the input that belong to the chunked body.
    pub consumed: usize,
    /// Chunk data found within the consumed bytes, as a range of the input.
    pub data: Option<Range<usize>>,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedDecoder {
    /// Creates a decoder positioned at the size line of the first chunk.
    pub fn new() -> Self {
        Self { state: Size, remaining_size: 0, size_digits: 0, line_len: 0 }
    }

    /// Returns true once the last chunk and the trailer section were seen.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state == End
    }

    /// Advances over `src`.
    ///
    /// Stops after the first run of chunk data, at the end of the body or at the
    /// end of `src`, whichever comes first. Bytes past the end of the body are
    /// never consumed.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidBody`] if the framing is malformed.
    pub fn decode(&mut self, src: &[u8]) -> Result<Decoded, ParseError> {
        let mut pos = 0;
        while self.state != End && pos < src.len() {
            if self.state == Body {
                let remaining = usize::try_from(self.remaining_size).unwrap_or(usize::MAX);
                let read_size = remaining.min(src.len() - pos);
                self.remaining_size -= read_size as u64;
                if self.remaining_size == 0 {
                    self.state = BodyCr;
                }

                trace!(len = read_size, "read chunked bytes");
                let data = pos..pos + read_size;
                return Ok(Decoded { consumed: pos + read_size, data: Some(data) });
            }

            let b = src[pos];
            pos += 1;
            self.state = self.step(b)?;
        }

        if self.state == End {
            trace!("finished reading chunked data");
        }
        Ok(Decoded { consumed: pos, data: None })
    }

    /// Feeds one framing byte through the state machine.
    fn step(&mut self, b: u8) -> Result<ChunkedState, ParseError> {
        if matches!(self.state, Size | SizeLws | Extension | Trailer | EndCr) {
            self.line_len += 1;
            ensure!(self.line_len <= MAX_CHUNK_LINE_BYTES, ParseError::invalid_body("chunk line too long"));
        }

        match self.state {
            Size => self.read_size(b),
            SizeLws => ChunkedState::read_size_lws(b),
            Extension => ChunkedState::read_extension(b),
            SizeLf => self.read_size_lf(b),
            BodyCr => ChunkedState::read_body_cr(b),
            BodyLf => self.read_body_lf(b),
            Trailer => ChunkedState::read_trailer(b),
            TrailerLf => self.read_trailer_lf(b),
            EndCr => ChunkedState::read_end_cr(b),
            EndLf => ChunkedState::read_end_lf(b),
            Body | End => Ok(self.state),
        }
    }

    /// Reads the chunk size in hexadecimal, digit by digit.
    ///
    /// # State Transitions
    /// - On hex digit: stay in Size to read more digits
    /// - On tab/space: SizeLws
    /// - On semicolon: Extension
    /// - On CR: SizeLf
    /// - A delimiter before any digit, or any other byte: error
    fn read_size(&mut self, b: u8) -> Result<ChunkedState, ParseError> {
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b + 10 - b'a',
            b'A'..=b'F' => b + 10 - b'A',
            b'\t' | b' ' | b';' | b'\r' => {
                ensure!(self.size_digits > 0, ParseError::invalid_body("invalid chunk size line: missing size"));
                return Ok(match b {
                    b';' => Extension,
                    b'\r' => SizeLf,
                    _ => SizeLws,
                });
            }
            _ => return Err(ParseError::invalid_body("invalid chunk size line: Invalid Size")),
        };

        self.remaining_size = self
            .remaining_size
            .checked_mul(16)
            .and_then(|size| size.checked_add(u64::from(digit)))
            .ok_or_else(|| ParseError::invalid_body("invalid overflow chunked length"))?;
        self.size_digits += 1;
        Ok(Size)
    }

    /// Validates the LF ending a size line; a zero size starts the trailer section.
    fn read_size_lf(&mut self, b: u8) -> Result<ChunkedState, ParseError> {
        ensure!(b == b'\n', ParseError::invalid_body("invalid chunk size LF"));
        self.line_len = 0;
        self.size_digits = 0;
        if self.remaining_size == 0 { Ok(EndCr) } else { Ok(Body) }
    }

    fn read_body_lf(&mut self, b: u8) -> Result<ChunkedState, ParseError> {
        ensure!(b == b'\n', ParseError::invalid_body("invalid chunk body LF"));
        self.line_len = 0;
        Ok(Size)
    }

    fn read_trailer_lf(&mut self, b: u8) -> Result<ChunkedState, ParseError> {
        ensure!(b == b'\n', ParseError::invalid_body("invalid trailer end LF"));
        self.line_len = 0;
        Ok(EndCr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Read the chunk size in hex
    Size,
    /// Handle whitespace after size
    SizeLws,
    /// Skip chunk extensions
    Extension,
    /// Read LF after chunk size
    SizeLf,
    /// Read chunk data
    Body,
    /// Read CR after chunk data
    BodyCr,
    /// Read LF after chunk data
    BodyLf,
    /// Read optional trailer fields
    Trailer,
    /// Read LF after trailer
    TrailerLf,
    /// Read final CR
    EndCr,
    /// Read final LF
    EndLf,
    /// Final state after reading last chunk
    End,
}

impl ChunkedState {
    /// Only tabs and spaces may follow the size, then an extension or the line end.
    fn read_size_lws(b: u8) -> Result<ChunkedState, ParseError> {
        match b {
            b'\t' | b' ' => Ok(SizeLws),
            b';' => Ok(Extension),
            b'\r' => Ok(SizeLf),
            _ => Err(ParseError::invalid_body("invalid chunk size linear white space")),
        }
    }

    /// Extensions are relayed without interpretation. A bare LF inside one is rejected.
    fn read_extension(b: u8) -> Result<ChunkedState, ParseError> {
        match b {
            b'\r' => Ok(SizeLf),
            b'\n' => Err(ParseError::invalid_body("invalid chunk extension contains newline")),
            _ => Ok(Extension),
        }
    }

    fn read_body_cr(b: u8) -> Result<ChunkedState, ParseError> {
        match b {
            b'\r' => Ok(BodyLf),
            _ => Err(ParseError::invalid_body("invalid chunk body CR")),
        }
    }

    fn read_trailer(b: u8) -> Result<ChunkedState, ParseError> {
        match b {
            b'\r' => Ok(TrailerLf),
            b'\n' => Err(ParseError::invalid_body("invalid trailer contains newline")),
            _ => Ok(Trailer),
        }
    }

    /// A CR at the start of a line is the end of the trailer section; anything else
    /// starts a trailer field.
    fn read_end_cr(b: u8) -> Result<ChunkedState, ParseError> {
        match b {
            b'\r' => Ok(EndLf),
            b'\n' => Err(ParseError::invalid_body("invalid chunk end CR")),
            _ => Ok(Trailer),
        }
    }

    fn read_end_lf(b: u8) -> Result<ChunkedState, ParseError> {
        match b {
            b'\n' => Ok(End),
            _ => Err(ParseError::invalid_body("invalid chunk end LF")),
        }
    }
}
