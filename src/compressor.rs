//! Streaming compressor: the two-pass scan -> select delimiter -> tokenize
//! -> encode -> byte-align -> write pipeline, protocol header emission, and
//! the retroactive padding-flag patch.
//!
//! File handles are scoped with ordinary Rust ownership/`Drop` rather than
//! being closed explicitly.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use log::info;

use crate::bitstream::BitVec;
use crate::bufio::BufferedRead;
use crate::config::CompressorConfig;
use crate::delimiter::select_delimiter;
use crate::digest::DigestTable;
use crate::error::{BpressError, ConsistencyError, ProtocolError};
use crate::scanner::Scanner;
use crate::token::pull_token;

const MAGIC_AND_PLACEHOLDER: &str = "0110001000000000";
const OUTPUT_MODE: u32 = 0o644;

/// Per-job mutable state threaded through both passes.
#[derive(Debug, Default)]
struct CompressorState {
    delimiter_bit: u8,
    protocol_header: Option<BitVec>,
    bit_stuffing: bool,
    padding: Option<BitVec>,
    raw_carryover: BitVec,
    comp_carryover: BitVec,
    bytes_read_pass_one: u64,
    bytes_read_pass_two: u64,
    bytes_compressed: u64,
    protocol_complete: bool,
    /// Bytes read but not yet folded into `bytes_compressed`. Normally a
    /// given iteration's tokenize loop always drains `stream` to empty
    /// before the iteration ends, so this is credited and zeroed every
    /// time. The one exception is a buffer with no delimiter anywhere in
    /// it: that iteration defers its whole buffer without tokenizing, so
    /// its bytes stay "pending" here until a later iteration (or, if the
    /// deferred data survives to EOF, the EOF branch) finally credits
    /// them -- preserving the bytes_read_pass_two == bytes_compressed
    /// invariant regardless of how many buffers get deferred in a row.
    pending_credit_bytes: u64,
}

/// Summary returned on a successful compression -- surfaced as a real
/// return value instead of only being visible via `Debug`.
#[derive(Debug, Clone)]
pub struct CompressionReport {
    pub input_size: u64,
    pub output_size: u64,
    pub delimiter_bit: u8,
    pub bit_stuffing: bool,
    pub padding_bits: Option<u8>,
    pub bytes_compressed: u64,
}

pub struct Compressor {
    config: CompressorConfig,
    state: CompressorState,
    digests: DigestTable,
}

impl Compressor {
    pub fn new(config: CompressorConfig) -> Self {
        Self {
            config,
            state: CompressorState::default(),
            digests: DigestTable::new(),
        }
    }

    /// Compresses `input` into `output`. Returns `None` for a zero-length
    /// input (no output is written), `Some(report)` otherwise.
    pub fn compress(&mut self, input: &Path, output: &Path) -> Result<Option<CompressionReport>, BpressError> {
        let input_size = std::fs::metadata(input)?.len();
        if input_size == 0 {
            info!("empty input, no output written");
            return Ok(None);
        }

        // Pass 1: scan + delimiter selection.
        let mut scanner = Scanner::open(input, self.config.buffer_size)?;
        let (scanned, bytes_read_pass_one) = scanner.scan()?;
        self.state.bytes_read_pass_one = bytes_read_pass_one;

        let delimiter_bit = select_delimiter(&scanned, &self.config.delimiter_mode);
        self.state.delimiter_bit = delimiter_bit;
        info!("selected delimiter bit {delimiter_bit}");

        // Pass 2: rewind, tokenize, encode, write.
        let in_file = File::open(input)?;
        let mut reader = BufReader::with_capacity(self.config.buffer_size, in_file);
        let out_file = open_output(output)?;
        let mut writer = BufWriter::with_capacity(self.config.buffer_size, out_file);

        'outer: loop {
            reader.fill_buffer();
            let n = reader.buffer().len();
            self.state.bytes_read_pass_two += n as u64;

            if n == 0 {
                self.finish_on_eof(&mut writer, delimiter_bit)?;
                break 'outer;
            }

            self.state.pending_credit_bytes += n as u64;
            let mut stream = BitVec::from_bytes(reader.buffer());

            if n < self.config.buffer_size && stream.last() != Some(delimiter_bit) {
                stream.push(delimiter_bit);
                self.state.bit_stuffing = true;
            }

            if !self.state.raw_carryover.is_empty() {
                let mut combined = std::mem::take(&mut self.state.raw_carryover);
                combined.extend(&stream);
                stream = combined;
            }

            let mut compressed_stream = std::mem::take(&mut self.state.comp_carryover);

            if !self.state.protocol_complete {
                if !stream.contains(delimiter_bit) {
                    return Err(ProtocolError::DelimiterNotFoundInFirstBuffer.into());
                }
                let mut header = BitVec::from_bits_str(MAGIC_AND_PLACEHOLDER);
                header.push(delimiter_bit);
                let delim_index = stream.position_of(delimiter_bit).expect("checked above");
                let preamble = stream.slice_to(delim_index + 1);
                header.extend(&preamble);
                stream = stream.slice_from(delim_index + 1);

                compressed_stream.extend(&header);
                self.state.protocol_header = Some(header);
                self.state.protocol_complete = true;
            }

            if !self.state.bit_stuffing && stream.last() != Some(delimiter_bit) {
                let found = if stream.len() >= 2 {
                    stream.rposition_of_upto(delimiter_bit, stream.len() - 2)
                } else {
                    None
                };
                match found {
                    Some(j) => {
                        self.state.raw_carryover = stream.slice_from(j + 1);
                        stream = stream.slice_to(j + 1);
                    }
                    None => {
                        // No delimiter anywhere in this buffer. Carry the
                        // whole thing forward and retry on the next buffer
                        // instead of tokenizing a stream with no delimiter
                        // (which `pull_token` would reject).
                        self.state.raw_carryover = stream;
                        self.state.comp_carryover = compressed_stream;
                        continue 'outer;
                    }
                }
            }

            loop {
                if stream.is_empty() {
                    self.state.bytes_compressed += self.state.pending_credit_bytes;
                    self.state.pending_credit_bytes = 0;
                    break;
                }
                let (token_len, rest) = pull_token(&stream, delimiter_bit)?;
                stream = rest;
                let digest = self.digests.digest(token_len as i64)?;
                compressed_stream.extend(&digest);
            }

            let tail_len = compressed_stream.len() % 8;
            let tail = compressed_stream.split_off_tail_bits(tail_len);
            writer.write_all(&compressed_stream.to_bytes())?;
            self.state.comp_carryover = tail;
        }

        writer.flush()?;
        drop(writer);

        self.patch_padding_flag(output)?;
        self.run_self_checks(delimiter_bit)?;

        let output_size = std::fs::metadata(output)?.len();
        let report = CompressionReport {
            input_size,
            output_size,
            delimiter_bit,
            bit_stuffing: self.state.bit_stuffing,
            padding_bits: self.state.padding.as_ref().map(|p| p.len() as u8),
            bytes_compressed: self.state.bytes_compressed,
        };
        info!("compression complete: {report:?}");
        Ok(Some(report))
    }

    /// Handles the empty-read branch of the pass-2 loop: drains any
    /// remaining raw carryover (performing bit-stuffing if needed),
    /// byte-aligns the compressed carryover, and writes the final bytes.
    fn finish_on_eof(&mut self, writer: &mut BufWriter<File>, delimiter_bit: u8) -> Result<(), BpressError> {
        // Normally zero: see `pending_credit_bytes`'s doc comment for the
        // one case where bytes can still be owed here.
        self.state.bytes_compressed += self.state.pending_credit_bytes;
        self.state.pending_credit_bytes = 0;

        if self.state.raw_carryover.is_empty() && self.state.comp_carryover.is_empty() {
            return Ok(());
        }

        if !self.state.raw_carryover.is_empty() {
            if self.state.bit_stuffing {
                return Err(ProtocolError::DoubleStuffing.into());
            }
            if self.state.raw_carryover.last() != Some(delimiter_bit) {
                self.state.raw_carryover.push(delimiter_bit);
                self.state.bit_stuffing = true;
            }
            loop {
                if self.state.raw_carryover.is_empty() {
                    break;
                }
                let (token_len, rest) = pull_token(&self.state.raw_carryover, delimiter_bit)?;
                self.state.raw_carryover = rest;
                let digest = self.digests.digest(token_len as i64)?;
                self.state.comp_carryover.extend(&digest);
            }
        }

        let pad_len = self.state.comp_carryover.len() % 8;
        if pad_len > 0 {
            let anti_delimiter = delimiter_bit ^ 1;
            let mut padding = BitVec::with_capacity(8 - pad_len);
            for _ in 0..(8 - pad_len) {
                padding.push(anti_delimiter);
            }
            self.state.comp_carryover.extend(&padding);
            self.state.padding = Some(padding);
        }

        writer.write_all(&self.state.comp_carryover.to_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Builds the 8-bit padding flag, splices it into the in-memory header
    /// at bit offsets [8..16), and patches byte 1 of the already-written
    /// output file in place.
    fn patch_padding_flag(&mut self, output: &Path) -> Result<(), BpressError> {
        let mut flag = BitVec::new();
        flag.push(if self.state.bit_stuffing { 1 } else { 0 });
        for _ in 0..4 {
            flag.push(0);
        }
        match &self.state.padding {
            Some(padding) => {
                let len = padding.len() as u32;
                for shift in (0..3).rev() {
                    flag.push(((len >> shift) & 1) as u8);
                }
            }
            None => {
                for _ in 0..3 {
                    flag.push(0);
                }
            }
        }

        if let Some(header) = &mut self.state.protocol_header {
            let mut patched = header.slice_to(8);
            patched.extend(&flag);
            patched.extend(&header.slice_from(16));
            *header = patched;
        }

        let mut patch_handle = OpenOptions::new().write(true).open(output)?;
        patch_handle.seek(SeekFrom::Start(1))?;
        patch_handle.write_all(&flag.to_bytes())?;
        Ok(())
    }

    fn run_self_checks(&self, delimiter_bit: u8) -> Result<(), BpressError> {
        if self.state.bytes_read_pass_one != self.state.bytes_read_pass_two {
            return Err(ConsistencyError::ReadSizeMismatch {
                pass_one: self.state.bytes_read_pass_one,
                pass_two: self.state.bytes_read_pass_two,
            }
            .into());
        }
        if self.state.bytes_read_pass_two != self.state.bytes_compressed {
            return Err(ConsistencyError::CompressedSizeMismatch {
                read: self.state.bytes_read_pass_two,
                compressed: self.state.bytes_compressed,
            }
            .into());
        }
        if let Some(header) = &self.state.protocol_header {
            if header.len() < 18 {
                return Err(ConsistencyError::HeaderTooShort(header.len()).into());
            }
            if header.get(16) != Some(delimiter_bit) {
                return Err(ConsistencyError::HeaderDelimiterMismatch.into());
            }
            let expected_stuffing = if self.state.bit_stuffing { 1 } else { 0 };
            if header.get(8) != Some(expected_stuffing) {
                return Err(ConsistencyError::HeaderBitStuffingMismatch.into());
            }
        }
        if let Some(padding) = &self.state.padding {
            if padding.last() == Some(delimiter_bit) {
                return Err(ConsistencyError::PaddingMatchesDelimiter.into());
            }
        }
        Ok(())
    }
}

fn open_output(path: &Path) -> std::io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    opts.mode(OUTPUT_MODE);
    opts.open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delimiter::DelimiterMode;
    use std::io::Write as _;

    fn compress_bytes(bytes: &[u8], buffer_size: usize) -> (CompressionReport, Vec<u8>) {
        let in_file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(in_file.path(), bytes).unwrap();
        let out_file = tempfile::NamedTempFile::new().unwrap();

        let config = CompressorConfig::new().with_buffer_size(buffer_size).unwrap();
        let mut compressor = Compressor::new(config);
        let report = compressor
            .compress(in_file.path(), out_file.path())
            .unwrap()
            .expect("non-empty input produces a report");
        let out_bytes = std::fs::read(out_file.path()).unwrap();
        (report, out_bytes)
    }

    #[test]
    fn empty_input_produces_no_output() {
        let in_file = tempfile::NamedTempFile::new().unwrap();
        let out_file = tempfile::NamedTempFile::new().unwrap();
        let mut compressor = Compressor::new(CompressorConfig::new());
        let result = compressor.compress(in_file.path(), out_file.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn s6_single_byte_end_to_end() {
        // 0b1111_1110 with delimiter_mode=low: delimiter bit is 0 (minority,
        // one zero bit vs seven ones).
        let (report, out_bytes) = compress_bytes(&[0b1111_1110], 4096);
        assert_eq!(report.delimiter_bit, 0);
        assert!(!report.bit_stuffing);
        assert_eq!(out_bytes[0], 0x62);
        // byte 1 is the padding flag; bit 0 (bit_stuffing) must be 0.
        assert_eq!(out_bytes[1] & 0b1000_0000, 0);
    }

    #[test]
    fn header_round_trips_magic_and_padding_flag() {
        let (_report, out_bytes) = compress_bytes(&[0xAA, 0x55, 0x00, 0xFF], 4096);
        assert_eq!(out_bytes[0], 0x62);
        let padding_flag = out_bytes[1];
        // reserved bits 1-4 must be zero.
        assert_eq!(padding_flag & 0b0111_1000, 0);
    }

    #[test]
    fn self_checks_hold_across_multiple_buffers() {
        let mut bytes = Vec::new();
        for i in 0..2000u32 {
            bytes.push((i % 251) as u8);
        }
        let (report, _out) = compress_bytes(&bytes, 64);
        assert_eq!(report.bytes_compressed, bytes.len() as u64);
    }

    #[test]
    fn custom_delimiter_mode_is_honored() {
        let in_file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(in_file.path(), [0b1010_1010, 0b0101_0101]).unwrap();
        let out_file = tempfile::NamedTempFile::new().unwrap();

        let config = CompressorConfig::new()
            .with_delimiter_mode(DelimiterMode::Custom(std::sync::Arc::new(|_| 1u8)));
        let mut compressor = Compressor::new(config);
        let report = compressor.compress(in_file.path(), out_file.path()).unwrap().unwrap();
        assert_eq!(report.delimiter_bit, 1);
    }

    #[test]
    fn all_zero_file_bit_stuffs_and_pads() {
        // All-zero bytes with low delimiter selects 0 as delimiter too
        // (tie -> 0), so every bit is a one-bit token; heavy bit-stuffing
        // is not triggered, but a large all-identical run exercises deep
        // extension-bucket digests.
        let bytes = vec![0u8; 10];
        let (report, _out) = compress_bytes(&bytes, 4096);
        assert_eq!(report.delimiter_bit, 0);
    }

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn small_buffer_forces_cross_buffer_tokens() {
        let f = write_temp(&[0xFF, 0xFF, 0xFF, 0x00, 0xFF]);
        let out = tempfile::NamedTempFile::new().unwrap();
        let config = CompressorConfig::new().with_buffer_size(2).unwrap();
        let mut compressor = Compressor::new(config);
        let report = compressor.compress(f.path(), out.path()).unwrap().unwrap();
        assert_eq!(report.bytes_compressed, 5);
    }
}
