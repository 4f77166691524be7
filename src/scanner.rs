//! Scanner: first-pass buffered reader that accumulates bit-stream
//! statistics over a whole file, stitching together the transition and
//! flip-flop counts that straddle a buffer boundary.
//!
//! Uses the `BufferedRead` trait (`crate::bufio`) for the underlying
//! buffered byte reads rather than reimplementing buffering.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::{debug, info, warn};

use crate::bitstream::BitVec;
use crate::bufio::BufferedRead;
use crate::error::{BpressError, ScanError};
use crate::stats::{count_flip_flops, ScannedData};

pub struct Scanner {
    reader: BufReader<File>,
    expected_size: u64,
}

impl Scanner {
    pub fn open(path: &Path, buffer_size: usize) -> Result<Self, BpressError> {
        let file = File::open(path)?;
        let expected_size = file.metadata()?.len();
        let reader = BufReader::with_capacity(buffer_size, file);
        Ok(Self { reader, expected_size })
    }

    pub fn expected_size(&self) -> u64 {
        self.expected_size
    }

    /// Runs the full scan to EOF, returning the accumulated statistics and
    /// total bytes read. Fails `ScanError::Incomplete` if a short read is
    /// seen before the expected file size is reached.
    pub fn scan(&mut self) -> Result<(ScannedData, u64), BpressError> {
        let mut data = ScannedData::new();
        let mut last: Option<BitVec> = None;
        let mut bytes_read: u64 = 0;

        loop {
            self.reader.fill_buffer();
            let n = self.reader.buffer().len();
            let stream = BitVec::from_bytes(self.reader.buffer());
            bytes_read += n as u64;
            debug!("scan: read {} bytes ({}/{})", n, bytes_read, self.expected_size);

            data.update(&stream);

            if let Some(last_bits) = &last {
                if !last_bits.is_empty() && !stream.is_empty() {
                    if last_bits.last() != stream.get(0) {
                        data.transitions += 1;
                    }
                    let mut edge = last_bits.clone();
                    edge.extend(&stream.slice_to(stream.len().min(2)));
                    data.flip_flops += count_flip_flops(&edge);
                }
            }
            last = Some(stream.slice_from(stream.len().saturating_sub(2)));

            let buffer_capacity = self.reader.capacity();
            if n < buffer_capacity && bytes_read == self.expected_size {
                info!("scan complete: {:?}", data);
                return Ok((data, bytes_read));
            } else if n < buffer_capacity {
                warn!(
                    "scan stopped on a short read ({} bytes) before reaching the expected size ({}/{})",
                    n, bytes_read, self.expected_size
                );
                return Err(BpressError::Scan(ScanError::Incomplete {
                    bytes_read,
                    expected: self.expected_size,
                }));
            }
        }
    }
}
