//! Compressor configuration: buffer size and delimiter selection mode.

use crate::delimiter::DelimiterMode;
use crate::error::ConfigError;

pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024;

#[derive(Clone, Debug)]
pub struct CompressorConfig {
    pub buffer_size: usize,
    pub delimiter_mode: DelimiterMode,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            delimiter_mode: DelimiterMode::Low,
        }
    }
}

impl CompressorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Result<Self, ConfigError> {
        if buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        self.buffer_size = buffer_size;
        Ok(self)
    }

    pub fn with_delimiter_mode(mut self, mode: DelimiterMode) -> Self {
        self.delimiter_mode = mode;
        self
    }
}
