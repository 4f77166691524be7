use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;

#[derive(PartialEq, Eq)]
pub enum BufferState {
    NotEmpty,
    Empty,
}

pub trait BufferedRead {
    fn fill_buffer(&mut self) -> BufferState;
}

impl BufferedRead for BufReader<File> {
    fn fill_buffer(&mut self) -> BufferState {
        self.consume(self.capacity());
        self.fill_buf().unwrap();
        if self.buffer().is_empty() {
            return BufferState::Empty;
        }
        BufferState::NotEmpty
    }
}
