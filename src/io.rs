use crate::{TransformError, TransformResult};
use std::io::{Read, Write};

/// Named view over a possibly larger buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ByteData {
    pub name: String,
    pub data: Vec<u8>,
    pub offset: usize,
    pub length: usize,
}

impl ByteData {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> ByteData {
        let length = data.len();
        ByteData {
            name: name.into(),
            data,
            offset: 0,
            length,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.offset..self.offset + self.length]
    }

    /// Gives the underlying buffer back for reuse.
    pub fn into_buffer(self) -> Vec<u8> {
        self.data
    }
}

/// Reads the whole stream into `buffer`, reusing its allocation.
/// `count` is a size hint; `None` when the length is unknown.
pub fn read(
    name: &str,
    reader: &mut dyn Read,
    mut buffer: Vec<u8>,
    count: Option<usize>,
) -> TransformResult<ByteData> {
    buffer.clear();
    if let Some(count) = count {
        buffer.reserve(count);
    }
    reader.read_to_end(&mut buffer).map_err(|e| {
        let count = count.map_or_else(|| "unknown".to_owned(), |count| count.to_string());
        TransformError::io(
            format!("Failed to read raw bytes [ {name} ] count [ {count} ]"),
            e,
        )
    })?;
    Ok(ByteData::new(name, buffer))
}

pub fn write(name: &str, data: &[u8], writer: &mut dyn Write) -> TransformResult<()> {
    writer
        .write_all(data)
        .and_then(|()| writer.flush())
        .map_err(|e| {
            TransformError::io(
                format!("Failed to write [ {name} ] count [ {} ]", data.len()),
                e,
            )
        })
}

/// One reusable read buffer per nesting depth, so a nested resource never
/// reads into the buffer of the container being processed.
#[derive(Debug, Default)]
pub struct InputBuffers {
    buffers: Vec<Vec<u8>>,
}

impl InputBuffers {
    pub fn take(&mut self, depth: usize) -> Vec<u8> {
        if depth >= self.buffers.len() {
            self.buffers.resize_with(depth + 1, Vec::new);
        }
        std::mem::take(&mut self.buffers[depth])
    }

    pub fn restore(&mut self, depth: usize, buffer: Vec<u8>) {
        if depth < self.buffers.len() {
            self.buffers[depth] = buffer;
        }
    }
}
