//! Framed output streams over `Read`/`Write`

use std::io::{self, Read, Write};

use crate::encoder::{Frame, FrameSink, SinkError};

use super::codec::{decode_frame, encode_frame, frame_length};
use super::errors::{WireError, WireResult};

/// Writes frames to any byte sink
#[derive(Debug)]
pub struct FrameWriter<W: Write> {
    writer: W,
    frames_written: u64,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames_written: 0,
        }
    }

    /// Appends one frame
    pub fn write_frame(&mut self, frame: &Frame) -> WireResult<()> {
        let bytes = encode_frame(frame)?;
        self.writer.write_all(&bytes)?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn flush(&mut self) -> WireResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> FrameSink for FrameWriter<W> {
    fn send(&mut self, frame: Frame) -> Result<(), SinkError> {
        match self.write_frame(&frame) {
            Ok(()) => Ok(()),
            Err(WireError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                Err(SinkError::Closed)
            }
            Err(e) => Err(SinkError::Write(e.to_string())),
        }
    }
}

/// Reads frames sequentially, verifying each checksum.
///
/// A clean end of input at a frame boundary ends the stream; a partial
/// frame is corruption.
#[derive(Debug)]
pub struct FrameReader<R: Read> {
    reader: R,
    offset: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, offset: 0 }
    }

    /// Byte offset of the next frame
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the next frame, or `None` at end of stream
    pub fn read_frame(&mut self) -> WireResult<Option<Frame>> {
        let mut length_buf = [0u8; 4];
        let read = read_fully(&mut self.reader, &mut length_buf)?;
        if read == 0 {
            return Ok(None);
        }
        if read < length_buf.len() {
            return Err(WireError::Truncated {
                needed: length_buf.len(),
                available: read,
            });
        }

        let length = frame_length(&length_buf)?;
        let mut buf = vec![0u8; length];
        buf[..4].copy_from_slice(&length_buf);
        let rest = read_fully(&mut self.reader, &mut buf[4..])?;
        if rest < length - 4 {
            return Err(WireError::Truncated {
                needed: length,
                available: 4 + rest,
            });
        }

        let (frame, consumed) = decode_frame(&buf)?;
        self.offset += consumed as u64;
        Ok(Some(frame))
    }

    /// Reads every remaining frame
    pub fn read_all(&mut self) -> WireResult<Vec<Frame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.read_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = WireResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

/// Reads until `buf` is full or the input ends; returns bytes read
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
