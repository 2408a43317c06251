//! Output sinks
//!
//! The executor writes frames into a sink. A full channel suspends the
//! writer until the receiver catches up; a dropped receiver is reported as
//! [`SinkError::Closed`] and treated as a client disconnect.

use thiserror::Error;
use tokio::sync::mpsc;

use super::frame::Frame;

/// Failure to write a frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("output stream closed by the receiver")]
    Closed,

    #[error("output write failed: {0}")]
    Write(String),
}

/// Destination of output frames
pub trait FrameSink: Send {
    /// Writes one frame, blocking while the destination is full
    fn send(&mut self, frame: Frame) -> Result<(), SinkError>;
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn send(&mut self, frame: Frame) -> Result<(), SinkError> {
        (**self).send(frame)
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn send(&mut self, frame: Frame) -> Result<(), SinkError> {
        (**self).send(frame)
    }
}

/// Collects frames in memory
#[derive(Debug, Default)]
pub struct VecSink {
    frames: Vec<Frame>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

impl FrameSink for VecSink {
    fn send(&mut self, frame: Frame) -> Result<(), SinkError> {
        self.frames.push(frame);
        Ok(())
    }
}

/// Writes frames into a bounded tokio channel.
///
/// Must be driven from a blocking context (e.g. `spawn_blocking`), never
/// from inside an async task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Frame>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Frame>) -> Self {
        Self { tx }
    }

    /// Creates a sink and its receiver with room for `capacity` frames
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl FrameSink for ChannelSink {
    fn send(&mut self, frame: Frame) -> Result<(), SinkError> {
        self.tx.blocking_send(frame).map_err(|_| SinkError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_keeps_order() {
        let mut sink = VecSink::new();
        sink.send(Frame::Row(b"[1]".to_vec())).unwrap();
        sink.send(Frame::Row(b"[2]".to_vec())).unwrap();
        assert_eq!(sink.frames()[1], Frame::Row(b"[2]".to_vec()));
    }

    #[test]
    fn test_channel_sink_closed_receiver() {
        let (mut sink, rx) = ChannelSink::bounded(1);
        drop(rx);
        assert_eq!(sink.send(Frame::Row(vec![])), Err(SinkError::Closed));
    }

    #[test]
    fn test_channel_sink_delivers() {
        let (mut sink, mut rx) = ChannelSink::bounded(2);
        sink.send(Frame::Row(b"[1]".to_vec())).unwrap();
        drop(sink);
        assert_eq!(rx.blocking_recv(), Some(Frame::Row(b"[1]".to_vec())));
        assert_eq!(rx.blocking_recv(), None);
    }
}
