use std::io;
use thiserror::Error;

use crate::buffer::BufferError;
use crate::message::MessageError;

/// Errors raised by sources and sinks
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    #[error("Sink {0} is closed")]
    Closed(String),
}
