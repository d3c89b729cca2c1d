//! FrameSink trait - session output interface
//!
//! Defines the abstract interface for frame consumers (display, disk, bus).

use crate::{ContractError, Frame};

/// Frame consumer
///
/// Called synchronously from the session's read loop. The loop does not
/// buffer: if `consume` blocks, reading blocks with it.
pub trait FrameSink: Send {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Take ownership of one complete frame
    ///
    /// # Errors
    /// `ContractError::SinkClosed` ends the session; anything else is
    /// logged and the stream continues.
    fn consume(&mut self, frame: Frame) -> Result<(), ContractError>;

    /// Flush and release resources
    fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn consume(&mut self, frame: Frame) -> Result<(), ContractError> {
        (**self).consume(frame)
    }

    fn close(&mut self) -> Result<(), ContractError> {
        (**self).close()
    }
}
