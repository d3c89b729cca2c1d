//! Sink implementations
//!
//! Contains LogSink, FileSink, ChannelSink, and FanoutSink.

mod channel;
mod fanout;
mod file;
mod log;

pub use self::channel::ChannelSink;
pub use self::fanout::FanoutSink;
pub use self::file::{ColorImageFormat, FileSink, FileSinkConfig};
pub use self::log::LogSink;
