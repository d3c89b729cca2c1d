//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Header timestamps are device ticks (100 ns since 1601-01-01)
//! - `FrameHeader::unix_time_secs` converts to Unix seconds for transport

mod config;
mod error;
mod frame;
mod header;
mod image;
mod pose;
mod runtime;
mod sensor;
mod sink;

pub use config::*;
pub use error::*;
pub use frame::Frame;
pub use header::*;
pub use image::{PixelBuffer, PixelEncoding};
pub use pose::*;
pub use runtime::*;
pub use sensor::*;
pub use sink::FrameSink;
