//! # Ingestion
//!
//! Device stream client: one blocking TCP session per modality.
//!
//! Responsibilities:
//! - Exact-length reads over fragmented TCP delivery (`FrameReader`)
//! - Fixed-layout header decode/encode (`codec`)
//! - Pixel grid reconstruction with row padding removed (`reconstruct`)
//! - Connect / read loop / reconnect state machine (`StreamSession`)
//! - Local device simulator for tests (`MockDeviceServer`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::StreamSession;
//! use contracts::Modality;
//!
//! let session = StreamSession::from_config(&config, Modality::Depth, sink)?;
//! let handle = session.handle();
//!
//! let worker = std::thread::spawn(move || session.run());
//! // ... later, from any thread
//! handle.cancel();
//! let stats = worker.join();
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::{synthetic_frame, MockDeviceConfig, MockDeviceServer};
//!
//! let server = MockDeviceServer::spawn("127.0.0.1:0", MockDeviceConfig::default(), |i| {
//!     Some(synthetic_frame(Modality::Color, i, 760, 428))
//! })?;
//! ```

pub mod codec;
mod error;
mod handle;
mod mock;
mod reader;
mod reconstruct;
mod session;

// Re-exports
pub use codec::{decode, encode, HeaderCodec};
pub use error::{IngestionError, Result, StreamError};
pub use handle::SessionHandle;
pub use mock::{
    frame_bytes, synthetic_frame, synthetic_timestamp, MockDeviceConfig, MockDeviceServer,
};
pub use reader::FrameReader;
pub use reconstruct::reconstruct;
pub use session::{SessionConfig, StreamSession};
