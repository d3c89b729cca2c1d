//! Stream session: connect -> read loop -> reconnect

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use contracts::{
    ConnectionConfig, ContractError, DisconnectKind, Frame, FrameSink, Modality, SensorEndpoint,
    SessionState, SessionStats, StreamError, StreamerConfig,
};
use pose_engine::{CalibrationExtrinsics, PoseEngine};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::codec::HeaderCodec;
use crate::error::{IngestionError, Result};
use crate::handle::SessionHandle;
use crate::reader::FrameReader;
use crate::reconstruct::reconstruct;

/// Connection parameters of one session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Device address (IP or host name)
    pub host: String,
    pub connect_timeout: Duration,
    /// A read stalled this long counts as a short read
    pub read_timeout: Duration,
    /// Fixed pause between a disconnect and the next connect attempt
    pub reconnect_delay: Duration,
    /// Larger payloads are rejected as malformed
    pub max_payload_bytes: u64,
}

impl SessionConfig {
    /// Defaults for `host`
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_connection(host, &ConnectionConfig::default())
    }

    pub fn with_connection(host: impl Into<String>, connection: &ConnectionConfig) -> Self {
        Self {
            host: host.into(),
            connect_timeout: connection.connect_timeout(),
            read_timeout: connection.read_timeout(),
            reconnect_delay: connection.reconnect_delay(),
            max_payload_bytes: connection.max_payload_bytes,
        }
    }

    pub fn from_config(config: &StreamerConfig) -> Self {
        Self::with_connection(config.device.host.clone(), &config.connection)
    }
}

/// Why a connection stopped streaming
enum StreamEnd {
    Cancelled,
    SinkClosed,
    Failed(StreamError),
}

/// One modality's connection to the device.
///
/// Owns its socket and its sink; nothing is shared with other sessions
/// except through the [`SessionHandle`]. `run` blocks the calling thread
/// until the handle is cancelled or the sink reports it is closed.
pub struct StreamSession<S> {
    endpoint: SensorEndpoint,
    config: SessionConfig,
    codec: HeaderCodec,
    pose: PoseEngine,
    sink: S,
    handle: SessionHandle,
    stats: SessionStats,
}

impl<S: FrameSink> StreamSession<S> {
    pub fn new(
        endpoint: SensorEndpoint,
        config: SessionConfig,
        pose: PoseEngine,
        sink: S,
    ) -> std::result::Result<Self, IngestionError> {
        if pose.modality() != endpoint.modality {
            return Err(IngestionError::ModalityMismatch {
                endpoint,
                engine: pose.modality(),
            });
        }

        Ok(Self {
            endpoint,
            codec: HeaderCodec::new(endpoint.modality, config.max_payload_bytes),
            config,
            pose,
            sink,
            handle: SessionHandle::new(),
            stats: SessionStats::default(),
        })
    }

    /// Build the session for `modality` from a loaded configuration
    pub fn from_config(
        config: &StreamerConfig,
        modality: Modality,
        sink: S,
    ) -> std::result::Result<Self, IngestionError> {
        let extrinsics = config
            .calibration
            .as_ref()
            .map(CalibrationExtrinsics::from_config)
            .transpose()?;
        let pose = PoseEngine::for_modality(modality, extrinsics.as_ref())?;
        let endpoint = SensorEndpoint::new(modality, config.streams.get(modality).port);

        Self::new(endpoint, SessionConfig::from_config(config), pose, sink)
    }

    /// Handle for cancelling the session from another thread
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn endpoint(&self) -> SensorEndpoint {
        self.endpoint
    }

    /// Drive the session until cancelled or the sink closes
    #[instrument(
        name = "stream_session",
        skip(self),
        fields(modality = %self.endpoint.modality, port = self.endpoint.port)
    )]
    pub fn run(mut self) -> SessionStats {
        info!(host = %self.config.host, "session started");

        while !self.handle.is_cancelled() {
            if self.connect_and_stream().is_break() {
                break;
            }
            if self.handle.wait_cancelled(self.config.reconnect_delay) {
                break;
            }
        }

        self.handle.set_state(SessionState::Disconnected);
        if let Err(e) = self.sink.close() {
            warn!(sink = self.sink.name(), error = %e, "sink close failed");
        }

        info!(
            frames = self.stats.frames,
            bytes = self.stats.bytes,
            connect_failures = self.stats.connect_failures,
            transient_disconnects = self.stats.transient_disconnects,
            protocol_errors = self.stats.protocol_errors,
            "session stopped"
        );
        self.stats
    }

    /// One connection attempt and, if it succeeds, its read loop
    fn connect_and_stream(&mut self) -> std::ops::ControlFlow<()> {
        use std::ops::ControlFlow::{Break, Continue};

        let modality = self.endpoint.modality;
        self.handle.set_state(SessionState::Connecting);

        let (stream, addr) = match self.connect() {
            Ok(connected) => connected,
            Err(e) => {
                self.stats.connect_failures += 1;
                observability::record_connect(modality, false);
                warn!(error = %e, "connect failed");
                self.handle.set_state(SessionState::Disconnected);
                return Continue(());
            }
        };

        self.stats.connects += 1;
        observability::record_connect(modality, true);
        self.handle.set_state(SessionState::Connected);
        info!(%addr, "connected");

        if let Err(e) = self.handle.attach(&stream) {
            warn!(error = %e, "socket not registered for cancellation");
        }
        let end = self.stream(stream);
        self.handle.detach();
        self.handle.set_state(SessionState::Disconnected);

        match end {
            StreamEnd::Cancelled => Break(()),
            StreamEnd::SinkClosed => {
                info!(sink = self.sink.name(), "sink closed, stopping session");
                Break(())
            }
            StreamEnd::Failed(_) if self.handle.is_cancelled() => {
                debug!("read interrupted by cancellation");
                Break(())
            }
            StreamEnd::Failed(e) => {
                let kind = e.disconnect_kind();
                self.stats.record_disconnect(kind);
                observability::record_disconnect(modality, kind);
                match kind {
                    DisconnectKind::Transient => warn!(error = %e, "connection lost"),
                    DisconnectKind::Protocol => {
                        error!(error = %e, "protocol error, dropping connection")
                    }
                }
                Continue(())
            }
        }
    }

    fn connect(&self) -> Result<(TcpStream, SocketAddr)> {
        let modality = self.endpoint.modality;
        let port = self.endpoint.port;
        let resolve_error = |message: String| StreamError::Resolve {
            modality,
            host: self.config.host.clone(),
            port,
            message,
        };

        let addrs = (self.config.host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| resolve_error(e.to_string()))?;

        let mut last_error = None;
        for addr in addrs {
            debug!(%addr, "connecting");
            let connected = TcpStream::connect_timeout(&addr, self.config.connect_timeout)
                .and_then(|stream| {
                    let read_timeout = Some(self.config.read_timeout).filter(|d| !d.is_zero());
                    stream.set_read_timeout(read_timeout)?;
                    stream.set_nodelay(true)?;
                    Ok(stream)
                });
            match connected {
                Ok(stream) => return Ok((stream, addr)),
                Err(source) => {
                    last_error = Some(StreamError::ConnectFailure {
                        modality,
                        addr,
                        source,
                    })
                }
            }
        }

        Err(last_error.unwrap_or_else(|| resolve_error("no addresses found".to_string())))
    }

    /// Read loop; frames are only produced here
    fn stream(&mut self, stream: TcpStream) -> StreamEnd {
        let mut reader = FrameReader::new(stream);
        self.handle.set_state(SessionState::Streaming);

        let end = loop {
            if self.handle.is_cancelled() {
                break StreamEnd::Cancelled;
            }

            let before = reader.bytes_read();
            let frame = match self.read_frame(&mut reader) {
                Ok(frame) => frame,
                Err(e) => break StreamEnd::Failed(e),
            };
            let bytes = reader.bytes_read() - before;

            self.stats.frames += 1;
            observability::record_frame_received(
                frame.modality(),
                bytes,
                frame.header.unix_time_secs(),
            );
            trace!(timestamp = frame.timestamp(), bytes, "frame received");

            if let Err(e) = self.sink.consume(frame) {
                observability::record_frame_dispatched(self.sink.name(), false);
                if let ContractError::SinkClosed { .. } = e {
                    break StreamEnd::SinkClosed;
                }
                self.stats.sink_errors += 1;
                warn!(sink = self.sink.name(), error = %e, "sink failed to consume frame");
            } else {
                observability::record_frame_dispatched(self.sink.name(), true);
            }
        };

        self.stats.bytes += reader.bytes_read();
        end
    }

    /// Header, payload, pixels, pose; nothing is emitted unless all succeed
    fn read_frame(&self, reader: &mut FrameReader<TcpStream>) -> Result<Frame> {
        let header_bytes = reader.read_exact(self.codec.header_size())?;
        let header = self.codec.decode(&header_bytes)?;
        let payload_len = self.codec.payload_len(&header)?;
        let payload = reader.read_exact(payload_len)?;
        let pixels = reconstruct(&header, &payload)?;
        let computed = self.pose.compute(&header);

        Ok(Frame {
            header,
            pixels,
            pose: computed.pose,
            header_transform: computed.header_transform,
        })
    }
}
