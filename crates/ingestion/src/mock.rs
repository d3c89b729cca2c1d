//! Mock 设备服务器
//!
//! 在本地 TCP 端口上模拟设备的颜色/深度流，用于无设备环境的测试。

use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use contracts::{
    ColorHeader, DepthHeader, FrameHeader, ImageLayout, Intrinsics, Modality,
    DEVICE_EPOCH_TO_UNIX_SECS,
};
use tracing::{debug, trace, warn};

use crate::codec::encode;

const ACCEPT_POLL: Duration = Duration::from_millis(5);

/// Mock 服务器配置
#[derive(Debug, Clone)]
pub struct MockDeviceConfig {
    /// 每次写入的最大字节数 (模拟 TCP 分片)
    pub chunk_size: usize,

    /// 帧间隔
    pub frame_interval: Duration,

    /// 服务多少个连接后关闭监听 (None = 不限)
    pub max_connections: Option<usize>,
}

impl Default for MockDeviceConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            frame_interval: Duration::ZERO,
            max_connections: None,
        }
    }
}

/// Mock 设备服务器
///
/// 后台线程依次接受连接；每个连接上按序号 `0, 1, 2, ...` 调用帧源，
/// 帧源返回 `None` 时关闭该连接。
pub struct MockDeviceServer {
    addr: SocketAddr,
    running: Arc<AtomicBool>,
    connections: Arc<AtomicUsize>,
    thread: Option<JoinHandle<()>>,
}

impl MockDeviceServer {
    /// 绑定地址并启动服务线程
    pub fn spawn<F>(addr: impl ToSocketAddrs, config: MockDeviceConfig, source: F) -> io::Result<Self>
    where
        F: FnMut(u64) -> Option<Bytes> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let connections = Arc::new(AtomicUsize::new(0));

        let thread = thread::Builder::new()
            .name(format!("mock-device-{}", addr.port()))
            .spawn({
                let running = running.clone();
                let connections = connections.clone();
                move || accept_loop(listener, config, source, running, connections)
            })?;

        debug!(%addr, "mock device listening");
        Ok(Self {
            addr,
            running,
            connections,
            thread: Some(thread),
        })
    }

    /// 按固定顺序发送 `frames`，每个连接都从头开始
    pub fn scripted(
        addr: impl ToSocketAddrs,
        config: MockDeviceConfig,
        frames: Vec<Bytes>,
    ) -> io::Result<Self> {
        Self::spawn(addr, config, move |i| frames.get(i as usize).cloned())
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// 已接受的连接数
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 停止服务并等待线程退出
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for MockDeviceServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop<F>(
    listener: TcpListener,
    config: MockDeviceConfig,
    mut source: F,
    running: Arc<AtomicBool>,
    connections: Arc<AtomicUsize>,
) where
    F: FnMut(u64) -> Option<Bytes>,
{
    while running.load(Ordering::Relaxed) {
        if config
            .max_connections
            .is_some_and(|max| connections.load(Ordering::SeqCst) >= max)
        {
            break;
        }

        match listener.accept() {
            Ok((stream, peer)) => {
                connections.fetch_add(1, Ordering::SeqCst);
                debug!(%peer, "mock device accepted connection");
                if let Err(e) = serve(stream, &config, &mut source, &running) {
                    debug!(%peer, error = %e, "mock device connection ended");
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => {
                warn!(error = %e, "mock device accept failed");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }

    debug!("mock device stopped accepting");
}

fn serve<F>(
    mut stream: TcpStream,
    config: &MockDeviceConfig,
    source: &mut F,
    running: &AtomicBool,
) -> io::Result<()>
where
    F: FnMut(u64) -> Option<Bytes>,
{
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;

    let chunk_size = config.chunk_size.max(1);
    let mut index = 0;
    while running.load(Ordering::Relaxed) {
        let Some(frame) = source(index) else {
            break;
        };
        for chunk in frame.chunks(chunk_size) {
            stream.write_all(chunk)?;
        }
        stream.flush()?;
        trace!(index, bytes = frame.len(), "mock frame sent");

        index += 1;
        if !config.frame_interval.is_zero() {
            thread::sleep(config.frame_interval);
        }
    }
    Ok(())
}

/// 拼接 header 与 payload 的线上字节
pub fn frame_bytes(header: &FrameHeader, payload: &[u8]) -> Bytes {
    let header = encode(header);
    let mut buf = BytesMut::with_capacity(header.len() + payload.len());
    buf.extend_from_slice(&header);
    buf.extend_from_slice(payload);
    buf.freeze()
}

/// 合成帧的设备时间戳：约 30 fps 递增
pub fn synthetic_timestamp(index: u64) -> i64 {
    (DEVICE_EPOCH_TO_UNIX_SECS + 1_700_000_000) * 10_000_000 + index as i64 * 333_333
}

/// 合成一帧 (颜色为 BGRA 渐变，深度为递增距离)，每行带 8 字节对齐填充
///
/// 位姿为单位旋转，沿设备 x 轴每帧平移 1 cm。
pub fn synthetic_frame(modality: Modality, index: u64, width: u32, height: u32) -> Bytes {
    let timestamp = synthetic_timestamp(index);
    let mut transform = [0.0f32; 16];
    for i in [0, 5, 10, 15] {
        transform[i] = 1.0;
    }
    transform[12] = index as f32 * 0.01;

    match modality {
        Modality::Color => {
            let layout = padded_layout(width, height, 4);
            let payload = fill_rows(&layout, |x, y| {
                vec![
                    (x * 255 / width.max(1)) as u8,
                    (y * 255 / height.max(1)) as u8,
                    (index % 256) as u8,
                    0xFF,
                ]
            });
            let header = FrameHeader::Color(ColorHeader {
                timestamp,
                layout,
                intrinsics: Intrinsics {
                    fx: width as f32,
                    fy: width as f32,
                    cx: width as f32 / 2.0,
                    cy: height as f32 / 2.0,
                },
                device_to_world: transform,
            });
            frame_bytes(&header, &payload)
        }
        Modality::Depth => {
            let layout = padded_layout(width, height, 2);
            let payload = fill_rows(&layout, |x, y| {
                let mm = (500 + x + y * 4 + index as u32) as u16;
                mm.to_le_bytes().to_vec()
            });
            let header = FrameHeader::Depth(DepthHeader {
                timestamp,
                layout,
                rig_to_world: transform,
            });
            frame_bytes(&header, &payload)
        }
    }
}

fn padded_layout(width: u32, height: u32, pixel_stride: u32) -> ImageLayout {
    ImageLayout {
        width,
        height,
        pixel_stride,
        row_stride: width * pixel_stride + 8,
    }
}

fn fill_rows(layout: &ImageLayout, pixel: impl Fn(u32, u32) -> Vec<u8>) -> Vec<u8> {
    let mut payload = Vec::with_capacity(layout.payload_len() as usize);
    for y in 0..layout.height {
        let row_start = payload.len();
        for x in 0..layout.width {
            payload.extend(pixel(x, y));
        }
        payload.resize(row_start + layout.row_stride as usize, 0xAB);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;
    use crate::reader::FrameReader;
    use crate::reconstruct::reconstruct;

    #[test]
    fn test_synthetic_frames_decode() {
        for modality in Modality::ALL {
            let bytes = synthetic_frame(modality, 3, 5, 3);
            let header = decode(modality, &bytes[..modality.header_size()]).unwrap();
            let payload = &bytes[modality.header_size()..];
            assert_eq!(payload.len() as u64, header.layout().payload_len());

            let pixels = reconstruct(&header, payload).unwrap();
            assert_eq!(pixels.pixel_count(), 15);
            assert_eq!(header.timestamp(), synthetic_timestamp(3));
        }
    }

    #[test]
    fn test_scripted_server_serves_chunks() {
        let frame = synthetic_frame(Modality::Depth, 0, 4, 2);
        let server = MockDeviceServer::scripted(
            "127.0.0.1:0",
            MockDeviceConfig {
                chunk_size: 3,
                ..Default::default()
            },
            vec![frame.clone()],
        )
        .unwrap();

        let stream = TcpStream::connect(server.local_addr()).unwrap();
        let mut reader = FrameReader::new(stream);
        let received = reader.read_exact(frame.len()).unwrap();
        assert_eq!(received, frame);
        // server closes after the script
        assert!(reader.read_exact(1).is_err());
        assert_eq!(server.connections(), 1);
    }

    #[test]
    fn test_max_connections_closes_listener() {
        let mut server = MockDeviceServer::spawn(
            "127.0.0.1:0",
            MockDeviceConfig {
                max_connections: Some(1),
                ..Default::default()
            },
            |_| None,
        )
        .unwrap();
        let addr = server.local_addr();

        drop(TcpStream::connect(addr).unwrap());
        server.stop();
        assert!(!server.is_running());
        assert!(TcpStream::connect(addr).is_err());
    }
}
