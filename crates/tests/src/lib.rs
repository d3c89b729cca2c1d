//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 基于 mock 设备的端到端测试（无需真实设备）

#[cfg(test)]
mod contract_tests {
    use contracts::{Modality, SensorEndpoint};

    #[test]
    fn test_well_known_endpoints() {
        let color = SensorEndpoint::well_known(Modality::Color);
        let depth = SensorEndpoint::well_known(Modality::Depth);
        assert_eq!((color.port, color.header_size()), (10090, 104));
        assert_eq!((depth.port, depth.header_size()), (10091, 88));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use async_channel::Receiver;
    use config_loader::ConfigLoader;
    use contracts::{
        ColorHeader, DepthHeader, Frame, FrameHeader, ImageLayout, Intrinsics, Modality,
        PixelEncoding, SensorEndpoint, SinkConfig, SinkType,
    };
    use dispatcher::{create_modality_sink, ChannelSink};
    use ingestion::{
        frame_bytes, synthetic_frame, synthetic_timestamp, MockDeviceConfig, MockDeviceServer,
        SessionConfig, StreamSession,
    };
    use nalgebra::{Matrix4, Vector4};
    use pose_engine::{CalibrationExtrinsics, PoseEngine};

    const RECV_TIMEOUT: Duration = Duration::from_secs(5);

    const RIG_TO_DEPTH: [f32; 16] = [
        0.022_715_6, -0.999_57, -0.018_523_6, -0.059_166_2, //
        0.960_999, 0.026_939_6, -0.275_235, -0.015_487_4, //
        0.275_616, -0.011_549_1, 0.961_198, -0.017_884_8, //
        0.0, 0.0, 0.0, 1.0,
    ];

    fn world_conv() -> Matrix4<f32> {
        Matrix4::new(
            0.0, 0.0, -1.0, 0.0, //
            -1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn cam_conv() -> Matrix4<f32> {
        Matrix4::from_diagonal(&Vector4::new(1.0, -1.0, -1.0, 1.0))
    }

    /// 90 degrees about device y, translated by (1, 2, 3)
    fn device_pose() -> Matrix4<f32> {
        Matrix4::new(
            0.0, 0.0, 1.0, 1.0, //
            0.0, 1.0, 0.0, 2.0, //
            -1.0, 0.0, 0.0, 3.0, //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// The device sends its matrices column-major
    fn wire(m: &Matrix4<f32>) -> [f32; 16] {
        let mut raw = [0.0; 16];
        raw.copy_from_slice(m.as_slice());
        raw
    }

    fn session_config() -> SessionConfig {
        let mut config = SessionConfig::new("127.0.0.1");
        config.reconnect_delay = Duration::from_millis(20);
        config.read_timeout = Duration::from_millis(500);
        config
    }

    fn single_connection(chunk_size: usize) -> MockDeviceConfig {
        MockDeviceConfig {
            chunk_size,
            max_connections: Some(1),
            ..Default::default()
        }
    }

    fn assert_close(actual: &Matrix4<f32>, expected: &Matrix4<f32>, tol: f32) {
        let diff = (actual - expected).abs().max();
        assert!(diff < tol, "max diff {diff}\nactual {actual}\nexpected {expected}");
    }

    async fn recv(rx: &Receiver<Frame>) -> Frame {
        tokio::time::timeout(RECV_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("channel closed")
    }

    /// 2 rows of 3 BGRA pixels with 4 bytes of row padding; pixel (x, y) = [x, y, 7, 255]
    fn color_frame_bytes(timestamp: i64) -> Vec<u8> {
        let mut payload = Vec::new();
        for y in 0..2u8 {
            for x in 0..3u8 {
                payload.extend_from_slice(&[x, y, 7, 255]);
            }
            payload.extend_from_slice(&[0xEE; 4]);
        }
        let header = FrameHeader::Color(ColorHeader {
            timestamp,
            layout: ImageLayout {
                width: 3,
                height: 2,
                pixel_stride: 4,
                row_stride: 16,
            },
            intrinsics: Intrinsics {
                fx: 500.0,
                fy: 510.0,
                cx: 1.5,
                cy: 1.0,
            },
            device_to_world: wire(&device_pose()),
        });
        frame_bytes(&header, &payload).to_vec()
    }

    /// 2x2 depth samples 100, 200 / 300, 400 with 2 bytes of row padding
    fn depth_frame_bytes(timestamp: i64) -> Vec<u8> {
        let mut payload = Vec::new();
        for row in [[100u16, 200], [300, 400]] {
            for sample in row {
                payload.extend_from_slice(&sample.to_le_bytes());
            }
            payload.extend_from_slice(&[0, 0]);
        }
        let header = FrameHeader::Depth(DepthHeader {
            timestamp,
            layout: ImageLayout {
                width: 2,
                height: 2,
                pixel_stride: 2,
                row_stride: 6,
            },
            rig_to_world: wire(&device_pose()),
        });
        frame_bytes(&header, &payload).to_vec()
    }

    /// Color frame split into 17-byte writes arrives exactly once, intact
    #[tokio::test]
    async fn test_color_frame_over_fragmented_stream() {
        let timestamp = synthetic_timestamp(0);
        let server = MockDeviceServer::scripted(
            "127.0.0.1:0",
            single_connection(17),
            vec![color_frame_bytes(timestamp).into()],
        )
        .unwrap();

        let (sink, rx) = ChannelSink::new("e2e_color", 8);
        let session = StreamSession::new(
            SensorEndpoint::new(Modality::Color, server.port()),
            session_config(),
            PoseEngine::color(),
            sink,
        )
        .unwrap();
        let handle = session.handle();
        let task = tokio::task::spawn_blocking(move || session.run());

        let frame = recv(&rx).await;
        assert_eq!(frame.timestamp(), timestamp);
        assert_eq!(frame.pixels.encoding(), PixelEncoding::Bgra8);
        assert_eq!((frame.pixels.width(), frame.pixels.height()), (3, 2));
        // padding stripped
        assert_eq!(frame.pixels.as_bytes().len(), 3 * 2 * 4);
        assert_eq!(frame.pixels.color_at(2, 1), Some(&[2u8, 1, 7, 255][..]));

        assert_eq!(frame.header_transform, device_pose());
        let expected = world_conv() * device_pose() * cam_conv();
        assert_close(&frame.pose.camera_to_world, &expected, 1e-6);

        let info = frame.camera_info("hl2").unwrap();
        assert_eq!((info.width, info.height), (3, 2));

        // the script is exhausted: nothing else arrives
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());

        handle.cancel();
        let stats = tokio::time::timeout(RECV_TIMEOUT, task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.connects, 1);
        assert_eq!(stats.protocol_errors, 0);
    }

    /// Depth pose composes with the inverse of the static calibration
    #[tokio::test]
    async fn test_depth_frame_with_calibration() {
        let server = MockDeviceServer::scripted(
            "127.0.0.1:0",
            single_connection(5),
            vec![depth_frame_bytes(synthetic_timestamp(4)).into()],
        )
        .unwrap();

        let calibration = CalibrationExtrinsics::from_row_major(&RIG_TO_DEPTH).unwrap();
        let (sink, rx) = ChannelSink::new("e2e_depth", 8);
        let session = StreamSession::new(
            SensorEndpoint::new(Modality::Depth, server.port()),
            session_config(),
            PoseEngine::depth(&calibration),
            sink,
        )
        .unwrap();
        let handle = session.handle();
        let task = tokio::task::spawn_blocking(move || session.run());

        let frame = recv(&rx).await;
        assert_eq!(frame.pixels.encoding(), PixelEncoding::Mono16);
        assert_eq!(frame.pixels.depth_at(0, 0), Some(100));
        assert_eq!(frame.pixels.depth_at(1, 1), Some(400));
        assert!(frame.header.intrinsics().is_none());

        let rig_to_depth = Matrix4::from_row_slice(&RIG_TO_DEPTH);
        let expected = world_conv() * device_pose() * rig_to_depth.try_inverse().unwrap();
        assert_close(&frame.pose.camera_to_world, &expected, 1e-4);

        handle.cancel();
        let stats = task.await.unwrap();
        assert_eq!(stats.frames, 1);
    }

    /// Both sessions built from a loaded config file stream in parallel
    #[tokio::test]
    async fn test_config_file_to_sessions() {
        let color = MockDeviceServer::scripted(
            "127.0.0.1:0",
            single_connection(64),
            vec![synthetic_frame(Modality::Color, 0, 4, 3)],
        )
        .unwrap();
        let depth = MockDeviceServer::scripted(
            "127.0.0.1:0",
            single_connection(64),
            vec![synthetic_frame(Modality::Depth, 0, 4, 3)],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holostream.toml");
        let identity = "1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0";
        std::fs::write(
            &path,
            format!(
                r#"
[device]
host = "127.0.0.1"
serial = "hl2-test"

[connection]
reconnect_delay_ms = 20
read_timeout_ms = 500

[streams.color]
port = {}

[streams.depth]
port = {}

[calibration]
rig_to_depth = [{identity}]
"#,
                color.port(),
                depth.port()
            ),
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        let mut running = Vec::new();
        for endpoint in config.streams.enabled_endpoints() {
            let (sink, rx) = ChannelSink::new(format!("e2e_{}", endpoint.modality), 4);
            let session = StreamSession::from_config(&config, endpoint.modality, sink).unwrap();
            assert_eq!(session.endpoint(), endpoint);
            let handle = session.handle();
            let task = tokio::task::spawn_blocking(move || session.run());
            running.push((endpoint.modality, rx, handle, task));
        }
        assert_eq!(running.len(), 2);

        for (modality, rx, _, _) in &running {
            let frame = recv(rx).await;
            assert_eq!(frame.modality(), *modality);
            assert_eq!(frame.timestamp(), synthetic_timestamp(0));
            assert_eq!(frame.pixels.pixel_count(), 12);

            let transform = frame.stamped_transform(&config.device.serial);
            assert_eq!(transform.parent_frame, "hl2-test_world");
            assert_eq!(
                transform.child_frame,
                format!("hl2-test_{modality}_optical_frame")
            );

            if *modality == Modality::Color {
                // identity header: only the basis conversions remain
                let expected = Matrix4::new(
                    0.0, 0.0, 1.0, 0.0, //
                    -1.0, 0.0, 0.0, 0.0, //
                    0.0, -1.0, 0.0, 0.0, //
                    0.0, 0.0, 0.0, 1.0,
                );
                assert_close(&frame.pose.camera_to_world, &expected, 1e-6);
            }
        }

        for (_, _, handle, task) in running {
            handle.cancel();
            let stats = task.await.unwrap();
            assert_eq!(stats.frames, 1);
        }
    }

    /// A protocol error drops the connection; the next connection streams normally
    #[tokio::test]
    async fn test_recovers_after_protocol_error() {
        let bad = frame_bytes(
            &FrameHeader::Color(ColorHeader {
                timestamp: 1,
                layout: ImageLayout {
                    width: 4,
                    height: 3,
                    pixel_stride: 5,
                    row_stride: 20,
                },
                intrinsics: Intrinsics {
                    fx: 1.0,
                    fy: 1.0,
                    cx: 0.0,
                    cy: 0.0,
                },
                device_to_world: wire(&Matrix4::identity()),
            }),
            &[0u8; 60],
        );
        let good = synthetic_frame(Modality::Color, 0, 4, 3);

        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();
        let server = MockDeviceServer::spawn(
            "127.0.0.1:0",
            MockDeviceConfig {
                max_connections: Some(2),
                ..Default::default()
            },
            move |index| {
                if index == 0 {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                match (counter.load(Ordering::SeqCst), index) {
                    (1, 0) => Some(bad.clone()),
                    (2, 0) => Some(good.clone()),
                    _ => None,
                }
            },
        )
        .unwrap();

        let (sink, rx) = ChannelSink::new("e2e_recover", 4);
        let session = StreamSession::new(
            SensorEndpoint::new(Modality::Color, server.port()),
            session_config(),
            PoseEngine::color(),
            sink,
        )
        .unwrap();
        let handle = session.handle();
        let task = tokio::task::spawn_blocking(move || session.run());

        let frame = recv(&rx).await;
        assert_eq!(frame.timestamp(), synthetic_timestamp(0));
        assert_eq!(connections.load(Ordering::SeqCst), 2);

        handle.cancel();
        let stats = task.await.unwrap();
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.connects, 2);
        assert_eq!(stats.protocol_errors, 1);
    }

    /// A session whose consumer went away stops on its own
    #[tokio::test]
    async fn test_dropped_consumer_ends_session() {
        let server = MockDeviceServer::spawn("127.0.0.1:0", MockDeviceConfig::default(), |i| {
            Some(synthetic_frame(Modality::Depth, i, 2, 2))
        })
        .unwrap();

        let calibration = CalibrationExtrinsics::from_row_major(&RIG_TO_DEPTH).unwrap();
        let (sink, rx) = ChannelSink::new("e2e_dropped", 1);
        drop(rx);
        let session = StreamSession::new(
            SensorEndpoint::new(Modality::Depth, server.port()),
            session_config(),
            PoseEngine::depth(&calibration),
            sink,
        )
        .unwrap();

        let stats = tokio::time::timeout(
            RECV_TIMEOUT,
            tokio::task::spawn_blocking(move || session.run()),
        )
        .await
        .expect("session should stop without cancellation")
        .unwrap();
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.connects, 1);
    }

    /// Without any sink the session discards frames and runs until cancelled
    #[tokio::test]
    async fn test_session_without_sinks_streams_until_cancelled() {
        let server = MockDeviceServer::spawn(
            "127.0.0.1:0",
            MockDeviceConfig {
                frame_interval: Duration::from_millis(2),
                ..Default::default()
            },
            |i| Some(synthetic_frame(Modality::Color, i, 4, 3)),
        )
        .unwrap();

        let depth_only = vec![SinkConfig {
            name: "depth_log".into(),
            sink_type: SinkType::Log,
            modalities: vec![Modality::Depth],
            params: HashMap::new(),
        }];
        let fanout = create_modality_sink(Modality::Color, &depth_only, "hl2").unwrap();
        assert!(fanout.is_empty());

        let session = StreamSession::new(
            SensorEndpoint::new(Modality::Color, server.port()),
            session_config(),
            PoseEngine::color(),
            fanout,
        )
        .unwrap();
        let handle = session.handle();
        let task = tokio::task::spawn_blocking(move || session.run());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!task.is_finished(), "session stopped without cancellation");

        handle.cancel();
        let stats = tokio::time::timeout(RECV_TIMEOUT, task)
            .await
            .unwrap()
            .unwrap();
        assert!(stats.frames > 1, "frames = {}", stats.frames);
        assert_eq!(stats.connects, 1);
        assert_eq!(stats.sink_errors, 0);
    }

    fn count_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    /// Config-driven sinks: depth frames land on disk, stream data on close
    #[tokio::test]
    async fn test_file_sink_pipeline() {
        let frames = (0..3)
            .map(|i| synthetic_frame(Modality::Depth, i, 4, 2))
            .collect();
        let server =
            MockDeviceServer::scripted("127.0.0.1:0", single_connection(4096), frames).unwrap();

        let out = tempfile::tempdir().unwrap();
        let sinks = vec![
            SinkConfig {
                name: "files".into(),
                sink_type: SinkType::File,
                modalities: vec![Modality::Depth],
                params: HashMap::from([(
                    "base_path".to_string(),
                    out.path().display().to_string(),
                )]),
            },
            SinkConfig {
                name: "log".into(),
                sink_type: SinkType::Log,
                modalities: Vec::new(),
                params: HashMap::from([("every".to_string(), "2".to_string())]),
            },
            SinkConfig {
                name: "color_only".into(),
                sink_type: SinkType::Log,
                modalities: vec![Modality::Color],
                params: HashMap::new(),
            },
        ];
        let fanout = create_modality_sink(Modality::Depth, &sinks, "hl2-e2e").unwrap();
        assert_eq!(fanout.len(), 2);

        let identity: Vec<f32> = (0..16).map(|i| if i % 5 == 0 { 1.0 } else { 0.0 }).collect();
        let calibration = CalibrationExtrinsics::from_row_major(&identity).unwrap();
        let session = StreamSession::new(
            SensorEndpoint::new(Modality::Depth, server.port()),
            session_config(),
            PoseEngine::depth(&calibration),
            fanout,
        )
        .unwrap();
        let handle = session.handle();
        let task = tokio::task::spawn_blocking(move || session.run());

        let depth_dir = out.path().join("depth");
        let deadline = Instant::now() + RECV_TIMEOUT;
        while count_files(&depth_dir) < 3 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(count_files(&depth_dir), 3);
        // stream data is only written on close
        assert!(!out.path().join("depth_stream_data.json").exists());

        handle.cancel();
        let stats = task.await.unwrap();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.sink_errors, 0);

        let text = std::fs::read_to_string(out.path().join("depth_stream_data.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let records = json.as_object().unwrap();
        assert_eq!(records.len(), 3);

        let first = &records[&synthetic_timestamp(0).to_string()];
        let image = first["image"].as_str().unwrap();
        assert!(out.path().join(image).exists());
        assert!(first.get("intrinsics").is_none());
        assert_eq!(
            first["transform"]["child_frame"],
            "hl2-e2e_depth_optical_frame"
        );
        // identity header and identity calibration: pose is the world conversion
        assert_eq!(first["camera_to_world"][0][2], -1.0);
        assert!(!out.path().join("color").exists());
    }
}
