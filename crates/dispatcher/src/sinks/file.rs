//! FileSink - writes frames to disk with folder structure
//!
//! ```text
//! <base_path>/
//!   color/color_<timestamp>.jpg   (or .png)
//!   depth/depth_<timestamp>.png   (16-bit grayscale, raw depth units)
//!   color_stream_data.json        (written on close)
//!   depth_stream_data.json
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use contracts::{
    CameraInfo, ContractError, Frame, FrameSink, Intrinsics, Modality, PixelBuffer, Pose,
    StampedTransform, DEFAULT_SERIAL,
};
use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::error::DispatcherError;

/// Container for color images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorImageFormat {
    #[default]
    Jpg,
    Png,
}

impl ColorImageFormat {
    fn extension(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
    /// Color image container
    pub image_format: ColorImageFormat,
    /// Frame-id prefix for the recorded transforms
    pub serial: String,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(
        name: &str,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatcherError> {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        let image_format = match params.get("image_format").map(String::as_str) {
            None | Some("jpg") | Some("jpeg") => ColorImageFormat::Jpg,
            Some("png") => ColorImageFormat::Png,
            Some(other) => return Err(DispatcherError::invalid_param(name, "image_format", other)),
        };

        Ok(Self {
            base_path,
            image_format,
            serial: DEFAULT_SERIAL.to_string(),
        })
    }
}

/// Per-frame metadata persisted on close
#[derive(Debug, Clone, Serialize)]
struct FrameRecord {
    /// Seconds since the Unix epoch
    stamp_secs: f64,
    /// Image path relative to the base directory
    image: String,
    /// Header transform (device_to_world / rig_to_world), row-major
    header_transform: [[f32; 4]; 4],
    /// Camera-to-world in the target frame, row-major
    camera_to_world: [[f32; 4]; 4],
    /// Camera-to-world as translation + quaternion between named frames
    transform: StampedTransform,
    #[serde(skip_serializing_if = "Option::is_none")]
    intrinsics: Option<Intrinsics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    camera_info: Option<CameraInfo>,
}

/// Sink that writes frames to disk files
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    created_dirs: HashSet<PathBuf>,
    /// Keyed by device timestamp
    records: HashMap<Modality, BTreeMap<i64, FrameRecord>>,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        // Create base directory if it doesn't exist
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            created_dirs: HashSet::new(),
            records: HashMap::new(),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        let config = FileSinkConfig::from_params(&name, params)?;
        Self::new(name.clone(), config)
            .map_err(|e| DispatcherError::sink_creation(name, e.to_string()))
    }

    /// Use `serial` as the frame-id prefix
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.config.serial = serial.into();
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    fn ensure_dir(&mut self, dir: &Path) -> std::io::Result<()> {
        if !self.created_dirs.contains(dir) {
            fs::create_dir_all(dir)?;
            self.created_dirs.insert(dir.to_path_buf());
        }
        Ok(())
    }

    fn write_frame_to_disk(&mut self, frame: &Frame) -> std::io::Result<()> {
        let modality = frame.modality();
        let timestamp = frame.timestamp();
        let extension = match modality {
            Modality::Color => self.config.image_format.extension(),
            Modality::Depth => "png",
        };

        let relative = format!("{modality}/{modality}_{timestamp}.{extension}");
        let sensor_dir = self.config.base_path.join(modality.as_str());
        self.ensure_dir(&sensor_dir)?;
        self.save_image(&self.config.base_path.join(&relative), &frame.pixels)?;

        let record = FrameRecord {
            stamp_secs: frame.header.unix_time_secs(),
            image: relative,
            header_transform: Pose::new(frame.header_transform).to_row_major(),
            camera_to_world: frame.pose.to_row_major(),
            transform: frame.stamped_transform(&self.config.serial),
            intrinsics: frame.header.intrinsics().copied(),
            camera_info: frame.camera_info(&self.config.serial),
        };
        self.records
            .entry(modality)
            .or_default()
            .insert(timestamp, record);

        Ok(())
    }

    fn save_image(&self, path: &Path, pixels: &PixelBuffer) -> std::io::Result<()> {
        let (width, height) = (pixels.width(), pixels.height());
        match pixels {
            PixelBuffer::Depth16 { .. } => image::save_buffer(
                path,
                pixels.as_bytes(),
                width,
                height,
                image::ColorType::L16,
            )
            .map_err(std::io::Error::other),

            PixelBuffer::Bgr8 { data, .. } => {
                // Convert BGR to RGB
                let mut rgb = data.clone();
                for chunk in rgb.chunks_exact_mut(3) {
                    chunk.swap(0, 2);
                }
                image::save_buffer(path, &rgb, width, height, image::ColorType::Rgb8)
                    .map_err(std::io::Error::other)
            }

            PixelBuffer::Bgra8 { data, .. } => match self.config.image_format {
                ColorImageFormat::Png => {
                    // Convert BGRA to RGBA
                    let mut rgba = data.clone();
                    for chunk in rgba.chunks_exact_mut(4) {
                        chunk.swap(0, 2);
                    }
                    image::save_buffer(path, &rgba, width, height, image::ColorType::Rgba8)
                        .map_err(std::io::Error::other)
                }
                ColorImageFormat::Jpg => {
                    // JPEG has no alpha channel
                    let rgb: Vec<u8> = data
                        .chunks_exact(4)
                        .flat_map(|px| [px[2], px[1], px[0]])
                        .collect();
                    image::save_buffer(path, &rgb, width, height, image::ColorType::Rgb8)
                        .map_err(std::io::Error::other)
                }
            },
        }
    }

    fn write_stream_data(&self) -> std::io::Result<()> {
        for (modality, records) in &self.records {
            let path = self
                .config
                .base_path
                .join(format!("{modality}_stream_data.json"));
            let writer = BufWriter::new(File::create(&path)?);
            serde_json::to_writer_pretty(writer, records)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            info!(
                sink = %self.name,
                path = %path.display(),
                frames = records.len(),
                "stream data written"
            );
        }
        Ok(())
    }

    fn persist_frame(&mut self, frame: &Frame) -> Result<(), ContractError> {
        self.write_frame_to_disk(frame).map_err(|e| {
            error!(sink = %self.name, timestamp = frame.timestamp(), error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl FrameSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_consume",
        skip(self, frame),
        fields(sink = %self.name, timestamp = frame.timestamp())
    )]
    fn consume(&mut self, frame: Frame) -> Result<(), ContractError> {
        self.persist_frame(&frame)
    }

    #[instrument(name = "file_sink_close", skip(self))]
    fn close(&mut self) -> Result<(), ContractError> {
        self.write_stream_data()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        self.records.clear();
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}
