//! Webcam input
//!
//! Cross-platform camera capture using the nokhwa crate. The camera is opened
//! and read on the calling thread; open it on the detector thread since some
//! backends are not `Send`.

use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

use super::{AcquireError, CameraFrame, FrameSource};

/// Information about an available camera
#[derive(Clone, Debug)]
pub struct CameraInfo {
    /// Camera index
    pub index: u32,
    /// Camera name
    pub name: String,
}

/// An open webcam stream
pub struct CameraSource {
    camera: Camera,
    name: String,
    frame_count: u64,
}

impl CameraSource {
    /// List available cameras
    pub fn list_cameras() -> Vec<CameraInfo> {
        match nokhwa::query(ApiBackend::Auto) {
            Ok(camera_list) => camera_list
                .iter()
                .enumerate()
                .map(|(idx, info)| CameraInfo {
                    index: idx as u32,
                    name: info.human_name().to_string(),
                })
                .collect(),
            Err(e) => {
                log::warn!("Failed to enumerate cameras: {:?}", e);
                Vec::new()
            }
        }
    }

    /// Open camera `camera_index` and start streaming
    pub fn open(camera_index: u32) -> Result<Self, AcquireError> {
        log::info!("Opening camera {}", camera_index);

        let index = CameraIndex::Index(camera_index);
        let mut camera = Self::open_with_fallbacks(index)?;

        camera
            .open_stream()
            .map_err(|e| AcquireError::Device(format!("failed to open camera stream: {:?}", e)))?;

        let name = camera.info().human_name().to_string();
        log::info!(
            "Camera opened: {} ({}x{})",
            name,
            camera.resolution().width(),
            camera.resolution().height()
        );

        Ok(Self {
            camera,
            name,
            frame_count: 0,
        })
    }

    /// Try progressively less specific formats until the camera accepts one
    fn open_with_fallbacks(index: CameraIndex) -> Result<Camera, AcquireError> {
        let attempts = [
            RequestedFormatType::AbsoluteHighestFrameRate,
            RequestedFormatType::HighestResolution(Resolution::new(640, 480)),
            RequestedFormatType::None,
        ];

        let mut last_error = None;
        for attempt in attempts {
            let requested = RequestedFormat::new::<RgbAFormat>(attempt);
            match Camera::new(index.clone(), requested) {
                Ok(camera) => return Ok(camera),
                Err(e) => {
                    log::warn!("Camera rejected format request: {:?}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(AcquireError::Device(format!(
            "failed to open camera with all format attempts: {:?}",
            last_error
        )))
    }
}

impl FrameSource for CameraSource {
    fn acquire_frame(&mut self) -> Result<CameraFrame, AcquireError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| AcquireError::Device(format!("failed to capture frame: {:?}", e)))?;

        let image = buffer
            .decode_image::<RgbAFormat>()
            .map_err(|e| AcquireError::Decode(format!("{:?}", e)))?;

        let frame = CameraFrame {
            width: image.width(),
            height: image.height(),
            data: image.into_raw(),
            frame_number: self.frame_count,
            timestamp: std::time::Instant::now(),
        };
        self.frame_count += 1;
        Ok(frame)
    }

    fn name(&self) -> String {
        format!("camera {}", self.name)
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            log::warn!("Failed to stop camera stream: {:?}", e);
        }
        log::info!("Camera released after {} frames", self.frame_count);
    }
}
