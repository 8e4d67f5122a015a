//! Marker Overlay - Main Entry Point
//!
//! Opens the overlay window (and the camera preview window), starts the
//! detector thread and drives the render loop from a fixed-interval timer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use marker_overlay::camera::{AcquireError, ImageSequenceSource};
use marker_overlay::config::SourceConfig;
use marker_overlay::preview::{HeadlessPreview, PreviewChannel, PreviewReceiver, PreviewSurface};
use marker_overlay::marker::{create_detector, MarkerFamily};
use marker_overlay::{
    AnimationPhase, DetectorHandle, DetectorLoop, Graphics, MarkerId, OverlayConfig, RenderLoop,
    RepeatingTimer, VisibilityFlag,
};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{WindowAttributes, WindowId};

const PREVIEW_DEFAULT_WIDTH: u32 = 640;
const PREVIEW_DEFAULT_HEIGHT: u32 = 480;

/// Animated overlay shown while a fiducial marker is in view
#[derive(Parser, Debug)]
#[command(name = "marker-overlay", version, about)]
struct Args {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Marker id that triggers the overlay
    #[arg(long)]
    marker_id: Option<MarkerId>,

    /// Marker dictionary: dict_6x6_250 or aruco_original
    #[arg(long, value_parser = parse_family)]
    marker_family: Option<MarkerFamily>,

    /// Camera index to capture from
    #[arg(long, conflicts_with = "frames")]
    camera: Option<u32>,

    /// Read frames from image files in this directory instead of a camera
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Replay the frame directory forever
    #[arg(long, requires = "frames")]
    loop_frames: bool,

    /// Do not open the camera preview window
    #[arg(long)]
    no_preview: bool,

    /// Render timer interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Degrees of rotation per visible render tick
    #[arg(long)]
    step: Option<f64>,

    /// Print available cameras and exit
    #[arg(long)]
    list_cameras: bool,
}

fn parse_family(name: &str) -> Result<MarkerFamily, String> {
    match name {
        "dict_6x6_250" => Ok(MarkerFamily::Dict6x6_250),
        "aruco_original" => Ok(MarkerFamily::ArucoOriginal),
        other => Err(format!(
            "unknown marker family '{}' (expected dict_6x6_250 or aruco_original)",
            other
        )),
    }
}

impl Args {
    /// Apply command-line overrides on top of the loaded configuration
    fn apply(&self, config: &mut OverlayConfig) {
        if let Some(id) = self.marker_id {
            config.target_marker_id = id;
        }
        if let Some(family) = self.marker_family {
            config.detector.family = family;
        }
        if let Some(index) = self.camera {
            config.source = SourceConfig::Camera { index };
        }
        if let Some(dir) = &self.frames {
            config.source = SourceConfig::Frames {
                dir: dir.clone(),
                looping: self.loop_frames,
                fps: None,
            };
        }
        if self.no_preview {
            config.preview_enabled = false;
        }
        if let Some(ms) = self.interval_ms {
            config.render_interval_ms = ms;
        }
        if let Some(step) = self.step {
            config.phase_step_degrees = step;
        }
    }
}

/// Application state machine
enum AppState {
    /// Initial state before windows are created
    Uninitialized,
    /// Windows and graphics context are ready
    Running { graphics: Graphics },
}

/// Main application handler implementing winit's ApplicationHandler trait
struct OverlayApp {
    config: OverlayConfig,
    state: AppState,
    render: RenderLoop,
    timer: RepeatingTimer,
    /// Set when the timer fired and the overlay window owes a tick
    tick_pending: bool,
    preview: Option<PreviewReceiver>,
    preview_sized: bool,
    /// Held, never joined. The detector may outlive its usefulness; the
    /// process ends when the overlay window closes.
    detector: DetectorHandle,
    detector_done_logged: bool,
    fatal: Option<anyhow::Error>,
}

impl OverlayApp {
    fn new(
        config: OverlayConfig,
        flag: VisibilityFlag,
        preview: Option<PreviewReceiver>,
        detector: DetectorHandle,
    ) -> Self {
        let render = RenderLoop::new(flag, AnimationPhase::new(config.phase_step_degrees));
        let timer = RepeatingTimer::new(config.render_interval(), Instant::now());
        Self {
            config,
            state: AppState::Uninitialized,
            render,
            timer,
            tick_pending: false,
            preview,
            preview_sized: false,
            detector,
            detector_done_logged: false,
            fatal: None,
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<Graphics> {
        log::info!("Creating window...");

        let window_attributes = WindowAttributes::default()
            .with_title(self.config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                self.config.window_width,
                self.config.window_height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("failed to create overlay window")?,
        );

        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        log::info!("Initializing wgpu and egui...");
        let mut graphics = pollster::block_on(Graphics::new(window, self.config.label_text.clone()))?;

        if self.preview.is_some() {
            let preview_attributes = WindowAttributes::default()
                .with_title(self.config.preview_title.clone())
                .with_inner_size(PhysicalSize::new(PREVIEW_DEFAULT_WIDTH, PREVIEW_DEFAULT_HEIGHT));
            let preview_window = Arc::new(
                event_loop
                    .create_window(preview_attributes)
                    .context("failed to create preview window")?,
            );
            graphics.attach_preview(preview_window)?;
        }

        Ok(graphics)
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.fatal = Some(error);
        event_loop.exit();
    }

    /// Events for the preview window. `q` or closing it stops the detector;
    /// the window goes away once the detector closes the preview.
    fn preview_event(&self, graphics: &mut Graphics, window_id: WindowId, event: WindowEvent) {
        let Some(receiver) = &self.preview else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Preview close requested, stopping detector...");
                receiver.request_quit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::KeyQ),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                log::info!("'q' pressed, stopping detector...");
                receiver.request_quit();
            }
            WindowEvent::Resized(physical_size) => {
                graphics.resize(window_id, physical_size);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = graphics.render_preview() {
                    log::warn!("Preview render failed: {}", e);
                }
            }
            _ => {}
        }
    }

    /// Move the latest detector frame to the GPU and drop the preview window
    /// once the detector has closed it
    fn poll_preview(&mut self, graphics: &mut Graphics) {
        let Some(receiver) = self.preview.as_mut() else {
            return;
        };

        if let Some(frame) = receiver.latest() {
            graphics.upload_preview_frame(&frame);
            if let Some(window) = graphics.preview_window() {
                if !self.preview_sized {
                    let _ = window.request_inner_size(PhysicalSize::new(frame.width, frame.height));
                    self.preview_sized = true;
                }
                window.request_redraw();
            }
        }

        if receiver.is_closed() {
            log::info!("Preview closed by detector");
            graphics.detach_preview();
            self.preview = None;
        }
    }

    fn render_tick(&mut self, event_loop: &ActiveEventLoop, graphics: &mut Graphics) {
        if !self.tick_pending {
            return;
        }
        self.tick_pending = false;

        if let Err(e) = self.render.tick(graphics) {
            self.fail(event_loop, anyhow::Error::new(e).context("render failed"));
        }
    }
}

impl ApplicationHandler for OverlayApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // Only initialize if we haven't already
        if let AppState::Uninitialized = &self.state {
            match self.init_graphics(event_loop) {
                Ok(graphics) => {
                    log::info!("Marker Overlay ready!");
                    log::info!("Press ESC to exit, 'q' in the preview window to stop detection");
                    self.state = AppState::Running { graphics };
                }
                Err(e) => self.fail(event_loop, e),
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        // Only handle events if we're running
        let mut state = std::mem::replace(&mut self.state, AppState::Uninitialized);
        if let AppState::Running { graphics } = &mut state {
            if window_id == graphics.overlay_window().id() {
                let _ = graphics.handle_overlay_event(&event);

                match event {
                    WindowEvent::CloseRequested => {
                        log::info!("Close requested, exiting...");
                        event_loop.exit();
                    }
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                state: ElementState::Pressed,
                                ..
                            },
                        ..
                    } => {
                        log::info!("Escape pressed, exiting...");
                        event_loop.exit();
                    }
                    WindowEvent::Resized(physical_size) => {
                        graphics.resize(window_id, physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        self.render_tick(event_loop, graphics);
                    }
                    _ => {}
                }
            } else {
                self.preview_event(graphics, window_id, event);
            }
        }
        self.state = state;
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let mut state = std::mem::replace(&mut self.state, AppState::Uninitialized);
        let AppState::Running { graphics } = &mut state else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };

        self.poll_preview(graphics);

        if !self.detector_done_logged && self.detector.is_finished() {
            log::info!("Detector finished; overlay keeps the last visibility value");
            self.detector_done_logged = true;
        }

        // Drive render ticks at the configured interval
        if self.timer.fire(Instant::now()) {
            self.tick_pending = true;
            graphics.overlay_window().request_redraw();
        }

        event_loop.set_control_flow(ControlFlow::WaitUntil(self.timer.deadline()));
        self.state = state;
    }
}

/// Open the configured source on the detector thread
fn spawn_detector(
    config: &OverlayConfig,
    flag: VisibilityFlag,
    preview: Box<dyn PreviewSurface + Send>,
) -> anyhow::Result<DetectorHandle> {
    let detector =
        create_detector(&config.detector).context("failed to create marker detector")?;
    let detector_loop = DetectorLoop::new(detector, preview, config.target_marker_id, flag);
    log::info!("Frame source: {}", config.source.display_name());

    let handle = match config.source.clone() {
        SourceConfig::Camera { index } => detector_loop.spawn(move || open_camera(index)),
        SourceConfig::Frames { dir, looping, fps } => detector_loop.spawn(move || {
            let source = ImageSequenceSource::open(&dir, looping)?;
            Ok(match fps {
                Some(fps) => source.with_frame_rate(fps),
                None => source,
            })
        }),
    };
    handle.context("failed to spawn detector thread")
}

#[cfg(feature = "camera")]
fn open_camera(index: u32) -> Result<marker_overlay::camera::CameraSource, AcquireError> {
    marker_overlay::camera::CameraSource::open(index)
}

#[cfg(not(feature = "camera"))]
fn open_camera(index: u32) -> Result<ImageSequenceSource, AcquireError> {
    Err(AcquireError::Device(format!(
        "camera {} requested but this build has no camera support",
        index
    )))
}

#[cfg(feature = "camera")]
fn list_cameras() -> anyhow::Result<()> {
    let cameras = marker_overlay::camera::CameraSource::list_cameras();
    if cameras.is_empty() {
        println!("No cameras found");
    }
    for camera in cameras {
        println!("{}: {}", camera.index, camera.name);
    }
    Ok(())
}

#[cfg(not(feature = "camera"))]
fn list_cameras() -> anyhow::Result<()> {
    anyhow::bail!("this build has no camera support")
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Marker Overlay v{}", env!("CARGO_PKG_VERSION"));

    if args.list_cameras {
        return list_cameras();
    }

    let mut config = match &args.config {
        Some(path) => OverlayConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => OverlayConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    log::info!(
        "Tracking marker {} of {} (render every {} ms, {} deg per tick)",
        config.target_marker_id,
        config.detector.family,
        config.render_interval_ms,
        config.phase_step_degrees
    );

    let flag = VisibilityFlag::new();
    let (preview, receiver): (Box<dyn PreviewSurface + Send>, Option<PreviewReceiver>) =
        if config.preview_enabled {
            let (channel, receiver) = PreviewChannel::new();
            (Box::new(channel), Some(receiver))
        } else {
            (Box::new(HeadlessPreview::new()), None)
        };

    let detector = spawn_detector(&config, flag.clone(), preview)?;

    // Create event loop
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    // Create and run application
    let mut app = OverlayApp::new(config, flag, receiver, detector);
    event_loop.run_app(&mut app).context("event loop error")?;

    if let Some(error) = app.fatal.take() {
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "marker-overlay",
            "--marker-id",
            "23",
            "--marker-family",
            "aruco_original",
            "--frames",
            "/tmp/seq",
            "--loop-frames",
            "--no-preview",
            "--interval-ms",
            "33",
            "--step",
            "2.5",
        ]);
        let mut config = OverlayConfig::default();
        args.apply(&mut config);

        assert_eq!(config.target_marker_id, 23);
        assert_eq!(config.detector.family, MarkerFamily::ArucoOriginal);
        assert_eq!(
            config.source,
            SourceConfig::Frames {
                dir: PathBuf::from("/tmp/seq"),
                looping: true,
                fps: None,
            }
        );
        assert!(!config.preview_enabled);
        assert_eq!(config.render_interval_ms, 33);
        assert_eq!(config.phase_step_degrees, 2.5);
    }

    #[test]
    fn test_camera_conflicts_with_frames() {
        let result = Args::try_parse_from(["marker-overlay", "--camera", "1", "--frames", "/tmp"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_family_rejected() {
        let result = Args::try_parse_from(["marker-overlay", "--marker-family", "dict_4x4_50"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::parse_from(["marker-overlay"]);
        let mut config = OverlayConfig::default();
        args.apply(&mut config);
        assert_eq!(config, OverlayConfig::default());
    }
}
