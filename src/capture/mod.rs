//! Camera capture flow: open a stream, preview, snapshot one still.
//!
//! DESIGN
//! ======
//! The platform camera sits behind [`CameraDevice`] / [`VideoStream`]. The
//! session owns at most one [`ActiveStream`]; that guard stops the hardware
//! stream when dropped, so every exit path (cancel, capture, toggle,
//! failed reopen, dropping the session) releases the camera. A new stream
//! is only requested after the previous guard is gone.
//!
//! ```text
//! Closed ──open──▶ Requesting ──granted──▶ Streaming ──capture──▶ Captured
//!    ▲                 │ denied                │ toggle (reopen)
//!    └─────────────────┴────── cancel / error ─┘
//! ```

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::payload::{ImagePayload, JPEG_MEDIA_TYPE, encode_jpeg};

/// JPEG quality used for captured stills.
pub const CAPTURE_JPEG_QUALITY: u8 = 95;

/// Name given to captured stills.
pub const CAPTURE_FILE_NAME: &str = "camera_capture.jpg";

// =============================================================================
// DEVICE SEAM
// =============================================================================

/// Which physical camera to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Outward-facing camera.
    #[default]
    Environment,
    /// Front camera; captures are mirrored to match the preview.
    User,
}

impl FacingMode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Environment => Self::User,
            Self::User => Self::Environment,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::User => "user",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("camera access denied")]
    Denied,

    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode capture: {0}")]
    Encode(String),
}

/// A live video stream handed out by a [`CameraDevice`].
pub trait VideoStream: Send {
    /// Native frame size. `(0, 0)` until the first frame has arrived.
    fn dimensions(&self) -> (u32, u32);

    /// The most recent frame at native resolution, if any.
    fn frame(&mut self) -> Option<RgbaImage>;

    /// Release the underlying hardware.
    fn stop(&mut self);
}

/// Source of video streams (platform camera, test double).
#[async_trait::async_trait]
pub trait CameraDevice: Send + Sync {
    /// Ask for a stream from the camera with the given facing mode.
    ///
    /// # Errors
    ///
    /// [`CameraError::Denied`] when permission is refused,
    /// [`CameraError::Unavailable`] when no such camera exists.
    async fn open(&self, facing: FacingMode) -> Result<Box<dyn VideoStream>, CameraError>;
}

// =============================================================================
// ACTIVE STREAM
// =============================================================================

/// Exclusive owner of one open stream. Stops it exactly once, on drop.
pub struct ActiveStream {
    inner: Box<dyn VideoStream>,
    facing: FacingMode,
}

impl ActiveStream {
    fn new(inner: Box<dyn VideoStream>, facing: FacingMode) -> Self {
        debug!(facing = facing.as_str(), "camera stream acquired");
        Self { inner, facing }
    }

    #[must_use]
    pub fn facing(&self) -> FacingMode {
        self.facing
    }
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        self.inner.stop();
        debug!(facing = self.facing.as_str(), "camera stream released");
    }
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Closed,
    Requesting,
    Streaming,
    Captured,
}

/// Capture state machine over a [`CameraDevice`].
pub struct CaptureSession<D: CameraDevice> {
    device: D,
    stream: Option<ActiveStream>,
    state: CaptureState,
    facing: FacingMode,
}

impl<D: CameraDevice> CaptureSession<D> {
    #[must_use]
    pub fn new(device: D) -> Self {
        Self { device, stream: None, state: CaptureState::Closed, facing: FacingMode::default() }
    }

    #[must_use]
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Facing mode of the current or last requested stream.
    #[must_use]
    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Open the camera with `facing`, replacing any active stream.
    ///
    /// # Errors
    ///
    /// Returns the device error; the session is then `Closed` with no stream.
    /// Dropping the future before the device answers also leaves it `Closed`.
    pub async fn open(&mut self, facing: FacingMode) -> Result<(), CameraError> {
        self.release();
        self.state = CaptureState::Requesting;
        self.facing = facing;
        let request = Request { state: &mut self.state };

        match self.device.open(facing).await {
            Ok(stream) => {
                self.stream = Some(ActiveStream::new(stream, facing));
                request.settle(CaptureState::Streaming);
                Ok(())
            }
            Err(e) => {
                warn!(facing = facing.as_str(), error = %e, "camera open failed");
                request.settle(CaptureState::Closed);
                Err(e)
            }
        }
    }

    /// Switch to the other camera. No-op unless streaming.
    ///
    /// # Errors
    ///
    /// Returns the device error; the session is then `Closed`.
    pub async fn toggle(&mut self) -> Result<(), CameraError> {
        if self.state != CaptureState::Streaming {
            return Ok(());
        }
        self.open(self.facing.toggled()).await
    }

    /// Snapshot the current frame as a JPEG still.
    ///
    /// Returns `Ok(None)` without changing state when not streaming or when
    /// the stream has not produced a frame yet. On success the stream is
    /// released and the session moves to `Captured`.
    ///
    /// # Errors
    ///
    /// [`CameraError::Encode`] if the frame cannot be encoded; the stream
    /// stays open.
    pub fn capture(&mut self) -> Result<Option<ImagePayload>, CameraError> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        let (width, height) = stream.inner.dimensions();
        if width == 0 || height == 0 {
            debug!("capture ignored: no frame yet");
            return Ok(None);
        }
        let Some(frame) = stream.inner.frame() else {
            return Ok(None);
        };
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(None);
        }

        let frame = match stream.facing {
            FacingMode::User => image::imageops::flip_horizontal(&frame),
            FacingMode::Environment => frame,
        };
        let bytes = encode_jpeg(&frame, CAPTURE_JPEG_QUALITY).map_err(|e| CameraError::Encode(e.to_string()))?;
        info!(width = frame.width(), height = frame.height(), bytes = bytes.len(), "photo captured");

        self.release();
        self.state = CaptureState::Captured;
        Ok(Some(ImagePayload {
            bytes,
            media_type: JPEG_MEDIA_TYPE.to_string(),
            name: CAPTURE_FILE_NAME.to_string(),
        }))
    }

    /// Close the camera.
    pub fn cancel(&mut self) {
        self.release();
        self.state = CaptureState::Closed;
    }

    fn release(&mut self) {
        drop(self.stream.take());
    }
}

/// An outstanding device request. Falls back to `Closed` if dropped unsettled.
struct Request<'a> {
    state: &'a mut CaptureState,
}

impl Request<'_> {
    fn settle(self, next: CaptureState) {
        *self.state = next;
    }
}

impl Drop for Request<'_> {
    fn drop(&mut self) {
        if *self.state == CaptureState::Requesting {
            *self.state = CaptureState::Closed;
            debug!("camera request dropped before the device answered");
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
