//! Camera capture: acquire a stream under a preferred facing mode, fall back
//! through weaker constraints, snapshot one frame to JPEG, and always hand the
//! device back.

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use image::{codecs::jpeg::JpegEncoder, RgbImage};
use thiserror::Error;

use crate::client::PhotoFile;

pub const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacingMode {
    User,
    Environment,
}

impl FacingMode {
    pub fn opposite(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }
}

impl std::str::FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" | "front" => Ok(FacingMode::User),
            "environment" | "back" => Ok(FacingMode::Environment),
            other => Err(format!("unknown facing mode {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraints {
    Facing(FacingMode),
    /// Any video device, no facing requirement.
    Any,
}

impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraints::Facing(FacingMode::User) => f.write_str("facing=user"),
            Constraints::Facing(FacingMode::Environment) => f.write_str("facing=environment"),
            Constraints::Any => f.write_str("any"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera found")]
    NoDevice,
    #[error("camera is busy")]
    Busy,
    #[error("camera constraints not satisfied")]
    Overconstrained,
    #[error("camera access requires a secure context")]
    InsecureContext,
    #[error("camera API not supported")]
    Unsupported,
    #[error("capture failed: {0}")]
    Capture(String),
}

impl CameraError {
    pub fn user_message(&self) -> &'static str {
        match self {
            CameraError::PermissionDenied => {
                "Camera permission denied. Please allow camera access and try again."
            }
            CameraError::NoDevice => "No camera found. Please connect a camera and try again.",
            CameraError::Busy => {
                "Camera is already in use by another application. Please close other apps using the camera."
            }
            CameraError::Overconstrained => {
                "Unable to access camera. Please check your camera settings."
            }
            CameraError::InsecureContext => {
                "HTTPS is required to access the camera. Please use a secure connection."
            }
            CameraError::Unsupported => "Camera API not supported on this device.",
            CameraError::Capture(_) => "Unable to access camera.",
        }
    }

    /// Classify an OS level failure to open a device.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => CameraError::PermissionDenied,
            io::ErrorKind::NotFound => CameraError::NoDevice,
            io::ErrorKind::ResourceBusy | io::ErrorKind::WouldBlock => CameraError::Busy,
            _ => CameraError::Capture(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Platform {
    pub mobile: bool,
    pub secure_context: bool,
}

/// An open video stream that owns the device until stopped.
pub trait VideoStream {
    fn frame(&mut self) -> Result<RgbImage, CameraError>;
    fn stop(&mut self);
}

pub trait CameraBackend {
    type Stream: VideoStream;

    fn available(&self) -> bool;
    fn open(&self, constraints: &Constraints) -> Result<Self::Stream, CameraError>;
}

/// Order in which constraints are tried. The opposite camera is only worth a
/// try on phones; desktops have at most one.
pub fn acquisition_plan(preferred: FacingMode, mobile: bool) -> Vec<Constraints> {
    let mut plan = vec![Constraints::Facing(preferred)];
    if mobile {
        plan.push(Constraints::Facing(preferred.opposite()));
    }
    plan.push(Constraints::Any);
    plan
}

pub fn open_camera<B: CameraBackend>(
    backend: &B,
    preferred: FacingMode,
    platform: Platform,
) -> Result<CameraSession<B::Stream>, CameraError> {
    if !platform.secure_context {
        return Err(CameraError::InsecureContext);
    }
    if !backend.available() {
        return Err(CameraError::Unsupported);
    }

    let mut last = CameraError::NoDevice;
    for constraints in acquisition_plan(preferred, platform.mobile) {
        match backend.open(&constraints) {
            Ok(stream) => {
                tracing::debug!(%constraints, "camera opened");
                return Ok(CameraSession::new(stream));
            }
            Err(e) => {
                tracing::debug!(%constraints, error = %e, "camera open failed, falling back");
                last = e;
            }
        }
    }
    tracing::warn!(error = %last, "no camera could be opened");
    Err(last)
}

/// Owns an open stream and stops it exactly once, on capture, close or drop.
pub struct CameraSession<S: VideoStream> {
    stream: Option<S>,
}

impl<S: VideoStream> CameraSession<S> {
    fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// Grab the current frame as a JPEG and release the camera.
    pub fn capture(mut self) -> Result<PhotoFile, CameraError> {
        let frame = match self.stream.as_mut() {
            Some(stream) => stream.frame()?,
            None => return Err(CameraError::Capture("stream already stopped".into())),
        };
        self.release();

        let bytes = encode_jpeg(&frame)?;
        let name = format!(
            "camera-capture-{}.jpg",
            chrono::Utc::now().timestamp_millis()
        );
        Ok(PhotoFile::jpeg(name, bytes))
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            tracing::debug!("camera released");
        }
    }
}

impl<S: VideoStream> Drop for CameraSession<S> {
    fn drop(&mut self) {
        self.release();
    }
}

pub fn encode_jpeg(frame: &RgbImage) -> Result<Vec<u8>, CameraError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(frame)
        .map_err(|e| CameraError::Capture(e.to_string()))?;
    Ok(out)
}

/// Camera backed by still frames that a capture daemon keeps refreshing on
/// disk, one file per facing mode.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCamera {
    pub user: Option<PathBuf>,
    pub environment: Option<PathBuf>,
    pub any: Option<PathBuf>,
}

pub struct SnapshotStream {
    path: PathBuf,
    stopped: bool,
}

impl SnapshotCamera {
    fn path_for(&self, constraints: &Constraints) -> Option<&Path> {
        match constraints {
            Constraints::Facing(FacingMode::User) => self.user.as_deref(),
            Constraints::Facing(FacingMode::Environment) => self.environment.as_deref(),
            Constraints::Any => self
                .any
                .as_deref()
                .or(self.user.as_deref())
                .or(self.environment.as_deref()),
        }
    }
}

impl CameraBackend for SnapshotCamera {
    type Stream = SnapshotStream;

    fn available(&self) -> bool {
        self.user.is_some() || self.environment.is_some() || self.any.is_some()
    }

    fn open(&self, constraints: &Constraints) -> Result<SnapshotStream, CameraError> {
        let path = self
            .path_for(constraints)
            .ok_or(CameraError::Overconstrained)?;
        // opening proves the device is there and readable
        std::fs::File::open(path).map_err(|e| CameraError::from_io(&e))?;
        Ok(SnapshotStream {
            path: path.to_path_buf(),
            stopped: false,
        })
    }
}

impl VideoStream for SnapshotStream {
    fn frame(&mut self) -> Result<RgbImage, CameraError> {
        if self.stopped {
            return Err(CameraError::Capture("stream stopped".into()));
        }
        let img = image::open(&self.path).map_err(|e| match e {
            image::ImageError::IoError(io) => CameraError::from_io(&io),
            other => CameraError::Capture(other.to_string()),
        })?;
        Ok(img.into_rgb8())
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        collections::HashMap,
        rc::Rc,
    };

    use super::*;

    #[derive(Default)]
    struct Log {
        attempts: Vec<Constraints>,
        stops: usize,
    }

    struct FakeStream(Rc<RefCell<Log>>);

    impl VideoStream for FakeStream {
        fn frame(&mut self) -> Result<RgbImage, CameraError> {
            Ok(RgbImage::from_pixel(4, 3, image::Rgb([200, 10, 10])))
        }

        fn stop(&mut self) {
            self.0.borrow_mut().stops += 1;
        }
    }

    struct FakeBackend {
        log: Rc<RefCell<Log>>,
        outcomes: HashMap<Constraints, CameraError>,
    }

    impl FakeBackend {
        fn failing(outcomes: &[(Constraints, CameraError)]) -> Self {
            Self {
                log: Rc::default(),
                outcomes: outcomes.iter().cloned().collect(),
            }
        }
    }

    impl CameraBackend for FakeBackend {
        type Stream = FakeStream;

        fn available(&self) -> bool {
            true
        }

        fn open(&self, c: &Constraints) -> Result<FakeStream, CameraError> {
            self.log.borrow_mut().attempts.push(*c);
            match self.outcomes.get(c) {
                Some(err) => Err(err.clone()),
                None => Ok(FakeStream(self.log.clone())),
            }
        }
    }

    const MOBILE: Platform = Platform {
        mobile: true,
        secure_context: true,
    };
    const DESKTOP: Platform = Platform {
        mobile: false,
        secure_context: true,
    };

    #[test]
    fn plan_order() {
        use Constraints::*;
        use FacingMode::*;
        assert_eq!(
            acquisition_plan(User, true),
            vec![Facing(User), Facing(Environment), Any]
        );
        assert_eq!(acquisition_plan(User, false), vec![Facing(User), Any]);
    }

    #[test]
    fn mobile_falls_through_to_unconstrained() {
        let backend = FakeBackend::failing(&[
            (Constraints::Facing(FacingMode::User), CameraError::Overconstrained),
            (Constraints::Facing(FacingMode::Environment), CameraError::NoDevice),
        ]);
        let session = open_camera(&backend, FacingMode::User, MOBILE).unwrap();
        assert_eq!(
            backend.log.borrow().attempts,
            vec![
                Constraints::Facing(FacingMode::User),
                Constraints::Facing(FacingMode::Environment),
                Constraints::Any
            ]
        );
        drop(session);
        assert_eq!(backend.log.borrow().stops, 1);
    }

    #[test]
    fn desktop_skips_opposite_camera_and_reports_last_error() {
        let backend = FakeBackend::failing(&[
            (Constraints::Facing(FacingMode::User), CameraError::Overconstrained),
            (Constraints::Any, CameraError::PermissionDenied),
        ]);
        let err = open_camera(&backend, FacingMode::User, DESKTOP).err().unwrap();
        assert!(matches!(err, CameraError::PermissionDenied));
        assert_eq!(backend.log.borrow().attempts.len(), 2);
    }

    #[test]
    fn insecure_context_is_refused_before_touching_the_device() {
        let backend = FakeBackend::failing(&[]);
        let platform = Platform {
            mobile: true,
            secure_context: false,
        };
        let err = open_camera(&backend, FacingMode::User, platform).err().unwrap();
        assert!(matches!(err, CameraError::InsecureContext));
        assert!(backend.log.borrow().attempts.is_empty());
    }

    #[test]
    fn capture_releases_exactly_once() {
        let backend = FakeBackend::failing(&[]);
        let session = open_camera(&backend, FacingMode::Environment, MOBILE).unwrap();
        let photo = session.capture().unwrap();
        assert_eq!(backend.log.borrow().stops, 1);
        assert_eq!(photo.mime, mime::IMAGE_JPEG);
        assert!(photo.file_name.starts_with("camera-capture-"));
        assert!(photo.file_name.ends_with(".jpg"));
        // JPEG SOI marker
        assert_eq!(&photo.bytes[..2], &[0xFF, 0xD8]);

        let session = open_camera(&backend, FacingMode::Environment, MOBILE).unwrap();
        session.close();
        assert_eq!(backend.log.borrow().stops, 2);
    }

    #[test]
    fn io_errors_are_classified() {
        let e = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(CameraError::from_io(&e), CameraError::PermissionDenied));
        let e = io::Error::from(io::ErrorKind::NotFound);
        assert!(matches!(CameraError::from_io(&e), CameraError::NoDevice));
        let e = io::Error::from(io::ErrorKind::WouldBlock);
        assert!(matches!(CameraError::from_io(&e), CameraError::Busy));
    }

    #[test]
    fn snapshot_camera() {
        let dir = tempfile::tempdir().unwrap();
        let still = dir.path().join("front.png");
        RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3]))
            .save(&still)
            .unwrap();

        let camera = SnapshotCamera {
            user: Some(still),
            environment: None,
            any: None,
        };
        assert!(matches!(
            camera.open(&Constraints::Facing(FacingMode::Environment)),
            Err(CameraError::Overconstrained)
        ));

        let session = open_camera(&camera, FacingMode::Environment, MOBILE).unwrap();
        let photo = session.capture().unwrap();
        let decoded = image::load_from_memory(&photo.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 8));

        let missing = SnapshotCamera {
            any: Some(dir.path().join("nope.png")),
            ..SnapshotCamera::default()
        };
        assert!(matches!(
            open_camera(&missing, FacingMode::User, DESKTOP).err().unwrap(),
            CameraError::NoDevice
        ));
        assert!(matches!(
            open_camera(&SnapshotCamera::default(), FacingMode::User, DESKTOP)
                .err()
                .unwrap(),
            CameraError::Unsupported
        ));
    }
}
