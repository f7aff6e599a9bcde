use thiserror::Error;

use greenroom_runtime::{FrameSource, FrameView};

#[derive(Debug, Error)]
pub enum WebcamError {
    #[error("webcam support not enabled (build with feature: greenroom-input-webcam/native)")]
    NotEnabled,

    #[error("{0}")]
    Backend(String),
}

#[derive(Clone, Debug, Default)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>, // RGB8, top row first
}

/// Camera capture. Frames are pulled on demand, so the scheduler paces it with the timer
/// fallback.
pub struct Webcam {
    #[cfg(feature = "native")]
    cam: nokhwa::Camera,
    grabs: GrabState,
}

/// Last good frame plus whether the grabs since then have been failing.
#[derive(Debug, Default)]
struct GrabState {
    last: Option<RgbFrame>,
    failing: bool,
}

impl GrabState {
    /// Keep the previous frame on a failed grab, logging only the first failure in a row.
    fn refresh(&mut self, grabbed: Result<RgbFrame, WebcamError>) {
        match grabbed {
            Ok(frame) => {
                if self.failing {
                    tracing::info!("webcam frames flowing again");
                }
                self.failing = false;
                self.last = Some(frame);
            }
            Err(e) => {
                if !self.failing {
                    tracing::warn!("webcam frame grab failed: {e}");
                }
                self.failing = true;
            }
        }
    }

    fn view(&self) -> Option<FrameView<'_>> {
        self.last
            .as_ref()
            .map(|f| FrameView::new(f.width, f.height, &f.rgb))
    }
}

impl Webcam {
    /// Open webcam `index` and best-effort set the requested resolution.
    pub fn new(index: u32, width: u32, height: u32) -> Result<Self, WebcamError> {
        #[cfg(not(feature = "native"))]
        {
            let _ = (index, width, height);
            Err(WebcamError::NotEnabled)
        }

        #[cfg(feature = "native")]
        {
            use nokhwa::{
                pixel_format::RgbFormat,
                utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution},
                Camera,
            };

            let requested =
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
            let mut cam = Camera::new(CameraIndex::Index(index), requested)
                .map_err(|e| WebcamError::Backend(e.to_string()))?;

            cam.open_stream()
                .map_err(|e| WebcamError::Backend(e.to_string()))?;

            // Best-effort; the source reports whatever resolution the device delivers.
            if let Err(e) = cam.set_resolution(Resolution::new(width, height)) {
                tracing::warn!(width, height, "webcam rejected requested resolution: {e}");
            }

            tracing::info!(index, "webcam stream opened");
            Ok(Self {
                cam,
                grabs: GrabState::default(),
            })
        }
    }

    /// Grab the next frame from the device as RGB8.
    pub fn poll_rgb(&mut self) -> Result<RgbFrame, WebcamError> {
        #[cfg(not(feature = "native"))]
        {
            Err(WebcamError::NotEnabled)
        }

        #[cfg(feature = "native")]
        {
            use nokhwa::pixel_format::RgbFormat;

            let buf = self
                .cam
                .frame()
                .map_err(|e| WebcamError::Backend(e.to_string()))?;

            let res = buf.resolution();
            let img = buf
                .decode_image::<RgbFormat>()
                .map_err(|e| WebcamError::Backend(e.to_string()))?;

            Ok(RgbFrame {
                width: res.width_x,
                height: res.height_y,
                rgb: img.into_raw(),
            })
        }
    }
}

impl FrameSource for Webcam {
    fn current_frame(&mut self) -> Option<FrameView<'_>> {
        let grabbed = self.poll_rgb();
        self.grabs.refresh(grabbed);
        self.grabs.view()
    }
}

impl std::fmt::Debug for Webcam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Webcam")
            .field("last", &self.grabs.last.as_ref().map(|l| (l.width, l.height)))
            .field("failing", &self.grabs.failing)
            .finish_non_exhaustive()
    }
}
