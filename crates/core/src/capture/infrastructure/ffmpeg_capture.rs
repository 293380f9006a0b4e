use std::path::{Path, PathBuf};

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::frame::Frame;

/// Reads frames from a camera device or a video file via ffmpeg-next.
///
/// Each decoded picture is converted to packed RGB24. Camera devices are
/// opened through libavdevice, so a live stream never reaches end of file.
pub struct FfmpegCapture {
    target: String,
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

// Safety: FfmpegCapture is owned by the frame loop and used from one thread
// at a time. The raw pointers inside ffmpeg types are never shared.
unsafe impl Send for FfmpegCapture {}

/// Maps a camera index to its device node.
pub fn device_path(index: u32) -> PathBuf {
    PathBuf::from(format!("/dev/video{index}"))
}

/// Short name of the libavdevice demuxer for Video4Linux2 cameras.
const CAPTURE_DEMUXER: &str = "v4l2";

/// The camera input format of the linked FFmpeg, if it has one.
///
/// Device demuxers cannot be probed from the node itself, so the camera has
/// to be opened with this format named explicitly (`ffmpeg -f v4l2`).
pub fn capture_input_format() -> Option<ffmpeg_next::format::Format> {
    ffmpeg_next::device::input::video().find(|format| is_capture_demuxer(format.name()))
}

/// Demuxer names are comma-separated alias lists, e.g. `video4linux2,v4l2`.
fn is_capture_demuxer(name: &str) -> bool {
    name.split(',').any(|alias| alias.trim() == CAPTURE_DEMUXER)
}

impl FfmpegCapture {
    /// Opens camera `index` (`/dev/video<index>`, V4L2).
    pub fn open_device(index: u32) -> Result<Self, CaptureError> {
        let path = device_path(index);
        if let Err(e) = ffmpeg_next::init() {
            return Err(open_error(&path, e));
        }
        ffmpeg_next::device::register_all();

        let format = capture_input_format().ok_or_else(|| CaptureError::Open {
            target: path.display().to_string(),
            reason: "FFmpeg was built without the v4l2 capture input".into(),
        })?;
        log::debug!("Opening {} with the {} input", path.display(), format.name());

        let ictx = ffmpeg_next::format::open(&path, &format)
            .map_err(|e| open_error(&path, e))?
            .input();
        Self::from_input(&path, ictx)
    }

    /// Opens a video file; frames end with [`CaptureError::EndOfStream`].
    pub fn open_file(path: &Path) -> Result<Self, CaptureError> {
        if let Err(e) = ffmpeg_next::init() {
            return Err(open_error(path, e));
        }
        let ictx = ffmpeg_next::format::input(&path).map_err(|e| open_error(path, e))?;
        Self::from_input(path, ictx)
    }

    fn from_input(
        path: &Path,
        ictx: ffmpeg_next::format::context::Input,
    ) -> Result<Self, CaptureError> {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::Open {
                target: path.display().to_string(),
                reason: "no video stream found".into(),
            })?;
        let video_stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| open_error(path, e))?;
        let decoder = codec_ctx.decoder().video().map_err(|e| open_error(path, e))?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| open_error(path, e))?;

        log::info!("Opened {} ({width}x{height})", path.display());

        Ok(Self {
            target: path.display().to_string(),
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index,
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }

    fn try_receive(&mut self) -> Option<Result<Frame, CaptureError>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        self.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            return Some(Err(CaptureError::Decode {
                target: self.target.clone(),
                reason: e.to_string(),
            }));
        }

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index);
        self.frame_index += 1;
        Some(Ok(frame))
    }
}

impl FrameSource for FfmpegCapture {
    fn describe(&self) -> String {
        self.target.clone()
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        if self.done {
            return Err(CaptureError::EndOfStream);
        }
        if let Some(result) = self.try_receive() {
            return result;
        }
        if self.flushing {
            self.done = true;
            return Err(CaptureError::EndOfStream);
        }

        loop {
            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut self.ictx) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => {
                    if let Err(e) = self.decoder.send_eof() {
                        log::debug!("Decoder flush failed for {}: {e}", self.target);
                    }
                    self.flushing = true;
                    if let Some(result) = self.try_receive() {
                        return result;
                    }
                    self.done = true;
                    return Err(CaptureError::EndOfStream);
                }
                // Camera has no frame ready yet.
                Err(ffmpeg_next::Error::Other { errno })
                    if errno == ffmpeg_next::util::error::EAGAIN =>
                {
                    std::thread::sleep(std::time::Duration::from_millis(1));
                    continue;
                }
                Err(e) => {
                    return Err(CaptureError::Device {
                        target: self.target.clone(),
                        reason: e.to_string(),
                    })
                }
            }

            if packet.stream() != self.video_stream_index {
                continue;
            }
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable packet from {}: {e}", self.target);
                continue;
            }
            if let Some(result) = self.try_receive() {
                return result;
            }
        }
    }
}

fn open_error(path: &Path, e: ffmpeg_next::Error) -> CaptureError {
    CaptureError::Open {
        target: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Copies pixel data from an ffmpeg frame into a tightly packed RGB buffer,
/// dropping per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
