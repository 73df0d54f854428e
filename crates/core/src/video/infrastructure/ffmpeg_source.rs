use ffmpeg_next::format::context::{Context, Input};
use ffmpeg_next::software::scaling;
use ffmpeg_next::Dictionary;

use crate::shared::frame::Frame;
use crate::shared::stream_info::StreamInfo;
use crate::video::domain::camera_source::CameraSource;
use crate::video::domain::frame_source::{CaptureHints, FrameSource};

/// ffmpeg input device used for numeric camera indices.
const DEVICE_INPUT_FORMAT: &str = "v4l2";

/// Decodes camera, file or network streams via ffmpeg-next.
///
/// Numeric sources open `/dev/video<N>` through the v4l2 input device;
/// everything else is handed to libavformat as a path or URL. Each decoded
/// picture is converted to RGB24.
pub struct FfmpegSource {
    stream: Option<OpenStream>,
    next_index: usize,
}

// Safety: FfmpegSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegSource {}

struct OpenStream {
    input: Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    flushing: bool,
    done: bool,
}

impl FfmpegSource {
    pub fn new() -> Self {
        Self {
            stream: None,
            next_index: 0,
        }
    }
}

impl Default for FfmpegSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for FfmpegSource {
    fn open(
        &mut self,
        source: &CameraSource,
        hints: CaptureHints,
    ) -> Result<StreamInfo, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        self.close();

        let options = capture_options(hints);
        let input = match source {
            CameraSource::Device(index) => open_device(*index, options)?,
            CameraSource::Location(location) => {
                ffmpeg_next::format::input_with_dictionary(location, options)?
            }
        };

        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(format!("{source} reports an empty {width}x{height} picture").into());
        }
        if let (Some(w), Some(h)) = (hints.width, hints.height) {
            if (w, h) != (width, height) {
                log::warn!("Requested {w}x{h} from {source}, got {width}x{height}");
            }
        }

        let info = StreamInfo {
            width,
            height,
            fps,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source: source.to_string(),
        };

        let scaler = scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;

        self.stream = Some(OpenStream {
            input,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            flushing: false,
            done: false,
        });
        self.next_index = 0;

        Ok(info)
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let stream = self.stream.as_mut().ok_or("FfmpegSource: not opened")?;
        let Some(pixels) = stream.next_picture()? else {
            return Ok(None);
        };
        let frame = Frame::new(pixels, stream.width, stream.height, 3, self.next_index);
        self.next_index += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        self.stream = None;
    }
}

impl OpenStream {
    /// Decodes one picture, pulling packets until the decoder yields or the
    /// input runs dry.
    fn next_picture(&mut self) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error>> {
        if self.done {
            return Ok(None);
        }

        if let Some(pixels) = self.try_receive()? {
            return Ok(Some(pixels));
        }
        if self.flushing {
            self.done = true;
            return Ok(None);
        }

        loop {
            let Some((stream, packet)) = self.input.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(pixels) = self.try_receive()? {
                    return Ok(Some(pixels));
                }
                self.done = true;
                return Ok(None);
            };

            if stream.index() != self.stream_index {
                continue;
            }
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
                continue;
            }
            if let Some(pixels) = self.try_receive()? {
                return Ok(Some(pixels));
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb)?;
        Ok(Some(extract_rgb_pixels(&rgb, self.width, self.height)))
    }
}

fn capture_options(hints: CaptureHints) -> Dictionary<'static> {
    let mut options = Dictionary::new();
    if let Some(size) = video_size(hints) {
        options.set("video_size", &size);
    } else if let Some(given) = one_sided_dimension(hints) {
        log::warn!("camera.{given} ignored: ffmpeg's video_size needs both width and height");
    }
    options
}

/// Names the single dimension hint that cannot be applied on its own.
fn one_sided_dimension(hints: CaptureHints) -> Option<&'static str> {
    match (hints.width, hints.height) {
        (Some(_), None) => Some("width"),
        (None, Some(_)) => Some("height"),
        _ => None,
    }
}

/// `WxH` for ffmpeg's `video_size` option, when both dimensions are given.
fn video_size(hints: CaptureHints) -> Option<String> {
    match (hints.width, hints.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some(format!("{w}x{h}")),
        _ => None,
    }
}

fn device_path(index: u32) -> String {
    format!("/dev/video{index}")
}

fn open_device(index: u32, options: Dictionary) -> Result<Input, Box<dyn std::error::Error>> {
    ffmpeg_next::device::register_all();
    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == DEVICE_INPUT_FORMAT)
        .ok_or("this ffmpeg build has no v4l2 input device; use a file path or URL source")?;

    let path = device_path(index);
    log::debug!("Opening {path} via {DEVICE_INPUT_FORMAT}");
    match ffmpeg_next::format::open_with(
        &path,
        &ffmpeg_next::format::format::Format::Input(format),
        options,
    )? {
        Context::Input(input) => Ok(input),
        Context::Output(_) => Err(format!("{path} opened as an output").into()),
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping the per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
