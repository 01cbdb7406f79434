// OpenCV glue: decoding clips, encoding annotated copies, and moving pixels
// between BGR `Mat`s and `image` buffers for the detector and the annotator.

use anyhow::{Context, Result, anyhow, bail};
use image::{GrayImage, RgbImage};
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use std::path::Path;
use stride_lines::VideoInfo;

/// An open clip. The capture is released when this is dropped.
pub struct VideoSource {
    cap: VideoCapture,
    info: VideoInfo,
}

impl VideoSource {
    pub fn open(path: &Path) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("non UTF-8 path: {}", path.display()))?;
        let cap = VideoCapture::from_file(path_str, videoio::CAP_ANY)
            .with_context(|| format!("failed to open {}", path.display()))?;
        if !cap.is_opened()? {
            bail!("cannot read video {}", path.display());
        }

        let info = VideoInfo {
            width: cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32,
            height: cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32,
            fps: cap.get(videoio::CAP_PROP_FPS)?,
            total_frames: cap.get(videoio::CAP_PROP_FRAME_COUNT)?.max(0.0) as u64,
        };
        Ok(Self { cap, info })
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    /// Next frame as BGR, or `None` at the end of the stream.
    pub fn read(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.cap.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    /// Frame `index` as BGR, or `None` if the decoder cannot reach it.
    pub fn read_at(&mut self, index: u64) -> Result<Option<Mat>> {
        self.cap.set(videoio::CAP_PROP_POS_FRAMES, index as f64)?;
        self.read()
    }
}

/// Writer for an annotated copy with the same size and frame rate as its source.
pub struct VideoSink {
    writer: VideoWriter,
}

impl VideoSink {
    pub fn create(path: &Path, info: &VideoInfo) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("non UTF-8 path: {}", path.display()))?;
        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let writer = VideoWriter::new(
            path_str,
            fourcc,
            info.fps,
            core::Size::new(info.width as i32, info.height as i32),
            true,
        )
        .with_context(|| format!("failed to create {}", path.display()))?;
        if !writer.is_opened()? {
            bail!("cannot write video {}", path.display());
        }
        Ok(Self { writer })
    }

    pub fn write(&mut self, frame: &Mat) -> Result<()> {
        self.writer.write(frame)?;
        Ok(())
    }
}

pub fn to_gray_image(bgr: &Mat) -> Result<GrayImage> {
    let mut gray = Mat::default();
    imgproc::cvt_color(bgr, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;
    let (width, height) = (gray.cols() as u32, gray.rows() as u32);
    GrayImage::from_raw(width, height, gray.data_bytes()?.to_vec())
        .ok_or_else(|| anyhow!("unexpected grayscale buffer size for {width}x{height}"))
}

pub fn to_rgb_image(bgr: &Mat) -> Result<RgbImage> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    RgbImage::from_raw(width, height, rgb.data_bytes()?.to_vec())
        .ok_or_else(|| anyhow!("unexpected RGB buffer size for {width}x{height}"))
}

pub fn to_bgr_mat(image: &RgbImage) -> Result<Mat> {
    let rgb = Mat::from_slice(image.as_raw())?
        .reshape(3, image.height() as i32)?
        .try_clone()?;
    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}
