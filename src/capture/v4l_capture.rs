// 该文件是 Panyan （攀岩） 项目的一部分。
// src/capture/v4l_capture.rs - V4L 相机拍照
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::ImageFormat;
use thiserror::Error;
use tracing::{error, info};
use url::Url;
use v4l::{
  FourCC,
  buffer::Type,
  io::{mmap::Stream, traits::CaptureStream},
  video::Capture as _,
};

use crate::{
  FromUrl, FromUrlWithScheme,
  capture::Capture,
  photo::{CapturedPhoto, PhotoStore, PhotoStoreError, Quality},
  query_value, url_file_path,
};

#[derive(Error, Debug)]
pub enum V4lCaptureError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Invalid path encoding: {0}")]
  PathEncodingError(#[from] std::string::FromUtf8Error),
  #[error("Unsupported pixel format: {0}")]
  UnsupportedPixelFormat(String),
  #[error("Frame decoding error: {0}")]
  DecodeError(#[from] image::ImageError),
  #[error("Photo store error: {0}")]
  PhotoStoreError(#[from] PhotoStoreError),
}

const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;
const DEFAULT_WARMUP: usize = 3;
const STREAM_BUFFERS: u32 = 4;

/// V4L2 摄像头
///
/// URL 形如 `v4l:///dev/video0?width=1280&height=720&warmup=3`，
/// 以 MJPEG 采集，每次拍照先丢弃 `warmup` 帧等待曝光稳定。
pub struct V4lCapture {
  device: v4l::Device,
  device_path: String,
  warmup: usize,
  store: PhotoStore,
}

impl FromUrlWithScheme for V4lCapture {
  const SCHEME: &'static str = "v4l";
}

impl FromUrl for V4lCapture {
  type Error = V4lCaptureError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(V4lCaptureError::SchemaMismatch);
    }

    let device_path = device_path(url)?;
    let width = query_value(url, "width").unwrap_or(DEFAULT_WIDTH);
    let height = query_value(url, "height").unwrap_or(DEFAULT_HEIGHT);
    let warmup = query_value(url, "warmup").unwrap_or(DEFAULT_WARMUP);

    let device = v4l::Device::with_path(&device_path)?;

    let mut format = device.format()?;
    format.width = width;
    format.height = height;
    format.fourcc = FourCC::new(b"MJPG");
    let format = device.set_format(&format)?;

    if format.fourcc != FourCC::new(b"MJPG") {
      return Err(V4lCaptureError::UnsupportedPixelFormat(
        format.fourcc.to_string(),
      ));
    }
    info!(
      "V4L 设备 {} 已打开: {}x{} {}",
      device_path, format.width, format.height, format.fourcc
    );

    Ok(V4lCapture {
      device,
      device_path,
      warmup,
      store: PhotoStore::new()?,
    })
  }
}

/// v4l:///dev/video0 或 v4l://localhost/dev/video0，路径为空时使用默认设备
fn device_path(url: &Url) -> Result<String, V4lCaptureError> {
  if url.path().is_empty() || url.path() == "/" {
    Ok(DEFAULT_DEVICE.to_string())
  } else {
    Ok(url_file_path(url)?.display().to_string())
  }
}

impl V4lCapture {
  fn capture_frame(&mut self) -> Result<Vec<u8>, V4lCaptureError> {
    let mut stream = Stream::with_buffers(&mut self.device, Type::VideoCapture, STREAM_BUFFERS)?;

    for _ in 0..self.warmup {
      stream.next()?;
    }

    let (buf, meta) = stream.next()?;
    let used = (meta.bytesused as usize).min(buf.len());
    Ok(buf[..used].to_vec())
  }
}

impl Capture for V4lCapture {
  type Error = V4lCaptureError;

  fn take_photo(&mut self, quality: Quality) -> Result<CapturedPhoto, Self::Error> {
    let data = self.capture_frame()?;
    let image = image::load_from_memory_with_format(&data, ImageFormat::Jpeg)?.to_rgb8();
    let photo = self.store.save_jpeg(&image, quality)?;
    info!(
      "{} 拍照完成: {}",
      self.device_path,
      photo.temp_image_path.display()
    );
    Ok(photo)
  }
}
