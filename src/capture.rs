// 该文件是 Panyan （攀岩） 项目的一部分。
// src/capture.rs - 拍照来源
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

use thiserror::Error;

use crate::{
  FromUrl,
  photo::{CapturedPhoto, Quality},
};

/// 相机：每次调用拍摄一张静态照片，返回本地临时图片路径
pub trait Capture {
  type Error;
  fn take_photo(&mut self, quality: Quality) -> Result<CapturedPhoto, Self::Error>;
}

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileCapture, ImageFileCaptureError};

#[cfg(feature = "v4l_capture")]
mod v4l_capture;
#[cfg(feature = "v4l_capture")]
pub use self::v4l_capture::{V4lCapture, V4lCaptureError};

#[cfg(feature = "gstreamer_capture")]
mod gstreamer_capture;
#[cfg(feature = "gstreamer_capture")]
pub use self::gstreamer_capture::{
  GStreamerCapture, GStreamerCaptureError, GStreamerCapturePipelineBuilder,
};

#[derive(Error, Debug)]
pub enum CaptureError {
  #[cfg(feature = "read_image_file")]
  #[error("Image file capture error: {0}")]
  ImageFileCaptureError(#[from] ImageFileCaptureError),
  #[cfg(feature = "v4l_capture")]
  #[error("V4L capture error: {0}")]
  V4lCaptureError(#[from] V4lCaptureError),
  #[cfg(feature = "gstreamer_capture")]
  #[error("GStreamer capture error: {0}")]
  GStreamerCaptureError(#[from] GStreamerCaptureError),
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
}

pub enum CaptureWrapper {
  #[cfg(feature = "read_image_file")]
  ImageFile(ImageFileCapture),
  #[cfg(feature = "v4l_capture")]
  V4l(V4lCapture),
  #[cfg(feature = "gstreamer_capture")]
  GStreamer(GStreamerCapture),
}

impl FromUrl for CaptureWrapper {
  type Error = CaptureError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileCapture::SCHEME {
        let capture = ImageFileCapture::from_url(url)?;
        return Ok(CaptureWrapper::ImageFile(capture));
      }
    }
    #[cfg(feature = "v4l_capture")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == V4lCapture::SCHEME {
        let capture = V4lCapture::from_url(url)?;
        return Ok(CaptureWrapper::V4l(capture));
      }
    }
    #[cfg(feature = "gstreamer_capture")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == GStreamerCapturePipelineBuilder::SCHEME {
        let capture = GStreamerCapturePipelineBuilder::from_url(url)?.build()?;
        return Ok(CaptureWrapper::GStreamer(capture));
      }
    }
    Err(CaptureError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl Capture for CaptureWrapper {
  type Error = CaptureError;

  fn take_photo(&mut self, quality: Quality) -> Result<CapturedPhoto, Self::Error> {
    match self {
      #[cfg(feature = "read_image_file")]
      CaptureWrapper::ImageFile(capture) => capture.take_photo(quality).map_err(CaptureError::from),
      #[cfg(feature = "v4l_capture")]
      CaptureWrapper::V4l(capture) => capture.take_photo(quality).map_err(CaptureError::from),
      #[cfg(feature = "gstreamer_capture")]
      CaptureWrapper::GStreamer(capture) => capture.take_photo(quality).map_err(CaptureError::from),
    }
  }
}
