// 该文件是 Panyan （攀岩） 项目的一部分。
// src/capture/gstreamer_capture.rs - GStreamer 相机拍照
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

//! # GStreamer 相机
//!
//! 管道一直处于播放状态（相当于相机预览），每次拍照从 appsink 取最新的一帧，
//! 转成 RGB 后按拍照质量编码为 JPEG。
//!
//! 支持的 URL：
//! - `gst://camera/dev/video0?width=1280&height=720&fps=15&rotate=90`
//! - `gst://test?width=640&height=480` 使用 `videotestsrc`，不需要真实摄像头
//!
//! ## 系统依赖
//!
//! **Ubuntu/Debian:**
//! ```bash
//! sudo apt-get install libgstreamer1.0-dev libgstreamer-plugins-base1.0-dev
//! ```

use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use image::RgbImage;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  capture::Capture,
  photo::{CapturedPhoto, PhotoStore, PhotoStoreError, Quality},
  query_param, query_value, url_file_path,
};

/// GStreamer 拍照错误类型
#[derive(Error, Debug)]
pub enum GStreamerCaptureError {
  /// URI scheme 不匹配（期望 "gst://"）
  #[error("URI scheme mismatch")]
  SchemeMismatch,
  /// GStreamer 库错误
  #[error("GStreamer error: {0}")]
  GStreamerError(#[from] gst::glib::Error),
  /// GStreamer 布尔操作错误
  #[error("GStreamer boolean error: {0}")]
  GStreamerBoolError(#[from] gst::glib::BoolError),
  /// 状态改变错误
  #[error("State change error: {0}")]
  StateChangeError(#[from] gst::StateChangeError),
  #[error("Failed to get appsink element")]
  AppSinkNotFound,
  #[error("Failed to convert element to appsink")]
  AppSinkConversionFailed,
  #[error("Failed to get video info from caps")]
  VideoInfoError,
  #[error("Unsupported video format")]
  UnsupportedFormat,
  #[error("Pipeline error: {0}")]
  PipelineError(String),
  #[error("Buffer size mismatch: expected {expected} bytes, got {actual} bytes")]
  BufferSizeMismatch { expected: usize, actual: usize },
  #[error("Photo store error: {0}")]
  PhotoStoreError(#[from] PhotoStoreError),
  #[error("Invalid path encoding: {0}")]
  PathEncodingError(#[from] std::string::FromUtf8Error),
}

pub enum GStreamerCaptureBuilderItem {
  CameraSource {
    camera: String,
    width: Option<u32>,
    height: Option<u32>,
    fps: u32,
  },
  TestSource,
  TargetFormat {
    width: Option<u32>,
    height: Option<u32>,
  },
  VideoFlip {
    method: u32,
  },
}

impl GStreamerCaptureBuilderItem {
  fn to_pipeline(&self) -> String {
    match self {
      GStreamerCaptureBuilderItem::CameraSource {
        camera,
        width,
        height,
        fps,
      } => {
        let mut caps = format!("video/x-raw,framerate={}/1", fps);
        if let Some(width) = width {
          caps.push_str(&format!(",width={}", width));
        }
        if let Some(height) = height {
          caps.push_str(&format!(",height={}", height));
        }
        format!("v4l2src device=\"{}\" ! {}", camera, caps)
      }
      GStreamerCaptureBuilderItem::TestSource => "videotestsrc is-live=true".to_string(),
      GStreamerCaptureBuilderItem::TargetFormat { width, height } => {
        let mut caps = "video/x-raw,format=RGB".to_string();
        if let Some(width) = width {
          caps.push_str(&format!(",width={}", width));
        }
        if let Some(height) = height {
          caps.push_str(&format!(",height={}", height));
        }
        format!("videoconvert ! videoscale ! {}", caps)
      }
      GStreamerCaptureBuilderItem::VideoFlip { method } => {
        format!("videoflip method={}", method)
      }
    }
  }
}

/// GStreamer 拍照管道构建器
pub struct GStreamerCapturePipelineBuilder {
  items: Vec<GStreamerCaptureBuilderItem>,
}

impl GStreamerCapturePipelineBuilder {
  fn build_camera_pipeline(url: &Url) -> Result<Self, GStreamerCaptureError> {
    let mut items = vec![
      GStreamerCaptureBuilderItem::CameraSource {
        camera: url_file_path(url)?.display().to_string(),
        width: query_value(url, "width"),
        height: query_value(url, "height"),
        fps: query_value(url, "fps").unwrap_or(15),
      },
      GStreamerCaptureBuilderItem::TargetFormat {
        width: None,
        height: None,
      },
    ];
    if let Some(video_flip) = Self::video_flip(query_param(url, "rotate").as_deref()) {
      items.push(video_flip);
    }
    Ok(GStreamerCapturePipelineBuilder { items })
  }

  fn build_test_pipeline(url: &Url) -> Self {
    let items = vec![
      GStreamerCaptureBuilderItem::TestSource,
      GStreamerCaptureBuilderItem::TargetFormat {
        width: query_value(url, "width"),
        height: query_value(url, "height"),
      },
    ];
    GStreamerCapturePipelineBuilder { items }
  }

  fn video_flip(rotate: Option<&str>) -> Option<GStreamerCaptureBuilderItem> {
    let method = match rotate? {
      "90" => 1,
      "180" => 2,
      "270" => 3,
      _ => return None,
    };
    Some(GStreamerCaptureBuilderItem::VideoFlip { method })
  }

  pub fn pipeline_description(&self) -> String {
    let basic_pipeline = self
      .items
      .iter()
      .map(GStreamerCaptureBuilderItem::to_pipeline)
      .collect::<Vec<String>>()
      .join(" ! ");
    format!(
      "{} ! appsink max-buffers=1 drop=true sync=false name=sink",
      basic_pipeline
    )
  }

  pub fn build(self) -> Result<GStreamerCapture, GStreamerCaptureError> {
    gst::init()?;

    let full_pipeline = self.pipeline_description();
    info!("GStreamer pipeline description: {}", full_pipeline);

    let pipeline = gst::parse::launch(&full_pipeline)?
      .downcast::<gst::Pipeline>()
      .map_err(|_| GStreamerCaptureError::PipelineError("Failed to create pipeline".to_string()))?;

    let appsink = pipeline
      .by_name("sink")
      .ok_or(GStreamerCaptureError::AppSinkNotFound)?
      .downcast::<gst_app::AppSink>()
      .map_err(|_| GStreamerCaptureError::AppSinkConversionFailed)?;

    pipeline.set_state(gst::State::Playing)?;

    Ok(GStreamerCapture {
      pipeline,
      appsink,
      store: PhotoStore::new()?,
    })
  }
}

impl FromUrlWithScheme for GStreamerCapturePipelineBuilder {
  const SCHEME: &'static str = "gst";
}

impl FromUrl for GStreamerCapturePipelineBuilder {
  type Error = GStreamerCaptureError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(GStreamerCaptureError::SchemeMismatch);
    }

    match url.host_str() {
      Some("camera") => Self::build_camera_pipeline(url),
      Some("test") => Ok(Self::build_test_pipeline(url)),
      _ => Err(GStreamerCaptureError::SchemeMismatch),
    }
  }
}

/// GStreamer 相机
pub struct GStreamerCapture {
  pipeline: gst::Pipeline,
  appsink: gst_app::AppSink,
  store: PhotoStore,
}

impl Drop for GStreamerCapture {
  fn drop(&mut self) {
    if let Err(e) = self.pipeline.set_state(gst::State::Null) {
      warn!("Failed to stop GStreamer pipeline: {}", e);
    }
  }
}

impl Capture for GStreamerCapture {
  type Error = GStreamerCaptureError;

  fn take_photo(&mut self, quality: Quality) -> Result<CapturedPhoto, Self::Error> {
    let sample = self
      .appsink
      .pull_sample()
      .map_err(|e| GStreamerCaptureError::PipelineError(format!("Failed to pull sample: {}", e)))?;
    let image = convert_sample_to_rgb(&sample)?;
    let photo = self.store.save_jpeg(&image, quality)?;
    info!("GStreamer 拍照完成: {}", photo.temp_image_path.display());
    Ok(photo)
  }
}

fn convert_sample_to_rgb(sample: &gst::Sample) -> Result<RgbImage, GStreamerCaptureError> {
  let buffer = sample
    .buffer()
    .ok_or_else(|| GStreamerCaptureError::PipelineError("No buffer in sample".to_string()))?;
  let caps = sample
    .caps()
    .ok_or_else(|| GStreamerCaptureError::PipelineError("No caps in sample".to_string()))?;

  let video_info =
    gst_video::VideoInfo::from_caps(caps).map_err(|_| GStreamerCaptureError::VideoInfoError)?;
  if video_info.format() != gst_video::VideoFormat::Rgb {
    return Err(GStreamerCaptureError::UnsupportedFormat);
  }

  let width = video_info.width() as usize;
  let height = video_info.height() as usize;
  let stride = video_info.stride()[0] as usize;

  let map = buffer.map_readable().map_err(|e| {
    GStreamerCaptureError::PipelineError(format!("Failed to map buffer for reading: {}", e))
  })?;
  let data = map.as_slice();

  // 每行可能有对齐填充
  let expected = stride * height.saturating_sub(1) + width * 3;
  if data.len() < expected {
    return Err(GStreamerCaptureError::BufferSizeMismatch {
      expected,
      actual: data.len(),
    });
  }

  let mut pixels = Vec::with_capacity(width * height * 3);
  for row in 0..height {
    let start = row * stride;
    pixels.extend_from_slice(&data[start..start + width * 3]);
  }

  RgbImage::from_raw(width as u32, height as u32, pixels).ok_or(
    GStreamerCaptureError::BufferSizeMismatch {
      expected: width * height * 3,
      actual: data.len(),
    },
  )
}
