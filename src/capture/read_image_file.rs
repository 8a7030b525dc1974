// 该文件是 Panyan （攀岩） 项目的一部分。
// src/capture/read_image_file.rs - 以图像文件模拟相机
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

use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  capture::Capture,
  photo::{CapturedPhoto, PhotoStore, PhotoStoreError, Quality},
  url_file_path,
};

#[derive(Error, Debug)]
pub enum ImageFileCaptureError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Photo store error: {0}")]
  PhotoStoreError(#[from] PhotoStoreError),
  #[error("Invalid path encoding: {0}")]
  PathEncodingError(#[from] std::string::FromUtf8Error),
  #[error("No image file in directory: {0}")]
  EmptyDirectory(String),
}

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// 从磁盘读取静态图片作为"相机"
///
/// 路径为单个文件时每次都拍到同一张图；为目录时按文件名顺序轮流返回其中的图片。
pub struct ImageFileCapture {
  files: Vec<PathBuf>,
  cursor: usize,
  store: PhotoStore,
}

impl FromUrlWithScheme for ImageFileCapture {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileCapture {
  type Error = ImageFileCaptureError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileCaptureError::SchemaMismatch);
    }

    let path = url_file_path(url)?;
    let files = if path.is_dir() {
      list_images(&path)?
    } else {
      vec![path]
    };
    info!("图像文件相机: {} 张图片", files.len());

    Ok(ImageFileCapture {
      files,
      cursor: 0,
      store: PhotoStore::new()?,
    })
  }
}

fn list_images(directory: &Path) -> Result<Vec<PathBuf>, ImageFileCaptureError> {
  let mut files = Vec::new();
  for entry in std::fs::read_dir(directory)? {
    let path = entry?.path();
    let is_image = path
      .extension()
      .and_then(|ext| ext.to_str())
      .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
      .unwrap_or(false);
    if path.is_file() && is_image {
      files.push(path);
    }
  }

  if files.is_empty() {
    return Err(ImageFileCaptureError::EmptyDirectory(
      directory.display().to_string(),
    ));
  }
  files.sort();
  Ok(files)
}

impl ImageFileCapture {
  fn next_file(&mut self) -> &Path {
    let index = self.cursor % self.files.len();
    self.cursor = (index + 1) % self.files.len();
    &self.files[index]
  }
}

impl Capture for ImageFileCapture {
  type Error = ImageFileCaptureError;

  fn take_photo(&mut self, quality: Quality) -> Result<CapturedPhoto, Self::Error> {
    let source = self.next_file().to_path_buf();
    let image = ImageReader::open(&source)?
      .with_guessed_format()?
      .decode()?
      .to_rgb8();
    let photo = self.store.save_jpeg(&image, quality)?;
    info!(
      "读取 {} -> {}",
      source.display(),
      photo.temp_image_path.display()
    );
    Ok(photo)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  fn image_url(path: &Path) -> Url {
    Url::parse(&format!("image://{}", path.display())).unwrap()
  }

  fn write_image(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([90, 120, 30]))
      .save(path)
      .unwrap();
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("v4l:///dev/video0").unwrap();
    assert!(matches!(
      ImageFileCapture::from_url(&url),
      Err(ImageFileCaptureError::SchemaMismatch)
    ));
  }

  #[test]
  fn single_file_is_returned_every_time() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("wall.png");
    write_image(&source, 16, 12);

    let mut capture = ImageFileCapture::from_url(&image_url(&source)).unwrap();
    let first = capture.take_photo(Quality::High).unwrap();
    let second = capture.take_photo(Quality::Low).unwrap();

    assert_ne!(first.temp_image_path, second.temp_image_path);
    for photo in [first, second] {
      let decoded = image::open(&photo.temp_image_path).unwrap();
      assert_eq!((decoded.width(), decoded.height()), (16, 12));
    }
  }

  #[test]
  fn directory_is_cycled_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    write_image(&dir.path().join("b.png"), 4, 4);
    write_image(&dir.path().join("a.png"), 2, 2);
    std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

    let mut capture = ImageFileCapture::from_url(&image_url(dir.path())).unwrap();
    let widths: Vec<u32> = (0..3)
      .map(|_| {
        let photo = capture.take_photo(Quality::Normal).unwrap();
        image::open(&photo.temp_image_path).unwrap().width()
      })
      .collect();

    assert_eq!(widths, vec![2, 4, 2]);
  }

  #[test]
  fn path_with_space_and_chinese_is_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let photos = dir.path().join("岩壁 photos");
    std::fs::create_dir(&photos).unwrap();
    let source = photos.join("wall.png");
    write_image(&source, 8, 6);

    let mut capture = ImageFileCapture::from_url(&image_url(&source)).unwrap();
    let photo = capture.take_photo(Quality::High).unwrap();
    let decoded = image::open(&photo.temp_image_path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (8, 6));

    let mut capture = ImageFileCapture::from_url(&image_url(&photos)).unwrap();
    assert!(capture.take_photo(Quality::Low).is_ok());
  }

  #[test]
  fn empty_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
      ImageFileCapture::from_url(&image_url(dir.path())),
      Err(ImageFileCaptureError::EmptyDirectory(_))
    ));
  }

  #[test]
  fn missing_file_fails_on_capture() {
    let dir = tempfile::tempdir().unwrap();
    let mut capture = ImageFileCapture::from_url(&image_url(&dir.path().join("gone.jpg"))).unwrap();
    assert!(matches!(
      capture.take_photo(Quality::High),
      Err(ImageFileCaptureError::IoError(_))
    ));
  }
}
