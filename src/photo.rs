// 该文件是 Panyan （攀岩） 项目的一部分。
// src/photo.rs - 照片定义与临时照片存储
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

use std::{
  fs::File,
  io::{BufWriter, Write},
  path::{Path, PathBuf},
  str::FromStr,
  sync::atomic::{AtomicU16, Ordering},
};

use chrono::Utc;
use image::{RgbImage, codecs::jpeg::JpegEncoder};
use tempfile::TempDir;
use thiserror::Error;
use tracing::info;

/// 拍照质量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Quality {
  #[default]
  High,
  Normal,
  Low,
}

impl Quality {
  /// 对应的 JPEG 编码质量 (1 - 100)
  pub fn jpeg_quality(self) -> u8 {
    match self {
      Quality::High => 95,
      Quality::Normal => 80,
      Quality::Low => 60,
    }
  }
}

impl FromStr for Quality {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "high" => Ok(Quality::High),
      "normal" => Ok(Quality::Normal),
      "low" => Ok(Quality::Low),
      other => Err(format!("未知的拍照质量: {}", other)),
    }
  }
}

impl std::fmt::Display for Quality {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Quality::High => "high",
      Quality::Normal => "normal",
      Quality::Low => "low",
    };
    f.write_str(s)
  }
}

/// 一次拍照的结果，指向本地临时图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPhoto {
  pub temp_image_path: PathBuf,
}

impl CapturedPhoto {
  pub fn new(temp_image_path: impl Into<PathBuf>) -> Self {
    Self {
      temp_image_path: temp_image_path.into(),
    }
  }
}

#[derive(Error, Debug)]
pub enum PhotoStoreError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像编码错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 临时照片存储
///
/// 持有一个临时目录，拍到的照片都以 JPEG 写入其中；存储被丢弃时目录随之删除。
pub struct PhotoStore {
  directory: TempDir,
  counter: AtomicU16,
}

impl PhotoStore {
  pub fn new() -> Result<Self, PhotoStoreError> {
    let directory = tempfile::Builder::new().prefix("panyan-").tempdir()?;
    info!("临时照片目录: {}", directory.path().display());
    Ok(PhotoStore {
      directory,
      counter: AtomicU16::new(0),
    })
  }

  pub fn directory(&self) -> &Path {
    self.directory.path()
  }

  fn photo_id(&self) -> u16 {
    self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  /// 生成下一张照片的路径，形如 `HH-MM-SS-XXXX.jpg`
  pub fn next_path(&self) -> PathBuf {
    let now = Utc::now();
    self.directory.path().join(format!(
      "{}-{:04X}.jpg",
      now.format("%H-%M-%S"),
      self.photo_id()
    ))
  }

  /// 按拍照质量编码为 JPEG 并写入存储
  pub fn save_jpeg(
    &self,
    image: &RgbImage,
    quality: Quality,
  ) -> Result<CapturedPhoto, PhotoStoreError> {
    let path = self.next_path();
    let mut writer = BufWriter::new(File::create(&path)?);
    JpegEncoder::new_with_quality(&mut writer, quality.jpeg_quality()).encode_image(image)?;
    writer.flush()?;
    Ok(CapturedPhoto::new(path))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quality_parses_known_levels() {
    assert_eq!("high".parse::<Quality>(), Ok(Quality::High));
    assert_eq!("normal".parse::<Quality>(), Ok(Quality::Normal));
    assert_eq!("low".parse::<Quality>(), Ok(Quality::Low));
    assert!("ultra".parse::<Quality>().is_err());
    assert_eq!(Quality::default(), Quality::High);
    assert_eq!(Quality::High.to_string(), "high");
  }

  #[test]
  fn higher_quality_means_higher_jpeg_quality() {
    assert!(Quality::High.jpeg_quality() > Quality::Normal.jpeg_quality());
    assert!(Quality::Normal.jpeg_quality() > Quality::Low.jpeg_quality());
  }

  #[test]
  fn store_paths_are_unique() {
    let store = PhotoStore::new().unwrap();
    let a = store.next_path();
    let b = store.next_path();
    assert_ne!(a, b);
    assert!(a.starts_with(store.directory()));
    assert_eq!(a.extension().and_then(|e| e.to_str()), Some("jpg"));
  }

  #[test]
  fn saved_photo_is_a_decodable_jpeg() {
    let store = PhotoStore::new().unwrap();
    let image = RgbImage::from_pixel(32, 24, image::Rgb([200, 40, 10]));
    let photo = store.save_jpeg(&image, Quality::High).unwrap();

    let decoded = image::open(&photo.temp_image_path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (32, 24));
    assert_eq!(
      image::ImageFormat::from_path(&photo.temp_image_path).unwrap(),
      image::ImageFormat::Jpeg
    );
  }

  #[test]
  fn store_directory_is_removed_on_drop() {
    let store = PhotoStore::new().unwrap();
    let dir = store.directory().to_path_buf();
    assert!(dir.exists());
    drop(store);
    assert!(!dir.exists());
  }
}
