// 该文件是 Panyan （攀岩） 项目的一部分。
// src/render/directory_record.rs - 目录记录显示
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
  path::{Path, PathBuf},
  sync::{
    Mutex,
    atomic::{AtomicU16, Ordering},
  },
};

use chrono::{Datelike, Utc};
use reqwest::blocking::Client;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, page::PageData, query_param, render::Render, url_file_path};

#[derive(Error, Debug)]
pub enum DirectoryRecordRenderError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无效的路径编码: {0}")]
  PathEncodingError(#[from] std::string::FromUtf8Error),
  #[error("下载识别结果失败: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("无效的识别结果地址: {0}")]
  UrlError(#[from] url::ParseError),
  #[error("不支持的识别结果地址: {0}")]
  UnsupportedReference(String),
}

/// 识别结果图片的来源
#[derive(Debug, Clone, PartialEq, Eq)]
enum ResultSource {
  Remote(Url),
  Local(PathBuf),
}

/// 把每次拍到的照片和识别结果图片按日期保存到目录中
///
/// URL 形如 `folder:///data/records?base=http://localhost:5000/`，
/// `base` 用于解析识别服务返回的相对地址。同一个值只保存一次。
pub struct DirectoryRecordRender {
  directory: PathBuf,
  base: Option<Url>,
  client: Client,
  shown: Mutex<PageData>,
  counter: AtomicU16,
}

impl FromUrlWithScheme for DirectoryRecordRender {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordRender {
  type Error = DirectoryRecordRenderError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordRenderError::SchemeMismatch);
    }

    let base = query_param(uri, "base")
      .map(|v| Url::parse(&v))
      .transpose()?;

    Ok(DirectoryRecordRender {
      directory: url_file_path(uri)?,
      base,
      client: Client::new(),
      shown: Mutex::new(PageData::default()),
      counter: AtomicU16::new(0),
    })
  }
}

impl DirectoryRecordRender {
  fn record_id(&self) -> u16 {
    self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn record_path(
    &self,
    suffix: &str,
    extension: &str,
  ) -> Result<PathBuf, DirectoryRecordRenderError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}-{}.{}",
      now.format("%H-%M-%S"),
      self.record_id(),
      suffix,
      extension
    )))
  }

  fn resolve(&self, reference: &str) -> Result<ResultSource, DirectoryRecordRenderError> {
    match Url::parse(reference) {
      Ok(url) => match url.scheme() {
        "http" | "https" => Ok(ResultSource::Remote(url)),
        "file" => url
          .to_file_path()
          .map(ResultSource::Local)
          .map_err(|_| DirectoryRecordRenderError::UnsupportedReference(reference.to_string())),
        _ => Err(DirectoryRecordRenderError::UnsupportedReference(
          reference.to_string(),
        )),
      },
      Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base {
        Some(base) => Ok(ResultSource::Remote(base.join(reference)?)),
        None => Ok(ResultSource::Local(PathBuf::from(reference))),
      },
      Err(e) => Err(e.into()),
    }
  }

  fn save_photo(&self, photo: &Path) -> Result<PathBuf, DirectoryRecordRenderError> {
    let path = self.record_path("photo", "jpg")?;
    std::fs::copy(photo, &path)?;
    Ok(path)
  }

  fn save_result(&self, reference: &str) -> Result<PathBuf, DirectoryRecordRenderError> {
    let source = self.resolve(reference)?;
    let extension = match &source {
      ResultSource::Remote(url) => extension_of(Path::new(url.path())),
      ResultSource::Local(path) => extension_of(path),
    };
    let path = self.record_path("result", &extension)?;

    match source {
      ResultSource::Remote(url) => {
        let body = self.client.get(url).send()?.error_for_status()?.bytes()?;
        std::fs::write(&path, &body)?;
      }
      ResultSource::Local(local) => {
        std::fs::copy(local, &path)?;
      }
    }
    Ok(path)
  }
}

fn extension_of(path: &Path) -> String {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .filter(|ext| !ext.is_empty())
    .unwrap_or("jpg")
    .to_ascii_lowercase()
}

impl Render for DirectoryRecordRender {
  type Error = DirectoryRecordRenderError;

  fn render_page(&self, data: &PageData) -> Result<(), Self::Error> {
    let mut shown = self.shown.lock().unwrap_or_else(|e| e.into_inner());

    if data.photo_url != shown.photo_url {
      if let Some(photo) = &data.photo_url {
        let path = self.save_photo(photo)?;
        info!("保存照片: {}", path.display());
      }
      shown.photo_url = data.photo_url.clone();
    }

    if data.result_url != shown.result_url {
      if let Some(reference) = &data.result_url {
        let path = self.save_result(reference)?;
        info!("保存识别结果: {} -> {}", reference, path.display());
      }
      shown.result_url = data.result_url.clone();
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn folder_url(path: &Path, query: &str) -> Url {
    Url::parse(&format!("folder://{}{}", path.display(), query)).unwrap()
  }

  fn saved_files(root: &Path) -> Vec<PathBuf> {
    fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
      for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
          walk(&path, out);
        } else {
          out.push(path);
        }
      }
    }
    let mut out = Vec::new();
    if root.exists() {
      walk(root, &mut out);
    }
    out.sort();
    out
  }

  #[test]
  fn relative_reference_uses_base() {
    let url = Url::parse("folder:///tmp/records?base=http://localhost:5000/").unwrap();
    let render = DirectoryRecordRender::from_url(&url).unwrap();
    assert_eq!(
      render.resolve("static/result.jpg").unwrap(),
      ResultSource::Remote(Url::parse("http://localhost:5000/static/result.jpg").unwrap())
    );
    assert_eq!(
      render.resolve("https://host/out1.jpg").unwrap(),
      ResultSource::Remote(Url::parse("https://host/out1.jpg").unwrap())
    );
  }

  #[test]
  fn relative_reference_without_base_is_local() {
    let url = Url::parse("folder:///tmp/records").unwrap();
    let render = DirectoryRecordRender::from_url(&url).unwrap();
    assert_eq!(
      render.resolve("static/result.jpg").unwrap(),
      ResultSource::Local(PathBuf::from("static/result.jpg"))
    );
    assert!(matches!(
      render.resolve("ftp://host/out.jpg"),
      Err(DirectoryRecordRenderError::UnsupportedReference(_))
    ));
  }

  #[test]
  fn changed_values_are_saved_once() {
    let records = tempfile::tempdir().unwrap();
    let inputs = tempfile::tempdir().unwrap();
    let photo = inputs.path().join("photo.jpg");
    let result = inputs.path().join("result.png");
    std::fs::write(&photo, b"photo-bytes").unwrap();
    std::fs::write(&result, b"result-bytes").unwrap();

    let render = DirectoryRecordRender::from_url(&folder_url(records.path(), "")).unwrap();

    let mut data = PageData {
      photo_url: Some(photo.clone()),
      result_url: None,
    };
    render.render_page(&data).unwrap();
    assert_eq!(saved_files(records.path()).len(), 1);

    data.result_url = Some(result.display().to_string());
    render.render_page(&data).unwrap();
    render.render_page(&data).unwrap();

    let files = saved_files(records.path());
    assert_eq!(files.len(), 2);
    let photo_copy = files
      .iter()
      .find(|p| p.to_string_lossy().ends_with("-photo.jpg"))
      .unwrap();
    let result_copy = files
      .iter()
      .find(|p| p.to_string_lossy().ends_with("-result.png"))
      .unwrap();
    assert_eq!(std::fs::read(photo_copy).unwrap(), b"photo-bytes");
    assert_eq!(std::fs::read(result_copy).unwrap(), b"result-bytes");
  }

  #[test]
  fn record_directory_with_space_and_chinese() {
    let root = tempfile::tempdir().unwrap();
    let records = root.path().join("攀岩 记录");
    let photo = root.path().join("photo.jpg");
    std::fs::write(&photo, b"photo-bytes").unwrap();

    let render = DirectoryRecordRender::from_url(&folder_url(&records, "")).unwrap();
    assert_eq!(render.directory, records);
    render
      .render_page(&PageData {
        photo_url: Some(photo),
        result_url: None,
      })
      .unwrap();

    let files = saved_files(&records);
    assert_eq!(files.len(), 1);
    assert_eq!(std::fs::read(&files[0]).unwrap(), b"photo-bytes");
  }

  #[test]
  fn missing_local_result_is_an_error() {
    let records = tempfile::tempdir().unwrap();
    let render = DirectoryRecordRender::from_url(&folder_url(records.path(), "")).unwrap();
    let data = PageData {
      photo_url: None,
      result_url: Some("/panyan/no/such/result.jpg".to_string()),
    };
    assert!(matches!(
      render.render_page(&data),
      Err(DirectoryRecordRenderError::IoError(_))
    ));
  }
}
