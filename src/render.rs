// 该文件是 Panyan （攀岩） 项目的一部分。
// src/render.rs - 页面显示
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
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, page::PageData};

/// 页面状态变化后刷新显示
pub trait Render {
  type Error;
  fn render_page(&self, data: &PageData) -> Result<(), Self::Error>;
}

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordRender, DirectoryRecordRenderError};

#[derive(Error, Debug)]
pub enum RenderError {
  #[cfg(feature = "directory_record")]
  #[error("目录记录显示错误: {0}")]
  DirectoryRecordRenderError(#[from] DirectoryRecordRenderError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 把页面状态打到日志里
#[derive(Debug, Default)]
pub struct LogRender;

impl FromUrlWithScheme for LogRender {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogRender {
  type Error = RenderError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RenderError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(LogRender)
  }
}

impl Render for LogRender {
  type Error = RenderError;

  fn render_page(&self, data: &PageData) -> Result<(), Self::Error> {
    info!(
      "照片: {} | 识别结果: {}",
      data
        .photo_url
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string()),
      data.result_url.as_deref().unwrap_or("-")
    );
    Ok(())
  }
}

pub enum RenderWrapper {
  Log(LogRender),
  #[cfg(feature = "directory_record")]
  DirectoryRecord(DirectoryRecordRender),
}

impl FromUrl for RenderWrapper {
  type Error = RenderError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogRender::SCHEME => Ok(RenderWrapper::Log(LogRender::from_url(url)?)),
      #[cfg(feature = "directory_record")]
      DirectoryRecordRender::SCHEME => Ok(RenderWrapper::DirectoryRecord(
        DirectoryRecordRender::from_url(url)?,
      )),
      other => Err(RenderError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Render for RenderWrapper {
  type Error = RenderError;

  fn render_page(&self, data: &PageData) -> Result<(), Self::Error> {
    match self {
      RenderWrapper::Log(render) => render.render_page(data),
      #[cfg(feature = "directory_record")]
      RenderWrapper::DirectoryRecord(render) => {
        render.render_page(data).map_err(RenderError::from)
      }
    }
  }
}
