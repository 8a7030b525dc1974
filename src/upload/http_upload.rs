// 该文件是 Panyan （攀岩） 项目的一部分。
// src/upload/http_upload.rs - HTTP multipart 上传
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

use std::path::Path;

use reqwest::{
  StatusCode,
  blocking::{Client, multipart::Form},
};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl,
  upload::{DetectResponse, FILE_FIELD, Upload},
};

#[derive(Error, Debug)]
pub enum HttpUploadError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("HTTP 错误: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("识别服务返回状态码 {0}")]
  Status(StatusCode),
  #[error("响应格式错误: {0}")]
  MalformedResponse(#[from] serde_json::Error),
}

/// 通过 HTTP multipart POST 把照片发送给识别服务
///
/// 不设置超时，不附加额外请求头。
pub struct HttpUpload {
  endpoint: Url,
  client: Client,
}

impl FromUrl for HttpUpload {
  type Error = HttpUploadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if !matches!(url.scheme(), "http" | "https") {
      error!(
        "URI scheme mismatch: expected 'http' or 'https', found '{}'",
        url.scheme()
      );
      return Err(HttpUploadError::SchemeMismatch(url.scheme().to_string()));
    }

    let client = Client::builder().timeout(None).build()?;

    Ok(HttpUpload {
      endpoint: url.clone(),
      client,
    })
  }
}

impl HttpUpload {
  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }
}

impl Upload for HttpUpload {
  type Error = HttpUploadError;

  fn upload_file(&self, path: &Path) -> Result<DetectResponse, Self::Error> {
    let form = Form::new().file(FILE_FIELD, path)?;

    info!("上传 {} 到 {}", path.display(), self.endpoint);
    let response = self
      .client
      .post(self.endpoint.clone())
      .multipart(form)
      .send()?;

    let status = response.status();
    if !status.is_success() {
      return Err(HttpUploadError::Status(status));
    }

    let body = response.bytes()?;
    Ok(DetectResponse::from_slice(&body)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_http_schemes_are_accepted() {
    let url = Url::parse("ftp://localhost/api/detect").unwrap();
    assert!(matches!(
      HttpUpload::from_url(&url),
      Err(HttpUploadError::SchemeMismatch(scheme)) if scheme == "ftp"
    ));

    let url = Url::parse(crate::upload::DEFAULT_ENDPOINT).unwrap();
    let upload = HttpUpload::from_url(&url).unwrap();
    assert_eq!(upload.endpoint().path(), "/api/detect");
  }

  #[test]
  fn unreadable_file_fails_before_sending() {
    let url = Url::parse("http://127.0.0.1:9/api/detect").unwrap();
    let upload = HttpUpload::from_url(&url).unwrap();
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
      upload.upload_file(&dir.path().join("missing.jpg")),
      Err(HttpUploadError::IoError(_))
    ));
  }
}
