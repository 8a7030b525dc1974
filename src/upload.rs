// 该文件是 Panyan （攀岩） 项目的一部分。
// src/upload.rs - 照片上传与识别结果
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

use serde::Deserialize;

mod http_upload;
pub use self::http_upload::{HttpUpload, HttpUploadError};

/// 识别服务的默认地址
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/api/detect";

/// multipart 中文件字段的名称
pub const FILE_FIELD: &str = "file";

/// 将本地图片上传到识别服务
///
/// 上传在后台线程中执行，因此实现必须是 `Send + Sync`。
pub trait Upload: Send + Sync {
  type Error: std::error::Error + Send + 'static;
  fn upload_file(&self, path: &Path) -> Result<DetectResponse, Self::Error>;
}

/// 识别服务的响应体: `{"result_image": "<url-or-path>"}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DetectResponse {
  pub result_image: String,
}

impl DetectResponse {
  pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
    serde_json::from_slice(body)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_result_image() {
    let response =
      DetectResponse::from_slice(br#"{"result_image": "http://localhost:5000/static/result.jpg"}"#)
        .unwrap();
    assert_eq!(
      response.result_image,
      "http://localhost:5000/static/result.jpg"
    );
  }

  #[test]
  fn extra_fields_are_ignored() {
    let response =
      DetectResponse::from_slice(br#"{"result_image": "out/1.jpg", "points": [[1, 2]]}"#).unwrap();
    assert_eq!(response.result_image, "out/1.jpg");
  }

  #[test]
  fn missing_field_is_malformed() {
    assert!(DetectResponse::from_slice(br#"{"image": "out/1.jpg"}"#).is_err());
  }

  #[test]
  fn non_json_body_is_malformed() {
    assert!(DetectResponse::from_slice(b"<html>Internal Server Error</html>").is_err());
    assert!(DetectResponse::from_slice(b"").is_err());
  }
}
