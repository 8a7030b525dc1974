// 该文件是 Panyan （攀岩） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod capture;
pub mod page;
pub mod photo;
pub mod render;
pub mod task;
pub mod upload;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// URL 路径按百分号编码解码后的本地路径
///
/// `Url` 会把空格和非 ASCII 字符编码，例如 `岩壁 photos` 变为 `%E5%B2%A9%E5%A3%81%20photos`。
#[cfg(any(
  feature = "read_image_file",
  feature = "v4l_capture",
  feature = "gstreamer_capture",
  feature = "directory_record"
))]
pub(crate) fn url_file_path(
  url: &url::Url,
) -> Result<std::path::PathBuf, std::string::FromUtf8Error> {
  Ok(std::path::PathBuf::from(
    urlencoding::decode(url.path())?.into_owned(),
  ))
}

/// URL 查询参数 `key` 的原始值
#[cfg(any(
  feature = "v4l_capture",
  feature = "gstreamer_capture",
  feature = "directory_record"
))]
pub(crate) fn query_param(url: &url::Url, key: &str) -> Option<String> {
  url
    .query_pairs()
    .find(|(k, _)| k == key)
    .map(|(_, v)| v.into_owned())
}

/// 将 URL 查询参数中的 `key` 解析为指定类型，缺失或无法解析时返回 `None`
#[cfg(any(feature = "v4l_capture", feature = "gstreamer_capture"))]
pub(crate) fn query_value<T: std::str::FromStr>(url: &url::Url, key: &str) -> Option<T> {
  query_param(url, key).and_then(|v| v.parse::<T>().ok())
}
