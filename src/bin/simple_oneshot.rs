// 该文件是 Panyan （攀岩） 项目的一部分。
// src/bin/simple_oneshot.rs - 拍一张照片并上传识别
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use panyan::{
  FromUrl,
  capture::CaptureWrapper,
  page::DetectPage,
  photo::Quality,
  render::RenderWrapper,
  task::{OneShotTask, Task},
  upload::{DEFAULT_ENDPOINT, HttpUpload},
};
use tracing::info;

/// Panyan 单次拍照参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 相机来源
  #[arg(long, value_name = "SOURCE", default_value = "v4l:///dev/video0")]
  pub capture: Url,
  /// 识别服务地址
  #[arg(long, value_name = "ENDPOINT", default_value = DEFAULT_ENDPOINT)]
  pub endpoint: Url,
  /// 显示方式
  #[arg(long, value_name = "RENDER", default_value = "log://")]
  pub render: Url,
  /// 拍照质量
  #[arg(long, value_name = "QUALITY", default_value = "high")]
  pub quality: Quality,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("相机来源: {}", args.capture);
  info!("识别服务: {}", args.endpoint);
  info!("显示方式: {}", args.render);

  let capture = CaptureWrapper::from_url(&args.capture)?;
  let upload = HttpUpload::from_url(&args.endpoint)?;
  let render = RenderWrapper::from_url(&args.render)?;
  let mut page = DetectPage::new(capture, upload, render).with_quality(args.quality);

  OneShotTask.run_task(&mut page)?;

  let data = page.data();
  info!(
    "照片: {}",
    data
      .photo_url
      .as_ref()
      .map(|p| p.display().to_string())
      .unwrap_or_default()
  );
  info!("识别结果: {}", data.result_url.as_deref().unwrap_or_default());

  Ok(())
}
