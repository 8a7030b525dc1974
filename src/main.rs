// 该文件是 Panyan （攀岩） 项目的一部分。
// src/main.rs - 项目主程序：连续拍照识别
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

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use url::Url;

use panyan::{
  FromUrl,
  capture::CaptureWrapper,
  page::DetectPage,
  photo::Quality,
  render::RenderWrapper,
  task::{ContinuousTask, Task, Trigger},
  upload::{DEFAULT_ENDPOINT, HttpUpload},
};
use tracing::info;

/// Panyan 拍照识别参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 相机来源
  /// 支持格式:
  /// - V4L2: v4l:///dev/video0?width=1280&height=720
  /// - GStreamer: gst://camera/dev/video0?fps=15 或 gst://test
  /// - 图片文件/目录: image:///path/to/photos
  #[arg(long, value_name = "SOURCE", default_value = "v4l:///dev/video0")]
  pub capture: Url,
  /// 识别服务地址
  #[arg(long, value_name = "ENDPOINT", default_value = DEFAULT_ENDPOINT)]
  pub endpoint: Url,
  /// 显示方式
  /// 支持格式:
  /// - 日志: log://
  /// - 目录记录: folder:///path/to/records?base=http://localhost:5000/
  #[arg(long, value_name = "RENDER", default_value = "log://")]
  pub render: Url,
  /// 拍照质量 (high, normal, low)
  #[arg(long, value_name = "QUALITY", default_value = "high")]
  pub quality: Quality,
  /// 自动拍照间隔（毫秒），不设置时按回车拍照
  #[arg(long, value_name = "MILLISECONDS")]
  pub interval_ms: Option<u64>,
  /// 拍照次数，0 表示不限
  #[arg(long, value_name = "SHOT_NUMBER", default_value_t = 0)]
  pub shot_number: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("相机来源: {}", args.capture);
  info!("识别服务: {}", args.endpoint);
  info!("显示方式: {}", args.render);
  info!("拍照质量: {}", args.quality);

  let capture = CaptureWrapper::from_url(&args.capture)?;
  let upload = HttpUpload::from_url(&args.endpoint)?;
  let render = RenderWrapper::from_url(&args.render)?;
  let mut page = DetectPage::new(capture, upload, render).with_quality(args.quality);

  let trigger = match args.interval_ms {
    Some(ms) => Trigger::Interval(Duration::from_millis(ms)),
    None => Trigger::Stdin,
  };
  let shot_number = (args.shot_number > 0).then_some(args.shot_number);

  ContinuousTask::default()
    .with_trigger(trigger)
    .with_shot_number(shot_number)
    .run_task(&mut page)?;

  Ok(())
}
