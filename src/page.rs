// 该文件是 Panyan （攀岩） 项目的一部分。
// src/page.rs - 拍照识别页面
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

//! 拍照识别页面
//!
//! 页面持有两项状态：最近一次拍到的照片路径和最近一次的识别结果地址。
//! 拍照成功后立即上传；上传在后台线程执行，完成后通过 channel 交回页面，
//! 由页面所在线程写入状态。失败不会修改状态，只记录日志。

use std::{
  path::{Path, PathBuf},
  sync::{
    Arc,
    mpsc::{Receiver, Sender, channel},
  },
  thread,
};

use tracing::{info, warn};

use crate::{
  capture::Capture,
  photo::Quality,
  render::Render,
  upload::{DetectResponse, Upload},
};

/// 页面状态，每项只保留最新的值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageData {
  pub photo_url: Option<PathBuf>,
  pub result_url: Option<String>,
}

/// 一次上传的完成记录
#[derive(Debug)]
pub struct UploadOutcome<E> {
  /// 上传序号，按发起顺序递增
  pub ticket: u64,
  pub photo: PathBuf,
  pub result: Result<DetectResponse, E>,
  /// 是否写入了页面状态；失败或已被更新的结果取代时为 `false`
  pub applied: bool,
}

struct UploadDone<E> {
  ticket: u64,
  photo: PathBuf,
  result: Result<DetectResponse, E>,
}

pub struct DetectPage<C, U: Upload, R> {
  data: PageData,
  quality: Quality,
  capture: C,
  upload: Arc<U>,
  render: R,
  sender: Sender<UploadDone<U::Error>>,
  receiver: Receiver<UploadDone<U::Error>>,
  issued: u64,
  applied: u64,
  in_flight: usize,
}

impl<C, U, R> DetectPage<C, U, R>
where
  C: Capture,
  C::Error: std::fmt::Display,
  U: Upload + 'static,
  R: Render,
  R::Error: std::fmt::Display,
{
  pub fn new(capture: C, upload: U, render: R) -> Self {
    let (sender, receiver) = channel();
    DetectPage {
      data: PageData::default(),
      quality: Quality::High,
      capture,
      upload: Arc::new(upload),
      render,
      sender,
      receiver,
      issued: 0,
      applied: 0,
      in_flight: 0,
    }
  }

  pub fn with_quality(mut self, quality: Quality) -> Self {
    self.quality = quality;
    self
  }

  pub fn data(&self) -> &PageData {
    &self.data
  }

  pub fn quality(&self) -> Quality {
    self.quality
  }

  /// 已发起但尚未完成的上传数
  pub fn in_flight(&self) -> usize {
    self.in_flight
  }

  pub fn set_photo_url(&mut self, photo_url: PathBuf) {
    self.data.photo_url = Some(photo_url);
    self.refresh();
  }

  pub fn set_result_url(&mut self, result_url: String) {
    self.data.result_url = Some(result_url);
    self.refresh();
  }

  fn refresh(&self) {
    if let Err(e) = self.render.render_page(&self.data) {
      warn!("刷新显示失败: {}", e);
    }
  }

  /// 拍照，成功后立即上传
  ///
  /// 拍照失败时返回错误，页面状态不变，也不会发起上传。
  pub fn take_photo(&mut self) -> Result<PathBuf, C::Error> {
    let photo = self.capture.take_photo(self.quality).map_err(|e| {
      warn!("拍照失败: {}", e);
      e
    })?;

    let path = photo.temp_image_path;
    info!("拍照成功: {}", path.display());
    self.set_photo_url(path.clone());
    self.upload_photo(&path);
    Ok(path)
  }

  /// 在后台上传照片，返回本次上传的序号
  pub fn upload_photo(&mut self, path: &Path) -> u64 {
    self.issued += 1;
    self.in_flight += 1;
    let ticket = self.issued;

    let upload = Arc::clone(&self.upload);
    let sender = self.sender.clone();
    let photo = path.to_path_buf();
    thread::spawn(move || {
      let result = upload.upload_file(&photo);
      // 页面已销毁时没有人接收结果
      let _ = sender.send(UploadDone {
        ticket,
        photo,
        result,
      });
    });

    ticket
  }

  fn apply(&mut self, done: UploadDone<U::Error>) -> UploadOutcome<U::Error> {
    self.in_flight = self.in_flight.saturating_sub(1);

    let applied = match &done.result {
      Ok(response) if done.ticket > self.applied => {
        self.applied = done.ticket;
        info!(
          "上传 #{} 完成: {} -> {}",
          done.ticket,
          done.photo.display(),
          response.result_image
        );
        self.set_result_url(response.result_image.clone());
        true
      }
      Ok(response) => {
        info!(
          "上传 #{} 的结果 {} 已过期，忽略",
          done.ticket, response.result_image
        );
        false
      }
      Err(e) => {
        warn!("上传 #{} 失败: {}", done.ticket, e);
        false
      }
    };

    UploadOutcome {
      ticket: done.ticket,
      photo: done.photo,
      result: done.result,
      applied,
    }
  }

  /// 处理所有已完成的上传，不阻塞
  pub fn poll_uploads(&mut self) -> Vec<UploadOutcome<U::Error>> {
    let mut outcomes = Vec::new();
    while let Ok(done) = self.receiver.try_recv() {
      outcomes.push(self.apply(done));
    }
    outcomes
  }

  /// 阻塞等待下一个上传完成；没有进行中的上传时返回 `None`
  pub fn wait_upload(&mut self) -> Option<UploadOutcome<U::Error>> {
    if self.in_flight == 0 {
      return None;
    }
    let done = self.receiver.recv().ok()?;
    Some(self.apply(done))
  }
}
