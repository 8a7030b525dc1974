// 该文件是 Panyan （攀岩） 项目的一部分。
// src/task.rs - 拍照识别任务
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
  io::BufRead,
  sync::mpsc::{self, Receiver, RecvTimeoutError},
  thread,
  time::Duration,
};

use tracing::{info, warn};

use crate::{
  capture::Capture,
  page::DetectPage,
  render::Render,
  upload::Upload,
};

pub trait Task<P>: Sized {
  type Error;
  fn run_task(self, page: &mut P) -> Result<(), Self::Error>;
}

/// 拍一张照片，等待识别结果后退出
pub struct OneShotTask;

impl<C, U, R> Task<DetectPage<C, U, R>> for OneShotTask
where
  C: Capture,
  C::Error: std::error::Error + Send + Sync + 'static,
  U: Upload + 'static,
  U::Error: Sync,
  R: Render,
  R::Error: std::fmt::Display,
{
  type Error = anyhow::Error;

  fn run_task(self, page: &mut DetectPage<C, U, R>) -> Result<(), Self::Error> {
    info!("开始任务...");
    let now = std::time::Instant::now();
    let photo = page.take_photo()?;
    info!("拍照完成: {}，等待识别结果...", photo.display());

    // 页面上可能还有更早发起的上传，只取本次照片的结果
    let outcome = loop {
      let outcome = page
        .wait_upload()
        .ok_or_else(|| anyhow::anyhow!("没有进行中的上传"))?;
      if outcome.photo == photo {
        break outcome;
      }
      info!("跳过更早的上传 #{}", outcome.ticket);
    };
    let response = outcome.result?;
    info!(
      "识别完成，耗时: {:.2?}，结果: {}",
      now.elapsed(),
      response.result_image
    );

    Ok(())
  }
}

/// 拍照触发方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
  /// 标准输入每输入一行拍一张，相当于按下快门
  Stdin,
  /// 固定间隔自动拍照
  Interval(Duration),
}

enum TriggerSource {
  Stdin(Receiver<()>),
  Interval { interval: Duration, waited: Duration },
}

impl TriggerSource {
  const POLL: Duration = Duration::from_millis(100);

  /// 最多等待一个轮询周期；`Some(true)` 表示该拍照，`None` 表示触发源已结束
  fn poll(&mut self) -> Option<bool> {
    match self {
      TriggerSource::Stdin(rx) => match rx.recv_timeout(Self::POLL) {
        Ok(()) => Some(true),
        Err(RecvTimeoutError::Timeout) => Some(false),
        Err(RecvTimeoutError::Disconnected) => None,
      },
      TriggerSource::Interval { interval, waited } => {
        if *waited >= *interval {
          *waited = Duration::ZERO;
          Some(true)
        } else {
          let step = Self::POLL.min(*interval - *waited);
          thread::sleep(step);
          *waited += step;
          Some(false)
        }
      }
    }
  }
}

#[derive(Debug)]
pub struct ContinuousTask {
  trigger: Trigger,
  shot_number: Option<usize>,
}

impl Default for ContinuousTask {
  fn default() -> Self {
    ContinuousTask {
      trigger: Trigger::Stdin,
      shot_number: None,
    }
  }
}

impl ContinuousTask {
  pub fn with_trigger(mut self, trigger: Trigger) -> Self {
    self.trigger = trigger;
    self
  }

  pub fn with_shot_number(mut self, shot_number: Option<usize>) -> Self {
    self.shot_number = shot_number;
    self
  }

  fn spawn_stdin_trigger() -> Receiver<()> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
      let stdin = std::io::stdin();
      for line in stdin.lock().lines() {
        if line.is_err() || tx.send(()).is_err() {
          break;
        }
      }
      // tx 在此被丢弃，主循环据此得知输入结束
    });
    rx
  }

  fn install_interrupt_handler() -> Result<Receiver<()>, ctrlc::Error> {
    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;
    Ok(rx)
  }

  /// 拍照并等待上传完成，失败只记录日志
  fn shoot<C, U, R>(page: &mut DetectPage<C, U, R>, index: usize)
  where
    C: Capture,
    C::Error: std::fmt::Display,
    U: Upload + 'static,
    R: Render,
    R::Error: std::fmt::Display,
  {
    info!("第 {} 次拍照", index);
    let now = std::time::Instant::now();
    if page.take_photo().is_err() {
      return;
    }
    if let Some(outcome) = page.wait_upload()
      && outcome.applied
    {
      info!("识别完成，耗时: {:.2?}", now.elapsed());
    }
  }

  /// 执行拍照循环，`interrupt` 收到消息时退出
  pub fn run_with_interrupt<C, U, R>(
    self,
    page: &mut DetectPage<C, U, R>,
    interrupt: Receiver<()>,
  ) -> Result<(), anyhow::Error>
  where
    C: Capture,
    C::Error: std::fmt::Display,
    U: Upload + 'static,
    R: Render,
    R::Error: std::fmt::Display,
  {
    info!("开始任务...");
    let mut source = match self.trigger {
      Trigger::Stdin => {
        info!("按回车拍照");
        TriggerSource::Stdin(Self::spawn_stdin_trigger())
      }
      Trigger::Interval(interval) => {
        info!("每 {:?} 自动拍照", interval);
        TriggerSource::Interval {
          interval,
          waited: interval,
        }
      }
    };

    let mut shot_index = 0usize;
    loop {
      if self.shot_number.map(|n| shot_index >= n).unwrap_or(false) {
        info!("达到指定拍照次数 {}, 退出任务循环", shot_index);
        break;
      }
      if interrupt.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }

      match source.poll() {
        Some(true) => {
          shot_index += 1;
          Self::shoot(page, shot_index);
        }
        Some(false) => {}
        None => {
          info!("输入结束，退出任务循环");
          break;
        }
      }
    }

    while page.in_flight() > 0 {
      page.wait_upload();
    }
    info!("任务完成，共拍照 {} 次", shot_index);
    Ok(())
  }
}

impl<C, U, R> Task<DetectPage<C, U, R>> for ContinuousTask
where
  C: Capture,
  C::Error: std::fmt::Display,
  U: Upload + 'static,
  R: Render,
  R::Error: std::fmt::Display,
{
  type Error = anyhow::Error;

  fn run_task(self, page: &mut DetectPage<C, U, R>) -> Result<(), Self::Error> {
    let interrupt = Self::install_interrupt_handler()?;
    self.run_with_interrupt(page, interrupt)
  }
}
