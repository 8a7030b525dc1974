// 该文件是 Panyan （攀岩） 项目的一部分。
// tests/common/mod.rs - 测试用的识别服务
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

#![allow(dead_code)]

use std::{
  io::{Read, Write},
  net::{TcpListener, TcpStream},
  sync::mpsc::{self, Receiver},
  thread,
};

use url::Url;

/// 依次应答预设响应的识别服务，每个连接处理一个请求
pub struct DetectServer {
  pub endpoint: Url,
  pub requests: Receiver<Vec<u8>>,
}

impl DetectServer {
  pub fn spawn(replies: Vec<(u16, String)>) -> Self {
    Self::spawn_with(|_| replies)
  }

  /// 应答内容依赖服务地址时使用，例如返回指向本服务的结果图片地址
  pub fn spawn_with(replies: impl FnOnce(&Url) -> Vec<(u16, String)>) -> Self {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let endpoint = Url::parse(&format!("http://127.0.0.1:{}/api/detect", port)).unwrap();
    let replies = replies(&endpoint);
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
      for (status, body) in replies {
        let (mut stream, _) = match listener.accept() {
          Ok(conn) => conn,
          Err(_) => return,
        };
        let request = read_request(&mut stream);
        let _ = tx.send(request);
        let response = format!(
          concat!(
            "HTTP/1.1 {} {}\r\n",
            "Content-Type: application/json\r\n",
            "Content-Length: {}\r\n",
            "Connection: close\r\n\r\n{}"
          ),
          status,
          if status < 400 { "OK" } else { "Error" },
          body.len(),
          body
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
      }
    });

    DetectServer {
      endpoint,
      requests: rx,
    }
  }

  pub fn ok(result_image: &str) -> (u16, String) {
    (200, format!(r#"{{"result_image": "{}"}}"#, result_image))
  }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
  haystack
    .windows(needle.len())
    .position(|window| window == needle)
}

fn read_request(stream: &mut TcpStream) -> Vec<u8> {
  let mut request = Vec::new();
  let mut chunk = [0u8; 4096];

  let header_end = loop {
    if let Some(pos) = find(&request, b"\r\n\r\n") {
      break pos + 4;
    }
    let n = stream.read(&mut chunk).unwrap();
    if n == 0 {
      return request;
    }
    request.extend_from_slice(&chunk[..n]);
  };

  let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
  let content_length = headers
    .lines()
    .find_map(|line| line.strip_prefix("content-length:"))
    .and_then(|v| v.trim().parse::<usize>().ok());

  loop {
    let body = &request[header_end..];
    let complete = match content_length {
      Some(length) => body.len() >= length,
      None => find(body, b"0\r\n\r\n").is_some(),
    };
    if complete {
      break;
    }
    let n = stream.read(&mut chunk).unwrap();
    if n == 0 {
      break;
    }
    request.extend_from_slice(&chunk[..n]);
  }

  request
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
  find(haystack, needle).is_some()
}
