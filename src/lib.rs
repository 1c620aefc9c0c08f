//! Lens - CNN 图像识别客户端
//!
//! 按部署环境加载后端地址、端点、超时与上传限制，在上传前校验图片，
//! 并调用图像识别后端的 `/predict` 与 `/health` 端点。

pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod services;
pub mod upload;
