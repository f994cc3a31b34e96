//! 工具模块 - 通用工具函数和类型
//!
//! - [`AppError`] / [`AppResult`] - 应用错误类型
//! - [`id`] - 字符串 ID 生成
//! - [`time`] - 毫秒时间戳
//! - [`validation`] - 输入校验辅助函数
//! - [`logger`] - tracing 日志初始化

pub mod error;
pub mod id;
pub mod logger;
pub mod time;
pub mod validation;

pub use error::{AppError, AppResult};
