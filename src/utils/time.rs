//! 时间工具

use chrono::Utc;

/// 当前 Unix 毫秒时间戳
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 当前 Unix 秒时间戳
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}
