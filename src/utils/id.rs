//! 字符串 ID 生成
//!
//! 记录 ID 是带前缀的毫秒时间戳 (`p1712345678901`、`o1712345678902` ...)，
//! 与既有存量数据的格式一致。同一毫秒内的并发创建通过单调计数器兜底，
//! 保证进程内永不重复。

use std::sync::atomic::{AtomicI64, Ordering};

use crate::utils::time::now_millis;

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// 生成下一个唯一的数字部分 (毫秒时间戳，同毫秒时递增)
fn next_millis() -> i64 {
    let now = now_millis();
    let mut last = LAST_ID.load(Ordering::Relaxed);
    loop {
        let candidate = if now > last { now } else { last + 1 };
        match LAST_ID.compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return candidate,
            Err(observed) => last = observed,
        }
    }
}

/// 生成带前缀的记录 ID
pub fn next_id(prefix: char) -> String {
    format!("{}{}", prefix, next_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_carry_prefix() {
        let id = next_id('p');
        assert!(id.starts_with('p'));
        assert!(id[1..].parse::<i64>().is_ok());
    }

    #[test]
    fn same_millisecond_ids_are_unique() {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(next_id('o')));
        }
    }

    #[test]
    fn ids_are_strictly_increasing() {
        let a = next_id('m')[1..].parse::<i64>().unwrap();
        let b = next_id('m')[1..].parse::<i64>().unwrap();
        assert!(b > a);
    }
}
