//! 取消令牌.
//!
//! 长时间运行的编码在每个采样/帧边界检查取消信号.
//! 令牌可以跨线程克隆, 所有克隆共享同一个标志.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 协作式取消令牌
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// 创建未取消的令牌
    pub fn new() -> Self {
        Self::default()
    }

    /// 发出取消信号
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// 是否已取消
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());

        std::thread::spawn(move || token.cancel()).join().unwrap();
        assert!(other.is_cancelled());
    }
}
