//! 外部调用节流 - 基础设施层
//!
//! 同一时刻最多 `permits` 个调用在途；每个调用结束后持有许可再等待 `delay`，
//! 因此调用速率上限约为 `permits / (调用耗时 + delay)`。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

/// 外部调用节流器，可在多个服务之间共享（clone 后共用同一组许可）
#[derive(Clone, Debug)]
pub struct CallThrottle {
    semaphore: Arc<Semaphore>,
    delay: Duration,
}

impl CallThrottle {
    pub fn new(permits: usize, delay: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(permits.max(1))),
            delay,
        }
    }

    /// 不限速（测试用）
    pub fn unlimited() -> Self {
        Self::new(Semaphore::MAX_PERMITS, Duration::ZERO)
    }

    /// 在许可内执行一次调用
    pub async fn run<F, T>(&self, call: F) -> T
    where
        F: Future<Output = T>,
    {
        // 信号量从不关闭，acquire 失败时直接放行
        let _permit = self.semaphore.acquire().await.ok();
        let output = call.await;
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        output
    }
}
