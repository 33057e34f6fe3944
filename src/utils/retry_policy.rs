// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// 重试策略配置
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大重试次数
    pub max_retries: u32,
    /// 初始退避时间
    pub initial_backoff: Duration,
    /// 最大退避时间
    pub max_backoff: Duration,
    /// 退避乘数
    pub backoff_multiplier: f64,
    /// 抖动因子 (0.0-1.0)
    pub jitter_factor: f64,
    /// 是否启用抖动
    pub enable_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            enable_jitter: true,
        }
    }
}

impl RetryPolicy {
    /// 创建标准重试策略，只修改最大重试次数
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// 不重试
    pub fn none() -> Self {
        Self::with_max_retries(0)
    }

    /// 计算第 attempt 次重试前的退避时间（attempt 从1开始）
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) as i32 - 1;
        let backoff_secs = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        // 限制最大退避时间
        let capped_backoff = backoff_secs.min(self.max_backoff.as_secs_f64());

        // 添加抖动
        let final_backoff = if self.enable_jitter && self.jitter_factor > 0.0 {
            let jitter_range = capped_backoff * self.jitter_factor;
            let jitter = rand::random_range(-jitter_range..jitter_range);
            (capped_backoff + jitter).max(0.0)
        } else {
            capped_backoff
        };

        Duration::from_secs_f64(final_backoff)
    }

    /// 是否应该重试
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// 执行操作，遇到可重试错误时按退避策略重试
    ///
    /// # 参数
    ///
    /// * `operation` - 每次调用返回一个新的 Future
    /// * `is_retryable` - 判断错误是否可重试
    pub async fn run<T, E, F, Fut>(
        &self,
        mut operation: F,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(attempt) && is_retryable(&e) => {
                    attempt += 1;
                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Retrying after retryable error"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
