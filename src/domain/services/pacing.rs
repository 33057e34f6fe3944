// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::PacingSettings;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 延迟类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayKind {
    /// 首次请求前的一次性延迟，模拟页面加载和定位
    Initial,
    /// 翻页前的停顿，偶尔会翻倍
    InterPage,
    /// 浏览结果列表的时间，与上一页记录数成正比
    Reading { records: usize },
    /// 页面抓取失败后的退避
    Backoff,
}

/// 请求节奏控制器
///
/// 所有延迟都在区间内均匀随机取值，避免固定且可被识别的请求间隔。
/// 不保存任何状态。
#[derive(Debug, Clone)]
pub struct PacingController {
    settings: PacingSettings,
}

impl PacingController {
    pub fn new(settings: PacingSettings) -> Self {
        Self { settings }
    }

    /// 所有延迟为零的控制器，用于测试
    pub fn disabled() -> Self {
        Self::new(PacingSettings::disabled())
    }

    /// 计算一次延迟
    pub fn delay(&self, kind: DelayKind) -> Duration {
        let s = &self.settings;
        let millis = match kind {
            DelayKind::Initial => uniform(s.initial_min_ms, s.initial_max_ms),
            DelayKind::InterPage => {
                let base = uniform(s.inter_page_min_ms, s.inter_page_max_ms);
                if rand::random_bool(s.long_pause_chance.clamp(0.0, 1.0)) {
                    base * 2
                } else {
                    base
                }
            }
            DelayKind::Reading { records } => {
                let factor = (records as f64 / 10.0).max(1.0);
                (uniform(s.reading_min_ms, s.reading_max_ms) as f64 * factor) as u64
            }
            DelayKind::Backoff => uniform(s.backoff_min_ms, s.backoff_max_ms),
        };
        Duration::from_millis(millis)
    }

    /// 等待一次延迟
    ///
    /// # 返回值
    ///
    /// 等待完成返回 true，被取消返回 false
    pub async fn pause(&self, kind: DelayKind, cancel: &CancellationToken) -> bool {
        let delay = self.delay(kind);
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }

        debug!(?kind, delay_ms = delay.as_millis() as u64, "Pacing pause");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

fn uniform(min_ms: u64, max_ms: u64) -> u64 {
    if max_ms <= min_ms {
        min_ms
    } else {
        rand::random_range(min_ms..=max_ms)
    }
}
