// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 初始化日志
///
/// 过滤规则取自 `RUST_LOG`，设置 `LEADRS_LOG_JSON=1` 时输出JSON格式。
pub fn init_telemetry() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,leadrs=debug".into());

    let json = std::env::var("LEADRS_LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
