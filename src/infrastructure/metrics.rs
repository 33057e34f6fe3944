// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 初始化指标导出
///
/// 未配置监听地址时不安装导出器，指标宏调用为空操作。
pub fn init_metrics(listen_addr: Option<&str>) {
    let Some(listen_addr) = listen_addr else {
        info!("Metrics exporter disabled");
        return;
    };

    let addr: SocketAddr = match listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", listen_addr, e);
            return;
        }
    };

    // 端口被占用时只记录告警（开发/测试环境常见）
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return;
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
}

fn describe_metrics() {
    describe_counter!(
        "leadrs_pages_fetched_total",
        "Total number of registry result pages fetched"
    );
    describe_counter!(
        "leadrs_page_failures_total",
        "Total number of registry pages skipped after a fetch failure"
    );
    describe_counter!(
        "leadrs_companies_scraped_total",
        "Total number of companies extracted from result pages"
    );
    describe_counter!(
        "leadrs_crm_created_total",
        "Total number of CRM records created or updated by imports"
    );
    describe_counter!(
        "leadrs_crm_failed_total",
        "Total number of CRM record writes that failed"
    );
    describe_gauge!("leadrs_jobs_active", "Number of scrape jobs currently running");
}
