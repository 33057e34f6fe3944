// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::domain::models::job::{Job, JobProgress};
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use crate::domain::services::pacing::{DelayKind, PacingController};
use crate::engines::pagination;
use crate::engines::traits::{FetchError, PageFetcher};

/// 抓取任务的致命错误
///
/// 发生在单页重试边界之外，任务进入 Failed 状态。
#[derive(Error, Debug)]
pub enum JobError {
    /// 首页抓取失败或查询URL无效
    #[error("{0}")]
    Fetch(#[from] FetchError),
    /// 任务快照保存失败
    #[error("Failed to persist job snapshot: {0}")]
    Repository(#[from] RepositoryError),
}

/// 一次运行的结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Cancelled,
}

/// 抓取工作器
///
/// 按顺序逐页抓取一个筛选结果集。每页之后保存完整的任务快照并推送进度，
/// 单页失败时退避后跳过该页继续。
pub struct ScrapeWorker {
    fetcher: Arc<dyn PageFetcher>,
    repository: Arc<dyn JobRepository>,
    pacing: PacingController,
}

impl ScrapeWorker {
    /// 创建新的抓取工作器实例
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        repository: Arc<dyn JobRepository>,
        pacing: PacingController,
    ) -> Self {
        Self {
            fetcher,
            repository,
            pacing,
        }
    }

    /// 运行一个抓取任务直到完成、失败或被取消
    ///
    /// 任务需已处于 Scraping 状态。返回最终的任务状态，该状态已尽力持久化。
    /// 取消不视为失败：保存最后的快照，状态保持不变并记录取消时间。
    #[instrument(skip_all, fields(job_id = %job.id, fetcher = self.fetcher.name()))]
    pub async fn run(
        &self,
        mut job: Job,
        max_pages: Option<u32>,
        progress: watch::Sender<JobProgress>,
        cancel: CancellationToken,
    ) -> Job {
        info!(query_url = %job.query_url, "Scrape job started");

        match self.walk(&mut job, max_pages, &progress, &cancel).await {
            Ok(Outcome::Completed) => {
                job.complete(Utc::now());
                info!(
                    companies = job.companies.len(),
                    skipped_pages = job.skipped_pages.len(),
                    "Scrape job completed"
                );
            }
            Ok(Outcome::Cancelled) => {
                job.mark_cancelled(Utc::now());
                info!(
                    page = job.progress.current_page,
                    companies = job.companies.len(),
                    "Scrape job cancelled"
                );
            }
            Err(e) => {
                error!("Scrape job failed: {}", e);
                job.fail(e.to_string(), Utc::now());
            }
        }

        if let Err(e) = self.repository.save(&job).await {
            error!("Failed to persist final job snapshot: {}", e);
        }
        progress.send_replace(job.progress.clone());
        job
    }

    async fn walk(
        &self,
        job: &mut Job,
        max_pages: Option<u32>,
        progress: &watch::Sender<JobProgress>,
        cancel: &CancellationToken,
    ) -> Result<Outcome, JobError> {
        if !self.pacing.pause(DelayKind::Initial, cancel).await {
            return Ok(Outcome::Cancelled);
        }

        let query_url = job.query_url.clone();
        let first = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Outcome::Cancelled),
            first = self.fetcher.fetch_first_page(&query_url) => first?,
        };

        let total_pages = match max_pages {
            Some(limit) if limit > 0 => first.total_pages.min(limit),
            _ => first.total_pages,
        };
        job.progress.total_pages = total_pages;
        job.progress.total_companies = first.total_companies;

        let mut last_records = first.companies.len();
        counter!("leadrs_pages_fetched_total").increment(1);
        counter!("leadrs_companies_scraped_total").increment(last_records as u64);
        job.record_page(1, first.companies);
        self.checkpoint(job, progress).await?;
        info!(
            page = 1,
            total_pages,
            total_companies = job.progress.total_companies,
            scraped = job.progress.companies_scraped,
            "Page scraped"
        );

        // 失败的页不会成为下一页的 referer
        let mut referer = pagination::page_url(&query_url, 1)?;

        for page in 2..=total_pages {
            if !self
                .pacing
                .pause(DelayKind::Reading { records: last_records }, cancel)
                .await
                || !self.pacing.pause(DelayKind::InterPage, cancel).await
            {
                return Ok(Outcome::Cancelled);
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(Outcome::Cancelled),
                fetched = self.fetcher.fetch_page(&query_url, page, &referer) => fetched,
            };

            match fetched {
                Ok(companies) => {
                    last_records = companies.len();
                    counter!("leadrs_pages_fetched_total").increment(1);
                    counter!("leadrs_companies_scraped_total").increment(last_records as u64);
                    referer = pagination::page_url(&query_url, page)?;
                    job.record_page(page, companies);
                    self.checkpoint(job, progress).await?;
                    info!(
                        page,
                        total_pages,
                        scraped = job.progress.companies_scraped,
                        "Page scraped"
                    );
                }
                Err(e) => {
                    warn!(page, status = ?e.status(), "Page fetch failed, skipping: {}", e);
                    counter!("leadrs_page_failures_total").increment(1);
                    job.record_skipped_page(page);
                    last_records = 0;
                    self.checkpoint(job, progress).await?;

                    if !self.pacing.pause(DelayKind::Backoff, cancel).await {
                        return Ok(Outcome::Cancelled);
                    }
                }
            }
        }

        Ok(Outcome::Completed)
    }

    /// 保存快照并推送进度
    async fn checkpoint(
        &self,
        job: &Job,
        progress: &watch::Sender<JobProgress>,
    ) -> Result<(), JobError> {
        self.repository.save(job).await?;
        progress.send_replace(job.progress.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "scrape_worker_test.rs"]
mod tests;
