// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{Job, JobProgress, JobSummary};
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use crate::workers::scrape_worker::ScrapeWorker;
use dashmap::DashMap;
use metrics::gauge;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, instrument};

/// 正在运行的任务句柄
struct RunningJob {
    cancel: CancellationToken,
    progress: watch::Receiver<JobProgress>,
}

/// 任务管理器
///
/// 每个抓取任务运行在独立的 tokio 任务上，管理器持有它们的取消令牌和进度通道。
/// 任务结束后自行从运行集合中移除。
pub struct JobManager {
    worker: Arc<ScrapeWorker>,
    repository: Arc<dyn JobRepository>,
    running: Arc<DashMap<String, RunningJob>>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    page_size: u32,
}

impl JobManager {
    pub fn new(worker: ScrapeWorker, repository: Arc<dyn JobRepository>, page_size: u32) -> Self {
        Self {
            worker: Arc::new(worker),
            repository,
            running: Arc::new(DashMap::new()),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            page_size,
        }
    }

    /// 创建并启动抓取任务
    ///
    /// 任务以 Scraping 状态保存后才开始抓取，返回该初始快照。
    #[instrument(skip(self))]
    pub async fn start(&self, query_url: &str, max_pages: Option<u32>) -> Result<Job, RepositoryError> {
        let mut job = Job::new(query_url);
        job.start();
        self.repository.save(&job).await?;

        let (tx, rx) = watch::channel(job.progress.clone());
        let cancel = self.shutdown.child_token();
        self.running.insert(
            job.id.clone(),
            RunningJob {
                cancel: cancel.clone(),
                progress: rx,
            },
        );
        gauge!("leadrs_jobs_active").set(self.running.len() as f64);
        info!(job_id = %job.id, "Scrape job scheduled");

        let worker = self.worker.clone();
        let running = self.running.clone();
        let snapshot = job.clone();
        self.tracker.spawn(async move {
            let finished = worker.run(snapshot, max_pages, tx, cancel).await;
            running.remove(&finished.id);
            gauge!("leadrs_jobs_active").set(running.len() as f64);
        });

        Ok(job)
    }

    /// 取消正在运行的任务，返回任务是否在运行
    pub fn cancel(&self, id: &str) -> bool {
        match self.running.get(id) {
            Some(entry) => {
                entry.cancel.cancel();
                info!(job_id = %id, "Scrape job cancellation requested");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.running.contains_key(id)
    }

    /// 正在运行的任务的最新进度
    pub fn progress(&self, id: &str) -> Option<JobProgress> {
        self.running
            .get(id)
            .map(|entry| entry.progress.borrow().clone())
    }

    /// 读取任务快照，并用实际公司列表校正进度
    pub async fn status(&self, id: &str) -> Result<Option<Job>, RepositoryError> {
        Ok(self
            .repository
            .load(id)
            .await?
            .map(|job| job.reconcile(self.page_size)))
    }

    /// 所有任务的摘要，按开始时间倒序
    pub async fn list(&self) -> Result<Vec<JobSummary>, RepositoryError> {
        Ok(self
            .repository
            .list_all()
            .await?
            .into_iter()
            .map(|job| job.reconcile(self.page_size).summary())
            .collect())
    }

    /// 取消任务并从仓库删除
    ///
    /// 等待运行中的任务写完最后一次快照后再删除，避免删除后被重新写入。
    pub async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let progress = self.running.get(id).map(|entry| {
            entry.cancel.cancel();
            entry.progress.clone()
        });

        if let Some(mut progress) = progress {
            // 发送端随任务结束而释放
            while progress.changed().await.is_ok() {}
        }

        self.repository.delete(id).await
    }

    /// 取消所有任务并等待它们保存最后的快照
    pub async fn shutdown(&self) {
        info!(running = self.running.len(), "Cancelling running scrape jobs");
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("All scrape jobs stopped");
    }
}
