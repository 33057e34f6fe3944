// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::company::ScrapedCompany;
use crate::domain::models::job::{Job, JobSummary};
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use crate::infrastructure::cache::redis_client::{KeyValueStore, RedisClient};
use async_trait::async_trait;
use tracing::warn;

/// 基于Redis的任务仓库
///
/// 每个任务分两个键保存：状态摘要和公司列表，另有一个按开始时间
/// 排序的有序集合作为索引。两次写入不是原子的，读取方需要用实际
/// 公司列表校正进度（见 `Job::reconcile`）。所有读取都直接访问主库，
/// 刚写入的任务立即可见。
#[derive(Clone)]
pub struct RedisJobRepository<S = RedisClient> {
    redis: S,
    prefix: String,
}

fn store_error(e: anyhow::Error) -> RepositoryError {
    RepositoryError::Store(e.to_string())
}

impl<S: KeyValueStore> RedisJobRepository<S> {
    pub fn new(redis: S, prefix: impl Into<String>) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
        }
    }

    pub(crate) fn summary_key(&self, id: &str) -> String {
        format!("{}:job:{}", self.prefix, id)
    }

    pub(crate) fn companies_key(&self, id: &str) -> String {
        format!("{}:job:{}:companies", self.prefix, id)
    }

    pub(crate) fn index_key(&self) -> String {
        format!("{}:jobs", self.prefix)
    }
}

#[async_trait]
impl<S: KeyValueStore> JobRepository for RedisJobRepository<S> {
    async fn save(&self, job: &Job) -> Result<(), RepositoryError> {
        // 先写公司列表，摘要的进度不会超过已持久化的列表
        let companies = serde_json::to_string(&job.companies)?;
        self.redis
            .set_forever(&self.companies_key(&job.id), &companies)
            .await
            .map_err(store_error)?;

        let summary = serde_json::to_string(&job.summary())?;
        self.redis
            .set_forever(&self.summary_key(&job.id), &summary)
            .await
            .map_err(store_error)?;

        self.redis
            .zadd(
                &self.index_key(),
                &job.id,
                job.started_at.timestamp_millis() as f64,
            )
            .await
            .map_err(store_error)
    }

    async fn load(&self, id: &str) -> Result<Option<Job>, RepositoryError> {
        let Some(raw) = self
            .redis
            .get(&self.summary_key(id))
            .await
            .map_err(store_error)?
        else {
            return Ok(None);
        };
        let summary: JobSummary = serde_json::from_str(&raw)?;

        let companies: Vec<ScrapedCompany> = match self
            .redis
            .get(&self.companies_key(id))
            .await
            .map_err(store_error)?
        {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };

        Ok(Some(Job::from_parts(summary, companies)))
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let removed = self
            .redis
            .del(&[self.summary_key(id), self.companies_key(id)])
            .await
            .map_err(store_error)?;
        self.redis
            .zrem(&self.index_key(), id)
            .await
            .map_err(store_error)?;
        Ok(removed > 0)
    }

    async fn list_all(&self) -> Result<Vec<Job>, RepositoryError> {
        let ids = self
            .redis
            .zrevrange_all(&self.index_key())
            .await
            .map_err(store_error)?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load(&id).await? {
                Some(job) => jobs.push(job),
                None => warn!(job_id = %id, "Job index points to a missing snapshot"),
            }
        }
        Ok(jobs)
    }
}
