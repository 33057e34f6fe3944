// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::Job;
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// 内存任务仓库
///
/// 用于单进程运行和测试，进程退出后数据丢失。
#[derive(Clone, Default)]
pub struct MemoryJobRepository {
    jobs: Arc<DashMap<String, Job>>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前保存的任务数
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn save(&self, job: &Job) -> Result<(), RepositoryError> {
        self.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<Job>, RepositoryError> {
        Ok(self.jobs.get(id).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.jobs.remove(id).is_some())
    }

    async fn list_all(&self) -> Result<Vec<Job>, RepositoryError> {
        let mut jobs: Vec<Job> = self.jobs.iter().map(|entry| entry.value().clone()).collect();
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| b.id.cmp(&a.id)));
        Ok(jobs)
    }
}
