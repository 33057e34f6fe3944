// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::Job;
use async_trait::async_trait;
use thiserror::Error;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 存储后端错误
    #[error("Store error: {0}")]
    Store(String),
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// 抓取任务仓库特质
///
/// 按任务ID保存和读取任务快照，不包含业务逻辑。同一任务的写入
/// 只来自一个抓取器实例，采用后写覆盖语义。
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// 保存任务快照（覆盖已有快照）
    async fn save(&self, job: &Job) -> Result<(), RepositoryError>;

    /// 根据ID读取任务
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(Job))` - 找到任务
    /// * `Ok(None)` - 任务不存在
    /// * `Err(RepositoryError)` - 读取失败
    async fn load(&self, id: &str) -> Result<Option<Job>, RepositoryError>;

    /// 删除任务，返回任务是否存在
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;

    /// 列出全部任务，按开始时间倒序
    async fn list_all(&self) -> Result<Vec<Job>, RepositoryError>;
}
