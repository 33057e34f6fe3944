// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::company::ScrapedCompany;

/// 抓取任务状态
///
/// 状态转换遵循以下流程：
/// Pending → Scraping → Completed/Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// 已创建，尚未开始抓取
    #[default]
    Pending,
    /// 抓取中
    Scraping,
    /// 已完成
    Completed,
    /// 已失败
    Failed,
}

impl JobStatus {
    /// 是否为终止状态
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Scraping => write!(f, "scraping"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "scraping" => Ok(JobStatus::Scraping),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(()),
        }
    }
}

/// 抓取进度快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    /// 当前页码（最后一次处理的页）
    pub current_page: u32,
    /// 总页数
    pub total_pages: u32,
    /// 已抓取的公司数
    pub companies_scraped: usize,
    /// 注册机构报告的公司总数（估计值）
    pub total_companies: usize,
}

/// 抓取任务
///
/// 一次抓取运行的持久化单元，包含状态、进度和累计的公司列表。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// 任务ID，基于UTC时间生成，可按字典序排序
    pub id: String,
    /// 任务状态
    pub status: JobStatus,
    /// 进度快照
    pub progress: JobProgress,
    /// 累计抓取到的公司
    pub companies: Vec<ScrapedCompany>,
    /// 抓取失败后被跳过的页码
    #[serde(default)]
    pub skipped_pages: Vec<u32>,
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 完成时间
    pub completed_at: Option<DateTime<Utc>>,
    /// 取消时间，取消不是失败，状态保持不变
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    /// 失败原因
    pub error: Option<String>,
    /// 带筛选条件的查询URL
    pub query_url: String,
}

/// 不含公司列表的任务摘要
///
/// 用于任务列表，以及键值存储中与公司列表分开保存的状态快照。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub status: JobStatus,
    pub progress: JobProgress,
    #[serde(default)]
    pub skipped_pages: Vec<u32>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub query_url: String,
}

/// 根据时间生成任务ID
///
/// 格式为 `job-YYYYMMDDTHHMMSSmmmZ-xxxx`，始终使用UTC以保证跨时区排序一致，
/// 末尾的随机后缀避免同一毫秒内创建的任务冲突。
pub fn generate_job_id(now: DateTime<Utc>) -> String {
    format!(
        "job-{}-{:04x}",
        now.format("%Y%m%dT%H%M%S%3fZ"),
        rand::random::<u16>()
    )
}

impl Job {
    /// 创建新的抓取任务，状态为 Pending
    pub fn new(query_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_job_id(now),
            status: JobStatus::Pending,
            progress: JobProgress::default(),
            companies: Vec::new(),
            skipped_pages: Vec::new(),
            started_at: now,
            completed_at: None,
            cancelled_at: None,
            error: None,
            query_url: query_url.into(),
        }
    }

    /// Pending → Scraping
    pub fn start(&mut self) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Scraping;
        }
    }

    /// 记录一页的抓取结果
    pub fn record_page(&mut self, page: u32, companies: Vec<ScrapedCompany>) {
        self.companies.extend(companies);
        self.progress.current_page = page;
        self.progress.companies_scraped = self.companies.len();
    }

    /// 记录一页抓取失败并被跳过
    pub fn record_skipped_page(&mut self, page: u32) {
        self.skipped_pages.push(page);
        self.progress.current_page = page;
    }

    /// Scraping → Completed
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(at);
        self.error = None;
    }

    /// Scraping → Failed
    pub fn fail(&mut self, message: impl Into<String>, at: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.completed_at = Some(at);
        self.error = Some(message.into());
    }

    /// 标记任务被取消，状态保持不变
    pub fn mark_cancelled(&mut self, at: DateTime<Utc>) {
        self.cancelled_at = Some(at);
    }

    /// 抓取是否已结束（完成、失败或被取消）
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal() || self.cancelled_at.is_some()
    }

    /// 用实际持久化的公司列表校正进度
    ///
    /// 状态快照和公司列表由两次写入分别保存，读取时可能看到先后不一致的版本。
    /// 已抓取数和当前页均取报告值与按实际列表长度推算值中的较大者。
    pub fn reconcile(mut self, page_size: u32) -> Self {
        let actual = self.companies.len();
        self.progress.companies_scraped = self.progress.companies_scraped.max(actual);

        if page_size > 0 {
            let mut derived_page = actual.div_ceil(page_size as usize) as u32;
            if self.progress.total_pages > 0 {
                derived_page = derived_page.min(self.progress.total_pages);
            }
            self.progress.current_page = self.progress.current_page.max(derived_page);
        }
        self
    }

    /// 生成不含公司列表的摘要
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            status: self.status,
            progress: self.progress.clone(),
            skipped_pages: self.skipped_pages.clone(),
            started_at: self.started_at,
            completed_at: self.completed_at,
            cancelled_at: self.cancelled_at,
            error: self.error.clone(),
            query_url: self.query_url.clone(),
        }
    }

    /// 由摘要和公司列表重新组装任务
    pub fn from_parts(summary: JobSummary, companies: Vec<ScrapedCompany>) -> Self {
        Self {
            id: summary.id,
            status: summary.status,
            progress: summary.progress,
            companies,
            skipped_pages: summary.skipped_pages,
            started_at: summary.started_at,
            completed_at: summary.completed_at,
            cancelled_at: summary.cancelled_at,
            error: summary.error,
            query_url: summary.query_url,
        }
    }
}
