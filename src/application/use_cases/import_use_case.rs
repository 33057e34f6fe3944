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

use crate::{
    application::dto::import_request::{ImportRequestDto, UpdateMatchesRequestDto},
    domain::{
        models::{
            company::ScrapedCompany,
            duplicate::{CrmCompanyRef, DuplicateMatch, MatchKind},
            field_mapping::{EditableFieldMapping, FieldMapping},
            import::ImportResult,
            job::{Job, JobStatus},
        },
        repositories::job_repository::RepositoryError,
        services::{
            crm_gateway::CrmError,
            duplicate_service::DuplicateService,
            import_service::{BatchImporter, ImportError},
            normalizer::registry_key,
        },
    },
    workers::manager::JobManager,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use validator::Validate;

#[derive(Error, Debug)]
pub enum ImportUseCaseError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Job not found")]
    NotFound,
    #[error("Job {id} is still {status}")]
    NotReady { id: String, status: JobStatus },
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("CRM error: {0}")]
    Crm(#[from] CrmError),
    #[error(transparent)]
    Import(#[from] ImportError),
}

/// 默认的可编辑字段映射
pub fn default_editable_mapping() -> EditableFieldMapping {
    EditableFieldMapping {
        name: Some("name".to_string()),
        postal_code: Some("zip".to_string()),
        city: Some("city".to_string()),
        revenue: Some("annualrevenue".to_string()),
        employees: Some("numberofemployees".to_string()),
    }
}

/// 重复检查与导入用例
///
/// 只有已完成或已取消的任务可以做重复检查和导入。
pub struct ImportUseCase {
    jobs: Arc<JobManager>,
    duplicates: DuplicateService,
    importer: BatchImporter,
    registry_id_field: String,
    source_url_field: String,
}

impl ImportUseCase {
    pub fn new(
        jobs: Arc<JobManager>,
        duplicates: DuplicateService,
        importer: BatchImporter,
        registry_id_field: impl Into<String>,
        source_url_field: impl Into<String>,
    ) -> Self {
        Self {
            jobs,
            duplicates,
            importer,
            registry_id_field: registry_id_field.into(),
            source_url_field: source_url_field.into(),
        }
    }

    /// 注册号和来源URL两个字段固定，其余使用请求中的映射或默认映射
    pub fn mapping(&self, editable: Option<EditableFieldMapping>) -> FieldMapping {
        FieldMapping::new(&self.registry_id_field, &self.source_url_field)
            .with_editable(editable.unwrap_or_else(default_editable_mapping))
    }

    async fn finished_job(&self, job_id: &str) -> Result<Job, ImportUseCaseError> {
        let job = self
            .jobs
            .status(job_id)
            .await?
            .ok_or(ImportUseCaseError::NotFound)?;

        if job.status == JobStatus::Completed || job.cancelled_at.is_some() {
            Ok(job)
        } else {
            Err(ImportUseCaseError::NotReady {
                id: job.id,
                status: job.status,
            })
        }
    }

    /// 检查任务中的公司在CRM中是否已存在
    pub async fn check_duplicates(
        &self,
        job_id: &str,
    ) -> Result<Vec<DuplicateMatch>, ImportUseCaseError> {
        let job = self.finished_job(job_id).await?;
        Ok(self
            .duplicates
            .check(&job.companies, &self.registry_id_field)
            .await?)
    }

    /// 按注册号查找CRM中的公司
    pub async fn find_by_registry_id(
        &self,
        registry_id: &str,
    ) -> Result<Vec<CrmCompanyRef>, ImportUseCaseError> {
        if registry_key(registry_id).is_none() {
            return Err(ImportUseCaseError::ValidationError(format!(
                "invalid registry id: {}",
                registry_id
            )));
        }
        Ok(self
            .duplicates
            .find_by_registry_id(registry_id, &self.registry_id_field)
            .await?)
    }

    /// 将任务中的公司导入CRM
    pub async fn import(
        &self,
        job_id: &str,
        dto: ImportRequestDto,
    ) -> Result<ImportResult, ImportUseCaseError> {
        dto.validate()
            .map_err(|e| ImportUseCaseError::ValidationError(e.to_string()))?;

        let job = self.finished_job(job_id).await?;
        let companies = select_companies(
            job.companies,
            dto.registry_ids.as_deref(),
            &dto.skip_registry_ids,
        );
        info!(job_id = %job.id, selected = companies.len(), "Importing companies");

        let mapping = self.mapping(dto.mapping);
        Ok(self
            .importer
            .import_batch(&companies, &mapping, Some(&job.id))
            .await?)
    }

    /// 用任务中的数据更新注册号完全匹配的CRM记录
    pub async fn update_matches(
        &self,
        job_id: &str,
        dto: UpdateMatchesRequestDto,
    ) -> Result<ImportResult, ImportUseCaseError> {
        let exact: Vec<DuplicateMatch> = self
            .check_duplicates(job_id)
            .await?
            .into_iter()
            .filter(|m| m.kind == MatchKind::ExactKey)
            .collect();

        let mapping = self.mapping(dto.mapping);
        Ok(self.importer.update_matched(&exact, &mapping).await)
    }
}

/// 按选择和排除列表筛选公司，注册号比较前统一为纯数字
fn select_companies(
    companies: Vec<ScrapedCompany>,
    selected: Option<&[String]>,
    skipped: &[String],
) -> Vec<ScrapedCompany> {
    let keys = |ids: &[String]| -> HashSet<String> {
        ids.iter().filter_map(|id| registry_key(id)).collect()
    };
    let selected = selected.map(keys);
    let skipped = keys(skipped);

    companies
        .into_iter()
        .filter(|company| {
            let key = registry_key(&company.registry_id);
            let wanted = match (&selected, &key) {
                (Some(selected), Some(key)) => selected.contains(key),
                (Some(_), None) => false,
                (None, _) => true,
            };
            wanted && !matches!(&key, Some(key) if skipped.contains(key))
        })
        .collect()
}
