// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crm::{
    BatchCreateOutcome, CrmField, CrmRecord, FieldDefinition, FieldOption, FilteredViewRequest,
    Properties, SearchFilter, UpdateRequest,
};
use crate::domain::models::import::FilteredView;
use async_trait::async_trait;
use thiserror::Error;

/// CRM网关错误类型
#[derive(Error, Debug)]
pub enum CrmError {
    /// 请求失败
    #[error("CRM request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// 权限不足
    #[error("CRM permission denied: {0}")]
    PermissionDenied(String),
    /// 非成功状态码
    #[error("CRM responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// 响应无法解析
    #[error("Invalid CRM response: {0}")]
    InvalidResponse(String),
    /// 配置错误
    #[error("CRM gateway misconfigured: {0}")]
    Config(String),
}

impl CrmError {
    /// 判断错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            CrmError::Request(e) => e.is_timeout() || e.is_connect(),
            CrmError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// 创建类请求能否重发
    ///
    /// 只有请求确定未被处理时（限流或连接未建立）才能重发，
    /// 超时和5xx时服务端可能已经写入。
    pub fn is_safe_to_resend(&self) -> bool {
        match self {
            CrmError::Request(e) => e.is_connect() && !e.is_timeout(),
            CrmError::Status { status, .. } => *status == 429,
            _ => false,
        }
    }

    /// 是否为权限问题
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, CrmError::PermissionDenied(_))
            || matches!(self, CrmError::Status { status: 401 | 403, .. })
    }
}

/// CRM网关特质
///
/// 记录相关的操作作用于网关配置的对象类型（例如 companies），
/// 字段相关的操作显式传入对象类型。
#[async_trait]
pub trait CrmGateway: Send + Sync {
    /// 列出对象类型的全部字段
    async fn list_fields(&self, object_type: &str) -> Result<Vec<CrmField>, CrmError>;

    /// 按条件搜索记录
    ///
    /// 外层各组之间为"或"，组内条件为"与"。
    async fn search_by_filters(
        &self,
        filter_groups: &[Vec<SearchFilter>],
        properties: &[String],
    ) -> Result<Vec<CrmRecord>, CrmError>;

    /// 分页读取全部记录，只返回指定属性
    async fn get_all_paged(&self, properties: &[String]) -> Result<Vec<CrmRecord>, CrmError>;

    /// 创建单条记录，返回新记录ID
    async fn create_one(&self, properties: &Properties) -> Result<String, CrmError>;

    /// 批量创建记录
    ///
    /// 部分成功时返回 `Ok`，逐条列出已创建和失败的输入；
    /// 返回 `Err` 表示整批请求失败。
    async fn create_batch(&self, inputs: &[Properties]) -> Result<BatchCreateOutcome, CrmError>;

    /// 更新单条记录
    async fn update_one(&self, id: &str, properties: &Properties) -> Result<(), CrmError>;

    /// 批量更新记录
    async fn update_batch(&self, updates: &[UpdateRequest]) -> Result<(), CrmError>;

    /// 创建字段
    async fn create_field(
        &self,
        object_type: &str,
        definition: &FieldDefinition,
    ) -> Result<CrmField, CrmError>;

    /// 用完整的选项列表替换字段现有选项
    async fn update_field_options(
        &self,
        object_type: &str,
        field_name: &str,
        options: &[FieldOption],
    ) -> Result<CrmField, CrmError>;

    /// 创建按属性值筛选的视图
    async fn create_filtered_view(
        &self,
        request: &FilteredViewRequest,
    ) -> Result<FilteredView, CrmError>;
}
