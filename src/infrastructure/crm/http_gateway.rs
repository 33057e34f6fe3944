// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CrmSettings;
use crate::domain::models::crm::{
    BatchCreateOutcome, CrmField, CrmRecord, FieldDefinition, FieldOption, FilteredViewRequest,
    Properties, SearchFilter, UpdateRequest,
};
use crate::domain::models::import::FilteredView;
use crate::domain::services::crm_gateway::{CrmError, CrmGateway};
use crate::utils::retry_policy::RetryPolicy;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// 单页读取上限
const PAGE_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct Paged<T> {
    results: Vec<T>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
struct NextPage {
    after: String,
}

impl<T> Paged<T> {
    fn next_cursor(&self) -> Option<String> {
        self.paging
            .as_ref()
            .and_then(|p| p.next.as_ref())
            .map(|n| n.after.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
    #[serde(rename = "objectWriteTraceId", default)]
    trace_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    context: Map<String, Value>,
}

impl BatchError {
    /// 错误上下文里标出的输入下标，可能是单个值或数组
    fn trace_indexes(&self, size: usize) -> Vec<usize> {
        let values: Vec<&Value> = match self.context.get("objectWriteTraceId") {
            Some(Value::Array(values)) => values.iter().collect(),
            Some(value) => vec![value],
            None => Vec::new(),
        };
        values
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => s.parse::<usize>().ok(),
                Value::Number(n) => n.as_u64().map(|n| n as usize),
                _ => None,
            })
            .filter(|&i| i < size)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    results: Vec<Created>,
    #[serde(default)]
    errors: Vec<BatchError>,
}

impl BatchResponse {
    /// 按 objectWriteTraceId 把结果对应回输入下标
    ///
    /// 没有追踪ID的结果只在数量与剩余输入一致时按顺序对应；
    /// 无法对应的输入记为失败或省略，调用方不得重新创建。
    fn into_outcome(self, size: usize) -> BatchCreateOutcome {
        let mut slots: Vec<Option<Result<String, String>>> = vec![None; size];

        let mut loose_errors = Vec::new();
        for error in self.errors {
            let indexes = error.trace_indexes(size);
            if indexes.is_empty() {
                loose_errors.push(error.message);
                continue;
            }
            for i in indexes {
                slots[i] = Some(Err(error.message.clone()));
            }
        }

        let mut loose_ids = Vec::new();
        for created in self.results {
            match created
                .trace_id
                .as_deref()
                .and_then(|t| t.parse::<usize>().ok())
                .filter(|&i| i < size)
            {
                Some(i) => slots[i] = Some(Ok(created.id)),
                None => loose_ids.push(created.id),
            }
        }

        let open = slots.iter().filter(|s| s.is_none()).count();
        if !loose_ids.is_empty() && loose_ids.len() == open {
            let mut ids = loose_ids.into_iter();
            for slot in slots.iter_mut().filter(|s| s.is_none()) {
                *slot = ids.next().map(Ok);
            }
        }

        if !loose_errors.is_empty() {
            let message = loose_errors.join("; ");
            for slot in slots.iter_mut().filter(|s| s.is_none()) {
                *slot = Some(Err(message.clone()));
            }
        }

        let mut outcome = BatchCreateOutcome::default();
        for (i, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(id)) => outcome.created.push((i, id)),
                Some(Err(message)) => outcome.failed.push((i, message)),
                None => {}
            }
        }
        outcome
    }
}

/// 一次HTTP请求的描述
struct Call<'a> {
    method: Method,
    path: String,
    query: Vec<(&'a str, String)>,
    body: Option<Value>,
    idempotent: bool,
    multi_status: bool,
}

impl<'a> Call<'a> {
    fn new(method: Method, path: String) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
            idempotent: true,
            multi_status: false,
        }
    }

    fn query(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// 创建类请求，只在服务端确定未处理时重发
    fn creates(mut self) -> Self {
        self.idempotent = false;
        self
    }

    /// 接受207部分成功响应
    fn accepts_multi_status(mut self) -> Self {
        self.multi_status = true;
        self
    }
}

/// CRM v3 REST API 网关
///
/// 读取和更新请求遇到429、5xx、超时按重试策略重试；创建请求只在429或
/// 连接未建立时重发。403映射为权限错误。批量创建的207响应按逐条结果返回。
pub struct HttpCrmGateway {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    object_type: String,
    retry: RetryPolicy,
}

/// 列表接口使用的对象类型ID
fn object_type_id(object_type: &str) -> &str {
    match object_type {
        "contacts" => "0-1",
        "companies" => "0-2",
        "deals" => "0-3",
        other => other,
    }
}

impl HttpCrmGateway {
    pub fn new(settings: &CrmSettings) -> Result<Self, CrmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_token: settings.api_token.clone(),
            object_type: settings.object_type.clone(),
            retry: RetryPolicy::with_max_retries(settings.max_retries),
        })
    }

    /// 替换重试策略
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn objects_path(&self) -> String {
        format!("/crm/v3/objects/{}", self.object_type)
    }

    async fn execute<T>(&self, call: Call<'_>) -> Result<T, CrmError>
    where
        T: DeserializeOwned + Send,
    {
        let resend: fn(&CrmError) -> bool = if call.idempotent {
            CrmError::is_retryable
        } else {
            CrmError::is_safe_to_resend
        };
        self.retry.run(|| self.send_once(&call), resend).await
    }

    async fn send_once<T>(&self, call: &Call<'_>) -> Result<T, CrmError>
    where
        T: DeserializeOwned + Send,
    {
        if self.api_token.trim().is_empty() {
            return Err(CrmError::Config("CRM API token is not configured".to_string()));
        }

        let mut request = self
            .client
            .request(call.method.clone(), format!("{}{}", self.base_url, call.path))
            .bearer_auth(&self.api_token);
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(method = %call.method, path = %call.path, status = status.as_u16(), "CRM call");

        if status == StatusCode::FORBIDDEN {
            return Err(CrmError::PermissionDenied(text));
        }
        if !status.is_success() || (status == StatusCode::MULTI_STATUS && !call.multi_status) {
            return Err(CrmError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| CrmError::InvalidResponse(e.to_string()))
    }

    fn search_body(
        filter_groups: &[Vec<SearchFilter>],
        properties: &[String],
        after: Option<&str>,
    ) -> Value {
        let groups: Vec<Value> = filter_groups
            .iter()
            .map(|filters| {
                let filters: Vec<Value> = filters
                    .iter()
                    .map(|f| {
                        json!({
                            "propertyName": f.property,
                            "operator": f.operator,
                            "value": f.value,
                        })
                    })
                    .collect();
                json!({ "filters": filters })
            })
            .collect();

        let mut body = json!({
            "filterGroups": groups,
            "properties": properties,
            "limit": PAGE_LIMIT,
        });
        if let Some(after) = after {
            body["after"] = json!(after);
        }
        body
    }
}

#[async_trait]
impl CrmGateway for HttpCrmGateway {
    #[instrument(skip(self))]
    async fn list_fields(&self, object_type: &str) -> Result<Vec<CrmField>, CrmError> {
        let page: Paged<CrmField> = self
            .execute(Call::new(
                Method::GET,
                format!("/crm/v3/properties/{}", object_type),
            ))
            .await?;
        Ok(page.results)
    }

    async fn search_by_filters(
        &self,
        filter_groups: &[Vec<SearchFilter>],
        properties: &[String],
    ) -> Result<Vec<CrmRecord>, CrmError> {
        let mut records = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let body = Self::search_body(filter_groups, properties, after.as_deref());
            let page: Paged<CrmRecord> = self
                .execute(Call::new(Method::POST, format!("{}/search", self.objects_path())).json(body))
                .await?;
            after = page.next_cursor();
            records.extend(page.results);
            if after.is_none() {
                return Ok(records);
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_all_paged(&self, properties: &[String]) -> Result<Vec<CrmRecord>, CrmError> {
        let mut records = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let mut call = Call::new(Method::GET, self.objects_path())
                .query("limit", PAGE_LIMIT.to_string())
                .query("properties", properties.join(","));
            if let Some(cursor) = &after {
                call = call.query("after", cursor.clone());
            }

            let page: Paged<CrmRecord> = self.execute(call).await?;
            after = page.next_cursor();
            records.extend(page.results);
            if after.is_none() {
                debug!(count = records.len(), "Read all CRM records");
                return Ok(records);
            }
        }
    }

    async fn create_one(&self, properties: &Properties) -> Result<String, CrmError> {
        let created: Created = self
            .execute(
                Call::new(Method::POST, self.objects_path())
                    .json(json!({ "properties": properties }))
                    .creates(),
            )
            .await?;
        Ok(created.id)
    }

    #[instrument(skip(self, inputs), fields(size = inputs.len()))]
    async fn create_batch(&self, inputs: &[Properties]) -> Result<BatchCreateOutcome, CrmError> {
        let size = inputs.len();
        let inputs: Vec<Value> = inputs
            .iter()
            .enumerate()
            .map(|(i, properties)| {
                json!({ "properties": properties, "objectWriteTraceId": i.to_string() })
            })
            .collect();
        let response: BatchResponse = self
            .execute(
                Call::new(Method::POST, format!("{}/batch/create", self.objects_path()))
                    .json(json!({ "inputs": inputs }))
                    .creates()
                    .accepts_multi_status(),
            )
            .await?;

        let outcome = response.into_outcome(size);
        if !outcome.failed.is_empty() || outcome.created.len() < size {
            debug!(
                created = outcome.created.len(),
                failed = outcome.failed.len(),
                size,
                "Batch create partially succeeded"
            );
        }
        Ok(outcome)
    }

    async fn update_one(&self, id: &str, properties: &Properties) -> Result<(), CrmError> {
        let _: Value = self
            .execute(
                Call::new(Method::PATCH, format!("{}/{}", self.objects_path(), id))
                    .json(json!({ "properties": properties })),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, updates), fields(size = updates.len()))]
    async fn update_batch(&self, updates: &[UpdateRequest]) -> Result<(), CrmError> {
        let inputs: Vec<Value> = updates
            .iter()
            .map(|u| json!({ "id": u.id, "properties": u.properties }))
            .collect();
        let _: Value = self
            .execute(
                Call::new(Method::POST, format!("{}/batch/update", self.objects_path()))
                    .json(json!({ "inputs": inputs })),
            )
            .await?;
        Ok(())
    }

    async fn create_field(
        &self,
        object_type: &str,
        definition: &FieldDefinition,
    ) -> Result<CrmField, CrmError> {
        let body = serde_json::to_value(definition)
            .map_err(|e| CrmError::InvalidResponse(e.to_string()))?;
        self.execute(
            Call::new(Method::POST, format!("/crm/v3/properties/{}", object_type))
                .json(body)
                .creates(),
        )
        .await
    }

    async fn update_field_options(
        &self,
        object_type: &str,
        field_name: &str,
        options: &[FieldOption],
    ) -> Result<CrmField, CrmError> {
        self.execute(
            Call::new(
                Method::PATCH,
                format!("/crm/v3/properties/{}/{}", object_type, field_name),
            )
            .json(json!({ "options": options })),
        )
        .await
    }

    async fn create_filtered_view(
        &self,
        request: &FilteredViewRequest,
    ) -> Result<FilteredView, CrmError> {
        let body = json!({
            "name": request.name,
            "objectTypeId": object_type_id(&request.object_type),
            "processingType": "DYNAMIC",
            "filterBranch": {
                "filterBranchType": "OR",
                "filters": [],
                "filterBranches": [{
                    "filterBranchType": "AND",
                    "filterBranches": [],
                    "filters": [{
                        "filterType": "PROPERTY",
                        "property": request.property,
                        "operation": {
                            "operationType": "ENUMERATION",
                            "operator": "IS_ANY_OF",
                            "values": [request.value],
                        },
                    }],
                }],
            },
        });

        let response: Value = self
            .execute(Call::new(Method::POST, "/crm/v3/lists".to_string()).json(body).creates())
            .await?;

        let list = &response["list"];
        let id = match &list["listId"] {
            Value::String(id) => id.clone(),
            Value::Number(id) => id.to_string(),
            _ => {
                return Err(CrmError::InvalidResponse(
                    "list response without listId".to_string(),
                ))
            }
        };
        let name = list["name"].as_str().unwrap_or(&request.name).to_string();
        Ok(FilteredView { id, name })
    }
}

#[cfg(test)]
#[path = "http_gateway_test.rs"]
mod tests;
