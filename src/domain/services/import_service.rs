// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CrmSettings;
use crate::domain::models::company::ScrapedCompany;
use crate::domain::models::crm::{
    CrmField, FieldDefinition, FieldOption, FilteredViewRequest, Properties, UpdateRequest,
};
use crate::domain::models::duplicate::DuplicateMatch;
use crate::domain::models::field_mapping::FieldMapping;
use crate::domain::models::import::{FilteredView, ImportItemError, ImportResult};
use crate::domain::services::crm_gateway::{CrmError, CrmGateway};
use metrics::counter;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// CRM批量接口单次请求的记录上限
pub const MAX_BATCH_SIZE: usize = 100;

/// 字段结构准备错误
///
/// 这些错误都会在提交任何批次之前返回给调用方。
#[derive(Error, Debug)]
pub enum SchemaProvisionError {
    /// 没有修改字段的权限
    #[error("Permission denied while provisioning field '{field}': {message}")]
    PermissionDenied { field: String, message: String },
    /// 字段选项被锁定
    #[error("Options of field '{0}' are read-only")]
    ReadOnly(String),
    /// 字段不存在
    #[error("Field '{0}' does not exist")]
    FieldMissing(String),
    /// 更新请求成功但选项未出现在字段中
    #[error("Option '{value}' was not persisted on field '{field}'")]
    OptionNotPersisted { field: String, value: String },
    /// 其他CRM错误
    #[error("CRM error while provisioning field '{field}': {source}")]
    Crm {
        field: String,
        #[source]
        source: CrmError,
    },
}

impl SchemaProvisionError {
    fn from_crm(field: &str, error: CrmError) -> Self {
        if error.is_permission_denied() {
            SchemaProvisionError::PermissionDenied {
                field: field.to_string(),
                message: error.to_string(),
            }
        } else {
            SchemaProvisionError::Crm {
                field: field.to_string(),
                source: error,
            }
        }
    }
}

/// 批量导入错误
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Schema(#[from] SchemaProvisionError),
}

/// 筛选视图创建失败，不影响导入结果
#[derive(Error, Debug)]
#[error("Filtered view provisioning failed: {0}")]
pub struct ViewProvisionError(#[from] pub CrmError);

/// 下拉选项准备的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionProvision {
    /// 选项已存在
    AlreadyPresent,
    /// 新增了选项
    Added,
    /// 字段不存在，已连同选项一起创建
    FieldCreated,
    /// 字段不是下拉类型，直接写值即可
    NotRequired,
}

/// 用于追溯导入来源的标签
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTag {
    pub value: String,
    pub label: String,
}

/// 下拉字段选项列表的完整快照
///
/// 部分CRM在更新选项时会整体替换列表，因此新增选项必须基于修改前的
/// 完整列表构造，并原样保留每个已有选项的全部元数据。
#[derive(Debug, Clone, PartialEq)]
pub struct OptionListSnapshot {
    field_name: String,
    options: Vec<FieldOption>,
}

impl OptionListSnapshot {
    pub fn capture(field: &CrmField) -> Self {
        Self {
            field_name: field.name.clone(),
            options: field.options.clone(),
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn options(&self) -> &[FieldOption] {
        &self.options
    }

    /// 按值或按标签判断选项是否已存在（忽略大小写和首尾空白）
    pub fn contains(&self, value: &str, label: &str) -> bool {
        let value = value.trim();
        let label = label.trim();
        self.options.iter().any(|o| {
            o.value.trim().eq_ignore_ascii_case(value) || o.label.trim().eq_ignore_ascii_case(label)
        })
    }

    /// 在完整列表末尾追加一个选项，返回用于回写的新列表
    pub fn appended(&self, mut option: FieldOption) -> Vec<FieldOption> {
        let next_order = self
            .options
            .iter()
            .filter_map(|o| o.display_order)
            .max()
            .map(|max| max + 1)
            .unwrap_or(self.options.len() as i32);
        option.display_order = Some(next_order);

        let mut options = self.options.clone();
        options.push(option);
        options
    }
}

/// 导入参数
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// 记录所属的对象类型
    pub object_type: String,
    /// 每批记录数，不超过100
    pub batch_size: usize,
    /// 批次之间的等待时间
    pub batch_delay: Duration,
    /// 来源标签字段，None 表示不打标签
    pub source_field: Option<String>,
    pub source_tag_prefix: String,
    /// 导入全部成功后是否创建筛选视图
    pub create_filtered_view: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            object_type: "companies".to_string(),
            batch_size: MAX_BATCH_SIZE,
            batch_delay: Duration::from_millis(500),
            source_field: Some("registry_import_source".to_string()),
            source_tag_prefix: "registry-import".to_string(),
            create_filtered_view: true,
        }
    }
}

impl ImportOptions {
    pub fn from_settings(settings: &CrmSettings) -> Self {
        let source_field = settings.source_field.trim();
        Self {
            object_type: settings.object_type.clone(),
            batch_size: settings.batch_size.clamp(1, MAX_BATCH_SIZE),
            batch_delay: Duration::from_millis(settings.batch_delay_ms),
            source_field: (!source_field.is_empty()).then(|| source_field.to_string()),
            source_tag_prefix: settings.source_tag_prefix.clone(),
            create_filtered_view: settings.create_filtered_view,
        }
    }
}

/// 批量导入器
///
/// 按固定大小分批创建CRM记录，批量请求失败时逐条重试该批次。
/// 导入器本身不做去重，调用方需先经过重复检查。
pub struct BatchImporter {
    gateway: Arc<dyn CrmGateway>,
    options: ImportOptions,
}

impl BatchImporter {
    pub fn new(gateway: Arc<dyn CrmGateway>, options: ImportOptions) -> Self {
        Self { gateway, options }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// 根据任务ID生成来源标签
    pub fn source_tag(&self, job_id: &str) -> SourceTag {
        SourceTag {
            value: format!("{}-{}", self.options.source_tag_prefix, job_id),
            label: format!("Registry import {}", job_id),
        }
    }

    /// 按字段映射构造写入属性
    ///
    /// 只写入映射目标和值都非空的属性。
    pub fn build_properties(
        &self,
        company: &ScrapedCompany,
        mapping: &FieldMapping,
        tag: Option<&SourceTag>,
    ) -> Properties {
        let mut properties: Properties = mapping
            .targets()
            .filter_map(|(attribute, field)| {
                attribute
                    .value(company)
                    .map(|value| (field.to_string(), value.to_string()))
            })
            .collect();

        if let (Some(tag), Some(field)) = (tag, self.options.source_field.as_ref()) {
            properties.insert(field.clone(), tag.value.clone());
        }
        properties
    }

    /// 批量导入公司
    #[instrument(skip(self, companies, mapping), fields(companies = companies.len()))]
    pub async fn import_batch(
        &self,
        companies: &[ScrapedCompany],
        mapping: &FieldMapping,
        job_id: Option<&str>,
    ) -> Result<ImportResult, ImportError> {
        if companies.is_empty() {
            return Ok(ImportResult::default().finish());
        }

        let tag = job_id.map(|id| self.source_tag(id));
        if let (Some(tag), Some(field)) = (tag.as_ref(), self.options.source_field.as_deref()) {
            let provision = self.ensure_source_field(field, tag).await?;
            debug!(field, ?provision, "Source field ready");
        }

        let mut result = ImportResult::default();
        for (index, chunk) in companies.chunks(self.batch_size()).enumerate() {
            if index > 0 && !self.options.batch_delay.is_zero() {
                tokio::time::sleep(self.options.batch_delay).await;
            }

            let inputs: Vec<Properties> = chunk
                .iter()
                .map(|company| self.build_properties(company, mapping, tag.as_ref()))
                .collect();

            match self.gateway.create_batch(&inputs).await {
                Ok(outcome) => {
                    // 批量接口已处理过的输入不再单独创建
                    let mut created: HashMap<usize, String> =
                        outcome.created.into_iter().collect();
                    let mut failed: HashMap<usize, String> = outcome.failed.into_iter().collect();
                    if created.len() < chunk.len() {
                        warn!(
                            batch = index,
                            size = chunk.len(),
                            created = created.len(),
                            "Batch create partially failed"
                        );
                    }
                    for (i, company) in chunk.iter().enumerate() {
                        if let Some(id) = created.remove(&i) {
                            result.record_created(id);
                        } else if let Some(message) = failed.remove(&i) {
                            result.record_failed(ImportItemError::new(company, message));
                        } else {
                            result.record_failed(ImportItemError::new(
                                company,
                                "Missing from batch create response",
                            ));
                        }
                    }
                }
                Err(e) => {
                    warn!(batch = index, size = chunk.len(), error = %e, "Batch create failed, falling back to individual creates");
                    for (company, properties) in chunk.iter().zip(inputs.iter()) {
                        match self.gateway.create_one(properties).await {
                            Ok(id) => result.record_created(id),
                            Err(e) => {
                                warn!(company = %company.label(), error = %e, "Create failed");
                                result.record_failed(ImportItemError::new(company, e.to_string()));
                            }
                        }
                    }
                }
            }
        }

        counter!("leadrs_crm_created_total").increment(result.created as u64);
        counter!("leadrs_crm_failed_total").increment(result.failed as u64);

        let mut result = result.finish();
        info!(
            created = result.created,
            failed = result.failed,
            "Import finished"
        );

        if result.success && self.options.create_filtered_view {
            if let (Some(tag), Some(field)) = (tag.as_ref(), self.options.source_field.as_deref()) {
                match self.provision_filtered_view(field, tag).await {
                    Ok(view) => result.filtered_view = Some(view),
                    Err(e) => warn!(error = %e, "Import succeeded without filtered view"),
                }
            }
        }

        Ok(result)
    }

    /// 用抓取到的数据更新已匹配的CRM记录
    ///
    /// 同一CRM记录只更新一次，以第一条匹配为准。返回结果中的
    /// `created_ids` 为已更新的记录ID。
    #[instrument(skip(self, matches, mapping), fields(matches = matches.len()))]
    pub async fn update_matched(
        &self,
        matches: &[DuplicateMatch],
        mapping: &FieldMapping,
    ) -> ImportResult {
        let mut seen = HashSet::new();
        let targets: Vec<&DuplicateMatch> = matches
            .iter()
            .filter(|m| seen.insert(m.existing.id.clone()))
            .collect();

        let mut result = ImportResult::default();
        for (index, chunk) in targets.chunks(self.batch_size()).enumerate() {
            if index > 0 && !self.options.batch_delay.is_zero() {
                tokio::time::sleep(self.options.batch_delay).await;
            }

            let updates: Vec<UpdateRequest> = chunk
                .iter()
                .map(|m| UpdateRequest {
                    id: m.existing.id.clone(),
                    properties: self.build_properties(&m.company, mapping, None),
                })
                .collect();

            match self.gateway.update_batch(&updates).await {
                Ok(()) => {
                    for update in updates {
                        result.record_created(update.id);
                    }
                }
                Err(e) => {
                    warn!(batch = index, size = chunk.len(), error = %e, "Batch update failed, falling back to individual updates");
                    for (m, update) in chunk.iter().zip(updates.into_iter()) {
                        match self.gateway.update_one(&update.id, &update.properties).await {
                            Ok(()) => result.record_created(update.id),
                            Err(e) => {
                                result.record_failed(ImportItemError::new(&m.company, e.to_string()))
                            }
                        }
                    }
                }
            }
        }

        let result = result.finish();
        info!(
            updated = result.created,
            failed = result.failed,
            "Update of matched records finished"
        );
        result
    }

    /// 确保下拉字段中存在指定选项
    ///
    /// 先按值和标签检查，只有确实缺失时才追加。回写时带上完整的原有选项列表。
    pub async fn ensure_dropdown_option(
        &self,
        field_name: &str,
        value: &str,
        label: &str,
    ) -> Result<OptionProvision, SchemaProvisionError> {
        let object_type = &self.options.object_type;
        let fields = self
            .gateway
            .list_fields(object_type)
            .await
            .map_err(|e| SchemaProvisionError::from_crm(field_name, e))?;

        let field = fields
            .into_iter()
            .find(|f| f.name == field_name)
            .ok_or_else(|| SchemaProvisionError::FieldMissing(field_name.to_string()))?;

        if !field.is_picklist() {
            return Ok(OptionProvision::NotRequired);
        }

        let snapshot = OptionListSnapshot::capture(&field);
        if snapshot.contains(value, label) {
            return Ok(OptionProvision::AlreadyPresent);
        }
        if field.options_read_only() {
            return Err(SchemaProvisionError::ReadOnly(field_name.to_string()));
        }

        let options = snapshot.appended(FieldOption::new(label, value));
        let updated = self
            .gateway
            .update_field_options(object_type, field_name, &options)
            .await
            .map_err(|e| SchemaProvisionError::from_crm(field_name, e))?;

        if !OptionListSnapshot::capture(&updated).contains(value, label) {
            return Err(SchemaProvisionError::OptionNotPersisted {
                field: field_name.to_string(),
                value: value.to_string(),
            });
        }

        info!(field = field_name, value, "Added dropdown option");
        Ok(OptionProvision::Added)
    }

    /// 确保来源字段及其标签选项存在，字段缺失时创建
    pub async fn ensure_source_field(
        &self,
        field_name: &str,
        tag: &SourceTag,
    ) -> Result<OptionProvision, SchemaProvisionError> {
        match self
            .ensure_dropdown_option(field_name, &tag.value, &tag.label)
            .await
        {
            Err(SchemaProvisionError::FieldMissing(_)) => {
                let mut option = FieldOption::new(&tag.label, &tag.value);
                option.display_order = Some(0);
                let definition = FieldDefinition {
                    name: field_name.to_string(),
                    label: "Registry import source".to_string(),
                    field_type: "enumeration".to_string(),
                    field_type_ui: "select".to_string(),
                    group_name: format!("{}information", singular(&self.options.object_type)),
                    options: vec![option],
                };
                self.gateway
                    .create_field(&self.options.object_type, &definition)
                    .await
                    .map_err(|e| SchemaProvisionError::from_crm(field_name, e))?;

                info!(field = field_name, "Created source field");
                Ok(OptionProvision::FieldCreated)
            }
            other => other,
        }
    }

    async fn provision_filtered_view(
        &self,
        field: &str,
        tag: &SourceTag,
    ) -> Result<FilteredView, ViewProvisionError> {
        let request = FilteredViewRequest {
            name: tag.label.clone(),
            object_type: self.options.object_type.clone(),
            property: field.to_string(),
            value: tag.value.clone(),
        };
        Ok(self.gateway.create_filtered_view(&request).await?)
    }

    fn batch_size(&self) -> usize {
        self.options.batch_size.clamp(1, MAX_BATCH_SIZE)
    }
}

/// companies → company，用于默认字段分组名
fn singular(object_type: &str) -> &str {
    match object_type {
        "companies" => "company",
        "contacts" => "contact",
        "deals" => "deal",
        other => other,
    }
}

#[cfg(test)]
#[path = "import_service_test.rs"]
mod tests;
