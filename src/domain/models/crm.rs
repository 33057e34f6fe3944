// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 写入CRM的属性集合
pub type Properties = BTreeMap<String, String>;

/// CRM中的一条记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrmRecord {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, Option<String>>,
}

impl CrmRecord {
    /// 读取属性值，空字符串视为不存在
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// 下拉字段中的一个选项
///
/// 未识别的元数据保存在 `extra` 中，回写时原样带回。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOption {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FieldOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            display_order: None,
            hidden: Some(false),
            description: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// 字段的修改权限元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationMetadata {
    #[serde(default)]
    pub archivable: bool,
    #[serde(default)]
    pub read_only_definition: bool,
    #[serde(default)]
    pub read_only_value: bool,
    #[serde(default)]
    pub read_only_options: Option<bool>,
}

/// CRM字段定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmField {
    pub name: String,
    #[serde(default)]
    pub label: String,
    /// 数据类型，例如 `string`、`number`、`enumeration`
    #[serde(rename = "type", default)]
    pub field_type: String,
    /// 表单控件类型，例如 `text`、`select`、`radio`
    #[serde(rename = "fieldType", default)]
    pub field_type_ui: Option<String>,
    #[serde(default)]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub modification_metadata: Option<ModificationMetadata>,
}

impl CrmField {
    /// 是否为下拉/单选等带选项的字段
    pub fn is_picklist(&self) -> bool {
        self.field_type == "enumeration"
            || matches!(
                self.field_type_ui.as_deref(),
                Some("select") | Some("radio") | Some("checkbox")
            )
    }

    /// 选项列表是否被锁定为只读
    pub fn options_read_only(&self) -> bool {
        self.modification_metadata
            .as_ref()
            .map(|m| m.read_only_definition || m.read_only_options.unwrap_or(false))
            .unwrap_or(false)
    }
}

/// 新建字段的定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(rename = "fieldType")]
    pub field_type_ui: String,
    pub group_name: String,
    #[serde(default)]
    pub options: Vec<FieldOption>,
}

/// 搜索条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub property: String,
    pub operator: String,
    pub value: String,
}

impl SearchFilter {
    pub fn eq(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            operator: "EQ".to_string(),
            value: value.into(),
        }
    }
}

/// 更新请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub id: String,
    pub properties: Properties,
}

/// 批量创建的逐条结果
///
/// 部分成功时已创建的输入和失败的输入分开返回，已创建的输入不能再次提交。
/// 两个列表都不包含的输入结果未知，同样不能再次提交。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchCreateOutcome {
    /// (输入下标, 新记录ID)，按下标升序
    pub created: Vec<(usize, String)>,
    /// (输入下标, 错误信息)，按下标升序
    pub failed: Vec<(usize, String)>,
}

impl BatchCreateOutcome {
    /// 全部创建成功，ID与输入顺序一致
    pub fn all_created(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            created: ids.into_iter().enumerate().collect(),
            failed: Vec::new(),
        }
    }
}

/// 筛选视图创建请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredViewRequest {
    pub name: String,
    pub object_type: String,
    pub property: String,
    pub value: String,
}
