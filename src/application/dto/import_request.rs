// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::field_mapping::EditableFieldMapping;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 导入请求
///
/// 不提供 `mapping` 时使用默认映射。`registry_ids` 只导入选中的公司，
/// `skip_registry_ids` 排除被标记为重复的公司。
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct ImportRequestDto {
    pub mapping: Option<EditableFieldMapping>,
    #[validate(length(min = 1))]
    pub registry_ids: Option<Vec<String>>,
    #[serde(default)]
    pub skip_registry_ids: Vec<String>,
}

/// 更新已匹配记录的请求
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateMatchesRequestDto {
    pub mapping: Option<EditableFieldMapping>,
}
