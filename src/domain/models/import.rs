// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

use super::company::ScrapedCompany;

/// 单条记录导入失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportItemError {
    /// 公司名称
    pub company_name: String,
    /// 注册号
    pub registry_id: String,
    /// 错误信息
    pub message: String,
}

impl ImportItemError {
    pub fn new(company: &ScrapedCompany, message: impl Into<String>) -> Self {
        Self {
            company_name: company.name.clone(),
            registry_id: company.registry_id.clone(),
            message: message.into(),
        }
    }
}

/// 已创建的筛选视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredView {
    pub id: String,
    pub name: String,
}

/// 批量导入结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportResult {
    /// 成功数
    pub created: usize,
    /// 失败数
    pub failed: usize,
    /// 失败明细
    pub errors: Vec<ImportItemError>,
    /// 成功写入的CRM记录ID
    pub created_ids: Vec<String>,
    /// 当且仅当失败数为0时为 true
    pub success: bool,
    /// 导入后创建的筛选视图
    pub filtered_view: Option<FilteredView>,
}

impl ImportResult {
    pub fn record_created(&mut self, id: String) {
        self.created += 1;
        self.created_ids.push(id);
    }

    pub fn record_failed(&mut self, error: ImportItemError) {
        self.failed += 1;
        self.errors.push(error);
    }

    /// 根据计数确定最终成功标志
    pub fn finish(mut self) -> Self {
        self.success = self.failed == 0;
        self
    }
}
