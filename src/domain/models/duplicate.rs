// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

use super::company::ScrapedCompany;

/// 重复匹配类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// 规范化注册号完全一致
    ExactKey,
    /// 规范化名称相似度达到阈值
    FuzzyName,
}

/// CRM中已有公司的引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmCompanyRef {
    /// CRM记录ID
    pub id: String,
    /// 显示名称
    pub name: String,
    /// 域名
    pub domain: Option<String>,
    /// 注册号（按CRM中保存的原样）
    pub registry_id: Option<String>,
}

/// 一条重复匹配结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateMatch {
    /// 新抓取的公司
    pub company: ScrapedCompany,
    /// 匹配到的CRM公司
    pub existing: CrmCompanyRef,
    /// 匹配类型
    pub kind: MatchKind,
    /// 名称相似度 (0.0-1.0)，仅模糊匹配时存在
    pub similarity: Option<f64>,
}

impl DuplicateMatch {
    /// 用于排序的置信度，精确匹配视为1.0
    pub fn confidence(&self) -> f64 {
        match self.kind {
            MatchKind::ExactKey => 1.0,
            MatchKind::FuzzyName => self.similarity.unwrap_or(0.0),
        }
    }
}
