// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::company::ScrapedCompany;
use crate::domain::models::crm::{CrmRecord, SearchFilter};
use crate::domain::models::duplicate::{CrmCompanyRef, DuplicateMatch, MatchKind};
use crate::domain::services::crm_gateway::{CrmError, CrmGateway};
use crate::domain::services::normalizer::{
    format_registry_id, normalize_company_name, registry_key, similarity,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// 模糊匹配阈值 (0.0-1.0)
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.75;

/// 重复匹配器
///
/// 先按规范化注册号做精确匹配，再对剩余公司按规范化名称做模糊匹配。
/// 纯计算，不访问网络。
#[derive(Debug, Clone)]
pub struct DuplicateMatcher {
    threshold: f64,
}

impl Default for DuplicateMatcher {
    fn default() -> Self {
        Self {
            threshold: FUZZY_MATCH_THRESHOLD,
        }
    }
}

impl DuplicateMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 匹配新抓取的公司与CRM中已有的公司
    ///
    /// # 返回值
    ///
    /// 精确匹配在前，模糊匹配按相似度降序排列
    pub fn find_matches(
        &self,
        companies: &[ScrapedCompany],
        existing: &[CrmCompanyRef],
    ) -> Vec<DuplicateMatch> {
        // 同一键出现多次时保留第一条
        let mut by_key: HashMap<String, usize> = HashMap::new();
        for (idx, entity) in existing.iter().enumerate() {
            if let Some(key) = entity.registry_id.as_deref().and_then(registry_key) {
                by_key.entry(key).or_insert(idx);
            }
        }

        let mut claimed = vec![false; existing.len()];
        let mut matches = Vec::new();
        let mut remaining = Vec::new();

        for company in companies {
            let hit = registry_key(&company.registry_id).and_then(|key| by_key.get(&key).copied());
            match hit {
                Some(idx) => {
                    claimed[idx] = true;
                    matches.push(DuplicateMatch {
                        company: company.clone(),
                        existing: existing[idx].clone(),
                        kind: MatchKind::ExactKey,
                        similarity: None,
                    });
                }
                None => remaining.push(company),
            }
        }

        let candidates: Vec<(usize, String)> = existing
            .iter()
            .enumerate()
            .filter(|(idx, _)| !claimed[*idx])
            .map(|(idx, entity)| (idx, normalize_company_name(&entity.name)))
            .filter(|(_, name)| !name.is_empty())
            .collect();

        for company in remaining {
            let name = normalize_company_name(&company.name);
            if name.is_empty() {
                continue;
            }

            let mut best: Option<(usize, f64)> = None;
            for (idx, candidate) in &candidates {
                let score = similarity(&name, candidate);
                match best {
                    Some((_, top)) if score <= top => {}
                    _ => best = Some((*idx, score)),
                }
            }

            if let Some((idx, score)) = best.filter(|(_, score)| *score >= self.threshold) {
                matches.push(DuplicateMatch {
                    company: company.clone(),
                    existing: existing[idx].clone(),
                    kind: MatchKind::FuzzyName,
                    similarity: Some(score),
                });
            }
        }

        matches.sort_by(|a, b| {
            kind_rank(a.kind)
                .cmp(&kind_rank(b.kind))
                .then_with(|| b.confidence().total_cmp(&a.confidence()))
        });
        matches
    }
}

fn kind_rank(kind: MatchKind) -> u8 {
    match kind {
        MatchKind::ExactKey => 0,
        MatchKind::FuzzyName => 1,
    }
}

/// 重复检查服务
///
/// 从CRM读取全部公司（仅名称、域名和注册号字段），交给匹配器计算重复。
pub struct DuplicateService {
    gateway: Arc<dyn CrmGateway>,
    matcher: DuplicateMatcher,
    name_field: String,
    domain_field: String,
}

impl DuplicateService {
    pub fn new(gateway: Arc<dyn CrmGateway>) -> Self {
        Self {
            gateway,
            matcher: DuplicateMatcher::new(),
            name_field: "name".to_string(),
            domain_field: "domain".to_string(),
        }
    }

    /// 读取CRM中的全部公司
    pub async fn load_existing(&self, key_field: &str) -> Result<Vec<CrmCompanyRef>, CrmError> {
        let properties = vec![
            self.name_field.clone(),
            self.domain_field.clone(),
            key_field.to_string(),
        ];
        let records = self.gateway.get_all_paged(&properties).await?;
        debug!(count = records.len(), "Loaded existing CRM companies");

        Ok(records
            .iter()
            .map(|record| self.to_ref(record, key_field))
            .collect())
    }

    /// 对一批公司做重复检查
    #[instrument(skip(self, companies), fields(companies = companies.len()))]
    pub async fn check(
        &self,
        companies: &[ScrapedCompany],
        key_field: &str,
    ) -> Result<Vec<DuplicateMatch>, CrmError> {
        let existing = self.load_existing(key_field).await?;
        let matches = self.matcher.find_matches(companies, &existing);

        let exact = matches
            .iter()
            .filter(|m| m.kind == MatchKind::ExactKey)
            .count();
        info!(
            existing = existing.len(),
            exact,
            fuzzy = matches.len() - exact,
            "Duplicate check finished"
        );
        Ok(matches)
    }

    /// 按注册号查找单个公司
    ///
    /// 同时按规范格式和纯数字格式搜索，不读取全部公司。
    pub async fn find_by_registry_id(
        &self,
        registry_id: &str,
        key_field: &str,
    ) -> Result<Vec<CrmCompanyRef>, CrmError> {
        let Some(key) = registry_key(registry_id) else {
            return Ok(Vec::new());
        };

        let mut groups = vec![vec![SearchFilter::eq(key_field, key.clone())]];
        if let Some(formatted) = format_registry_id(&key) {
            groups.push(vec![SearchFilter::eq(key_field, formatted)]);
        }

        let properties = vec![
            self.name_field.clone(),
            self.domain_field.clone(),
            key_field.to_string(),
        ];
        let records = self.gateway.search_by_filters(&groups, &properties).await?;

        Ok(records
            .iter()
            .map(|record| self.to_ref(record, key_field))
            .filter(|entity| entity.registry_id.as_deref().and_then(registry_key) == Some(key.clone()))
            .collect())
    }

    fn to_ref(&self, record: &CrmRecord, key_field: &str) -> CrmCompanyRef {
        CrmCompanyRef {
            id: record.id.clone(),
            name: record
                .property(&self.name_field)
                .unwrap_or_default()
                .to_string(),
            domain: record.property(&self.domain_field).map(str::to_string),
            registry_id: record.property(key_field).map(str::to_string),
        }
    }
}

#[cfg(test)]
#[path = "duplicate_service_test.rs"]
mod tests;
