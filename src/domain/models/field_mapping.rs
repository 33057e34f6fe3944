// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

use super::company::ScrapedCompany;

/// 公司记录中可映射的属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyAttribute {
    Name,
    RegistryId,
    PostalCode,
    City,
    Revenue,
    Employees,
    SourceUrl,
}

impl CompanyAttribute {
    /// 读取公司记录中对应属性的值，空值返回 None
    pub fn value<'a>(&self, company: &'a ScrapedCompany) -> Option<&'a str> {
        let value = match self {
            CompanyAttribute::Name => company.name.as_str(),
            CompanyAttribute::RegistryId => company.registry_id.as_str(),
            CompanyAttribute::PostalCode => company.postal_code.as_str(),
            CompanyAttribute::City => company.city.as_str(),
            CompanyAttribute::Revenue => company.revenue.as_deref().unwrap_or_default(),
            CompanyAttribute::Employees => company.employees.as_deref().unwrap_or_default(),
            CompanyAttribute::SourceUrl => company.source_url.as_str(),
        };
        let value = value.trim();
        (!value.is_empty()).then_some(value)
    }
}

/// 用户可编辑的字段映射部分
///
/// `None` 或空字符串表示该属性不导入。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditableFieldMapping {
    pub name: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub revenue: Option<String>,
    pub employees: Option<String>,
}

/// 公司属性到CRM字段的映射
///
/// 注册号和来源URL两个字段由策略固定，不提供修改入口，
/// 以保证导入后的记录始终带有去重键。
#[derive(Debug, Clone, Serialize)]
pub struct FieldMapping {
    name: Option<String>,
    postal_code: Option<String>,
    city: Option<String>,
    revenue: Option<String>,
    employees: Option<String>,
    registry_id: String,
    source_url: String,
}

impl FieldMapping {
    /// 创建映射，固定字段在此确定
    pub fn new(registry_id_field: impl Into<String>, source_url_field: impl Into<String>) -> Self {
        Self {
            name: None,
            postal_code: None,
            city: None,
            revenue: None,
            employees: None,
            registry_id: registry_id_field.into(),
            source_url: source_url_field.into(),
        }
    }

    /// 覆盖全部可编辑字段
    pub fn with_editable(mut self, editable: EditableFieldMapping) -> Self {
        self.name = normalize_target(editable.name);
        self.postal_code = normalize_target(editable.postal_code);
        self.city = normalize_target(editable.city);
        self.revenue = normalize_target(editable.revenue);
        self.employees = normalize_target(editable.employees);
        self
    }

    /// 当前可编辑部分
    pub fn editable(&self) -> EditableFieldMapping {
        EditableFieldMapping {
            name: self.name.clone(),
            postal_code: self.postal_code.clone(),
            city: self.city.clone(),
            revenue: self.revenue.clone(),
            employees: self.employees.clone(),
        }
    }

    pub fn registry_id_field(&self) -> &str {
        &self.registry_id
    }

    pub fn source_url_field(&self) -> &str {
        &self.source_url
    }

    /// 指定属性映射到的CRM字段
    pub fn target(&self, attribute: CompanyAttribute) -> Option<&str> {
        let target = match attribute {
            CompanyAttribute::Name => self.name.as_deref(),
            CompanyAttribute::PostalCode => self.postal_code.as_deref(),
            CompanyAttribute::City => self.city.as_deref(),
            CompanyAttribute::Revenue => self.revenue.as_deref(),
            CompanyAttribute::Employees => self.employees.as_deref(),
            CompanyAttribute::RegistryId => Some(self.registry_id.as_str()),
            CompanyAttribute::SourceUrl => Some(self.source_url.as_str()),
        };
        target.filter(|t| !t.trim().is_empty())
    }

    /// 所有已映射的 (属性, CRM字段) 对
    pub fn targets(&self) -> impl Iterator<Item = (CompanyAttribute, &str)> + '_ {
        [
            CompanyAttribute::Name,
            CompanyAttribute::RegistryId,
            CompanyAttribute::PostalCode,
            CompanyAttribute::City,
            CompanyAttribute::Revenue,
            CompanyAttribute::Employees,
            CompanyAttribute::SourceUrl,
        ]
        .into_iter()
        .filter_map(|attribute| self.target(attribute).map(|t| (attribute, t)))
    }
}

fn normalize_target(target: Option<String>) -> Option<String> {
    target
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
