// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 抓取到的公司记录
///
/// 由页面抓取器从结果列表的一张卡片中解析得到，创建后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedCompany {
    /// 公司名称
    pub name: String,
    /// 注册号，规范格式 `NNNNNN-NNNN`，无法解析时为空字符串
    pub registry_id: String,
    /// 邮政编码，格式 `NNN NN`
    pub postal_code: String,
    /// 城市
    pub city: String,
    /// 营业额，注册机构未公开时为空
    pub revenue: Option<String>,
    /// 员工人数
    pub employees: Option<String>,
    /// 来源页面URL
    pub source_url: String,
}

impl ScrapedCompany {
    /// 用于日志和错误信息的可读标识
    pub fn label(&self) -> String {
        if self.registry_id.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.registry_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(name: &str, registry_id: &str) -> ScrapedCompany {
        ScrapedCompany {
            name: name.to_string(),
            registry_id: registry_id.to_string(),
            postal_code: String::new(),
            city: String::new(),
            revenue: None,
            employees: None,
            source_url: String::new(),
        }
    }

    #[test]
    fn test_label_includes_registry_id_when_known() {
        assert_eq!(
            company("Falu Plast AB", "556199-8484").label(),
            "Falu Plast AB (556199-8484)"
        );
        assert_eq!(company("Falu Plast AB", "").label(), "Falu Plast AB");
    }
}
