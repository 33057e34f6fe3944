// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::company::ScrapedCompany;
use crate::domain::services::normalizer::format_registry_id;
use crate::engines::traits::{FetchError, HtmlExtractor, ListingSummary, PageContext};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static LINK_REGISTRY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{6})-?(\d{4})/?$").expect("valid link id regex"));

static LABELED_REGISTRY_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)org\.?\s*nr\.?:?\s*(\d{6})-?(\d{4})").expect("valid labeled id regex")
});

static POSTAL_CITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{3})\s?(\d{2})\s+(.+)$").expect("valid postal regex"));

static ENTITY_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,3}(?:[\s.]\d{3})+|\d+)\s*(?:företag|träffar|bolag|companies|results)",
    )
    .expect("valid count regex")
});

static PAGE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]page=(\d+)").expect("valid page link regex"));

const REVENUE_LABELS: &[&str] = &["omsättning", "revenue", "turnover"];
const EMPLOYEE_LABELS: &[&str] = &["anställda", "employees"];

/// 提取器使用的CSS选择器
#[derive(Debug, Clone)]
pub struct ExtractorSelectors {
    /// 单个公司卡片
    pub card: String,
    /// 卡片内带链接的公司名称
    pub name_link: String,
    /// 没有链接时的公司名称
    pub name: String,
    /// "NNN NN 城市" 地址块
    pub location: String,
    /// 带标签的属性块
    pub property: String,
    pub property_label: String,
    pub property_value: String,
    /// 公司总数所在元素，先试专用选择器再试通用选择器
    pub count: String,
    pub count_fallback: String,
    /// 分页链接
    pub pagination: String,
}

impl Default for ExtractorSelectors {
    fn default() -> Self {
        Self {
            card: "[data-company-card], .search-result, .company-card".to_string(),
            name_link: "h2 a[href], h3 a[href], a.company-name[href]".to_string(),
            name: "h2, h3, .company-name".to_string(),
            location: ".location, .address, [data-location]".to_string(),
            property: ".property, dl > div".to_string(),
            property_label: ".label, dt".to_string(),
            property_value: ".value, dd".to_string(),
            count: "[data-result-count], .search-result-count".to_string(),
            count_fallback: "h1, h2, header".to_string(),
            pagination: "a[href*='page=']".to_string(),
        }
    }
}

/// 注册机构结果页的HTML提取器
pub struct RegistryHtmlExtractor {
    card: Selector,
    name_link: Selector,
    name: Selector,
    location: Selector,
    property: Selector,
    property_label: Selector,
    property_value: Selector,
    count: Selector,
    count_fallback: Selector,
    pagination: Selector,
}

fn compile(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector)
        .map_err(|e| FetchError::Parse(format!("invalid selector '{}': {}", selector, e)))
}

/// 元素文本，空白合并为单个空格
fn text_of(element: ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 从页头文本解析公司总数，去掉千位分隔符
pub fn parse_entity_count(text: &str) -> Option<usize> {
    let captures = ENTITY_COUNT.captures(text)?;
    let digits: String = captures[1].chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// 从公司链接末尾解析注册号
pub fn registry_id_from_link(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    let captures = LINK_REGISTRY_ID.captures(path)?;
    format_registry_id(&format!("{}{}", &captures[1], &captures[2]))
}

/// 从文本中的 "Org.nr" 标签解析注册号
pub fn registry_id_from_text(text: &str) -> Option<String> {
    let captures = LABELED_REGISTRY_ID.captures(text)?;
    format_registry_id(&format!("{}{}", &captures[1], &captures[2]))
}

/// 拆分 "NNN NN 城市"，没有邮编时整段视为城市
pub fn split_postal_city(text: &str) -> (String, String) {
    let text = text.trim();
    match POSTAL_CITY.captures(text) {
        Some(captures) => (
            format!("{} {}", &captures[1], &captures[2]),
            captures[3].trim().to_string(),
        ),
        None => (String::new(), text.to_string()),
    }
}

impl RegistryHtmlExtractor {
    pub fn new(selectors: &ExtractorSelectors) -> Result<Self, FetchError> {
        Ok(Self {
            card: compile(&selectors.card)?,
            name_link: compile(&selectors.name_link)?,
            name: compile(&selectors.name)?,
            location: compile(&selectors.location)?,
            property: compile(&selectors.property)?,
            property_label: compile(&selectors.property_label)?,
            property_value: compile(&selectors.property_value)?,
            count: compile(&selectors.count)?,
            count_fallback: compile(&selectors.count_fallback)?,
            pagination: compile(&selectors.pagination)?,
        })
    }

    fn parse_card(&self, card: ElementRef, context: &PageContext) -> Option<ScrapedCompany> {
        let link = card.select(&self.name_link).next();
        let name = link
            .map(text_of)
            .filter(|n| !n.is_empty())
            .or_else(|| card.select(&self.name).next().map(text_of))
            .unwrap_or_default();
        let href = link.and_then(|l| l.value().attr("href"));

        let registry_id = href
            .and_then(registry_id_from_link)
            .or_else(|| registry_id_from_text(&text_of(card)))
            .unwrap_or_default();

        if name.is_empty() && registry_id.is_empty() {
            return None;
        }

        let (postal_code, city) = card
            .select(&self.location)
            .next()
            .map(|el| split_postal_city(&text_of(el)))
            .unwrap_or_default();

        let mut revenue = None;
        let mut employees = None;
        for block in card.select(&self.property) {
            let label = block
                .select(&self.property_label)
                .next()
                .map(text_of)
                .unwrap_or_default()
                .to_lowercase();
            let value = block
                .select(&self.property_value)
                .next()
                .map(text_of)
                .filter(|v| !v.is_empty() && v != "-");

            if REVENUE_LABELS.iter().any(|l| label.contains(l)) {
                revenue = revenue.or(value);
            } else if EMPLOYEE_LABELS.iter().any(|l| label.contains(l)) {
                employees = employees.or(value);
            }
        }

        let source_url = href
            .and_then(|h| Url::parse(&context.page_url).ok()?.join(h).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| context.page_url.clone());

        Some(ScrapedCompany {
            name,
            registry_id,
            postal_code,
            city,
            revenue,
            employees,
            source_url,
        })
    }
}

impl HtmlExtractor for RegistryHtmlExtractor {
    fn extract_companies(&self, html: &str, context: &PageContext) -> Vec<ScrapedCompany> {
        let document = Html::parse_document(html);
        document
            .select(&self.card)
            .filter_map(|card| self.parse_card(card, context))
            .collect()
    }

    fn extract_summary(&self, html: &str) -> ListingSummary {
        let document = Html::parse_document(html);

        let total_companies = [&self.count, &self.count_fallback]
            .into_iter()
            .find_map(|selector| {
                document
                    .select(selector)
                    .find_map(|el| parse_entity_count(&text_of(el)))
            });

        let max_page_link = document
            .select(&self.pagination)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| PAGE_LINK.captures(href)?[1].parse::<u32>().ok())
            .max();

        ListingSummary {
            total_companies,
            max_page_link,
        }
    }
}
