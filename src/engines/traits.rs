// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::company::ScrapedCompany;
use async_trait::async_trait;
use thiserror::Error;

/// 页面抓取错误类型
///
/// 单页抓取的失败单元，抓取任务遇到后退避并跳到下一页。
#[derive(Error, Debug)]
pub enum FetchError {
    /// 请求失败（超时、连接中断等）
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 非成功状态码
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },
    /// 查询URL无效
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// 页面解析失败
    #[error("Failed to parse page: {0}")]
    Parse(String),
}

impl FetchError {
    /// 响应状态码（如果有）
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::RequestFailed(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// 解析页面时的上下文
#[derive(Debug, Clone)]
pub struct PageContext {
    /// 当前页面URL，用于解析相对链接和记录来源
    pub page_url: String,
}

/// 结果列表首页的汇总信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingSummary {
    /// 页头报告的公司总数
    pub total_companies: Option<usize>,
    /// 分页链接中出现的最大页码
    pub max_page_link: Option<u32>,
}

/// 首页抓取结果
#[derive(Debug, Clone)]
pub struct FirstPage {
    pub companies: Vec<ScrapedCompany>,
    pub total_companies: usize,
    pub total_pages: u32,
}

/// 结果页抓取器特质
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// 抓取第1页，同时解析公司总数和总页数
    async fn fetch_first_page(&self, query_url: &str) -> Result<FirstPage, FetchError>;

    /// 抓取指定页，referer 为上一页的URL
    async fn fetch_page(
        &self,
        query_url: &str,
        page: u32,
        referer: &str,
    ) -> Result<Vec<ScrapedCompany>, FetchError>;

    /// 抓取器名称
    fn name(&self) -> &'static str;
}

/// HTML字段提取器特质
pub trait HtmlExtractor: Send + Sync {
    /// 从结果页中提取公司记录，无法解析的卡片直接丢弃
    fn extract_companies(&self, html: &str, context: &PageContext) -> Vec<ScrapedCompany>;

    /// 从首页提取公司总数和分页信息
    fn extract_summary(&self, html: &str) -> ListingSummary;
}
