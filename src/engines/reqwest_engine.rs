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

use crate::config::settings::RegistrySettings;
use crate::domain::models::company::ScrapedCompany;
use crate::engines::pagination::{compute_total_pages, origin_referer, page_url, same_origin};
use crate::engines::traits::{FetchError, FirstPage, HtmlExtractor, PageContext, PageFetcher};
use crate::engines::user_agents::random_user_agent;
use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA, REFERER,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// 结果页抓取器
///
/// 基于reqwest实现，使用浏览器风格的请求头、随机 User-Agent，
/// 并把上一页作为 referer 以模拟顺序翻页。同一抓取器内共享 cookie。
pub struct RegistryFetcher {
    client: reqwest::Client,
    extractor: Arc<dyn HtmlExtractor>,
    base_url: String,
    page_size: u32,
}

impl RegistryFetcher {
    pub fn new(
        settings: &RegistrySettings,
        extractor: Arc<dyn HtmlExtractor>,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            extractor,
            base_url: settings.base_url.clone(),
            page_size: settings.page_size,
        })
    }

    fn browser_headers(referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("sv-SE,sv;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
        headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
        if let Ok(value) = HeaderValue::from_str(referer) {
            headers.insert(REFERER, value);
        }
        headers
    }

    #[instrument(skip(self, referer))]
    async fn get_html(&self, url: &str, referer: &str) -> Result<String, FetchError> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .headers(Self::browser_headers(referer))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = response.text().await?;
        debug!(
            bytes = html.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched result page"
        );
        Ok(html)
    }
}

#[async_trait]
impl PageFetcher for RegistryFetcher {
    async fn fetch_first_page(&self, query_url: &str) -> Result<FirstPage, FetchError> {
        if !same_origin(query_url, &self.base_url)? {
            return Err(FetchError::InvalidUrl(format!(
                "{} is not on the registry site {}",
                query_url, self.base_url
            )));
        }

        let url = page_url(query_url, 1)?;
        let referer = origin_referer(query_url)?;
        let html = self.get_html(&url, &referer).await?;

        let companies = self
            .extractor
            .extract_companies(&html, &PageContext { page_url: url });
        let summary = self.extractor.extract_summary(&html);
        let total_companies = summary.total_companies.unwrap_or(companies.len());
        let total_pages = compute_total_pages(total_companies, self.page_size, summary.max_page_link);

        Ok(FirstPage {
            companies,
            total_companies,
            total_pages,
        })
    }

    async fn fetch_page(
        &self,
        query_url: &str,
        page: u32,
        referer: &str,
    ) -> Result<Vec<ScrapedCompany>, FetchError> {
        let url = page_url(query_url, page)?;
        let html = self.get_html(&url, referer).await?;
        Ok(self
            .extractor
            .extract_companies(&html, &PageContext { page_url: url }))
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;
