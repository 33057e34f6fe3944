// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::FetchError;
use url::Url;

/// 页码查询参数名
pub const PAGE_PARAM: &str = "page";

fn parse(query_url: &str) -> Result<Url, FetchError> {
    Url::parse(query_url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", query_url, e)))
}

/// 构造指定页的URL
///
/// 替换已有的页码参数，保留其他筛选参数及其顺序。
pub fn page_url(query_url: &str, page: u32) -> Result<String, FetchError> {
    let mut url = parse(query_url)?;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (key, value) in &pairs {
            query.append_pair(key, value);
        }
        query.append_pair(PAGE_PARAM, &page.to_string());
    }
    Ok(url.to_string())
}

/// 第1页使用的 referer：站点根地址
pub fn origin_referer(query_url: &str) -> Result<String, FetchError> {
    let url = parse(query_url)?;
    Ok(format!("{}/", url.origin().ascii_serialization()))
}

/// 两个URL是否属于同一站点（协议、主机和端口相同）
pub fn same_origin(url: &str, site: &str) -> Result<bool, FetchError> {
    Ok(parse(url)?.origin() == parse(site)?.origin())
}

/// 计算总页数
///
/// 先按公司总数和每页条数计算，分页链接报告的页码更大时取更大值。
pub fn compute_total_pages(total_companies: usize, page_size: u32, max_page_link: Option<u32>) -> u32 {
    let computed = if page_size == 0 {
        1
    } else {
        total_companies.div_ceil(page_size as usize).max(1) as u32
    };
    computed.max(max_page_link.unwrap_or(0))
}
