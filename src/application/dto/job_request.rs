// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// 创建抓取任务请求
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateJobRequestDto {
    /// 带筛选条件的结果列表URL
    #[validate(url)]
    pub url: String,
    /// 最多抓取的页数
    #[validate(range(min = 1, max = 10000))]
    pub max_pages: Option<u32>,
}
