// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 该模块包含系统的核心业务逻辑服务：
/// - CRM网关（crm_gateway）：CRM访问的抽象接口
/// - 重复检查（duplicate_service）：注册号精确匹配与名称模糊匹配
/// - 批量导入（import_service）：分批写入CRM及字段结构准备
/// - 规范化（normalizer）：注册号与公司名称规范化、相似度计算
/// - 节奏控制（pacing）：模拟人工浏览的随机延迟
pub mod crm_gateway;
pub mod duplicate_service;
pub mod import_service;
pub mod normalizer;
pub mod pacing;
