// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 公司（company）：从注册机构结果页抓取到的公司记录
/// - 抓取任务（job）：一次抓取运行的状态、进度和累计结果
/// - 重复匹配（duplicate）：新抓取公司与CRM已有记录的配对
/// - 字段映射（field_mapping）：公司属性到CRM字段的映射
/// - 导入结果（import）：批量导入的统计与失败明细
/// - CRM实体（crm）：与CRM网关交换的记录、字段和选项
pub mod company;
pub mod crm;
pub mod duplicate;
pub mod field_mapping;
pub mod import;
pub mod job;
