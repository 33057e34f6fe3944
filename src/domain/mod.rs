// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：公司、任务、重复匹配、字段映射等数据结构
/// - 仓库接口（repositories）：任务持久化抽象接口
/// - 服务（services）：重复检查、批量导入和请求节奏等领域服务
///
/// 领域层只依赖抽象接口，具体的存储和CRM实现由基础设施层提供。
pub mod models;
pub mod repositories;
pub mod services;
