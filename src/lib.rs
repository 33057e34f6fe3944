// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含重复检查与导入用例及请求DTO
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// 抓取引擎模块
///
/// 结果页抓取、分页计算和HTML字段提取
pub mod engines;

/// 基础设施模块
///
/// Redis、CRM HTTP接口和指标导出等具体实现
pub mod infrastructure;

/// 表示层模块
///
/// HTTP路由、处理器和错误响应
pub mod presentation;

/// 工具模块
pub mod utils;

/// 工作器模块
///
/// 抓取任务的执行与管理
pub mod workers;
