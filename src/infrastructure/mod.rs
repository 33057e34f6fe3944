// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，提供对具体技术的抽象和封装。
///
/// 包含的子模块：
/// - 缓存（cache）：Redis客户端
/// - CRM（crm）：CRM网关的HTTP实现
/// - 指标（metrics）：Prometheus指标导出
/// - 仓库实现（repositories）：任务仓库的Redis与内存实现
///
/// 基础设施层依赖于领域层的抽象接口，领域层不依赖具体技术实现。
pub mod cache;
pub mod crm;
pub mod metrics;
pub mod repositories;
