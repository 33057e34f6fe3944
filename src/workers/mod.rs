// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供抓取任务的执行和生命周期管理
/// 包括逐页抓取、取消、进度推送和优雅关闭
pub mod manager;
pub mod scrape_worker;
