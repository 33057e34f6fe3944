// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 提供任务仓库接口的Redis实现与内存实现
pub mod memory_job_repo;
pub mod redis_job_repo;
