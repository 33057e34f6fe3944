// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod pagination;
pub mod registry_extractor;
pub mod reqwest_engine;
pub mod traits;
pub mod user_agents;
