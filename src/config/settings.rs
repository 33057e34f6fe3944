// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含服务器、Redis、任务存储、注册机构站点、请求节奏、CRM和指标等配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// Redis配置
    pub redis: RedisSettings,
    /// 任务存储配置
    #[serde(default)]
    pub job_store: JobStoreSettings,
    /// 注册机构站点配置
    #[serde(default)]
    pub registry: RegistrySettings,
    /// 请求节奏配置
    #[serde(default)]
    pub pacing: PacingSettings,
    /// CRM配置
    #[serde(default)]
    pub crm: CrmSettings,
    /// 指标导出配置
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// Redis配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis连接URL
    pub url: String,
    /// 键前缀
    pub key_prefix: String,
}

/// 任务存储后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStoreBackend {
    #[default]
    Redis,
    Memory,
}

/// 任务存储配置设置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobStoreSettings {
    pub backend: JobStoreBackend,
}

/// 注册机构站点配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// 站点根地址，查询URL必须属于该站点
    pub base_url: String,
    /// 每页记录数
    pub page_size: u32,
    /// 单页请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.allabolag.se".to_string(),
            page_size: 10,
            timeout_secs: 30,
        }
    }
}

/// 请求节奏配置设置（毫秒）
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    pub initial_min_ms: u64,
    pub initial_max_ms: u64,
    pub inter_page_min_ms: u64,
    pub inter_page_max_ms: u64,
    /// 翻页停顿翻倍的概率 (0.0-1.0)
    pub long_pause_chance: f64,
    pub reading_min_ms: u64,
    pub reading_max_ms: u64,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            initial_min_ms: 1_000,
            initial_max_ms: 2_000,
            inter_page_min_ms: 2_000,
            inter_page_max_ms: 4_000,
            long_pause_chance: 0.1,
            reading_min_ms: 1_000,
            reading_max_ms: 3_000,
            backoff_min_ms: 5_000,
            backoff_max_ms: 10_000,
        }
    }
}

impl PacingSettings {
    /// 所有延迟为零
    pub fn disabled() -> Self {
        Self {
            initial_min_ms: 0,
            initial_max_ms: 0,
            inter_page_min_ms: 0,
            inter_page_max_ms: 0,
            long_pause_chance: 0.0,
            reading_min_ms: 0,
            reading_max_ms: 0,
            backoff_min_ms: 0,
            backoff_max_ms: 0,
        }
    }
}

/// CRM配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrmSettings {
    /// API根地址
    pub base_url: String,
    /// 私有应用访问令牌，为空时CRM调用会返回认证错误
    pub api_token: String,
    /// 导入的对象类型
    pub object_type: String,
    /// 保存注册号的字段
    pub registry_id_field: String,
    /// 保存来源页面URL的字段
    pub source_url_field: String,
    /// 每批记录数（上限100）
    pub batch_size: usize,
    /// 批次间隔（毫秒）
    pub batch_delay_ms: u64,
    /// 来源标签字段，为空表示不打标签
    pub source_field: String,
    /// 来源标签前缀
    pub source_tag_prefix: String,
    /// 导入全部成功后是否创建筛选视图
    pub create_filtered_view: bool,
    /// 可重试错误的最大重试次数
    pub max_retries: u32,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for CrmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.hubapi.com".to_string(),
            api_token: String::new(),
            object_type: "companies".to_string(),
            registry_id_field: "orgnr".to_string(),
            source_url_field: "registry_url".to_string(),
            batch_size: 100,
            batch_delay_ms: 500,
            source_field: "registry_import_source".to_string(),
            source_tag_prefix: "registry-import".to_string(),
            create_filtered_view: true,
            max_retries: 3,
            timeout_secs: 30,
        }
    }
}

/// 指标导出配置设置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSettings {
    /// Prometheus监听地址，未设置时不导出
    pub listen_addr: Option<String>,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载内置默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 和 `LEADRS__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("LEADRS").separator("__"))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("redis.key_prefix", "leadrs")
    }

    /// 服务器监听地址
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
