// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use async_trait::async_trait;
use redis::AsyncCommands;

/// 任务仓库使用的键值与有序集合操作
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 获取指定键的值，不存在时返回None
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// 永久设置键值对
    async fn set_forever(&self, key: &str, value: &str) -> Result<()>;

    /// 删除多个键，返回实际删除的数量
    async fn del(&self, keys: &[String]) -> Result<usize>;

    /// 向有序集合添加成员（已存在时更新分数）
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()>;

    /// 按分数从高到低列出有序集合的全部成员
    async fn zrevrange_all(&self, key: &str) -> Result<Vec<String>>;

    /// 从有序集合移除成员
    async fn zrem(&self, key: &str, member: &str) -> Result<()>;
}

/// Redis客户端
///
/// 提供任务存储所需的键值与有序集合操作
#[derive(Clone)]
pub struct RedisClient {
    /// Redis客户端
    client: redis::Client,
}

impl RedisClient {
    /// 创建新的Redis客户端实例
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    ///
    /// # 返回值
    ///
    /// * `Ok(RedisClient)` - Redis客户端实例
    /// * `Err(anyhow::Error)` - URL无效
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// 检查连接是否可用
    pub async fn ping(&self) -> Result<()> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<()>(&mut con).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for RedisClient {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = con.get(key).await?;
        Ok(value)
    }

    async fn set_forever(&self, key: &str, value: &str) -> Result<()> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        con.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<usize> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let removed: usize = con.del(keys).await?;
        Ok(removed)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        con.zadd::<_, _, _, ()>(key, member, score).await?;
        Ok(())
    }

    async fn zrevrange_all(&self, key: &str) -> Result<Vec<String>> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let members: Vec<String> = con.zrevrange(key, 0, -1).await?;
        Ok(members)
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<()> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        con.zrem::<_, _, ()>(key, member).await?;
        Ok(())
    }
}
