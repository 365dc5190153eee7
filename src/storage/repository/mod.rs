// Repository 抽象层 - 托管存储的通用查询接口

pub mod memory;
pub mod postgrest;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use super::error::StoreError;
use crate::models::RowChange;

/// 排序条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: false,
        }
    }
}

/// 删除条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// 列非空，对带主键的表等价于恒真
    NotNull(String),
}

/// 存储操作接口 - 所有存储实现必须实现此 trait
#[async_trait]
pub trait DataStore: Send + Sync {
    /// 查询整表，可选排序
    async fn select(&self, table: &str, order: Option<&Order>) -> Result<Vec<Value>, StoreError>;

    /// 插入一行并返回存储后的行（含存储端分配的字段）
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError>;

    /// 删除满足条件的所有行
    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), StoreError>;

    /// 订阅指定表的行变更
    ///
    /// 返回的接收器可能也会收到其他表的事件，调用方按表名过滤
    fn subscribe(&self, table: &str) -> broadcast::Receiver<RowChange>;

    /// 获取存储类型标识
    fn store_type(&self) -> &str;
}
