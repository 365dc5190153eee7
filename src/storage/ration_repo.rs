// 数据访问层 - 清单物品与家庭成员的四个操作和一个变更订阅

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use super::error::StoreError;
use super::repository::{DataStore, Filter, Order};
use super::subscription::Subscription;
use crate::models::{FamilyMember, NewRationItem, RationItem, ITEMS_TABLE, MEMBERS_TABLE};

/// 清单仓库
///
/// 克隆开销很小，内部共享同一个存储实例
#[derive(Clone)]
pub struct RationRepository {
    store: Arc<dyn DataStore>,
}

impl RationRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// 获取全部物品，按创建时间倒序
    pub async fn list_items(&self) -> Result<Vec<RationItem>, StoreError> {
        let rows = self
            .store
            .select(ITEMS_TABLE, Some(&Order::desc("created_at")))
            .await?;
        decode_rows(rows)
    }

    /// 获取全部家庭成员
    pub async fn list_members(&self) -> Result<Vec<FamilyMember>, StoreError> {
        let rows = self.store.select(MEMBERS_TABLE, None).await?;
        decode_rows(rows)
    }

    /// 添加物品，返回存储后的行
    ///
    /// 名称非空由调用方保证
    pub async fn add_item(&self, item: NewRationItem) -> Result<RationItem, StoreError> {
        let row = serde_json::to_value(&item)?;
        let stored = self.store.insert(ITEMS_TABLE, row).await?;
        let added: RationItem = serde_json::from_value(stored)?;
        debug!("已添加物品: {:?}", added);
        Ok(added)
    }

    /// 清空物品表
    pub async fn clear_list(&self) -> Result<(), StoreError> {
        self.store
            .delete(ITEMS_TABLE, &Filter::NotNull("id".to_string()))
            .await
            .map_err(|e| {
                error!("清空清单失败: {}", e);
                e
            })
    }

    /// 订阅物品表变更
    ///
    /// 每个事件重新拉取一次完整清单并回调；拉取失败只记录日志
    pub fn subscribe_to_changes<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Vec<RationItem>) + Send + Sync + 'static,
    {
        let mut receiver = self.store.subscribe(ITEMS_TABLE);
        let repo = self.clone();

        let task = tokio::spawn(async move {
            info!("已订阅 {} 变更 ({})", ITEMS_TABLE, repo.store.store_type());
            loop {
                match receiver.recv().await {
                    Ok(change) if change.table != ITEMS_TABLE => continue,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("变更事件积压，跳过 {} 条，按一次变更处理", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }

                match repo.list_items().await {
                    Ok(items) => callback(items),
                    Err(e) => warn!("变更后重新拉取清单失败: {}", e),
                }
            }
        });

        Subscription::new(task)
    }
}

fn decode_rows<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(StoreError::from))
        .collect()
}
