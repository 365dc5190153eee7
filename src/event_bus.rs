// 事件总线 - 存储端到订阅者的行变更分发
//
// 使用 tokio::sync::broadcast 实现发布/订阅
// 两种存储实现共用，订阅者按表名自行过滤

use tokio::sync::broadcast;

use crate::models::RowChange;

/// 变更总线
///
/// 支持多个订阅者同时接收事件
pub struct ChangeBus {
    sender: broadcast::Sender<RowChange>,
}

impl ChangeBus {
    /// 创建新的变更总线
    ///
    /// # 参数
    /// - `capacity`: 事件缓冲区大小，家庭规模 64 足够
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 发布事件
    ///
    /// 如果没有订阅者，事件会被丢弃(这是正常的)
    pub fn publish(&self, change: RowChange) {
        match self.sender.send(change) {
            Ok(receiver_count) => {
                tracing::trace!("变更已发布，订阅者数量: {}", receiver_count);
            }
            Err(_) => {
                tracing::trace!("变更已发布但无订阅者");
            }
        }
    }

    /// 订阅事件
    pub fn subscribe(&self) -> broadcast::Receiver<RowChange> {
        self.sender.subscribe()
    }

    /// 获取当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
