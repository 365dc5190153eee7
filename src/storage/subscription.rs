// 变更订阅句柄 - 可取消的事件流

use tokio::task::JoinHandle;
use tracing::debug;

/// 变更订阅
///
/// `cancel` 幂等；drop 时自动取消
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// 释放订阅，重复调用无副作用
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("变更订阅已释放");
        }
    }

    /// 是否仍处于活动状态
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
