// 控制器Handle - 视图与控制器之间的唯一通道

use tokio::sync::{mpsc, oneshot, watch};

use super::{ControllerCommand, Intent, SessionState};

/// 控制器Handle
///
/// drop 时自动卸载控制器
pub struct ControllerHandle {
    sender: mpsc::UnboundedSender<ControllerCommand>,
    state: watch::Receiver<SessionState>,
}

impl ControllerHandle {
    pub(crate) fn new(
        sender: mpsc::UnboundedSender<ControllerCommand>,
        state: watch::Receiver<SessionState>,
    ) -> Self {
        Self { sender, state }
    }

    /// 派发意图，等待其效果（包括存储调用）生效
    pub async fn dispatch(&self, intent: Intent) {
        let _ = self.send(intent).await;
    }

    /// 派发意图但不等待；返回的接收器在效果生效后完成
    ///
    /// 意图按发送顺序处理，控制器停止后接收器立即返回错误
    pub fn send(&self, intent: Intent) -> oneshot::Receiver<()> {
        let (done, rx) = oneshot::channel();
        let _ = self.sender.send(ControllerCommand::Dispatch { intent, done });
        rx
    }

    /// 获取当前状态快照
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// 获取状态变更接收器，用于驱动渲染
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// 等待初始加载结束（成功或失败）
    pub async fn wait_until_loaded(&self) -> SessionState {
        let mut rx = self.state.clone();
        let loaded = rx.wait_for(|s| !s.is_loading).await.map(|s| s.clone());
        loaded.unwrap_or_else(|_| self.snapshot())
    }

    /// 卸载控制器：此后不再有任何状态变化，订阅被释放
    pub async fn unmount(&self) {
        let (reply, rx) = oneshot::channel();
        if self
            .sender
            .send(ControllerCommand::Unmount { reply: Some(reply) })
            .is_ok()
        {
            let _ = rx.await;
        }
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        let _ = self.sender.send(ControllerCommand::Unmount { reply: None });
    }
}
