// Controller Actor - 使用Actor模式管理会话状态
//
// 用消息传递替代 Arc<Mutex<SessionState>>，卸载后忽略所有状态修改

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use super::{ControllerHandle, Intent, SessionState};
use crate::models::{FamilyMember, NewRationItem, RationItem, Screen};
use crate::storage::{RationRepository, StoreError, Subscription};

/// 数量留空时的默认值
const DEFAULT_QUANTITY: &str = "1";

/// 控制器命令
pub enum ControllerCommand {
    /// 用户意图，效果完全生效后回复 done
    Dispatch {
        intent: Intent,
        done: oneshot::Sender<()>,
    },

    /// 初始加载完成
    InitialLoaded {
        items: Result<Vec<RationItem>, StoreError>,
        members: Result<Vec<FamilyMember>, StoreError>,
    },

    /// 订阅推送的完整清单
    ItemsPushed { items: Vec<RationItem> },

    /// 物品已写入存储
    ItemAdded { item: RationItem },

    /// 添加流程结束（含显式刷新）
    AddFinished {
        result: Result<Vec<RationItem>, StoreError>,
        done: oneshot::Sender<()>,
    },

    /// 清空流程结束
    ClearFinished {
        result: Result<(), StoreError>,
        done: oneshot::Sender<()>,
    },

    /// 卸载
    Unmount { reply: Option<oneshot::Sender<()>> },
}

/// 控制器Actor
pub struct ControllerActor {
    receiver: mpsc::UnboundedReceiver<ControllerCommand>,
    /// 派发给后台任务的回送通道，弱引用以免阻止 Actor 退出
    sender: mpsc::WeakUnboundedSender<ControllerCommand>,
    repo: RationRepository,
    state: watch::Sender<SessionState>,
    subscription: Option<Subscription>,
    mounted: bool,
}

impl ControllerActor {
    /// 创建新的Actor
    pub fn new(repo: RationRepository) -> (Self, ControllerHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::default());

        let actor = Self {
            receiver,
            sender: sender.downgrade(),
            repo,
            state: state_tx,
            subscription: None,
            mounted: true,
        };
        let handle = ControllerHandle::new(sender, state_rx);
        (actor, handle)
    }

    /// 运行Actor
    pub async fn run(mut self) {
        info!("控制器已启动");
        self.start();

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                ControllerCommand::Dispatch { intent, done } => {
                    self.handle_intent(intent, done);
                }

                ControllerCommand::InitialLoaded { items, members } => {
                    self.apply_initial_load(items, members);
                }

                ControllerCommand::ItemsPushed { items } => {
                    debug!("收到推送清单: {} 个物品", items.len());
                    self.update(|s| s.items = items);
                }

                ControllerCommand::ItemAdded { item } => {
                    info!("已添加物品: {} ({})", item.name, item.added_by);
                    self.update(|s| {
                        s.new_item.clear();
                        s.quantity.clear();
                    });
                }

                ControllerCommand::AddFinished { result, done } => {
                    match result {
                        Ok(items) => self.update(|s| {
                            s.items = items;
                            s.action_error = None;
                        }),
                        Err(e) => {
                            let message = error_message(&e, "Failed to add item");
                            warn!("添加物品失败: {}", message);
                            self.update(|s| s.action_error = Some(message));
                        }
                    }
                    let _ = done.send(());
                }

                ControllerCommand::ClearFinished { result, done } => {
                    match result {
                        Ok(()) => self.update(|s| {
                            s.items.clear();
                            s.is_delete_modal_open = false;
                            s.action_error = None;
                        }),
                        Err(e) => {
                            let message = error_message(&e, "Failed to clear list");
                            self.update(|s| s.action_error = Some(message));
                        }
                    }
                    self.update(|s| s.is_deleting = false);
                    let _ = done.send(());
                }

                ControllerCommand::Unmount { reply } => {
                    self.unmount();
                    if let Some(reply) = reply {
                        let _ = reply.send(());
                    }
                }
            }
        }

        info!("控制器已停止");
    }

    /// 挂载：并发请求物品和成员，同时打开唯一的变更订阅
    fn start(&mut self) {
        let Some(sender) = self.sender.upgrade() else {
            return;
        };

        let push_sender = sender.clone();
        self.subscription = Some(self.repo.subscribe_to_changes(move |items| {
            let _ = push_sender.send(ControllerCommand::ItemsPushed { items });
        }));

        let repo = self.repo.clone();
        tokio::spawn(async move {
            let (items, members) = tokio::join!(repo.list_items(), repo.list_members());
            let _ = sender.send(ControllerCommand::InitialLoaded { items, members });
        });
    }

    fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        info!("控制器已卸载");
    }

    /// 修改状态并通知视图；卸载后忽略
    fn update<F: FnOnce(&mut SessionState)>(&self, f: F) {
        if !self.mounted {
            debug!("控制器已卸载，忽略状态更新");
            return;
        }
        self.state.send_modify(f);
    }

    fn apply_initial_load(
        &self,
        items: Result<Vec<RationItem>, StoreError>,
        members: Result<Vec<FamilyMember>, StoreError>,
    ) {
        match (items, members) {
            (Ok(items), Ok(members)) => {
                debug!("已加载 {} 个物品, {} 位成员", items.len(), members.len());
                self.update(|s| {
                    s.items = items;
                    s.members = members;
                    s.is_loading = false;
                });
            }
            (Err(e), _) | (_, Err(e)) => {
                let message = error_message(&e, "An error occurred");
                warn!("初始加载失败: {}", message);
                self.update(|s| {
                    s.load_error = Some(message);
                    s.is_loading = false;
                });
            }
        }
    }

    fn handle_intent(&mut self, intent: Intent, done: oneshot::Sender<()>) {
        let blocked = {
            let s = self.state.borrow();
            !self.mounted || s.is_loading || s.load_error.is_some()
        };
        if blocked {
            debug!("当前不可交互，忽略意图: {:?}", intent);
            let _ = done.send(());
            return;
        }

        match intent {
            Intent::SubmitItem => return self.submit_item(done),
            Intent::ConfirmClear => return self.confirm_clear(done),
            Intent::SelectMember(id) => {
                let member = {
                    let s = self.state.borrow();
                    (s.screen == Screen::Profiles)
                        .then(|| s.members.iter().find(|m| m.id == id).cloned())
                        .flatten()
                };
                if let Some(member) = member {
                    info!("当前用户: {}", member.name);
                    self.update(|s| {
                        s.current_user = Some(member);
                        s.screen = Screen::Menu;
                    });
                }
            }
            Intent::OpenAddItem => self.navigate(Screen::Menu, Screen::Add),
            Intent::OpenList => self.navigate(Screen::Menu, Screen::List),
            Intent::BackToMenu => {
                let screen = self.state.borrow().screen;
                if matches!(screen, Screen::Add | Screen::List) {
                    self.update(|s| s.screen = Screen::Menu);
                }
            }
            Intent::SwitchProfile => {
                let screen = self.state.borrow().screen;
                if screen == Screen::Menu {
                    self.update(|s| {
                        s.current_user = None;
                        s.screen = Screen::Profiles;
                    });
                }
            }
            Intent::SetItemName(name) => self.update(|s| s.new_item = name),
            Intent::SetQuantity(quantity) => self.update(|s| s.quantity = quantity),
            Intent::OpenClearDialog => {
                let allowed = {
                    let s = self.state.borrow();
                    s.screen == Screen::List && !s.items.is_empty() && !s.is_deleting
                };
                if allowed {
                    self.update(|s| s.is_delete_modal_open = true);
                }
            }
            Intent::CloseClearDialog => self.update(|s| s.is_delete_modal_open = false),
        }

        let _ = done.send(());
    }

    /// 菜单跳转需要当前用户
    fn navigate(&self, from: Screen, to: Screen) {
        let allowed = {
            let s = self.state.borrow();
            s.screen == from && s.current_user.is_some()
        };
        if allowed {
            self.update(|s| s.screen = to);
        }
    }

    /// 添加物品：名称为空或未选用户时不做任何事
    ///
    /// 成功后清空输入框，再显式拉取一次完整清单（不依赖订阅）
    fn submit_item(&self, done: oneshot::Sender<()>) {
        let (name, quantity, user) = {
            let s = self.state.borrow();
            (s.new_item.clone(), s.quantity.clone(), s.current_user.clone())
        };

        // 仅用去空白后的名称判断是否为空，写入时保留原始输入
        let Some(user) = user.filter(|_| !name.trim().is_empty()) else {
            let _ = done.send(());
            return;
        };
        let Some(sender) = self.sender.upgrade() else {
            let _ = done.send(());
            return;
        };

        let quantity = if quantity.trim().is_empty() {
            DEFAULT_QUANTITY.to_string()
        } else {
            quantity
        };
        let new_item = NewRationItem {
            name,
            quantity: Some(quantity),
            added_by: user.name,
        };

        let repo = self.repo.clone();
        tokio::spawn(async move {
            let result = async {
                let item = repo.add_item(new_item).await?;
                let _ = sender.send(ControllerCommand::ItemAdded { item });
                repo.list_items().await
            }
            .await;
            let _ = sender.send(ControllerCommand::AddFinished { result, done });
        });
    }

    /// 确认清空：对话框未打开或正在删除时忽略
    fn confirm_clear(&self, done: oneshot::Sender<()>) {
        let allowed = {
            let s = self.state.borrow();
            s.is_delete_modal_open && !s.is_deleting
        };
        if !allowed {
            let _ = done.send(());
            return;
        }
        let Some(sender) = self.sender.upgrade() else {
            let _ = done.send(());
            return;
        };

        self.update(|s| s.is_deleting = true);

        let repo = self.repo.clone();
        tokio::spawn(async move {
            let result = repo.clear_list().await;
            let _ = sender.send(ControllerCommand::ClearFinished { result, done });
        });
    }
}

/// 错误文本为空时使用兜底文案
fn error_message(error: &StoreError, fallback: &str) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
