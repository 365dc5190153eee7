// 应用状态控制器 - 会话状态机
//
// 控制器以 Actor 形式独占会话状态，所有修改串行执行
// 存储调用在独立任务中运行，结果以消息形式回送
// 状态快照通过 watch 通道发布给视图

pub mod actor;
pub mod handle;

pub use actor::{ControllerActor, ControllerCommand};
pub use handle::ControllerHandle;

use crate::models::{FamilyMember, RationItem, Screen};
use crate::storage::RationRepository;

/// 会话状态
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub screen: Screen,
    pub current_user: Option<FamilyMember>,
    pub items: Vec<RationItem>,
    pub members: Vec<FamilyMember>,
    /// 物品名称输入框
    pub new_item: String,
    /// 数量输入框
    pub quantity: String,
    pub is_loading: bool,
    /// 初始加载失败信息，出现后整个会话只显示错误
    pub load_error: Option<String>,
    /// 添加/清空失败信息，不阻塞后续操作
    pub action_error: Option<String>,
    pub is_delete_modal_open: bool,
    pub is_deleting: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            screen: Screen::Profiles,
            current_user: None,
            items: Vec::new(),
            members: Vec::new(),
            new_item: String::new(),
            quantity: String::new(),
            is_loading: true,
            load_error: None,
            action_error: None,
            is_delete_modal_open: false,
            is_deleting: false,
        }
    }
}

/// 视图发出的用户意图
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// 按成员 ID 选择身份
    SelectMember(String),
    OpenAddItem,
    OpenList,
    SwitchProfile,
    BackToMenu,
    SetItemName(String),
    SetQuantity(String),
    SubmitItem,
    OpenClearDialog,
    CloseClearDialog,
    ConfirmClear,
}

/// 挂载控制器：启动 Actor、初始加载和变更订阅
pub fn mount(repo: RationRepository) -> ControllerHandle {
    let (actor, handle) = ControllerActor::new(repo);
    tokio::spawn(actor.run());
    handle
}

#[cfg(test)]
mod tests;
