//! 视图模块
//!
//! 会话状态的纯文本渲染，按优先级：
//! - 加载中 / 加载失败时屏蔽所有界面
//! - 操作错误显示为顶部横幅
//! - 当前界面
//! - 清空确认对话框（打开时）

pub mod delete_modal;
pub mod input;
pub mod screens;

pub use delete_modal::{DeleteModal, ModalChoice};
pub use input::{parse, Command};

use crate::controller::SessionState;
use crate::models::Screen;

/// 渲染整个界面
pub fn render(state: &SessionState) -> String {
    if state.is_loading {
        return "Loading...\n".to_string();
    }
    if let Some(error) = &state.load_error {
        return format!("{}\n", error);
    }

    let mut out = String::new();
    if let Some(error) = &state.action_error {
        out.push_str(&format!("! {}\n\n", error));
    }

    let body = match (state.screen, &state.current_user) {
        (Screen::Profiles, _) => screens::profiles(&state.members),
        (Screen::Menu, Some(user)) => screens::menu(user),
        (Screen::Menu, None) => String::new(),
        (Screen::Add, _) => screens::add_item(state),
        (Screen::List, _) => screens::list(state),
    };
    out.push_str(&body);

    let modal = DeleteModal {
        is_open: state.is_delete_modal_open,
    };
    if let Some(dialog) = modal.render() {
        out.push('\n');
        out.push_str(&dialog);
        out.push('\n');
    }

    out
}
