// 清空确认对话框 - 无状态，仅由 is_open 决定

use crate::controller::Intent;

/// 对话框按钮
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalChoice {
    Cancel,
    DeleteAll,
}

/// 清空确认对话框
pub struct DeleteModal {
    pub is_open: bool,
}

impl DeleteModal {
    /// 关闭时不渲染任何内容
    pub fn render(&self) -> Option<String> {
        if !self.is_open {
            return None;
        }

        Some(
            [
                "+--------------------------------------------------------------+",
                "| Clear List                                                   |",
                "|                                                              |",
                "| Are you sure you want to clear the entire list?              |",
                "| This action cannot be undone.                                |",
                "|                                                              |",
                "|   [n] Cancel                              [y] Delete All     |",
                "+--------------------------------------------------------------+",
            ]
            .join("\n"),
        )
    }

    /// 按钮映射为意图：Cancel 关闭，Delete All 确认
    pub fn on_choice(&self, choice: ModalChoice) -> Option<Intent> {
        if !self.is_open {
            return None;
        }
        Some(match choice {
            ModalChoice::Cancel => Intent::CloseClearDialog,
            ModalChoice::DeleteAll => Intent::ConfirmClear,
        })
    }
}
