// 命令解析 - 将输入行映射为意图

use super::delete_modal::{DeleteModal, ModalChoice};
use crate::controller::{Intent, SessionState};
use crate::models::Screen;

/// 一行输入的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Intent(Intent),
    /// 名称和提交需要依次派发
    Intents(Vec<Intent>),
    Quit,
    Unknown,
}

/// 按当前界面解析输入
pub fn parse(state: &SessionState, line: &str) -> Command {
    let line = line.trim();
    if matches!(line, "q" | "quit") {
        return Command::Quit;
    }
    if state.is_loading || state.load_error.is_some() {
        return Command::Unknown;
    }

    // 对话框打开时只接受对话框操作
    if state.is_delete_modal_open {
        let modal = DeleteModal { is_open: true };
        let choice = match line {
            "y" | "delete" => ModalChoice::DeleteAll,
            "n" | "cancel" => ModalChoice::Cancel,
            _ => return Command::Unknown,
        };
        return modal
            .on_choice(choice)
            .map(Command::Intent)
            .unwrap_or(Command::Unknown);
    }

    let intent = match state.screen {
        Screen::Profiles => line
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| state.members.get(i))
            .map(|m| Intent::SelectMember(m.id.clone())),
        Screen::Menu => match line {
            "1" | "add" => Some(Intent::OpenAddItem),
            "2" | "list" => Some(Intent::OpenList),
            "s" | "switch" => Some(Intent::SwitchProfile),
            _ => None,
        },
        Screen::Add => return parse_add(line),
        Screen::List => match line {
            "c" | "clear" => Some(Intent::OpenClearDialog),
            "b" | "back" => Some(Intent::BackToMenu),
            _ => None,
        },
    };

    intent.map(Command::Intent).unwrap_or(Command::Unknown)
}

fn parse_add(line: &str) -> Command {
    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    };

    match keyword {
        "name" => Command::Intent(Intent::SetItemName(rest.to_string())),
        "qty" => Command::Intent(Intent::SetQuantity(rest.to_string())),
        "save" if rest.is_empty() => Command::Intent(Intent::SubmitItem),
        // save <名称> 直接设置名称并提交
        "save" => Command::Intents(vec![
            Intent::SetItemName(rest.to_string()),
            Intent::SubmitItem,
        ]),
        "back" | "b" => Command::Intent(Intent::BackToMenu),
        _ => Command::Unknown,
    }
}
