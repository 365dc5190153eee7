// 数据模型模块 - 定义所有的数据结构

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 物品表名
pub const ITEMS_TABLE: &str = "ration_items";
/// 家庭成员表名
pub const MEMBERS_TABLE: &str = "family_members";

/// 清单物品
///
/// `id` 和 `created_at` 由存储端分配，创建后不可修改，只会被整表清空删除
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RationItem {
    pub id: String,
    pub name: String,
    /// 自由文本数量，不做解析
    #[serde(default)]
    pub quantity: Option<String>,
    /// 添加者的显示名
    pub added_by: String,
    pub created_at: DateTime<Utc>,
}

/// 新增物品的插入载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRationItem {
    pub name: String,
    pub quantity: Option<String>,
    pub added_by: String,
}

/// 家庭成员（只读）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub id: String,
    pub name: String,
}

/// 界面枚举
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    /// 选择身份
    #[default]
    Profiles,
    /// 主菜单
    Menu,
    /// 添加物品
    Add,
    /// 查看清单
    List,
}

/// 行变更类型（物品创建后不可修改，只有插入和删除）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Delete,
}

/// 存储端推送的行变更事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowChange {
    pub table: String,
    pub kind: ChangeKind,
}

impl RowChange {
    pub fn new(table: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            table: table.into(),
            kind,
        }
    }
}
