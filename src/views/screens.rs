// 四个界面的文本渲染

use std::fmt::Write;

use crate::controller::SessionState;
use crate::models::{FamilyMember, RationItem};

pub fn profiles(members: &[FamilyMember]) -> String {
    let mut out = String::from("Who are you?\n\n");
    for (index, member) in members.iter().enumerate() {
        let _ = writeln!(out, "  [{}] {}", index + 1, member.name);
    }
    if members.is_empty() {
        out.push_str("  (no family members)\n");
    }
    out
}

pub fn menu(user: &FamilyMember) -> String {
    format!(
        "Hello, {}!\n\n  [1] Add Item\n  [2] View List\n\n  [s] Switch Profile\n",
        user.name
    )
}

pub fn add_item(state: &SessionState) -> String {
    let field = |value: &str, placeholder: &str| {
        if value.is_empty() {
            format!("<{}>", placeholder)
        } else {
            value.to_string()
        }
    };

    format!(
        "Add Item\n\n  Name:     {}\n  Quantity: {}\n\n  name <text>  set item name\n  qty <text>   set quantity\n  save         Add to List\n  back         Back to Menu\n",
        field(&state.new_item, "Enter item name"),
        field(&state.quantity, "Quantity (optional)"),
    )
}

pub fn list(state: &SessionState) -> String {
    let mut out = String::from("Ration List\n\n");

    if state.items.is_empty() {
        out.push_str("  No items in the list\n");
    } else {
        for item in &state.items {
            out.push_str(&item_card(item));
        }
        let label = if state.is_deleting {
            "Clearing..."
        } else {
            "[c] Clear List"
        };
        let _ = writeln!(out, "\n  {}", label);
    }

    out.push_str("  [b] Back to Menu\n");
    out
}

fn item_card(item: &RationItem) -> String {
    let mut card = format!("  - {}\n", item.name);
    if let Some(quantity) = item.quantity.as_deref().filter(|q| !q.is_empty()) {
        let _ = writeln!(card, "      Quantity: {}", quantity);
    }
    let _ = writeln!(card, "      Added by {}", item.added_by);
    card
}
