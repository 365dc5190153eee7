// 控制器场景测试

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Semaphore};

use super::*;
use crate::models::{RowChange, ITEMS_TABLE, MEMBERS_TABLE};
use crate::storage::repository::{DataStore, Filter, Order};
use crate::storage::{MemoryStore, StoreError};

/// 测试用存储：包装内存存储，支持计数、闸门和故障注入
#[derive(Default)]
struct TestStore {
    inner: MemoryStore,
    item_selects: AtomicUsize,
    inserts: AtomicUsize,
    /// 设置后，物品查询需先获取许可
    gate: Option<Arc<Semaphore>>,
    fail_members: AtomicBool,
    fail_insert: AtomicBool,
    fail_delete: AtomicBool,
}

impl TestStore {
    fn with_members(names: &[&str]) -> Self {
        let store = Self::default();
        store.seed_members(names);
        store
    }

    fn seed_members(&self, names: &[&str]) {
        let rows = names
            .iter()
            .enumerate()
            .map(|(i, name)| json!({ "id": format!("m{}", i + 1), "name": name }))
            .collect();
        self.inner.seed(MEMBERS_TABLE, rows);
    }

    fn seed_items(&self, count: usize) {
        let rows = (0..count)
            .map(|i| {
                json!({
                    "id": format!("i{}", i),
                    "name": format!("Item {}", i),
                    "quantity": null,
                    "added_by": "Alice",
                    "created_at": format!("2024-05-01T10:00:0{}.000000Z", i),
                })
            })
            .collect();
        self.inner.seed(ITEMS_TABLE, rows);
    }
}

#[async_trait]
impl DataStore for TestStore {
    async fn select(&self, table: &str, order: Option<&Order>) -> Result<Vec<Value>, StoreError> {
        if table == ITEMS_TABLE {
            self.item_selects.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await;
            }
        }
        if table == MEMBERS_TABLE && self.fail_members.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 401,
                message: "Invalid API key".to_string(),
            });
        }
        self.inner.select(table, order).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("insert rejected".to_string()));
        }
        self.inner.insert(table, row).await
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), StoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("delete rejected".to_string()));
        }
        self.inner.delete(table, filter).await
    }

    fn subscribe(&self, table: &str) -> broadcast::Receiver<RowChange> {
        self.inner.subscribe(table)
    }

    fn store_type(&self) -> &str {
        "test"
    }
}

async fn mount_loaded(store: Arc<TestStore>) -> ControllerHandle {
    let handle = mount(RationRepository::new(store));
    let state = tokio::time::timeout(Duration::from_secs(1), handle.wait_until_loaded())
        .await
        .expect("初始加载超时");
    assert!(!state.is_loading);
    handle
}

async fn wait_for<F>(handle: &ControllerHandle, predicate: F) -> SessionState
where
    F: Fn(&SessionState) -> bool,
{
    let mut rx = handle.watch();
    let state = tokio::time::timeout(Duration::from_secs(1), async {
        rx.wait_for(|s| predicate(s)).await.map(|s| s.clone())
    })
    .await
    .expect("等待状态超时");
    state.expect("控制器已停止")
}

/// 选择成员并进入清单页
async fn open_list_as(handle: &ControllerHandle, member_id: &str) {
    handle.dispatch(Intent::SelectMember(member_id.to_string())).await;
    handle.dispatch(Intent::OpenList).await;
    assert_eq!(handle.snapshot().screen, Screen::List);
}

#[tokio::test]
async fn test_initial_state() {
    let state = SessionState::default();
    assert_eq!(state.screen, Screen::Profiles);
    assert!(state.is_loading);
    assert!(state.current_user.is_none());
    assert!(state.items.is_empty());
}

#[tokio::test]
async fn test_mount_loads_items_and_members() {
    let store = Arc::new(TestStore::with_members(&["Alice", "Bob"]));
    store.seed_items(2);

    let handle = mount_loaded(store).await;
    let state = handle.snapshot();

    assert_eq!(state.members.len(), 2);
    assert_eq!(state.items.len(), 2);
    assert_eq!(state.items[0].name, "Item 1");
    assert!(state.load_error.is_none());
}

#[tokio::test]
async fn test_load_failure_is_global_and_final() {
    let store = Arc::new(TestStore::with_members(&["Alice"]));
    store.fail_members.store(true, Ordering::SeqCst);

    let handle = mount_loaded(store).await;
    assert_eq!(handle.snapshot().load_error.as_deref(), Some("Invalid API key"));

    handle.dispatch(Intent::SelectMember("m1".to_string())).await;
    let state = handle.snapshot();
    assert_eq!(state.screen, Screen::Profiles);
    assert!(state.current_user.is_none());
}

#[tokio::test]
async fn test_navigation_state_machine() {
    let store = Arc::new(TestStore::with_members(&["Alice"]));
    let handle = mount_loaded(store).await;

    // 未选用户时菜单跳转无效
    handle.dispatch(Intent::OpenAddItem).await;
    assert_eq!(handle.snapshot().screen, Screen::Profiles);

    handle.dispatch(Intent::SelectMember("unknown".to_string())).await;
    assert_eq!(handle.snapshot().screen, Screen::Profiles);

    handle.dispatch(Intent::SelectMember("m1".to_string())).await;
    let state = handle.snapshot();
    assert_eq!(state.screen, Screen::Menu);
    assert_eq!(state.current_user.unwrap().name, "Alice");

    handle.dispatch(Intent::OpenAddItem).await;
    assert_eq!(handle.snapshot().screen, Screen::Add);
    handle.dispatch(Intent::BackToMenu).await;
    assert_eq!(handle.snapshot().screen, Screen::Menu);

    handle.dispatch(Intent::OpenList).await;
    assert_eq!(handle.snapshot().screen, Screen::List);
    handle.dispatch(Intent::BackToMenu).await;

    handle.dispatch(Intent::SwitchProfile).await;
    let state = handle.snapshot();
    assert_eq!(state.screen, Screen::Profiles);
    assert!(state.current_user.is_none());
}

#[tokio::test]
async fn test_alice_adds_milk_with_default_quantity() {
    let store = Arc::new(TestStore::with_members(&["Alice", "Bob"]));
    let handle = mount_loaded(store.clone()).await;

    handle.dispatch(Intent::SelectMember("m1".to_string())).await;
    handle.dispatch(Intent::OpenAddItem).await;
    handle.dispatch(Intent::SetItemName("Milk".to_string())).await;
    handle.dispatch(Intent::SetQuantity(String::new())).await;
    handle.dispatch(Intent::SubmitItem).await;

    let state = handle.snapshot();
    // 添加成功后停留在添加页，输入框清空
    assert_eq!(state.screen, Screen::Add);
    assert!(state.new_item.is_empty());
    assert!(state.quantity.is_empty());
    assert!(state.action_error.is_none());

    handle.dispatch(Intent::BackToMenu).await;
    handle.dispatch(Intent::OpenList).await;

    let state = handle.snapshot();
    assert_eq!(state.screen, Screen::List);
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].name, "Milk");
    assert_eq!(state.items[0].quantity.as_deref(), Some("1"));
    assert_eq!(state.items[0].added_by, "Alice");
}

#[tokio::test]
async fn test_add_refetches_explicitly() {
    let store = Arc::new(TestStore::with_members(&["Alice"]));
    let handle = mount_loaded(store.clone()).await;

    handle.dispatch(Intent::SelectMember("m1".to_string())).await;
    handle.dispatch(Intent::OpenAddItem).await;
    handle.dispatch(Intent::SetItemName("Rice".to_string())).await;
    handle.dispatch(Intent::SetQuantity("2 kg".to_string())).await;

    let before = store.item_selects.load(Ordering::SeqCst);
    handle.dispatch(Intent::SubmitItem).await;

    // dispatch 返回时显式刷新已完成
    let state = handle.snapshot();
    assert!(store.item_selects.load(Ordering::SeqCst) > before);
    assert_eq!(state.items[0].name, "Rice");
    assert_eq!(state.items[0].quantity.as_deref(), Some("2 kg"));
}

#[tokio::test]
async fn test_add_keeps_name_as_typed() {
    let store = Arc::new(TestStore::with_members(&["Alice"]));
    let handle = mount_loaded(store.clone()).await;

    handle.dispatch(Intent::SelectMember("m1".to_string())).await;
    handle.dispatch(Intent::OpenAddItem).await;
    handle.dispatch(Intent::SetItemName(" Milk ".to_string())).await;
    handle.dispatch(Intent::SetQuantity("  ".to_string())).await;
    handle.dispatch(Intent::SubmitItem).await;

    // 名称原样写入，空白数量按留空处理
    let state = handle.snapshot();
    assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    assert_eq!(state.items[0].name, " Milk ");
    assert_eq!(state.items[0].quantity.as_deref(), Some("1"));
}

#[tokio::test]
async fn test_blank_name_never_reaches_store() {
    let store = Arc::new(TestStore::with_members(&["Alice"]));
    let handle = mount_loaded(store.clone()).await;

    handle.dispatch(Intent::SelectMember("m1".to_string())).await;
    handle.dispatch(Intent::OpenAddItem).await;
    handle.dispatch(Intent::SetItemName("   ".to_string())).await;
    handle.dispatch(Intent::SetQuantity("3".to_string())).await;
    handle.dispatch(Intent::SubmitItem).await;

    assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    // 输入框保持原样
    assert_eq!(handle.snapshot().quantity, "3");
}

#[tokio::test]
async fn test_submit_without_user_is_noop() {
    let store = Arc::new(TestStore::with_members(&["Alice"]));
    let handle = mount_loaded(store.clone()).await;

    handle.dispatch(Intent::SetItemName("Milk".to_string())).await;
    handle.dispatch(Intent::SubmitItem).await;

    assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    assert!(handle.snapshot().items.is_empty());
}

#[tokio::test]
async fn test_add_failure_is_recorded_and_ui_stays_usable() {
    let store = Arc::new(TestStore::with_members(&["Alice"]));
    store.fail_insert.store(true, Ordering::SeqCst);
    let handle = mount_loaded(store.clone()).await;

    handle.dispatch(Intent::SelectMember("m1".to_string())).await;
    handle.dispatch(Intent::OpenAddItem).await;
    handle.dispatch(Intent::SetItemName("Milk".to_string())).await;
    handle.dispatch(Intent::SubmitItem).await;

    let state = handle.snapshot();
    assert_eq!(state.action_error.as_deref(), Some("insert rejected"));
    assert!(state.load_error.is_none());
    assert_eq!(state.new_item, "Milk");

    // 重试成功后错误清除
    store.fail_insert.store(false, Ordering::SeqCst);
    handle.dispatch(Intent::SubmitItem).await;
    let state = handle.snapshot();
    assert!(state.action_error.is_none());
    assert_eq!(state.items.len(), 1);
}

#[tokio::test]
async fn test_change_event_triggers_exactly_one_refetch() {
    let store = Arc::new(TestStore::with_members(&["Alice"]));
    let handle = mount_loaded(store.clone()).await;
    assert_eq!(store.item_selects.load(Ordering::SeqCst), 1);

    store.inner.insert_external(
        ITEMS_TABLE,
        json!({"name": "Bread", "quantity": "2", "added_by": "Bob"}),
    );

    let state = wait_for(&handle, |s| s.items.len() == 1).await;
    assert_eq!(state.items[0].name, "Bread");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.item_selects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unmount_during_fetch_freezes_state() {
    let gate = Arc::new(Semaphore::new(0));
    let store = TestStore {
        gate: Some(gate.clone()),
        ..TestStore::default()
    };
    store.seed_members(&["Alice"]);
    store.seed_items(3);
    let store = Arc::new(store);

    let handle = mount(RationRepository::new(store.clone()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.item_selects.load(Ordering::SeqCst), 1);

    handle.unmount().await;
    gate.add_permits(10);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = handle.snapshot();
    assert!(state.is_loading);
    assert!(state.items.is_empty());
    assert!(state.members.is_empty());
}

#[tokio::test]
async fn test_unmount_releases_subscription() {
    let store = Arc::new(TestStore::with_members(&["Alice"]));
    let handle = mount_loaded(store.clone()).await;

    handle.unmount().await;
    handle.unmount().await;

    store
        .inner
        .insert_external(ITEMS_TABLE, json!({"name": "Late", "added_by": "Bob"}));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(store.item_selects.load(Ordering::SeqCst), 1);
    assert!(handle.snapshot().items.is_empty());
}

#[tokio::test]
async fn test_clear_cancel_keeps_items() {
    let store = Arc::new(TestStore::with_members(&["Alice"]));
    store.seed_items(3);
    let handle = mount_loaded(store.clone()).await;
    open_list_as(&handle, "m1").await;

    handle.dispatch(Intent::OpenClearDialog).await;
    assert!(handle.snapshot().is_delete_modal_open);

    handle.dispatch(Intent::CloseClearDialog).await;
    let state = handle.snapshot();
    assert!(!state.is_delete_modal_open);
    assert_eq!(state.items.len(), 3);
    assert_eq!(store.inner.row_count(ITEMS_TABLE), 3);
}

#[tokio::test]
async fn test_clear_confirm_empties_list() {
    let store = Arc::new(TestStore::with_members(&["Alice"]));
    store.seed_items(3);
    let handle = mount_loaded(store.clone()).await;
    open_list_as(&handle, "m1").await;

    handle.dispatch(Intent::OpenClearDialog).await;
    handle.dispatch(Intent::ConfirmClear).await;

    let state = handle.snapshot();
    assert!(state.items.is_empty());
    assert!(!state.is_delete_modal_open);
    assert!(!state.is_deleting);
    assert_eq!(store.inner.row_count(ITEMS_TABLE), 0);
}

#[tokio::test]
async fn test_confirm_without_open_dialog_is_ignored() {
    let store = Arc::new(TestStore::with_members(&["Alice"]));
    store.seed_items(2);
    let handle = mount_loaded(store.clone()).await;
    open_list_as(&handle, "m1").await;

    handle.dispatch(Intent::ConfirmClear).await;
    assert_eq!(store.inner.row_count(ITEMS_TABLE), 2);
    assert_eq!(handle.snapshot().items.len(), 2);
}

#[tokio::test]
async fn test_clear_failure_resets_deleting_flag() {
    let store = Arc::new(TestStore::with_members(&["Alice"]));
    store.seed_items(3);
    store.fail_delete.store(true, Ordering::SeqCst);
    let handle = mount_loaded(store.clone()).await;
    open_list_as(&handle, "m1").await;

    handle.dispatch(Intent::OpenClearDialog).await;
    handle.dispatch(Intent::ConfirmClear).await;

    let state = handle.snapshot();
    assert!(!state.is_deleting);
    assert!(state.is_delete_modal_open);
    assert_eq!(state.items.len(), 3);
    assert_eq!(state.action_error.as_deref(), Some("delete rejected"));
}

#[tokio::test]
async fn test_clear_dialog_requires_items() {
    let store = Arc::new(TestStore::with_members(&["Alice"]));
    let handle = mount_loaded(store).await;
    open_list_as(&handle, "m1").await;

    handle.dispatch(Intent::OpenClearDialog).await;
    assert!(!handle.snapshot().is_delete_modal_open);
}
