// 内存存储实现 - 与托管存储语义一致的进程内实现
//
// 插入时分配 id 和 created_at，每行变更发布一条事件

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::broadcast;

use super::{DataStore, Filter, Order};
use crate::event_bus::ChangeBus;
use crate::models::{ChangeKind, RowChange};
use crate::storage::error::StoreError;

#[derive(Default)]
struct Tables {
    rows: HashMap<String, Vec<Value>>,
    /// 最后分配的时间戳，保证严格递增
    last_created_at: Option<DateTime<Utc>>,
}

/// 内存存储
pub struct MemoryStore {
    tables: Mutex<Tables>,
    bus: ChangeBus,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            bus: ChangeBus::new(64),
        }
    }

    /// 预置行，不发布事件（用于初始化成员表等）
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        let mut tables = self.lock();
        tables.rows.entry(table.to_string()).or_default().extend(rows);
    }

    /// 模拟外部写入：插入一行并发布事件
    pub fn insert_external(&self, table: &str, row: Value) -> Value {
        let stored = self.insert_row(table, row);
        self.bus.publish(RowChange::new(table, ChangeKind::Insert));
        stored
    }

    /// 指定表当前行数
    pub fn row_count(&self, table: &str) -> usize {
        self.lock().rows.get(table).map(Vec::len).unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // 锁内不会 panic，中毒时继续使用内部数据
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert_row(&self, table: &str, mut row: Value) -> Value {
        let mut tables = self.lock();

        let mut created_at = Utc::now();
        if let Some(last) = tables.last_created_at {
            if created_at <= last {
                created_at = last + Duration::microseconds(1);
            }
        }
        tables.last_created_at = Some(created_at);

        if let Some(obj) = row.as_object_mut() {
            obj.insert(
                "id".to_string(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
            obj.insert(
                "created_at".to_string(),
                Value::String(created_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
            );
        }

        tables
            .rows
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// 按列比较，字符串按字典序（RFC3339 定长格式即时间序），缺失值排最前
fn compare_column(a: &Value, b: &Value, column: &str) -> std::cmp::Ordering {
    let key = |v: &Value| v.get(column).map(|c| match c {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });
    key(a).cmp(&key(b))
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, table: &str, order: Option<&Order>) -> Result<Vec<Value>, StoreError> {
        let mut rows = self.lock().rows.get(table).cloned().unwrap_or_default();

        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let ord = compare_column(a, b, &order.column);
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }

        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        if !row.is_object() {
            return Err(StoreError::Backend(format!(
                "row for {} must be an object",
                table
            )));
        }
        Ok(self.insert_external(table, row))
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), StoreError> {
        let removed = {
            let mut tables = self.lock();
            let rows = tables.rows.entry(table.to_string()).or_default();
            let before = rows.len();
            match filter {
                Filter::NotNull(column) => {
                    rows.retain(|row| row.get(column).map_or(true, Value::is_null));
                }
            }
            before - rows.len()
        };

        for _ in 0..removed {
            self.bus.publish(RowChange::new(table, ChangeKind::Delete));
        }
        Ok(())
    }

    fn subscribe(&self, _table: &str) -> broadcast::Receiver<RowChange> {
        self.bus.subscribe()
    }

    fn store_type(&self) -> &str {
        "memory"
    }
}
