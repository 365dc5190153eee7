// 托管存储客户端 - 通过 PostgREST 接口访问 Supabase 数据表
//
// 行变更由后台轮询任务按表比对行 ID 产生，经变更总线分发

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{DataStore, Filter, Order};
use crate::event_bus::ChangeBus;
use crate::models::{ChangeKind, RowChange};
use crate::storage::config::StoreConfig;
use crate::storage::error::StoreError;

const REST_PATH: &str = "rest/v1";

/// 单表请求封装
#[derive(Clone)]
struct RestClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl RestClient {
    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, REST_PATH, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    /// `select=*`，可选 `order=列.方向`
    fn select_request(&self, table: &str, order: Option<&Order>) -> RequestBuilder {
        let request = self.request(Method::GET, table).query(&[("select", "*")]);
        match order {
            Some(order) => {
                let direction = if order.ascending { "asc" } else { "desc" };
                request.query(&[("order", format!("{}.{}", order.column, direction))])
            }
            None => request,
        }
    }

    /// 单行插入，要求返回写入后的行
    fn insert_request(&self, table: &str, row: Value) -> RequestBuilder {
        self.request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&vec![row])
    }

    fn delete_request(&self, table: &str, filter: &Filter) -> RequestBuilder {
        let (column, predicate) = match filter {
            Filter::NotNull(column) => (column.as_str(), "not.is.null"),
        };
        self.request(Method::DELETE, table).query(&[(column, predicate)])
    }

    /// 发送请求，非 2xx 转为 StoreError
    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(StoreError::from_response(status, &error_text));
        }

        Ok(response)
    }

    async fn fetch_ids(&self, table: &str) -> Result<HashSet<String>, StoreError> {
        let response = self
            .send(self.request(Method::GET, table).query(&[("select", "id")]))
            .await?;
        let rows: Vec<Value> = response.json().await?;

        Ok(rows
            .iter()
            .filter_map(|row| match &row["id"] {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .collect())
    }
}

/// PostgREST 存储
pub struct PostgrestStore {
    rest: RestClient,
    bus: Arc<ChangeBus>,
    poll_interval: Duration,
    /// 每张被订阅表的轮询任务
    watchers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl PostgrestStore {
    /// 创建新的存储客户端
    pub fn new(
        config: &StoreConfig,
        request_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            rest: RestClient {
                client,
                base_url: config.url.clone(),
                anon_key: config.anon_key.clone(),
            },
            bus: Arc::new(ChangeBus::new(64)),
            poll_interval,
            watchers: Mutex::new(HashMap::new()),
        })
    }

    /// 确保指定表的轮询任务在运行
    fn ensure_watcher(&self, table: &str) {
        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(handle) = watchers.get(table) {
            if !handle.is_finished() {
                return;
            }
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("没有可用的异步运行时，无法监听表 {} 的变更", table);
            return;
        };

        info!("开始监听表 {} 的变更，轮询间隔 {:?}", table, self.poll_interval);
        let handle = runtime.spawn(watch_table(
            self.rest.clone(),
            table.to_string(),
            self.bus.clone(),
            self.poll_interval,
        ));
        watchers.insert(table.to_string(), handle);
    }
}

impl Drop for PostgrestStore {
    fn drop(&mut self) {
        let watchers = self.watchers.get_mut().unwrap_or_else(|e| e.into_inner());
        for (_, handle) in watchers.drain() {
            handle.abort();
        }
    }
}

/// 比较两次轮询的行 ID，得到插入/删除事件；没有上一次结果时只建立基线
fn diff_ids(previous: Option<&HashSet<String>>, current: &HashSet<String>) -> Vec<ChangeKind> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    let inserted = current.difference(previous).map(|_| ChangeKind::Insert);
    let deleted = previous.difference(current).map(|_| ChangeKind::Delete);
    inserted.chain(deleted).collect()
}

/// 轮询行 ID 集合，与上一次比较后发布插入/删除事件
///
/// 没有订阅者时退出
async fn watch_table(rest: RestClient, table: String, bus: Arc<ChangeBus>, period: Duration) {
    let mut known: Option<HashSet<String>> = None;
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if bus.subscriber_count() == 0 {
            info!("表 {} 已无订阅者，停止监听", table);
            break;
        }

        match rest.fetch_ids(&table).await {
            Ok(ids) => {
                for kind in diff_ids(known.as_ref(), &ids) {
                    bus.publish(RowChange::new(table.as_str(), kind));
                }
                known = Some(ids);
            }
            Err(e) => warn!("轮询表 {} 失败: {}", table, e),
        }
    }
}

#[async_trait]
impl DataStore for PostgrestStore {
    async fn select(&self, table: &str, order: Option<&Order>) -> Result<Vec<Value>, StoreError> {
        let response = self.rest.send(self.rest.select_request(table, order)).await?;
        let rows: Option<Vec<Value>> = response.json().await?;
        debug!("查询表 {} 完成", table);
        Ok(rows.unwrap_or_default())
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let response = self.rest.send(self.rest.insert_request(table, row)).await?;
        let mut rows: Vec<Value> = response.json().await?;
        if rows.is_empty() {
            return Err(StoreError::Backend(format!(
                "insert into {} returned no row",
                table
            )));
        }
        Ok(rows.swap_remove(0))
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), StoreError> {
        self.rest.send(self.rest.delete_request(table, filter)).await?;
        Ok(())
    }

    fn subscribe(&self, table: &str) -> broadcast::Receiver<RowChange> {
        let receiver = self.bus.subscribe();
        self.ensure_watcher(table);
        receiver
    }

    fn store_type(&self) -> &str {
        "postgrest"
    }
}
