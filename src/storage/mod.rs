// 存储模块 - 托管存储抽象与数据访问层

// 子模块
pub mod config;
pub mod error;
pub mod ration_repo;
pub mod repository;
pub mod subscription;

// 重新导出主要类型
pub use config::{StartupConfigError, StoreConfig};
pub use error::StoreError;
pub use ration_repo::RationRepository;
pub use repository::DataStore;
pub use subscription::Subscription;

// 重新导出具体实现
pub use repository::memory::MemoryStore;
pub use repository::postgrest::PostgrestStore;
