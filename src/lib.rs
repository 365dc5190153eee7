// 家庭物资清单 - 主库

// 声明模块
pub mod app;
pub mod controller;
pub mod event_bus;
pub mod logger;
pub mod models;
pub mod settings;
pub mod storage;
pub mod views;

pub use app::run;
