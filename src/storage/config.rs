// 存储配置定义 - 托管存储的连接参数

use thiserror::Error;

/// 存储地址环境变量
pub const URL_VAR: &str = "SUPABASE_URL";
/// 访问密钥环境变量
pub const KEY_VAR: &str = "SUPABASE_ANON_KEY";

/// 启动配置错误，出现即拒绝启动
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartupConfigError {
    #[error("missing required setting {0}")]
    MissingVar(&'static str),

    #[error("{var} is not a valid URL: {value}")]
    InvalidUrl { var: &'static str, value: String },
}

/// 托管存储配置
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// 存储地址，不带末尾斜杠
    pub url: String,
    /// 匿名访问密钥
    pub anon_key: String,
}

impl StoreConfig {
    /// 从进程环境变量读取
    pub fn from_env() -> Result<Self, StartupConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 通过任意查找函数读取，两项都必须存在且非空
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StartupConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = required(&lookup, URL_VAR)?;
        let anon_key = required(&lookup, KEY_VAR)?;

        if reqwest::Url::parse(&url).is_err() {
            return Err(StartupConfigError::InvalidUrl {
                var: URL_VAR,
                value: url,
            });
        }

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
        })
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, StartupConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(StartupConfigError::MissingVar(name))
}
