//! 加载器设置

use crate::substitution::SubstitutionTable;
use loader_common::{ConfigError, ConfigResult};
use scope_abstractions::DuplicatePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "UNIT_LOADER";

/// 默认的单元描述文件位置
pub const DEFAULT_CONTEXTS_CONFIG: &str = "conf/contexts.properties";

/// 加载器设置
///
/// 设置文件（可选）在下，`UNIT_LOADER_*` 环境变量在上，
/// 嵌套键使用双下划线分隔。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// 单元描述文件位置
    pub contexts_config: String,
    /// `${root}` 的替换值
    pub root: Option<String>,
    /// `${config_root}` 的替换值
    pub config_root: Option<String>,
    /// 父作用域单例名称冲突策略
    pub duplicate_policy: DuplicatePolicy,
    /// 是否监控单元描述文件并热重载
    pub watch: bool,
    /// 文件变更防抖延迟（毫秒）
    pub debounce_ms: u64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            contexts_config: DEFAULT_CONTEXTS_CONFIG.to_string(),
            root: None,
            config_root: None,
            duplicate_policy: DuplicatePolicy::default(),
            watch: false,
            debounce_ms: 500,
        }
    }
}

impl LoaderSettings {
    /// 从设置文件和环境变量加载
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// 使用指定的环境变量前缀加载
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!("加载器设置文件: {}", path.display());
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings: Self = builder
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .and_then(|built| built.try_deserialize())
            .map_err(|e| {
                error!("加载器设置读取失败: {}", e);
                ConfigError::SettingsError {
                    message: e.to_string(),
                }
            })?;

        settings.validate()?;
        Ok(settings)
    }

    /// 验证设置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.contexts_config.trim().is_empty() {
            return Err(ConfigError::SettingsError {
                message: "contexts_config 不能为空".to_string(),
            });
        }
        Ok(())
    }

    /// 构建占位符替换表
    pub fn substitutions(&self) -> SubstitutionTable {
        let mut table = SubstitutionTable::new();
        if let Some(root) = &self.root {
            table = table.with_root(root);
        }
        if let Some(config_root) = &self.config_root {
            table = table.with_config_root(config_root);
        }
        table
    }

    /// 防抖延迟
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
