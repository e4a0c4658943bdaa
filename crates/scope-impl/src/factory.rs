//! 文件作用域工厂实现

use crate::scope::ConfiguredScope;
use config::FileFormat;
use loader_common::{ConfigError, ConfigResult};
use scope_abstractions::{ExecutionScope, ScopeFactory, SharedParent, SharedScope};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// 单元定义
///
/// 单元定义文件的内容，支持 TOML、JSON 和 YAML：
///
/// ```toml
/// display_name = "oflaDemo"
/// autostart = true
///
/// [properties]
/// context_path = "/oflaDemo"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDefinition {
    /// 显示名称
    #[serde(default)]
    pub display_name: Option<String>,
    /// 创建后是否立即启动
    #[serde(default = "default_autostart")]
    pub autostart: bool,
    /// 单元属性
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

fn default_autostart() -> bool {
    true
}

impl Default for UnitDefinition {
    fn default() -> Self {
        Self {
            display_name: None,
            autostart: default_autostart(),
            properties: HashMap::new(),
        }
    }
}

/// 文件作用域工厂
///
/// 把配置引用当作单元定义文件的路径，相对路径基于 `base_dir` 解析。
#[derive(Debug, Default)]
pub struct FileScopeFactory {
    base_dir: Option<PathBuf>,
}

impl FileScopeFactory {
    /// 创建新的文件作用域工厂
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// 设置相对路径的基准目录
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// 解析配置引用对应的文件路径
    pub fn resolve_path(&self, config_ref: &str) -> PathBuf {
        let path = Path::new(config_ref);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// 读取单元定义文件
    pub fn read_definition(&self, path: &Path) -> ConfigResult<UnitDefinition> {
        let shown = path.display().to_string();
        if !path.is_file() {
            return Err(ConfigError::file_not_found(shown));
        }

        let format = detect_format(path)?;
        debug!("读取单元定义文件: {} ({:?})", shown, format);

        config::Config::builder()
            .add_source(config::File::from(path).format(format).required(true))
            .build()
            .and_then(|settings| settings.try_deserialize::<UnitDefinition>())
            .map_err(|e| ConfigError::parse_error(shown, e.to_string()))
    }
}

fn detect_format(path: &Path) -> ConfigResult<FileFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("toml") => Ok(FileFormat::Toml),
        Some("json") => Ok(FileFormat::Json),
        Some("yaml" | "yml") => Ok(FileFormat::Yaml),
        other => Err(ConfigError::parse_error(
            path.display().to_string(),
            format!("不支持的单元定义格式: {}", other.unwrap_or("<无扩展名>")),
        )),
    }
}

impl ScopeFactory for FileScopeFactory {
    fn create(&self, config_ref: &str, parent: &SharedParent) -> ConfigResult<SharedScope> {
        if config_ref.trim().is_empty() {
            return Err(ConfigError::scope_creation_failed(config_ref, "配置引用为空"));
        }

        let path = self.resolve_path(config_ref);
        let definition = self.read_definition(&path)?;

        let scope_name = definition.display_name.clone().unwrap_or_else(|| {
            path.file_stem()
                .map_or_else(|| config_ref.to_string(), |stem| stem.to_string_lossy().into_owned())
        });
        let autostart = definition.autostart;

        let scope = ConfiguredScope::new(parent.info().child(scope_name), config_ref, definition, parent);
        if autostart {
            scope
                .start()
                .map_err(|e| ConfigError::scope_creation_failed(config_ref, e.to_string()))?;
        }

        info!("作用域创建完成: {} ({})", scope.info().name, config_ref);
        Ok(Arc::new(scope))
    }

    fn name(&self) -> &str {
        "FileScopeFactory"
    }
}
