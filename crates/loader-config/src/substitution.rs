//! 配置引用占位符替换

use tracing::debug;

/// 安装根目录占位符
pub const ROOT_PLACEHOLDER: &str = "${root}";

/// 配置根目录占位符
pub const CONFIG_ROOT_PLACEHOLDER: &str = "${config_root}";

/// 占位符替换表
///
/// 只支持 [`ROOT_PLACEHOLDER`] 和 [`CONFIG_ROOT_PLACEHOLDER`] 两个固定占位符，
/// 不是通用模板。未设置的占位符原样保留。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionTable {
    root: Option<String>,
    config_root: Option<String>,
}

impl SubstitutionTable {
    /// 创建空的替换表
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置安装根目录
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// 设置配置根目录
    pub fn with_config_root(mut self, config_root: impl Into<String>) -> Self {
        self.config_root = Some(config_root.into());
        self
    }

    /// 安装根目录
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// 配置根目录
    pub fn config_root(&self) -> Option<&str> {
        self.config_root.as_deref()
    }

    /// 替换配置引用中的占位符
    pub fn apply(&self, value: &str) -> String {
        let mut resolved = value.to_string();

        if let Some(root) = &self.root {
            resolved = resolved.replace(ROOT_PLACEHOLDER, root);
        }
        if let Some(config_root) = &self.config_root {
            resolved = resolved.replace(CONFIG_ROOT_PLACEHOLDER, config_root);
        }

        if resolved != value {
            debug!("占位符替换: {} -> {}", value, resolved);
        }
        resolved
    }

    /// 值中仍未被替换的占位符
    pub fn unresolved(&self, value: &str) -> Vec<&'static str> {
        let resolved = self.apply(value);
        [ROOT_PLACEHOLDER, CONFIG_ROOT_PLACEHOLDER]
            .into_iter()
            .filter(|token| resolved.contains(token))
            .collect()
    }
}
