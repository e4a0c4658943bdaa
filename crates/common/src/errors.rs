//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
///
/// 描述配置资源缺失、无法读取，或者某个单元的配置引用无法构造出作用域。
/// 对整个加载器不是致命错误，只会让当前这一次 `load` 失败。
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {path}, 原因: {message}")]
    ParseError { path: String, message: String },

    #[error("单元描述无效: 第 {line} 行, 原因: {message}")]
    InvalidDescriptor { line: usize, message: String },

    #[error("单元名称无效: '{name}'")]
    InvalidUnitName { name: String },

    #[error("作用域创建失败: {config_ref}, 原因: {message}")]
    ScopeCreationFailed { config_ref: String, message: String },

    #[error("加载器设置无效: {message}")]
    SettingsError { message: String },

    #[error("配置文件监控失败: {message}")]
    WatchError { message: String },
}

impl ConfigError {
    /// 创建文件不存在错误
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// 创建解析错误
    pub fn parse_error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// 创建作用域创建失败错误
    pub fn scope_creation_failed(config_ref: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ScopeCreationFailed {
            config_ref: config_ref.into(),
            message: message.into(),
        }
    }

    /// 是否表示配置资源不存在
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::FileNotFound { .. } => true,
            Self::FileReadError { source } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// 注册错误类型
///
/// 父作用域拒绝发布某个名称，或者管理端点拒绝注册。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("单例已存在: {name}")]
    DuplicateSingleton { name: String },

    #[error("单例未注册: {name}")]
    NotRegistered { name: String },

    #[error("管理端点注册失败: {object_name}, 原因: {message}")]
    ManagementRejected { object_name: String, message: String },
}

/// 作用域生命周期错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("非法的状态转换: {scope}, {from} -> {to}")]
    InvalidTransition {
        scope: String,
        from: crate::lifecycle::LifecycleState,
        to: crate::lifecycle::LifecycleState,
    },

    #[error("作用域停止失败: {scope}, 原因: {message}")]
    StopFailed { scope: String, message: String },

    #[error("作用域关闭失败: {scope}, 原因: {message}")]
    CloseFailed { scope: String, message: String },
}

/// 卸载清理错误类型
///
/// 只在 `unload` 内部使用，记录日志后被吞掉，从不返回给调用方。
#[derive(Error, Debug)]
pub enum TeardownError {
    #[error("单元停止失败: {unit}, 原因: {source}")]
    Stop {
        unit: String,
        source: LifecycleError,
    },

    #[error("单元关闭失败: {unit}, 原因: {source}")]
    Close {
        unit: String,
        source: LifecycleError,
    },

    #[error("单元从父作用域移除失败: {unit}, 原因: {source}")]
    Destroy {
        unit: String,
        source: RegistrationError,
    },
}

impl TeardownError {
    /// 出错的单元名称
    pub fn unit(&self) -> &str {
        match self {
            Self::Stop { unit, .. } | Self::Close { unit, .. } | Self::Destroy { unit, .. } => unit,
        }
    }
}

/// 加载器错误类型
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("配置错误: {source}")]
    Configuration {
        #[from]
        source: ConfigError,
    },

    #[error("注册错误: {source}")]
    Registration {
        #[from]
        source: RegistrationError,
    },
}

impl LoaderError {
    /// 是否为配置错误
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// 是否为注册错误
    pub fn is_registration(&self) -> bool {
        matches!(self, Self::Registration { .. })
    }
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type RegistrationResult<T> = Result<T, RegistrationError>;
pub type LifecycleResult<T> = Result<T, LifecycleError>;
pub type LoaderResult<T> = Result<T, LoaderError>;
