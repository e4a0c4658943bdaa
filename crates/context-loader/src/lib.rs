//! # 单元加载器
//!
//! 这个 crate 在运行时加载和卸载命名单元。每个单元拥有由作用域工厂创建的
//! 隔离执行作用域，并以单元名称发布为共享父作用域中的单例，供其他单元查找。
//!
//! ## 主要功能
//!
//! - **单元注册表**: 单元名称到作用域的并发映射
//! - **加载/卸载**: 编排作用域的创建、发布、停止、关闭和销毁
//! - **启动加载**: 从单元描述来源批量加载，单个失败互不影响
//! - **管理端点**: 把加载器注册到管理代理，供外部调用
//! - **热重载**: 监控单元描述文件并与注册表对账
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use context_loader::ContextLoaderBuilder;
//! use loader_config::{PropertiesDescriptorSource, SubstitutionTable};
//! use scope_impl::{FileScopeFactory, SingletonParentScope};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = ContextLoaderBuilder::new(
//!         Arc::new(SingletonParentScope::root()),
//!         Arc::new(FileScopeFactory::new()),
//!     )
//!     .with_source(PropertiesDescriptorSource::new("conf/contexts.properties"))
//!     .with_substitutions(SubstitutionTable::new().with_root("/srv/server"))
//!     .build_shared();
//!
//!     // 启动时批量加载
//!     let report = loader.init();
//!     println!("已加载: {:?}", report.loaded);
//!
//!     // 运行时加载和卸载
//!     loader.load("chat", "/srv/server/webapps/chat.toml")?;
//!     loader.unload("chat");
//!
//!     loader.unload_all();
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod loader;
pub mod registry;
pub mod watcher;

// 重新导出主要类型
pub use builder::{default_management_name, ContextLoaderBuilder};
pub use loader::{ContextLoader, InitReport, ReconcileReport, UnitFailure, UnitStatus};
pub use registry::{UnitEntry, UnitOrigin, UnitRegistry};
pub use watcher::DescriptorWatcher;
