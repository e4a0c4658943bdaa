//! # 作用域具体实现
//!
//! 提供父作用域、基于配置文件的子作用域、文件作用域工厂和内存管理代理

pub mod factory;
pub mod management;
pub mod parent;
pub mod scope;

pub use factory::{FileScopeFactory, UnitDefinition};
pub use management::InMemoryManagementAgent;
pub use parent::SingletonParentScope;
pub use scope::ConfiguredScope;
