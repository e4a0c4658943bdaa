//! # Loader Configuration
//!
//! 单元加载器的配置层。
//!
//! ## 主要组件
//!
//! - [`PropertiesDescriptorSource`] - 从 `name = configReference` 文件读取单元描述
//! - [`StaticDescriptorSource`] - 内存中的单元描述
//! - [`SubstitutionTable`] - 两个固定占位符的替换表
//! - [`LoaderSettings`] - 加载器设置，文件加环境变量分层

pub mod properties;
pub mod settings;
pub mod substitution;

pub use properties::*;
pub use settings::*;
pub use substitution::*;
