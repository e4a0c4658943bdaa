//! 单元注册表

use dashmap::DashMap;
use parking_lot::Mutex;
use scope_abstractions::SharedScope;
use serde::Serialize;
use std::sync::Arc;

/// 单元来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitOrigin {
    /// 由单元描述来源加载，重载时随描述文件增删
    Descriptor,
    /// 运行时通过 `load` 或管理端点加载，重载时保留
    Runtime,
}

/// 单元注册表条目
#[derive(Debug, Clone)]
pub struct UnitEntry {
    /// 单元作用域
    pub scope: SharedScope,
    /// 创建作用域时使用的配置引用（已替换占位符）
    pub config_ref: String,
    /// 单元来源
    pub origin: UnitOrigin,
    /// 加载时间
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

impl UnitEntry {
    /// 创建新的注册表条目，来源为 [`UnitOrigin::Runtime`]
    pub fn new(scope: SharedScope, config_ref: impl Into<String>) -> Self {
        Self {
            scope,
            config_ref: config_ref.into(),
            origin: UnitOrigin::Runtime,
            loaded_at: chrono::Utc::now(),
        }
    }

    /// 设置单元来源
    pub fn with_origin(mut self, origin: UnitOrigin) -> Self {
        self.origin = origin;
        self
    }
}

/// 单元注册表
///
/// 单元名称到作用域的并发映射，每个操作按键原子执行，
/// 不同名称的操作互不阻塞。
///
/// 注册表还为每个名称维护一把串行锁，供加载器在同名的
/// `load` / `unload` 之间串行化整个流程使用。
#[derive(Debug, Default)]
pub struct UnitRegistry {
    entries: DashMap<String, UnitEntry>,
    name_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl UnitRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            name_locks: DashMap::new(),
        }
    }

    /// 插入或覆盖条目，返回被覆盖的旧条目
    pub fn put(&self, name: &str, entry: UnitEntry) -> Option<UnitEntry> {
        self.entries.insert(name.to_string(), entry)
    }

    /// 原子地移除并返回条目
    pub fn remove(&self, name: &str) -> Option<UnitEntry> {
        self.entries.remove(name).map(|(_, entry)| entry)
    }

    /// 按名称获取作用域
    pub fn get(&self, name: &str) -> Option<SharedScope> {
        self.entries.get(name).map(|entry| Arc::clone(&entry.scope))
    }

    /// 按名称获取完整条目
    pub fn entry(&self, name: &str) -> Option<UnitEntry> {
        self.entries.get(name).map(|entry| entry.value().clone())
    }

    /// 是否包含指定名称
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// 所有单元名称，按字典序排列
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// 所有条目的快照，按名称排列
    pub fn snapshot(&self) -> Vec<(String, UnitEntry)> {
        let mut entries: Vec<(String, UnitEntry)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 获取名称对应的串行锁
    pub fn name_lock(&self, name: &str) -> Arc<Mutex<()>> {
        Arc::clone(&self.name_locks.entry(name.to_string()).or_default())
    }

    /// 释放不再需要的串行锁
    ///
    /// 必须在持有 `lock` 的临界区末尾调用。名称仍在注册表中，或其他调用方
    /// 已经取得同一把锁时保留不动。
    pub fn release_name_lock(&self, name: &str, lock: &Arc<Mutex<()>>) {
        if self.entries.contains_key(name) {
            return;
        }
        // 表中一份，调用方一份
        self.name_locks.remove_if(name, |_, held| {
            Arc::ptr_eq(held, lock) && Arc::strong_count(held) == 2
        });
    }

    /// 串行锁数量
    pub fn lock_count(&self) -> usize {
        self.name_locks.len()
    }
}
