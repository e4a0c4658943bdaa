//! 单元加载器
//!
//! 负责单元的加载、卸载以及启动时的批量加载

use crate::registry::{UnitEntry, UnitOrigin, UnitRegistry};
use loader_common::{
    ConfigError, LifecycleState, LoaderResult, TeardownError, UnitDescriptor, UnitDescriptorSource,
};
use loader_config::SubstitutionTable;
use parking_lot::Mutex;
use scope_abstractions::{
    LoaderManagement, ManagementAgent, ManagementHandle, ObjectName, ScopeFactory, SharedParent,
    SharedScope,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 单元加载失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    pub name: String,
    pub config_ref: String,
    pub reason: String,
}

/// 启动加载报告
#[derive(Debug, Clone, Default, Serialize)]
pub struct InitReport {
    /// 单元描述来源位置，未设置时为空
    pub source: Option<String>,
    /// 来源是否存在并读取成功
    pub source_found: bool,
    /// 加载成功的单元
    pub loaded: Vec<String>,
    /// 加载失败的单元
    pub failed: Vec<UnitFailure>,
}

impl InitReport {
    /// 是否全部加载成功
    pub fn is_clean(&self) -> bool {
        self.source_found && self.failed.is_empty()
    }
}

/// 描述文件与注册表对账的结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub loaded: Vec<String>,
    pub unloaded: Vec<String>,
    pub replaced: Vec<String>,
    pub unchanged: Vec<String>,
    /// 未在描述中列出、运行时加载的单元
    pub retained: Vec<String>,
    pub failed: Vec<UnitFailure>,
}

impl ReconcileReport {
    /// 注册表是否发生了变化
    pub fn has_changes(&self) -> bool {
        !(self.loaded.is_empty() && self.unloaded.is_empty() && self.replaced.is_empty())
    }
}

/// 单元状态快照
#[derive(Debug, Clone, Serialize)]
pub struct UnitStatus {
    pub name: String,
    pub config_ref: String,
    pub scope_id: uuid::Uuid,
    pub scope_name: String,
    pub state: LifecycleState,
    pub origin: UnitOrigin,
    /// 父作用域中是否能查到该单元
    pub published: bool,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

/// 单元加载器
///
/// 持有单元注册表，编排单元作用域的创建、发布和销毁：
///
/// - `load`：通过工厂创建作用域，写入注册表，再以单元名称发布为父作用域单例
/// - `unload`：从注册表移除，停止、关闭作用域并从父作用域销毁，从不报错
/// - `init`：注册管理端点，读取单元描述来源，逐个加载，失败互不影响
///
/// 同名单元的 `load` / `unload` 串行执行，不同名称之间并发执行。
#[derive(Debug)]
pub struct ContextLoader {
    parent: SharedParent,
    factory: Arc<dyn ScopeFactory>,
    source: Option<Arc<dyn UnitDescriptorSource>>,
    substitutions: SubstitutionTable,
    registry: UnitRegistry,
    management: Option<Arc<dyn ManagementAgent>>,
    management_name: ObjectName,
    management_handle: Mutex<Option<ManagementHandle>>,
}

impl ContextLoader {
    pub(crate) fn from_parts(
        parent: SharedParent,
        factory: Arc<dyn ScopeFactory>,
        source: Option<Arc<dyn UnitDescriptorSource>>,
        substitutions: SubstitutionTable,
        management: Option<Arc<dyn ManagementAgent>>,
        management_name: ObjectName,
    ) -> Self {
        Self {
            parent,
            factory,
            source,
            substitutions,
            registry: UnitRegistry::new(),
            management,
            management_name,
            management_handle: Mutex::new(None),
        }
    }

    /// 加载单元
    ///
    /// 成功后注册表和父作用域都能以 `name` 查到同一个作用域。
    /// 工厂失败时返回配置错误，不留下任何状态；父作用域拒绝注册时
    /// 注册表回滚到调用前的状态，新建的作用域被关闭后丢弃。
    ///
    /// 同名单元已存在时直接覆盖注册表条目，旧作用域不会被停止。
    pub fn load(&self, name: &str, config_ref: &str) -> LoaderResult<()> {
        self.load_as(name, config_ref, UnitOrigin::Runtime)
    }

    fn load_as(&self, name: &str, config_ref: &str, origin: UnitOrigin) -> LoaderResult<()> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidUnitName {
                name: name.to_string(),
            }
            .into());
        }

        let lock = self.registry.name_lock(name);
        let _serial = lock.lock();
        let result = self.load_locked(name, config_ref, origin);
        self.registry.release_name_lock(name, &lock);
        result
    }

    fn load_locked(&self, name: &str, config_ref: &str, origin: UnitOrigin) -> LoaderResult<()> {
        debug!(unit = %name, "加载单元: {}", config_ref);
        let scope = self.factory.create(config_ref, &self.parent).map_err(|e| {
            warn!(unit = %name, "创建单元作用域失败: {}", e);
            e
        })?;

        debug!(unit = %name, scope_id = %scope.info().id, "写入单元注册表");
        let previous = self
            .registry
            .put(name, UnitEntry::new(Arc::clone(&scope), config_ref).with_origin(origin));
        if let Some(previous) = &previous {
            warn!(
                unit = %name,
                previous_scope = %previous.scope.info().id,
                "单元已存在，旧作用域被覆盖且未卸载"
            );
        }

        debug!(unit = %name, "发布到父作用域: {}", self.parent.info().name);
        if let Err(e) = self.parent.register_singleton(name, Arc::clone(&scope)) {
            error!(unit = %name, "父作用域注册失败，回滚: {}", e);
            match previous {
                Some(previous) => {
                    self.registry.put(name, previous);
                }
                None => {
                    self.registry.remove(name);
                }
            }
            self.report_failures(name, shutdown_scope(name, &scope));
            return Err(e.into());
        }

        info!(unit = %name, "单元加载完成: {}", scope.info().name);
        Ok(())
    }

    /// 卸载单元
    ///
    /// 未加载的名称为空操作。清理过程中的失败只记录日志，继续执行后续步骤。
    pub fn unload(&self, name: &str) {
        let lock = self.registry.name_lock(name);
        let _serial = lock.lock();
        self.unload_locked(name);
        self.registry.release_name_lock(name, &lock);
    }

    fn unload_locked(&self, name: &str) {
        debug!(unit = %name, "卸载单元");
        let Some(entry) = self.registry.remove(name) else {
            debug!(unit = %name, "单元未加载，忽略");
            return;
        };
        debug!(unit = %name, scope_id = %entry.scope.info().id, "已从单元注册表移除");

        let failures = if self.parent.contains_singleton(name) {
            self.tear_down(name)
        } else {
            warn!(unit = %name, "单元未发布到父作用域，只关闭注册表中的作用域");
            shutdown_scope(name, &entry.scope)
        };

        self.report_failures(name, failures);
        info!(unit = %name, "单元卸载完成");
    }

    /// 停止、关闭并从父作用域销毁已发布的单元
    fn tear_down(&self, name: &str) -> Vec<TeardownError> {
        let mut failures = match self.parent.get_singleton(name) {
            Some(scope) => shutdown_scope(name, &scope),
            None => Vec::new(),
        };

        debug!(unit = %name, "从父作用域销毁单例");
        if let Err(source) = self.parent.destroy_singleton(name) {
            failures.push(TeardownError::Destroy {
                unit: name.to_string(),
                source,
            });
        }
        failures
    }

    fn report_failures(&self, name: &str, failures: Vec<TeardownError>) {
        for failure in failures {
            warn!(unit = %name, "单元清理失败，已忽略: {}", failure);
        }
    }

    /// 按名称获取单元作用域
    pub fn get_scope(&self, name: &str) -> Option<SharedScope> {
        self.registry.get(name)
    }

    /// 父作用域
    pub fn parent_scope(&self) -> &SharedParent {
        &self.parent
    }

    /// 单元描述来源位置
    pub fn contexts_config(&self) -> Option<String> {
        self.source.as_ref().map(|source| source.location())
    }

    /// 占位符替换表
    pub fn substitutions(&self) -> &SubstitutionTable {
        &self.substitutions
    }

    /// 管理端点名称
    pub fn management_name(&self) -> &ObjectName {
        &self.management_name
    }

    /// 单元注册表
    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// 已加载的单元名称
    pub fn loaded_units(&self) -> Vec<String> {
        self.registry.names()
    }

    /// 所有单元的状态快照
    pub fn status(&self) -> Vec<UnitStatus> {
        self.registry
            .snapshot()
            .into_iter()
            .map(|(name, entry)| UnitStatus {
                published: self.parent.contains_singleton(&name),
                config_ref: entry.config_ref,
                scope_id: entry.scope.info().id,
                scope_name: entry.scope.info().name.clone(),
                state: entry.scope.state(),
                origin: entry.origin,
                loaded_at: entry.loaded_at,
                name,
            })
            .collect()
    }

    /// 启动加载
    ///
    /// 先注册管理端点，再读取单元描述来源并逐个加载。来源未设置或不存在时
    /// 记录错误日志后返回，不加载任何单元；单个单元失败不影响其他单元。
    pub fn init(self: &Arc<Self>) -> InitReport {
        info!("开始初始化单元加载器");
        self.register_management();

        let mut report = InitReport {
            source: self.contexts_config(),
            ..InitReport::default()
        };

        let Some(source) = &self.source else {
            error!("未设置单元描述来源，跳过单元加载");
            return report;
        };

        if !source.exists() {
            error!("单元描述来源不存在: {}", source.location());
            return report;
        }

        let descriptors = match source.load_descriptors() {
            Ok(descriptors) => descriptors,
            Err(e) => {
                error!("读取单元描述来源失败: {}, 原因: {}", source.location(), e);
                return report;
            }
        };
        report.source_found = true;

        for descriptor in descriptors {
            let config_ref = self.substitutions.apply(&descriptor.config_ref);
            let unresolved = self.substitutions.unresolved(&descriptor.config_ref);
            if !unresolved.is_empty() {
                warn!(unit = %descriptor.name, "配置引用中有未设置的占位符: {:?}", unresolved);
            }

            info!("加载单元: {} = {}", descriptor.name, config_ref);
            match self.load_as(&descriptor.name, &config_ref, UnitOrigin::Descriptor) {
                Ok(()) => report.loaded.push(descriptor.name),
                Err(e) => {
                    error!(unit = %descriptor.name, "单元加载失败: {}", e);
                    report.failed.push(UnitFailure {
                        name: descriptor.name,
                        config_ref,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "单元加载器初始化完成: 成功 {} 个, 失败 {} 个",
            report.loaded.len(),
            report.failed.len()
        );
        report
    }

    fn register_management(self: &Arc<Self>) {
        let Some(agent) = &self.management else {
            debug!("未配置管理代理，跳过管理端点注册");
            return;
        };

        let mut handle = self.management_handle.lock();
        if handle.is_some() {
            debug!("管理端点已注册: {}", self.management_name);
            return;
        }

        let target: Arc<dyn LoaderManagement> = Arc::clone(self) as Arc<dyn LoaderManagement>;
        match agent.register(self.management_name.clone(), target) {
            Ok(registered) => {
                info!("管理端点注册完成: {}", registered.object_name);
                *handle = Some(registered);
            }
            Err(e) => warn!("管理端点注册失败: {}", e),
        }
    }

    /// 注销管理端点
    ///
    /// 管理代理持有加载器的强引用，关闭前需要调用以释放加载器
    pub fn uninit(&self) {
        let Some(handle) = self.management_handle.lock().take() else {
            return;
        };
        if let Some(agent) = &self.management {
            match agent.unregister(&handle) {
                Ok(()) => info!("管理端点已注销: {}", handle.object_name),
                Err(e) => warn!("管理端点注销失败: {}", e),
            }
        }
    }

    /// 卸载全部单元
    pub fn unload_all(&self) {
        let names = self.registry.names();
        info!("卸载全部单元: {} 个", names.len());
        for name in names {
            self.unload(&name);
        }
    }

    /// 重新读取单元描述来源并与注册表对账
    ///
    /// 来源不可读时保持现有单元不变
    pub fn reload(&self) -> ReconcileReport {
        let Some(source) = &self.source else {
            warn!("未设置单元描述来源，跳过重载");
            return ReconcileReport::default();
        };

        match source.load_descriptors() {
            Ok(descriptors) => self.reconcile(&descriptors),
            Err(e) => {
                error!("重载时读取单元描述来源失败，保持现有单元: {}", e);
                ReconcileReport::default()
            }
        }
    }

    /// 让注册表与给定的单元描述一致
    ///
    /// 不再列出的描述单元被卸载，新增的单元被加载，配置引用变化的单元先卸载后加载。
    /// 运行时加载且未在描述中列出的单元保持不变。
    pub fn reconcile(&self, descriptors: &[UnitDescriptor]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let wanted: HashMap<&str, String> = descriptors
            .iter()
            .map(|d| (d.name.as_str(), self.substitutions.apply(&d.config_ref)))
            .collect();

        for (name, entry) in self.registry.snapshot() {
            if wanted.contains_key(name.as_str()) {
                continue;
            }
            match entry.origin {
                UnitOrigin::Descriptor => {
                    self.unload(&name);
                    report.unloaded.push(name);
                }
                UnitOrigin::Runtime => {
                    debug!(unit = %name, "运行时加载的单元，重载时保留");
                    report.retained.push(name);
                }
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for descriptor in descriptors {
            let name = descriptor.name.as_str();
            let Some(config_ref) = wanted.get(name) else {
                continue;
            };
            if !seen.insert(name) {
                continue;
            }

            let replacing = match self.registry.entry(name) {
                Some(entry) if entry.config_ref == *config_ref => {
                    report.unchanged.push(name.to_string());
                    continue;
                }
                Some(_) => {
                    debug!(unit = %name, "配置引用已变化，重新加载");
                    self.unload(name);
                    true
                }
                None => false,
            };

            match self.load_as(name, config_ref, UnitOrigin::Descriptor) {
                Ok(()) if replacing => report.replaced.push(name.to_string()),
                Ok(()) => report.loaded.push(name.to_string()),
                Err(e) => {
                    error!(unit = %name, "单元加载失败: {}", e);
                    report.failed.push(UnitFailure {
                        name: name.to_string(),
                        config_ref: config_ref.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "单元对账完成: 新增 {}, 卸载 {}, 替换 {}, 未变 {}, 保留 {}, 失败 {}",
            report.loaded.len(),
            report.unloaded.len(),
            report.replaced.len(),
            report.unchanged.len(),
            report.retained.len(),
            report.failed.len()
        );
        report
    }
}

/// 停止（若在运行）并关闭作用域，收集失败
fn shutdown_scope(name: &str, scope: &SharedScope) -> Vec<TeardownError> {
    let mut failures = Vec::new();

    if scope.is_running() {
        debug!(unit = %name, "停止作用域");
        if let Err(source) = scope.stop() {
            failures.push(TeardownError::Stop {
                unit: name.to_string(),
                source,
            });
        }
    }

    debug!(unit = %name, "关闭作用域");
    if let Err(source) = scope.close() {
        failures.push(TeardownError::Close {
            unit: name.to_string(),
            source,
        });
    }
    failures
}

impl LoaderManagement for ContextLoader {
    fn load_unit(&self, name: &str, config_ref: &str) -> LoaderResult<()> {
        self.load(name, config_ref)
    }

    fn unload_unit(&self, name: &str) {
        self.unload(name)
    }

    fn get_scope(&self, name: &str) -> Option<SharedScope> {
        ContextLoader::get_scope(self, name)
    }

    fn contexts_config(&self) -> Option<String> {
        ContextLoader::contexts_config(self)
    }

    fn parent_scope(&self) -> SharedParent {
        Arc::clone(&self.parent)
    }

    fn loaded_units(&self) -> Vec<String> {
        ContextLoader::loaded_units(self)
    }
}
