//! 单元加载器集中集成测试
use context_loader::{ContextLoader, ContextLoaderBuilder};
use loader_common::{
    ConfigError, ConfigResult, LifecycleError, LifecycleResult, LifecycleState, LoaderError,
    ScopeInfo,
};
use loader_config::{PropertiesDescriptorSource, StaticDescriptorSource, SubstitutionTable};
use parking_lot::Mutex;
use scope_abstractions::{
    ExecutionScope, FnScopeFactory, ManagementAgent, ScopeFactory, SharedParent, SharedScope,
};
use scope_impl::{ConfiguredScope, FileScopeFactory, InMemoryManagementAgent, SingletonParentScope};
use std::any::Any;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 停止和关闭都会失败的作用域
#[derive(Debug)]
struct FaultyScope {
    info: ScopeInfo,
    state: Mutex<LifecycleState>,
}

impl ExecutionScope for FaultyScope {
    fn info(&self) -> &ScopeInfo {
        &self.info
    }

    fn config_ref(&self) -> &str {
        "faulty"
    }

    fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    fn start(&self) -> LifecycleResult<()> {
        *self.state.lock() = LifecycleState::Running;
        Ok(())
    }

    fn stop(&self) -> LifecycleResult<()> {
        Err(LifecycleError::StopFailed {
            scope: self.info.name.clone(),
            message: "worker thread did not exit".to_string(),
        })
    }

    fn close(&self) -> LifecycleResult<()> {
        Err(LifecycleError::CloseFailed {
            scope: self.info.name.clone(),
            message: "resource still in use".to_string(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn write_unit(dir: &Path, file: &str, content: &str) -> String {
    let path = dir.join(file);
    std::fs::write(&path, content).unwrap();
    path.display().to_string()
}

fn file_loader(parent: &SharedParent) -> ContextLoaderBuilder {
    ContextLoaderBuilder::new(Arc::clone(parent), Arc::new(FileScopeFactory::new()))
}

fn root_parent() -> SharedParent {
    Arc::new(SingletonParentScope::root())
}

/// 注册表和父作用域对同一名称的视图一致
fn assert_consistent(loader: &ContextLoader, parent: &SharedParent, name: &str) {
    match (loader.get_scope(name), parent.get_singleton(name)) {
        (Some(registered), Some(published)) => assert!(Arc::ptr_eq(&registered, &published)),
        (None, None) => {}
        (registered, published) => panic!(
            "单元 {} 状态不一致: registry={:?}, parent={:?}",
            name,
            registered.map(|s| s.info().id),
            published.map(|s| s.info().id)
        ),
    }
}

#[tokio::test]
async fn test_load_unload_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config_ref = write_unit(
        dir.path(),
        "oflaDemo.toml",
        "display_name = \"oflaDemo\"\n[properties]\ncontext_path = \"/oflaDemo\"\n",
    );
    let parent = root_parent();
    let loader = file_loader(&parent).build();

    loader.load("oflaDemo", &config_ref).unwrap();
    let scope = loader.get_scope("oflaDemo").unwrap();
    assert_consistent(&loader, &parent, "oflaDemo");
    assert!(scope.is_running());

    let configured = scope.as_any().downcast_ref::<ConfiguredScope>().unwrap();
    assert_eq!(configured.property("context_path"), Some("/oflaDemo"));
    assert_eq!(configured.info().name, "root.oflaDemo");

    loader.unload("oflaDemo");
    assert!(loader.get_scope("oflaDemo").is_none());
    assert!(!parent.contains_singleton("oflaDemo"));
    assert_eq!(scope.state(), LifecycleState::Closed);
}

#[tokio::test]
async fn test_unload_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config_ref = write_unit(dir.path(), "live.toml", "autostart = true\n");
    let parent = root_parent();
    let loader = file_loader(&parent).build();

    loader.load("live", &config_ref).unwrap();
    loader.unload("live");
    let after_first: Vec<String> = parent.singleton_names();

    loader.unload("live");
    loader.unload("never");

    assert_eq!(parent.singleton_names(), after_first);
    assert!(loader.loaded_units().is_empty());
}

#[tokio::test]
async fn test_factory_failure_leaves_no_partial_registration() {
    let dir = tempfile::tempdir().unwrap();
    let parent = root_parent();
    let loader = file_loader(&parent).build();

    let missing = dir.path().join("missing.toml").display().to_string();
    let err = loader.load("ghost", &missing).unwrap_err();
    assert!(matches!(
        err,
        LoaderError::Configuration {
            source: ConfigError::FileNotFound { .. }
        }
    ));

    let malformed = write_unit(dir.path(), "broken.toml", "autostart = [not valid\n");
    let err = loader.load("broken", &malformed).unwrap_err();
    assert!(err.is_configuration());

    for name in ["ghost", "broken"] {
        assert!(loader.get_scope(name).is_none());
        assert!(!parent.contains_singleton(name));
    }
}

#[tokio::test]
async fn test_names_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_unit(dir.path(), "a.toml", "autostart = true\n");
    let b = write_unit(dir.path(), "b.json", "{\"display_name\": \"bee\"}");
    let parent = root_parent();
    let loader = file_loader(&parent).build();

    loader.load("a", &a).unwrap();
    loader.load("b", &b).unwrap();
    let scope_b = loader.get_scope("b").unwrap();

    loader.unload("a");

    assert!(Arc::ptr_eq(&loader.get_scope("b").unwrap(), &scope_b));
    assert!(scope_b.is_running());
    assert_consistent(&loader, &parent, "a");
    assert_consistent(&loader, &parent, "b");
}

#[tokio::test]
async fn test_registration_error_is_returned_and_rolled_back() {
    let dir = tempfile::tempdir().unwrap();
    let config_ref = write_unit(dir.path(), "chat.toml", "autostart = true\n");
    let parent = root_parent();
    let loader = file_loader(&parent).build();

    // 父作用域中已有同名单例
    let occupant = FileScopeFactory::new().create(&config_ref, &parent).unwrap();
    parent.register_singleton("chat", Arc::clone(&occupant)).unwrap();

    let err = loader.load("chat", &config_ref).unwrap_err();
    assert!(err.is_registration());
    assert!(loader.get_scope("chat").is_none());
    assert!(Arc::ptr_eq(&parent.get_singleton("chat").unwrap(), &occupant));
}

#[tokio::test]
async fn test_teardown_failures_are_suppressed() {
    let parent = root_parent();
    let factory = FnScopeFactory::new(
        "faulty",
        |_config_ref: &str, parent: &SharedParent| -> ConfigResult<SharedScope> {
            let scope: SharedScope = Arc::new(FaultyScope {
                info: parent.info().child("faulty"),
                state: Mutex::new(LifecycleState::Running),
            });
            Ok(scope)
        },
    );
    let loader = ContextLoaderBuilder::new(Arc::clone(&parent), Arc::new(factory)).build();

    loader.load("faulty", "faulty").unwrap();
    loader.unload("faulty");

    // 停止和关闭失败被吞掉，单元仍然从两处移除
    assert!(loader.get_scope("faulty").is_none());
    assert!(!parent.contains_singleton("faulty"));
}

#[tokio::test]
async fn test_init_from_properties_file() {
    let dir = tempfile::tempdir().unwrap();
    let webapps = dir.path().join("webapps");
    std::fs::create_dir(&webapps).unwrap();
    write_unit(&webapps, "first.toml", "autostart = true\n");
    write_unit(&webapps, "third.yaml", "display_name: third\n");

    let contexts = dir.path().join("contexts.properties");
    std::fs::write(
        &contexts,
        "\
# 单元列表
first = ${root}/webapps/first.toml
second = ${root}/webapps/second.toml
third = ${root}/webapps/third.yaml
",
    )
    .unwrap();

    let parent = root_parent();
    let root = dir.path().display().to_string();
    let loader = file_loader(&parent)
        .with_source(PropertiesDescriptorSource::new(&contexts))
        .with_substitutions(SubstitutionTable::new().with_root(&root))
        .build_shared();

    let report = loader.init();

    assert!(report.source_found);
    assert_eq!(report.loaded, vec!["first", "third"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "second");
    assert_eq!(
        report.failed[0].config_ref,
        format!("{root}/webapps/second.toml")
    );

    assert_eq!(
        loader.get_scope("first").unwrap().config_ref(),
        format!("{root}/webapps/first.toml")
    );
    for name in ["first", "second", "third"] {
        assert_consistent(&loader, &parent, name);
    }
}

#[tokio::test]
async fn test_init_with_missing_source_loads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let parent = root_parent();
    let loader = file_loader(&parent)
        .with_source(PropertiesDescriptorSource::new(
            dir.path().join("contexts.properties"),
        ))
        .build_shared();

    let report = loader.init();

    assert!(!report.source_found);
    assert!(report.loaded.is_empty());
    assert!(report.failed.is_empty());
    assert!(loader.loaded_units().is_empty());
    assert!(parent.singleton_names().is_empty());
}

#[tokio::test]
async fn test_management_surface() {
    let dir = tempfile::tempdir().unwrap();
    let config_ref = write_unit(dir.path(), "admin.toml", "autostart = true\n");
    let agent = Arc::new(InMemoryManagementAgent::new());
    let parent = root_parent();
    let loader = file_loader(&parent)
        .with_source(StaticDescriptorSource::new("memory"))
        .with_management(agent.clone())
        .build_shared();

    loader.init();

    let managed = agent.lookup(loader.management_name()).unwrap();
    assert_eq!(managed.contexts_config().as_deref(), Some("memory"));

    managed.load_unit("admin", &config_ref).unwrap();
    assert!(managed.get_scope("admin").is_some());
    assert!(managed.parent_scope().contains_singleton("admin"));

    managed.unload_unit("admin");
    assert!(managed.loaded_units().is_empty());

    loader.uninit();
    assert!(agent.lookup(loader.management_name()).is_none());
}

#[tokio::test]
async fn test_reload_follows_descriptor_file() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_unit(dir.path(), "a.toml", "autostart = true\n");
    let b = write_unit(dir.path(), "b.toml", "autostart = true\n");
    let contexts = dir.path().join("contexts.properties");
    std::fs::write(&contexts, format!("a = {a}\n")).unwrap();

    let parent = root_parent();
    let loader = file_loader(&parent)
        .with_source(PropertiesDescriptorSource::new(&contexts))
        .build_shared();
    loader.init();
    assert_eq!(loader.loaded_units(), vec!["a"]);

    std::fs::write(&contexts, format!("b = {b}\n")).unwrap();
    let report = loader.reload();
    assert_eq!(report.loaded, vec!["b"]);
    assert_eq!(report.unloaded, vec!["a"]);
    assert_eq!(loader.loaded_units(), vec!["b"]);

    // 描述文件暂时不可读时保留现有单元
    std::fs::remove_file(&contexts).unwrap();
    let report = loader.reload();
    assert!(!report.has_changes());
    assert_eq!(loader.loaded_units(), vec!["b"]);
}

#[tokio::test]
async fn test_reload_keeps_runtime_units() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_unit(dir.path(), "a.toml", "autostart = true\n");
    let hot = write_unit(dir.path(), "hot.toml", "autostart = true\n");
    let contexts = dir.path().join("contexts.properties");
    std::fs::write(&contexts, format!("a = {a}\n")).unwrap();

    let parent = root_parent();
    let loader = file_loader(&parent)
        .with_source(PropertiesDescriptorSource::new(&contexts))
        .build_shared();
    loader.init();
    loader.load("hot", &hot).unwrap();
    let hot_scope = loader.get_scope("hot").unwrap();

    // 只加一行注释，单元列表不变
    std::fs::write(&contexts, format!("# 热加载单元不写入此文件\na = {a}\n")).unwrap();
    let report = loader.reload();
    assert!(report.unloaded.is_empty());
    assert_eq!(report.retained, vec!["hot"]);
    assert_eq!(loader.loaded_units(), vec!["a", "hot"]);
    assert!(Arc::ptr_eq(&loader.get_scope("hot").unwrap(), &hot_scope));
    assert!(!hot_scope.is_closed());
    assert_consistent(&loader, &parent, "hot");

    let status = serde_json::to_value(loader.status()).unwrap();
    assert_eq!(status[0]["origin"], "descriptor");
    assert_eq!(status[1]["origin"], "runtime");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_name_operations_stay_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let config_ref = write_unit(dir.path(), "hot.toml", "autostart = true\n");
    let parent = root_parent();
    let loader = Arc::new(file_loader(&parent).build());
    let running = Arc::new(AtomicBool::new(true));

    // 持有同名串行锁观察：可见的单元始终一致且未被关闭
    let observer = {
        let loader = Arc::clone(&loader);
        let parent = Arc::clone(&parent);
        let running = Arc::clone(&running);
        tokio::task::spawn_blocking(move || {
            let mut samples = 0usize;
            while running.load(Ordering::SeqCst) {
                let lock = loader.registry().name_lock("hot");
                let guard = lock.lock();
                if let Some(scope) = loader.get_scope("hot") {
                    assert!(!scope.is_closed(), "已注册的单元不应处于关闭状态");
                }
                assert_consistent(&loader, &parent, "hot");
                drop(guard);
                samples += 1;
                std::thread::yield_now();
            }
            samples
        })
    };

    let tasks: Vec<_> = (0..8)
        .map(|worker| {
            let loader = Arc::clone(&loader);
            let config_ref = config_ref.clone();
            tokio::task::spawn_blocking(move || {
                for round in 0..50 {
                    if (worker + round) % 2 == 0 {
                        // 已加载时父作用域拒绝重复注册，错误可以忽略
                        let _ = loader.load("hot", &config_ref);
                    } else {
                        loader.unload("hot");
                    }
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }
    running.store(false, Ordering::SeqCst);
    assert!(observer.await.unwrap() > 0);

    assert_consistent(&loader, &parent, "hot");
    if let Some(scope) = loader.get_scope("hot") {
        assert!(!scope.is_closed());
        assert_eq!(scope.state(), LifecycleState::Running);
    }
    loader.unload("hot");
    assert!(loader.get_scope("hot").is_none());
    assert!(!parent.contains_singleton("hot"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_names() {
    let dir = tempfile::tempdir().unwrap();
    let config_ref = write_unit(dir.path(), "unit.toml", "autostart = true\n");
    let parent = root_parent();
    let loader = Arc::new(file_loader(&parent).build());

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let loader = Arc::clone(&loader);
            let config_ref = config_ref.clone();
            tokio::task::spawn_blocking(move || loader.load(&format!("unit-{i}"), &config_ref))
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(loader.loaded_units().len(), 16);
    for i in 0..16 {
        assert_consistent(&loader, &parent, &format!("unit-{i}"));
    }

    let status = serde_json::to_value(loader.status()).unwrap();
    assert_eq!(status.as_array().unwrap().len(), 16);

    loader.unload_all();
    assert!(parent.singleton_names().is_empty());
}

#[tokio::test]
async fn test_substitution_without_config_root_keeps_placeholder() -> anyhow::Result<()> {
    let parent = root_parent();
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let recorder = Arc::clone(&seen);
    let factory = FnScopeFactory::new(
        "recording",
        move |config_ref: &str, parent: &SharedParent| -> ConfigResult<SharedScope> {
            recorder.lock().push(config_ref.to_string());
            let scope: SharedScope = Arc::new(FaultyScope {
                info: parent.info().child(config_ref),
                state: Mutex::new(LifecycleState::Created),
            });
            Ok(scope)
        },
    );

    let loader = ContextLoaderBuilder::new(Arc::clone(&parent), Arc::new(factory))
        .with_source(
            StaticDescriptorSource::new("memory")
                .with_unit("a", "${root}/a.toml")
                .with_unit("b", "${config_root}/b.toml"),
        )
        .with_substitutions(SubstitutionTable::new().with_root("/srv"))
        .build_shared();

    let report = loader.init();
    anyhow::ensure!(report.failed.is_empty(), "unexpected failures: {:?}", report.failed);

    assert_eq!(
        *seen.lock(),
        vec!["/srv/a.toml".to_string(), "${config_root}/b.toml".to_string()]
    );
    Ok(())
}
