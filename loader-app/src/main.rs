//! # 单元加载器
//!
//! 按单元描述文件启动加载单元，等待退出信号后卸载全部单元

use anyhow::Context;
use clap::Parser;
use context_loader::{ContextLoader, ContextLoaderBuilder, DescriptorWatcher};
use loader_config::{LoaderSettings, PropertiesDescriptorSource};
use scope_abstractions::SharedParent;
use scope_impl::{FileScopeFactory, InMemoryManagementAgent, SingletonParentScope};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "unit-loader")]
#[command(about = "按单元描述文件加载隔离的单元作用域")]
struct Args {
    /// 加载器设置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 单元描述文件路径
    #[arg(long)]
    contexts_config: Option<String>,

    /// `${root}` 的替换值
    #[arg(long)]
    root: Option<String>,

    /// `${config_root}` 的替换值
    #[arg(long)]
    config_root: Option<String>,

    /// 监控单元描述文件并热重载
    #[arg(long)]
    watch: bool,

    /// 加载完成后立即卸载并退出
    #[arg(long)]
    once: bool,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 以 JSON 格式输出日志
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    init_logging(&args);

    info!("启动单元加载器");

    let settings = load_settings(&args)?;
    let loader = build_loader(&settings);

    let report = loader.init();
    if !report.source_found {
        warn!("没有加载任何单元: {}", settings.contexts_config);
    }
    println!("{}", serde_json::to_string_pretty(&loader.status())?);

    if args.once {
        shutdown(&loader);
        return Ok(());
    }

    let watcher = if settings.watch {
        Some(
            DescriptorWatcher::start(
                Arc::clone(&loader),
                &settings.contexts_config,
                settings.debounce(),
            )
            .context("启动单元描述文件监控失败")?,
        )
    } else {
        None
    };

    // 等待退出信号
    tokio::signal::ctrl_c().await.context("等待退出信号失败")?;

    info!("收到退出信号，正在卸载单元");
    drop(watcher);
    shutdown(&loader);

    info!("单元加载器已关闭");
    Ok(())
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(parse_log_level(&args.log_level)).into())
    });

    if args.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// 读取设置，命令行参数优先
fn load_settings(args: &Args) -> anyhow::Result<LoaderSettings> {
    let mut settings =
        LoaderSettings::load(args.config.as_deref()).context("读取加载器设置失败")?;

    if let Some(contexts_config) = &args.contexts_config {
        settings.contexts_config = contexts_config.clone();
    }
    if let Some(root) = &args.root {
        settings.root = Some(root.clone());
    }
    if let Some(config_root) = &args.config_root {
        settings.config_root = Some(config_root.clone());
    }
    settings.watch |= args.watch;

    settings.validate().context("加载器设置无效")?;
    info!("单元描述文件: {}", settings.contexts_config);
    Ok(settings)
}

/// 组装父作用域、工厂、描述来源和管理代理
fn build_loader(settings: &LoaderSettings) -> Arc<ContextLoader> {
    let parent: SharedParent =
        Arc::new(SingletonParentScope::root().with_duplicate_policy(settings.duplicate_policy));

    // 相对的配置引用基于描述文件所在目录解析
    let mut factory = FileScopeFactory::new();
    if let Some(dir) = Path::new(&settings.contexts_config)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
    {
        factory = factory.with_base_dir(dir);
    }

    ContextLoaderBuilder::new(parent, Arc::new(factory))
        .with_source(PropertiesDescriptorSource::new(&settings.contexts_config))
        .with_substitutions(settings.substitutions())
        .with_management(Arc::new(InMemoryManagementAgent::new()))
        .build_shared()
}

fn shutdown(loader: &ContextLoader) {
    loader.unload_all();
    loader.uninit();
}

fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
