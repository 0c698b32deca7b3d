// lib.rs
//
// ================================================================================
// Ayjx Yulu - 聚合语录机器人
//
// 架构：事件模型 | 插件流水线 | 原子配置
// ================================================================================

#[macro_use]
pub mod log;

pub mod http;
pub mod plugins;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast, mpsc};

// ============================================================================
// 1. Error Types (统一错误处理)
// ============================================================================

/// 框架核心错误类型
pub type AyjxError = Box<dyn std::error::Error + Send + Sync>;

pub type AyjxResult<T> = Result<T, AyjxError>;

// ============================================================================
// 2. Data Models (事件数据模型)
// ============================================================================

/// 聊天频道，频道 ID 即回复目标
#[derive(Debug, Clone, Default)]
pub struct Channel {
    pub id: String,
}

impl Channel {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// 一条纯文本消息
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub channel: Option<Channel>,
}

impl Message {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            channel: None,
        }
    }

    pub fn in_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }
}

/// 事件来源的登录信息
#[derive(Debug, Clone, Default)]
pub struct Login {
    /// 适配器 ID，回复时据此找到发送通道
    pub adapter: String,
}

impl Login {
    pub fn new(adapter: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
        }
    }
}

/// 事件类型常量
pub mod event_types {
    pub const MESSAGE_CREATED: &str = "message-created";

    pub const LOGIN_ADDED: &str = "login-added";
    pub const LOGIN_REMOVED: &str = "login-removed";
}

/// 核心事件结构
#[derive(Debug, Clone, Default)]
pub struct Event {
    pub event_type: String,
    pub login: Option<Login>,
    pub channel: Option<Channel>,
    pub message: Option<Message>,
}

impl Event {
    /// 创建消息创建事件，频道取自消息本身
    pub fn message_created(message: Message) -> Self {
        Self {
            event_type: event_types::MESSAGE_CREATED.to_string(),
            channel: message.channel.clone(),
            message: Some(message),
            ..Default::default()
        }
    }

    pub fn login_added(login: Login) -> Self {
        Self {
            event_type: event_types::LOGIN_ADDED.to_string(),
            login: Some(login),
            ..Default::default()
        }
    }

    pub fn login_removed(login: Login) -> Self {
        Self {
            event_type: event_types::LOGIN_REMOVED.to_string(),
            login: Some(login),
            ..Default::default()
        }
    }

    pub fn with_login(mut self, login: Login) -> Self {
        self.login = Some(login);
        self
    }

    pub fn is_message_created(&self) -> bool {
        self.event_type == event_types::MESSAGE_CREATED
    }

    /// 获取消息内容（如果是消息事件）
    pub fn content(&self) -> Option<&str> {
        self.message.as_ref().map(|m| m.content.as_str())
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel.as_ref().map(|c| c.id.as_str())
    }

    pub fn adapter(&self) -> Option<&str> {
        self.login.as_ref().map(|l| l.adapter.as_str())
    }
}

// ============================================================================
// 3. Configuration System (配置系统)
// ============================================================================

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// 核心配置
    #[serde(default)]
    pub core: CoreConfig,
    /// 插件配置（使用 flatten 支持任意插件配置）
    #[serde(flatten)]
    pub plugins: HashMap<String, toml::Value>,
}

/// 核心配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// 日志级别: debug | info | warn | error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// 获取指定插件的配置，段缺失或无法解析时返回 `None`
    pub fn get_plugin_config<T: for<'de> Deserialize<'de>>(&self, plugin_id: &str) -> Option<T> {
        self.plugins
            .get(plugin_id)
            .and_then(|v| v.clone().try_into().ok())
    }
}

/// 配置管理器
pub struct ConfigManager {
    path: PathBuf,
    config: RwLock<AppConfig>,
}

impl ConfigManager {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config: RwLock::new(AppConfig::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 加载配置
    pub async fn load(&self) -> AyjxResult<AppConfig> {
        self.load_or_create().await.map(|(cfg, _)| cfg)
    }

    /// 加载配置，文件不存在时写入默认配置。
    ///
    /// 第二个返回值表示文件是否为本次新建。解析失败时内存中的配置保持不变，
    /// 磁盘上的文件也不会被覆盖。
    pub async fn load_or_create(&self) -> AyjxResult<(AppConfig, bool)> {
        if !self.path.exists() {
            let default_cfg = AppConfig::default();
            self.save_atomic(&default_cfg).await?;
            return Ok((default_cfg, true));
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        let cfg: AppConfig = toml::from_str(&content)?;

        *self.config.write().await = cfg.clone();
        Ok((cfg, false))
    }

    /// 原子写入配置（写临时文件 -> Rename 覆盖）
    pub async fn save_atomic(&self, cfg: &AppConfig) -> AyjxResult<()> {
        let content = toml::to_string_pretty(cfg)?;
        let path = self.path.clone();
        let tmp_path = self.path.with_extension("tmp");

        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp_path, &path)
        })
        .await??;

        *self.config.write().await = cfg.clone();
        Ok(())
    }

    /// 获取当前配置（只读快照）
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }
}

// ============================================================================
// 4. Plugin Traits (插件接口定义)
// ============================================================================

/// 适配器接口
/// 负责与聊天平台通信：产生事件、投递回复
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// 适配器唯一标识
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// 启动适配器，事件经 `ctx.event_tx` 送入框架
    async fn start(&self, ctx: AdapterContext) -> AyjxResult<()>;

    async fn stop(&self) -> AyjxResult<()>;

    /// 向频道发送文本消息
    async fn send_message(&self, channel_id: &str, content: &str) -> AyjxResult<()>;
}

/// 适配器上下文，传递给适配器的 start 方法
pub struct AdapterContext {
    pub event_tx: mpsc::Sender<Event>,
    /// 框架关闭时会收到 `SystemSignal::Shutdown`
    pub system_rx: broadcast::Receiver<SystemSignal>,
}

/// 业务逻辑插件接口
#[async_trait]
pub trait Plugin: Send + Sync {
    /// 插件唯一标识，同时也是配置文件中的段名
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.1.0"
    }

    /// 新建配置文件时写入的默认配置段
    fn default_config(&self) -> Option<toml::Value> {
        None
    }

    /// 插件优先级（数字越小优先级越高）
    fn priority(&self) -> i32 {
        100
    }

    /// 插件加载时调用
    async fn on_load(&self, _ctx: &PluginContext) -> AyjxResult<()> {
        Ok(())
    }

    /// 插件卸载时调用
    async fn on_unload(&self, _ctx: &PluginContext) -> AyjxResult<()> {
        Ok(())
    }

    /// 接收事件
    async fn on_event(&self, ctx: &PluginContext, event: &Event) -> AyjxResult<EventResult>;

    /// 配置重载通知
    async fn on_config_reload(
        &self,
        _ctx: &PluginContext,
        _new_config: &AppConfig,
    ) -> AyjxResult<()> {
        Ok(())
    }
}

/// 事件处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventResult {
    /// 继续传递事件给后续插件
    #[default]
    Continue,
    /// 停止传递事件（事件已被处理）
    Stop,
}

type AdapterMap = HashMap<String, Arc<dyn Adapter>>;

/// 插件上下文
#[derive(Clone)]
pub struct PluginContext {
    config: Arc<ConfigManager>,
    adapters: Arc<AdapterMap>,
    plugin_id: Arc<str>,
}

impl PluginContext {
    /// 获取当前插件的配置段
    pub async fn plugin_config<T: for<'de> Deserialize<'de>>(&self) -> Option<T> {
        self.config.get().await.get_plugin_config(&self.plugin_id)
    }

    /// 回复到事件所在的频道
    pub async fn reply(&self, event: &Event, content: &str) -> AyjxResult<()> {
        let adapter_id = event.adapter().ok_or("Event has no adapter info")?;
        let channel_id = event.channel_id().ok_or("Event has no channel info")?;

        let adapter = self
            .adapters
            .get(adapter_id)
            .ok_or_else(|| format!("Adapter {} not found", adapter_id))?;
        adapter.send_message(channel_id, content).await
    }
}

// ============================================================================
// 5. System Signals (系统信号)
// ============================================================================

#[derive(Clone, Debug)]
pub enum SystemSignal {
    Shutdown,
}

// ============================================================================
// 6. Framework Core (框架核心)
// ============================================================================

struct AyjxInner {
    config: Arc<ConfigManager>,
    adapters: Arc<AdapterMap>,
    /// 按优先级排好序，构建后不再变化
    plugins: Vec<Arc<dyn Plugin>>,
    system_tx: broadcast::Sender<SystemSignal>,
    event_tx: mpsc::Sender<Event>,
}

/// 框架构建器
pub struct AyjxBuilder {
    config_path: PathBuf,
    adapters: Vec<Box<dyn Adapter>>,
    plugins: Vec<Box<dyn Plugin>>,
}

impl AyjxBuilder {
    pub fn new() -> Self {
        Self {
            config_path: PathBuf::from("config.toml"),
            adapters: Vec::new(),
            plugins: Vec::new(),
        }
    }

    pub fn config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = path.as_ref().to_path_buf();
        self
    }

    pub fn adapter<A: Adapter + 'static>(mut self, adapter: A) -> Self {
        self.adapters.push(Box::new(adapter));
        self
    }

    pub fn plugin<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn build(self) -> Ayjx {
        let (event_tx, event_rx) = mpsc::channel(1000);
        let (system_tx, _) = broadcast::channel(16);

        let adapters = self
            .adapters
            .into_iter()
            .map(|a| (a.id().to_string(), Arc::from(a) as Arc<dyn Adapter>))
            .collect();

        // 稳定排序：同优先级保持注册顺序
        let mut plugins = self.plugins;
        plugins.sort_by_key(|p| p.priority());

        Ayjx {
            inner: Arc::new(AyjxInner {
                config: Arc::new(ConfigManager::new(&self.config_path)),
                adapters: Arc::new(adapters),
                plugins: plugins
                    .into_iter()
                    .map(|p| Arc::from(p) as Arc<dyn Plugin>)
                    .collect(),
                system_tx,
                event_tx,
            }),
            event_rx: Some(event_rx),
        }
    }
}

impl Default for AyjxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Ayjx 框架核心
pub struct Ayjx {
    inner: Arc<AyjxInner>,
    /// 事件接收端 (仅在主循环使用)
    event_rx: Option<mpsc::Receiver<Event>>,
}

impl Ayjx {
    pub fn builder() -> AyjxBuilder {
        AyjxBuilder::new()
    }

    /// 加载配置并初始化插件
    ///
    /// 只有新建配置文件时才写入插件默认配置段；已有文件缺少某个段时保持原样，
    /// 由插件自行决定如何处理。配置文件损坏时记录错误后以空配置继续。
    pub async fn init(&self) -> AyjxResult<()> {
        let config = &self.inner.config;
        info!(target: "Config", "正在加载配置: {}", config.path().display());

        match config.load_or_create().await {
            Ok((mut cfg, true)) => {
                for plugin in self.inner.plugins.iter() {
                    if let Some(def_cfg) = plugin.default_config() {
                        info!(target: "Config", "+ 初始化插件配置: {}", plugin.name());
                        cfg.plugins.insert(plugin.id().to_string(), def_cfg);
                    }
                }
                config.save_atomic(&cfg).await?;
                apply_log_level(&cfg.core);
            }
            Ok((cfg, false)) => apply_log_level(&cfg.core),
            Err(e) => {
                error!(
                    target: "Config",
                    "加载配置文件 {} 失败: {}",
                    config.path().display(),
                    e
                );
            }
        }

        for plugin in self.inner.plugins.iter() {
            let ctx = self.inner.plugin_context(plugin.id());
            match plugin.on_load(&ctx).await {
                Ok(()) => {
                    info!(target: "Plugin", "✅ [{}] v{} 就绪", plugin.name(), plugin.version())
                }
                Err(e) => error!(target: "Plugin", "❌ [{}] 初始化失败: {}", plugin.name(), e),
            }
        }

        Ok(())
    }

    /// 启动框架：初始化、启动适配器并进入事件循环，Ctrl-C 退出
    pub async fn run(mut self) -> AyjxResult<()> {
        info!("Ayjx Yulu 正在启动...");
        self.init().await?;

        for (id, adapter) in self.inner.adapters.iter() {
            let adapter = adapter.clone();
            let ctx = AdapterContext {
                event_tx: self.inner.event_tx.clone(),
                system_rx: self.inner.system_tx.subscribe(),
            };
            info!("- {} ({}) 已启动", adapter.name(), id);

            tokio::spawn(async move {
                if let Err(e) = adapter.start(ctx).await {
                    error!("适配器 {} 运行错误: {}", adapter.id(), e);
                }
            });
        }

        let mut event_rx = self
            .event_rx
            .take()
            .ok_or("事件循环已在运行")?;
        info!("事件循环已启动，等待消息...");

        loop {
            tokio::select! {
                maybe_event = event_rx.recv() => {
                    let Some(event) = maybe_event else { break };
                    // 每个事件独立任务处理，插件之间不互相阻塞
                    let inner = self.inner.clone();
                    tokio::spawn(async move {
                        inner.process_event(event).await;
                    });
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("收到 Ctrl-C，正在停止...");
                    break;
                }
            }
        }

        self.shutdown().await;
        info!("框架已停止");
        Ok(())
    }

    /// 直接将事件送入插件流水线并等待处理完成
    pub async fn dispatch(&self, event: Event) {
        self.inner.process_event(event).await;
    }

    /// 重新读取配置文件并通知所有插件
    pub async fn reload_config(&self) {
        info!(target: "Config", "重新加载配置...");
        let new_cfg = match self.inner.config.load().await {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(target: "Config", "重新加载配置失败: {}", e);
                return;
            }
        };

        apply_log_level(&new_cfg.core);
        for plugin in self.inner.plugins.iter() {
            let ctx = self.inner.plugin_context(plugin.id());
            if let Err(e) = plugin.on_config_reload(&ctx, &new_cfg).await {
                error!(target: "Plugin", "[{}] 配置重载失败: {}", plugin.name(), e);
            }
        }
    }

    async fn shutdown(&self) {
        let _ = self.inner.system_tx.send(SystemSignal::Shutdown);

        for (id, adapter) in self.inner.adapters.iter() {
            if let Err(e) = adapter.stop().await {
                error!("停止适配器 {} 时发生错误: {}", id, e);
            }
        }

        for plugin in self.inner.plugins.iter() {
            let ctx = self.inner.plugin_context(plugin.id());
            if let Err(e) = plugin.on_unload(&ctx).await {
                error!(target: "Plugin", "[{}] 卸载失败: {}", plugin.name(), e);
            }
        }
    }
}

impl AyjxInner {
    /// 按优先级依次交给插件，遇到 Stop 即终止；插件出错只记录，不影响后续插件
    async fn process_event(&self, event: Event) {
        for plugin in self.plugins.iter() {
            let ctx = self.plugin_context(plugin.id());

            match plugin.on_event(&ctx, &event).await {
                Ok(EventResult::Stop) => break,
                Ok(EventResult::Continue) => {}
                Err(e) => {
                    error!(target: "Plugin", "插件 {} 处理事件时发生错误: {}", plugin.name(), e);
                }
            }
        }
    }

    fn plugin_context(&self, plugin_id: &str) -> PluginContext {
        PluginContext {
            config: self.config.clone(),
            adapters: self.adapters.clone(),
            plugin_id: Arc::from(plugin_id),
        }
    }
}

fn apply_log_level(core: &CoreConfig) {
    match core.log_level.parse::<log::Level>() {
        Ok(level) => log::set_max_level(level),
        Err(e) => warn!(target: "Config", "{}，沿用当前级别", e),
    }
}

// ============================================================================
// 7. Re-exports (重新导出)
// ============================================================================

pub mod prelude {
    //! 常用类型的预导入模块
    //!
    //! ```rust
    //! use ayjx_yulu::prelude::*;
    //! ```

    pub use super::{Ayjx, AyjxBuilder, AyjxError, AyjxResult};

    pub use super::{Adapter, AdapterContext, EventResult, Plugin, PluginContext, SystemSignal};

    pub use super::{AppConfig, CoreConfig};

    pub use super::{Channel, Event, Login, Message};

    pub use async_trait::async_trait;

    pub use toml;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_sections_are_flattened() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [core]
            log_level = "debug"

            [yulu]
            enable = false
            "#,
        )
        .unwrap();

        assert_eq!(cfg.core.log_level, "debug");
        assert!(cfg.plugins.contains_key("yulu"));
        assert!(!cfg.plugins.contains_key("core"));
    }

    #[test]
    fn missing_core_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.core.log_level, "info");
        assert!(cfg.plugins.is_empty());
    }

    #[test]
    fn message_event_takes_channel_from_message() {
        let msg = Message::new("1", "hello").in_channel(Channel::new("room"));
        let event = Event::message_created(msg).with_login(Login::new("mock"));

        assert!(event.is_message_created());
        assert_eq!(event.content(), Some("hello"));
        assert_eq!(event.channel_id(), Some("room"));
        assert_eq!(event.adapter(), Some("mock"));
    }

    #[tokio::test]
    async fn load_reports_whether_file_was_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let manager = ConfigManager::new(&path);

        let (cfg, created) = manager.load_or_create().await.unwrap();
        assert!(created);
        assert!(path.exists());
        assert_eq!(cfg.core.log_level, "info");

        let (_, created_again) = manager.load_or_create().await.unwrap();
        assert!(!created_again);
    }

    #[tokio::test]
    async fn broken_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[yulu\nenable = ").unwrap();
        let manager = ConfigManager::new(&path);

        assert!(manager.load().await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[yulu\nenable = ");
        assert!(manager.get().await.plugins.is_empty());
    }

    #[tokio::test]
    async fn saved_config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let manager = ConfigManager::new(&path);

        let mut cfg = AppConfig::default();
        cfg.core.log_level = "warn".to_string();
        cfg.plugins.insert(
            "yulu".to_string(),
            toml::from_str::<toml::Value>("enable = true").unwrap(),
        );
        manager.save_atomic(&cfg).await.unwrap();

        let reloaded = ConfigManager::new(&path).load().await.unwrap();
        assert_eq!(reloaded.core.log_level, "warn");
        assert!(reloaded.plugins.contains_key("yulu"));
        assert!(!path.with_extension("tmp").exists());
    }
}
