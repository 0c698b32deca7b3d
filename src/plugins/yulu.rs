//! 聚合语录插件
//!
//! 发送语录类型名称获取对应语录，发送 `随机人设` 获取随机角色设定，
//! 发送 `语录列表` 查看支持的类型。

mod catalog;
mod config;

pub use catalog::{BUILTIN_QUOTE_TYPES, QuoteCatalog, QuoteType};
pub use config::{DEFAULT_PERSONA_API, DEFAULT_QUOTE_API, YuluConfig};

use crate::http;
use crate::prelude::*;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const PLUGIN_ID: &str = "yulu";

pub const PERSONA_COMMAND: &str = "随机人设";
pub const LIST_COMMAND: &str = "语录列表";
pub const PERSONA_FAILED: &str = "获取随机人设失败，请稍后再试~";

/// 让接口以纯文本返回
const QUOTE_OUTPUT_TYPE: &str = "t(1,text,2,lipson)";

/// 识别出的指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Persona,
    Quote(&'a QuoteType),
    List,
}

type Rule = for<'a> fn(&'a QuoteCatalog, &str) -> Option<Command<'a>>;

/// 按顺序尝试，首个命中即生效
const RULES: &[Rule] = &[match_persona, match_quote, match_list];

fn match_persona<'a>(_: &'a QuoteCatalog, content: &str) -> Option<Command<'a>> {
    (content == PERSONA_COMMAND).then_some(Command::Persona)
}

fn match_quote<'a>(catalog: &'a QuoteCatalog, content: &str) -> Option<Command<'a>> {
    catalog.get(content).map(Command::Quote)
}

fn match_list<'a>(_: &'a QuoteCatalog, content: &str) -> Option<Command<'a>> {
    (content == LIST_COMMAND).then_some(Command::List)
}

/// 将消息内容映射为指令，不识别时返回 `None`
pub fn route<'a>(catalog: &'a QuoteCatalog, content: &str) -> Option<Command<'a>> {
    RULES.iter().find_map(|rule| rule(catalog, content))
}

pub fn quote_failed_text(label: &str) -> String {
    format!("获取{}失败，请稍后再试~", label)
}

pub fn help_text(catalog: &QuoteCatalog) -> String {
    let types = catalog.labels().collect::<Vec<_>>().join("、");
    format!(
        "支持的语录类型：\n{}\n\n另外可以发送'{}'获取随机角色设定",
        types, PERSONA_COMMAND
    )
}

/// 加载后的运行参数
struct Settings {
    enabled: bool,
    quote_api: String,
    persona_api: String,
    client: reqwest::Client,
}

impl Settings {
    fn disabled() -> Self {
        Self {
            enabled: false,
            quote_api: DEFAULT_QUOTE_API.to_string(),
            persona_api: DEFAULT_PERSONA_API.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn from_config(cfg: YuluConfig) -> AyjxResult<Self> {
        let client = http::build_client(cfg.timeout())?;
        Ok(Self {
            enabled: cfg.enable,
            quote_api: cfg.quote_api,
            persona_api: cfg.persona_api,
            client,
        })
    }

    async fn fetch_quote(&self, quote: &QuoteType) -> Option<String> {
        http::fetch_text(
            &self.client,
            &self.quote_api,
            &[("id", quote.id), ("type", QUOTE_OUTPUT_TYPE)],
            quote.label,
        )
        .await
    }

    async fn fetch_random_persona(&self) -> Option<String> {
        http::fetch_text(&self.client, &self.persona_api, &[], PERSONA_COMMAND).await
    }
}

/// 由配置段得到运行参数；段缺失或构建失败时一律回退为禁用
fn resolve_settings(
    cfg: Option<YuluConfig>,
    build: impl FnOnce(YuluConfig) -> AyjxResult<Settings>,
) -> Settings {
    let Some(cfg) = cfg else {
        error!(
            target: "Yulu",
            "加载配置失败: 缺少 [{}] 段或 enable 字段无效，插件已禁用",
            PLUGIN_ID
        );
        return Settings::disabled();
    };

    build(cfg).unwrap_or_else(|e| {
        error!(target: "Yulu", "初始化 HTTP 客户端失败: {}，插件已禁用", e);
        Settings::disabled()
    })
}

pub struct YuluPlugin {
    catalog: QuoteCatalog,
    settings: RwLock<Arc<Settings>>,
}

impl YuluPlugin {
    /// 创建插件，加载配置前处于禁用状态
    pub fn new() -> Self {
        Self {
            catalog: QuoteCatalog::builtin(),
            settings: RwLock::new(Arc::new(Settings::disabled())),
        }
    }

    pub async fn is_enabled(&self) -> bool {
        self.settings.read().await.enabled
    }

    /// 应用配置段；任何失败都会替换掉旧参数并禁用插件
    async fn apply(&self, cfg: Option<YuluConfig>) -> AyjxResult<()> {
        let settings = resolve_settings(cfg, Settings::from_config);

        if settings.enabled {
            info!(target: "Yulu", "插件初始化完成");
        } else {
            info!(target: "Yulu", "插件未启用");
        }

        *self.settings.write().await = Arc::new(settings);
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &PluginContext,
        event: &Event,
        command: Command<'_>,
    ) -> AyjxResult<()> {
        let settings = self.settings.read().await.clone();

        let reply = match command {
            Command::Persona => {
                info!(target: "Yulu", "收到随机人设请求");
                settings
                    .fetch_random_persona()
                    .await
                    .unwrap_or_else(|| PERSONA_FAILED.to_string())
            }
            Command::Quote(quote) => {
                info!(target: "Yulu", "收到语录请求: {}", quote.label);
                settings
                    .fetch_quote(quote)
                    .await
                    .unwrap_or_else(|| quote_failed_text(quote.label))
            }
            Command::List => help_text(&self.catalog),
        };

        ctx.reply(event, &reply).await?;
        Ok(())
    }
}

impl Default for YuluPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for YuluPlugin {
    fn id(&self) -> &str {
        PLUGIN_ID
    }

    fn name(&self) -> &str {
        "YuluPlugin"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn default_config(&self) -> Option<toml::Value> {
        toml::Value::try_from(YuluConfig::default()).ok()
    }

    async fn on_load(&self, ctx: &PluginContext) -> AyjxResult<()> {
        self.apply(ctx.plugin_config::<YuluConfig>().await).await
    }

    async fn on_config_reload(
        &self,
        _ctx: &PluginContext,
        new_config: &AppConfig,
    ) -> AyjxResult<()> {
        self.apply(new_config.get_plugin_config::<YuluConfig>(PLUGIN_ID))
            .await
    }

    async fn on_event(&self, ctx: &PluginContext, event: &Event) -> AyjxResult<EventResult> {
        if !self.is_enabled().await {
            return Ok(EventResult::Continue);
        }

        if !event.is_message_created() {
            return Ok(EventResult::Continue);
        }

        let content = event.content().unwrap_or("").trim();
        let chat_id = event.channel_id().unwrap_or("");
        if content.is_empty() || chat_id.is_empty() {
            return Ok(EventResult::Continue);
        }

        match route(&self.catalog, content) {
            Some(command) => {
                self.execute(ctx, event, command).await?;
                Ok(EventResult::Stop)
            }
            None => Ok(EventResult::Continue),
        }
    }
}
