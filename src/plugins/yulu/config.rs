use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_QUOTE_API: &str = "https://api.dragonlongzhu.cn/api/yl_juhe.php";
pub const DEFAULT_PERSONA_API: &str = "https://api.dragonlongzhu.cn/api/suiji_renshe.php";

/// `[yulu]` 配置段
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct YuluConfig {
    /// 必填，缺失视为配置加载失败
    pub enable: bool,
    #[serde(default = "default_quote_api")]
    pub quote_api: String,
    #[serde(default = "default_persona_api")]
    pub persona_api: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_quote_api() -> String {
    DEFAULT_QUOTE_API.to_string()
}

fn default_persona_api() -> String {
    DEFAULT_PERSONA_API.to_string()
}

fn default_timeout_secs() -> u64 {
    crate::http::DEFAULT_TIMEOUT.as_secs()
}

impl YuluConfig {
    /// 请求超时，至少 1 秒
    pub fn timeout(&self) -> Duration {
        if self.timeout_secs == 0 {
            warn!(target: "Yulu", "timeout_secs = 0 无效，按 1 秒处理");
        }
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for YuluConfig {
    fn default() -> Self {
        Self {
            enable: true,
            quote_api: default_quote_api(),
            persona_api: default_persona_api(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_enable_is_required() {
        let cfg: YuluConfig = toml::from_str("enable = false").unwrap();

        assert!(!cfg.enable);
        assert_eq!(cfg.quote_api, DEFAULT_QUOTE_API);
        assert_eq!(cfg.persona_api, DEFAULT_PERSONA_API);
        assert_eq!(cfg.timeout_secs, 10);
        assert_eq!(cfg.timeout(), crate::http::DEFAULT_TIMEOUT);
    }

    #[test]
    fn zero_timeout_is_raised_to_one_second() {
        let cfg: YuluConfig = toml::from_str("enable = true\ntimeout_secs = 0").unwrap();
        assert_eq!(cfg.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn missing_enable_is_an_error() {
        assert!(toml::from_str::<YuluConfig>("timeout_secs = 3").is_err());
    }

    #[test]
    fn default_serializes_to_table() {
        let value = toml::Value::try_from(YuluConfig::default()).unwrap();

        assert_eq!(value.get("enable").and_then(|v| v.as_bool()), Some(true));
        assert_eq!(
            value.get("timeout_secs").and_then(|v| v.as_integer()),
            Some(10)
        );
    }
}
