use crate::error::ConfigError;
use std::str::FromStr;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 阅读管理后端地址
    pub api_base_url: String,
    /// 管理员访问令牌（Bearer）
    pub access_token: String,
    /// 草稿 TOML 存放目录
    pub draft_folder: String,
    /// 同时处理的草稿数量
    pub max_concurrent_drafts: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 试卷激活后等待的秒数
    pub activation_redirect_delay_secs: u64,
    /// 处理成功后是否删除草稿文件
    pub remove_finished_drafts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            access_token: String::new(),
            draft_folder: "reading_drafts".to_string(),
            max_concurrent_drafts: 4,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            activation_redirect_delay_secs: 3,
            remove_finished_drafts: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        let config = Self {
            api_base_url: std::env::var("API_BASE_URL").unwrap_or(default.api_base_url),
            access_token: std::env::var("ACCESS_TOKEN").unwrap_or(default.access_token),
            draft_folder: std::env::var("DRAFT_FOLDER").unwrap_or(default.draft_folder),
            max_concurrent_drafts: parse_env("MAX_CONCURRENT_DRAFTS", "usize", default.max_concurrent_drafts)?,
            verbose_logging: parse_env("VERBOSE_LOGGING", "bool", default.verbose_logging)?,
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            activation_redirect_delay_secs: parse_env(
                "ACTIVATION_REDIRECT_DELAY_SECS",
                "u64",
                default.activation_redirect_delay_secs,
            )?,
            remove_finished_drafts: parse_env("REMOVE_FINISHED_DRAFTS", "bool", default.remove_finished_drafts)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Missing { var_name: "API_BASE_URL" });
        }
        if self.max_concurrent_drafts == 0 {
            return Err(ConfigError::EnvVarParseFailed {
                var_name: "MAX_CONCURRENT_DRAFTS".to_string(),
                value: "0".to_string(),
                expected_type: "正整数",
            });
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(var_name: &str, expected_type: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value,
            expected_type,
        }),
        Err(_) => Ok(default),
    }
}
