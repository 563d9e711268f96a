use serde::{Deserialize, Serialize};

/// Settings for the language runtime inside site containers.
///
/// Every field has a development-friendly default so an empty `php:` block
/// (or none at all) still produces a complete environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeSettings {
    pub display_errors: bool,
    pub memory_limit: String,
    pub max_execution_time: u32,
    pub max_input_vars: u32,
    pub max_input_time: u32,
    pub upload_max_file_size: String,
    pub post_max_size: String,
    pub opcache_enable: bool,
    pub opcache_revalidate_freq: u32,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            display_errors: true,
            memory_limit: "512M".to_string(),
            max_execution_time: 5000,
            max_input_vars: 5000,
            max_input_time: 5000,
            upload_max_file_size: "512M".to_string(),
            post_max_size: "512M".to_string(),
            opcache_enable: false,
            opcache_revalidate_freq: 0,
        }
    }
}

const fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

impl RuntimeSettings {
    #[must_use]
    pub fn as_envs(&self) -> Vec<String> {
        vec![
            format!("PHP_DISPLAY_ERRORS={}", on_off(self.display_errors)),
            format!("PHP_MEMORY_LIMIT={}", self.memory_limit),
            format!("PHP_MAX_EXECUTION_TIME={}", self.max_execution_time),
            format!("PHP_MAX_INPUT_VARS={}", self.max_input_vars),
            format!("PHP_MAX_INPUT_TIME={}", self.max_input_time),
            format!("PHP_UPLOAD_MAX_FILESIZE={}", self.upload_max_file_size),
            format!("PHP_POST_MAX_SIZE={}", self.post_max_size),
            format!("PHP_OPCACHE_ENABLE={}", u8::from(self.opcache_enable)),
            format!(
                "PHP_OPCACHE_REVALIDATE_FREQ={}",
                self.opcache_revalidate_freq
            ),
        ]
    }
}

/// Profiler credentials forwarded to site containers when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Blackfire {
    #[serde(default)]
    pub server_id: String,
    #[serde(default)]
    pub server_token: String,
}

impl Blackfire {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.server_id.is_empty() && self.server_token.is_empty()
    }

    #[must_use]
    pub fn as_envs(&self) -> Vec<String> {
        let mut envs = Vec::new();
        if !self.server_id.is_empty() {
            envs.push(format!("BLACKFIRE_SERVER_ID={}", self.server_id));
        }
        if !self.server_token.is_empty() {
            envs.push(format!("BLACKFIRE_SERVER_TOKEN={}", self.server_token));
        }
        envs
    }
}
