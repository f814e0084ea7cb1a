use serde::{Deserialize, Serialize};

/// Main configuration structure for testshift
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Retry ceilings, skip flags and worker pool size
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Shell commands for the three gates
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Generator (LLM) connection settings
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Budget and workflow options applied to every file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MigrationConfig {
    /// Shared ceiling for draft, execution, type-check and lint repairs
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Global ceiling on repair-loop selections (defaults to `max_retries`)
    #[serde(default)]
    pub max_total_attempts: Option<u32>,

    /// Ceiling on repair cycles spent on one fingerprint
    #[serde(default = "default_per_error_attempts")]
    pub per_error_attempts: u32,

    /// Number of files migrated concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Name of the scratch directory created next to each test file
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: String,

    #[serde(default)]
    pub skip_execution: bool,

    #[serde(default)]
    pub skip_type_check: bool,

    #[serde(default)]
    pub skip_lint: bool,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_per_error_attempts() -> u32 {
    3
}

const fn default_concurrency() -> usize {
    4
}

fn default_scratch_dir() -> String {
    ".testshift".to_string()
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            max_total_attempts: None,
            per_error_attempts: default_per_error_attempts(),
            concurrency: default_concurrency(),
            scratch_dir: default_scratch_dir(),
            skip_execution: false,
            skip_type_check: false,
            skip_lint: false,
        }
    }
}

impl MigrationConfig {
    /// Effective global repair-loop ceiling.
    pub fn total_attempt_ceiling(&self) -> u32 {
        self.max_total_attempts.unwrap_or(self.max_retries)
    }
}

/// One external command. `{file}` in any argument is replaced with the
/// path of the temp file under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    /// Arguments with the `{file}` placeholder substituted.
    pub fn render_args(&self, file: &str) -> Vec<String> {
        self.args.iter().map(|a| a.replace("{file}", file)).collect()
    }

    /// Human-readable command line.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Gate commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CommandsConfig {
    #[serde(default = "default_execution_command")]
    pub execution: CommandSpec,

    #[serde(default = "default_type_check_command")]
    pub type_check: CommandSpec,

    #[serde(default = "default_lint_command")]
    pub lint: CommandSpec,

    /// Best-effort auto-fix run before the authoritative lint check
    #[serde(default = "default_lint_fix_command")]
    pub lint_fix: Option<CommandSpec>,
}

fn default_execution_command() -> CommandSpec {
    CommandSpec::new("npx", &["jest", "--ci", "{file}"])
}

fn default_type_check_command() -> CommandSpec {
    CommandSpec::new(
        "npx",
        &["tsc", "--noEmit", "--skipLibCheck", "--jsx", "react-jsx", "{file}"],
    )
}

fn default_lint_command() -> CommandSpec {
    CommandSpec::new("npx", &["eslint", "{file}"])
}

#[allow(clippy::unnecessary_wraps)]
fn default_lint_fix_command() -> Option<CommandSpec> {
    Some(CommandSpec::new("npx", &["eslint", "--fix", "{file}"]))
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            execution: default_execution_command(),
            type_check: default_type_check_command(),
            lint: default_lint_command(),
            lint_fix: default_lint_fix_command(),
        }
    }
}

/// Generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GeneratorConfig {
    /// API key (falls back to `ANTHROPIC_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

const fn default_timeout_secs() -> u64 {
    300
}

const fn default_max_tokens() -> u32 {
    8192
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl GeneratorConfig {
    /// Get API key from config or environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation of the log files: daily, hourly or never
    #[serde(default = "default_log_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_log_rotation(),
        }
    }
}
