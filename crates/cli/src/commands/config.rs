use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use manpower_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    for (key_path, value, env_keys) in effective_fields(&config) {
        lines.push(render_line(
            key_path,
            &value,
            field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<(&'static str, String, &'static [&'static str])> {
    let workflow = &config.workflow;
    vec![
        field("database.url", config.database.url.clone(), &["MANPOWER_DATABASE_URL"]),
        field("database.max_connections", config.database.max_connections.to_string(), &["MANPOWER_DATABASE_MAX_CONNECTIONS"]),
        field("database.timeout_secs", config.database.timeout_secs.to_string(), &["MANPOWER_DATABASE_TIMEOUT_SECS"]),
        field("server.bind_address", config.server.bind_address.clone(), &["MANPOWER_SERVER_BIND_ADDRESS"]),
        field("server.port", config.server.port.to_string(), &["MANPOWER_SERVER_PORT"]),
        field("server.graceful_shutdown_secs", config.server.graceful_shutdown_secs.to_string(), &["MANPOWER_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
        field("workflow.hr_department", workflow.hr_department.clone(), &["MANPOWER_WORKFLOW_HR_DEPARTMENT"]),
        field("workflow.management_department", workflow.management_department.clone(), &["MANPOWER_WORKFLOW_MANAGEMENT_DEPARTMENT"]),
        field("workflow.manager_position", workflow.manager_position.clone(), &["MANPOWER_WORKFLOW_MANAGER_POSITION"]),
        field("workflow.director_position", workflow.director_position.clone(), &["MANPOWER_WORKFLOW_DIRECTOR_POSITION"]),
        field("workflow.recruiter_position", workflow.recruiter_position.clone(), &["MANPOWER_WORKFLOW_RECRUITER_POSITION"]),
        field("workflow.doc_number_prefix", workflow.doc_number_prefix.clone(), &["MANPOWER_WORKFLOW_DOC_NUMBER_PREFIX"]),
        field("workflow.submit_retry_limit", workflow.submit_retry_limit.to_string(), &["MANPOWER_WORKFLOW_SUBMIT_RETRY_LIMIT"]),
        field("logging.level", config.logging.level.clone(), &["MANPOWER_LOGGING_LEVEL", "MANPOWER_LOG_LEVEL"]),
        field("logging.format", format!("{:?}", config.logging.format).to_ascii_lowercase(), &["MANPOWER_LOGGING_FORMAT", "MANPOWER_LOG_FORMAT"]),
    ]
}

fn field(
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
) -> (&'static str, String, &'static [&'static str]) {
    (key_path, value, env_keys)
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("manpower.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/manpower.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
