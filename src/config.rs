#![forbid(unsafe_code)]

// Configuration - command line and environment, resolved into run settings

use crate::validate::{Concurrency, TestInput};
use crate::view::console::{DEFAULT_VIEWPORT_ROWS, DEFAULT_WIDTH};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const WS_PATH: &str = "/ws";
const START_TEST_PATH: &str = "/api/start-test";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid server URL {url:?}: {source}")]
    InvalidServer { url: String, source: url::ParseError },
    #[error("server URL must use http or https, got {0:?}")]
    UnsupportedScheme(String),
    #[error("malformed header {0:?}, expected \"Name: value\"")]
    MalformedHeader(String),
    #[error("could not read body file {path}: {source}")]
    BodyFile { path: PathBuf, source: std::io::Error },
}

/// Launch a streaming load test and watch every session live
#[derive(Debug, Clone, Parser)]
#[command(name = "streamwatch", version, about)]
pub struct Cli {
    /// Base URL of the test runner
    #[arg(long, env = "STREAMWATCH_SERVER", default_value = "http://localhost:8091")]
    pub server: String,

    /// Target endpoint the runner should load
    #[arg(long, env = "STREAMWATCH_ENDPOINT")]
    pub endpoint: String,

    #[arg(long, env = "STREAMWATCH_METHOD", default_value = "GET")]
    pub method: String,

    /// Number of parallel sessions, clamped to 1..=50
    #[arg(
        long,
        env = "STREAMWATCH_CONCURRENCY",
        default_value_t = 1,
        allow_negative_numbers = true
    )]
    pub concurrency: i64,

    /// Request header as "Name: value"; repeatable
    #[arg(long = "header", short = 'H', env = "STREAMWATCH_HEADERS", value_delimiter = '\n')]
    pub headers: Vec<String>,

    /// Request body; must be JSON when non-empty
    #[arg(long, env = "STREAMWATCH_BODY", conflicts_with = "body_file")]
    pub body: Option<String>,

    #[arg(long, env = "STREAMWATCH_BODY_FILE")]
    pub body_file: Option<PathBuf>,

    /// Marker the runner treats as end of stream; repeatable
    #[arg(long = "end-flag", env = "STREAMWATCH_END_FLAGS", value_delimiter = ',')]
    pub end_flags: Vec<String>,

    /// Visible rows per session pane
    #[arg(long, env = "STREAMWATCH_VIEWPORT_ROWS", default_value_t = DEFAULT_VIEWPORT_ROWS)]
    pub viewport_rows: u32,

    /// Console width used for wrapping
    #[arg(long, env = "STREAMWATCH_WIDTH", default_value_t = DEFAULT_WIDTH)]
    pub width: usize,

    /// Give up waiting for the run after this many seconds
    #[arg(long, env = "STREAMWATCH_TIMEOUT_SECS", default_value_t = 600)]
    pub timeout_secs: u64,

    /// Write the run report as JSON
    #[arg(long, env = "STREAMWATCH_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Write client metrics in Prometheus text format
    #[arg(long, env = "STREAMWATCH_METRICS_OUTPUT")]
    pub metrics_output: Option<PathBuf>,
}

/// Everything the binary needs, resolved and checked
#[derive(Debug, Clone)]
pub struct Settings {
    pub ws_url: Url,
    pub submit_url: Url,
    pub input: TestInput,
    pub viewport_rows: u32,
    pub width: usize,
    pub timeout: Duration,
    pub output: Option<PathBuf>,
    pub metrics_output: Option<PathBuf>,
}

impl Cli {
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let (ws_url, submit_url) = derive_urls(&self.server)?;

        let headers = self
            .headers
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| parse_header(line))
            .collect::<Result<Vec<_>, _>>()?;

        let body = match (self.body, self.body_file) {
            (Some(body), _) => body,
            (None, Some(path)) => std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::BodyFile { path, source })?,
            (None, None) => String::new(),
        };

        Ok(Settings {
            ws_url,
            submit_url,
            input: TestInput {
                concurrency: Concurrency::clamped(self.concurrency),
                endpoint: self.endpoint,
                method: self.method,
                headers,
                body,
                end_flags: self.end_flags,
            },
            viewport_rows: self.viewport_rows.max(1),
            width: self.width.max(1),
            timeout: Duration::from_secs(self.timeout_secs),
            output: self.output,
            metrics_output: self.metrics_output,
        })
    }
}

/// Channel and submission URLs share the runner's host: http maps to ws,
/// https to wss.
pub fn derive_urls(server: &str) -> Result<(Url, Url), ConfigError> {
    let base = Url::parse(server).map_err(|source| ConfigError::InvalidServer {
        url: server.to_string(),
        source,
    })?;

    let ws_scheme = match base.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    };

    let mut submit_url = base.clone();
    submit_url.set_path(START_TEST_PATH);
    submit_url.set_query(None);

    let mut ws_url = base;
    ws_url.set_path(WS_PATH);
    ws_url.set_query(None);
    ws_url
        .set_scheme(ws_scheme)
        .map_err(|()| ConfigError::UnsupportedScheme(ws_scheme.to_string()))?;

    Ok((ws_url, submit_url))
}

/// Split `Name: value` at the first colon. Values may contain colons.
pub fn parse_header(line: &str) -> Result<(String, String), ConfigError> {
    match line.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ConfigError::MalformedHeader(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["streamwatch", "--endpoint", "http://target.local/chat"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_derive_urls() {
        let (ws, submit) = derive_urls("http://localhost:8091").unwrap();
        assert_eq!(ws.as_str(), "ws://localhost:8091/ws");
        assert_eq!(submit.as_str(), "http://localhost:8091/api/start-test");

        let (ws, submit) = derive_urls("https://runner.example.com/ignored?x=1").unwrap();
        assert_eq!(ws.as_str(), "wss://runner.example.com/ws");
        assert_eq!(submit.as_str(), "https://runner.example.com/api/start-test");
    }

    #[test]
    fn test_derive_urls_rejects_bad_input() {
        assert!(matches!(derive_urls("not a url"), Err(ConfigError::InvalidServer { .. })));
        assert!(matches!(
            derive_urls("ftp://runner.local"),
            Err(ConfigError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Authorization: Bearer a:b").unwrap(),
            ("Authorization".to_string(), "Bearer a:b".to_string())
        );
        assert_eq!(parse_header("X-Empty:").unwrap(), ("X-Empty".to_string(), String::new()));
        assert!(parse_header("no colon here").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = cli(&[]).into_settings().unwrap();
        assert_eq!(settings.ws_url.as_str(), "ws://localhost:8091/ws");
        assert_eq!(settings.input.method, "GET");
        assert_eq!(settings.input.concurrency.get(), 1);
        assert_eq!(settings.viewport_rows, DEFAULT_VIEWPORT_ROWS);
        assert_eq!(settings.width, DEFAULT_WIDTH);
        assert_eq!(settings.timeout, Duration::from_secs(600));
        assert!(settings.input.body.is_empty());
        assert!(settings.output.is_none());
    }

    #[test]
    fn test_flags_resolve_into_input() {
        let settings = cli(&[
            "--server", "https://runner.local",
            "--method", "post",
            "--concurrency", "80",
            "-H", "Accept: text/event-stream",
            "--header", "X-Trace: 1",
            "--body", r#"{"prompt":"hi"}"#,
            "--end-flag", "[DONE]",
            "--end-flag", "</s>",
        ])
        .into_settings()
        .unwrap();

        assert_eq!(settings.submit_url.as_str(), "https://runner.local/api/start-test");
        assert_eq!(settings.input.concurrency.get(), 50);
        assert_eq!(settings.input.method, "post");
        assert_eq!(
            settings.input.headers,
            vec![
                ("Accept".to_string(), "text/event-stream".to_string()),
                ("X-Trace".to_string(), "1".to_string()),
            ]
        );
        assert_eq!(settings.input.body, r#"{"prompt":"hi"}"#);
        assert_eq!(settings.input.end_flags, vec!["[DONE]".to_string(), "</s>".to_string()]);
    }

    #[test]
    fn test_negative_concurrency_clamps_to_one() {
        let settings = cli(&["--concurrency", "-4"]).into_settings().unwrap();
        assert_eq!(settings.input.concurrency.get(), 1);
    }

    #[test]
    fn test_body_file() {
        let path = std::env::temp_dir()
            .join(format!("streamwatch-body-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"stream":true}"#).unwrap();
        let settings = cli(&["--body-file", path.to_str().unwrap()]).into_settings().unwrap();
        assert_eq!(settings.input.body, r#"{"stream":true}"#);
        std::fs::remove_file(&path).unwrap();

        let missing = cli(&["--body-file", "/nonexistent/streamwatch/body.json"]).into_settings();
        assert!(matches!(missing, Err(ConfigError::BodyFile { .. })));
    }

    #[test]
    fn test_body_and_body_file_conflict() {
        let result = Cli::try_parse_from([
            "streamwatch", "--endpoint", "x", "--body", "{}", "--body-file", "b.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_header_is_config_error() {
        let result = cli(&["-H", "broken"]).into_settings();
        assert!(matches!(result, Err(ConfigError::MalformedHeader(h)) if h == "broken"));
    }
}
