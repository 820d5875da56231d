//! Shoppilot entry point.
//!
//! `tools` prints the function-calling schemas for the orchestrator to
//! feed its LLM. `run` establishes a browser session and serves tool
//! calls over stdin/stdout, one JSON object per line; logs go to stderr
//! so stdout stays a clean frame channel.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shoppilot_browser::{register_page_tools, SessionConfig, SessionManager};
use shoppilot_protocols::{Tool, ToolSet};
use shoppilot_vision::{CandidateList, ValidateCandidateItemTool, VisionClient};

use cli::{Cli, Commands};

/// One line of orchestrator input.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request {
    /// Execute a tool.
    Call {
        tool: String,
        #[serde(default)]
        arguments: Value,
    },
    /// Set the product query subsequent validations run against. Clears
    /// previously accepted candidates.
    SetQuery { query: String },
    /// Re-navigate the warm page to the start URL between conversations,
    /// dropping accepted candidates and the stored query.
    Reset,
    /// Report the accepted candidate URLs.
    Candidates,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Tools => {
            let (set, _, _) = build_tool_set(
                Arc::new(SessionManager::new()),
                "http://127.0.0.1:8100/classificator",
            );
            println!("{}", serde_json::to_string_pretty(&set.function_schemas())?);
            Ok(())
        }
        Commands::Run {
            show_browser,
            start_url,
            viewport_width,
            viewport_height,
            user_agent,
            screenshot_dir,
            typing_delay_ms,
            slow_mo_ms,
            debug_port,
            profile_dir,
            classificator_url,
        } => {
            let config = SessionConfig {
                headless: !show_browser,
                start_url,
                viewport: (viewport_width, viewport_height),
                user_agent,
                screenshot_dir,
                typing_delay_ms,
                slow_mo_ms,
                debug_port,
                profile_dir,
            };
            run(config, &classificator_url).await
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn build_tool_set(
    manager: Arc<SessionManager>,
    classificator_url: &str,
) -> (ToolSet, Arc<ValidateCandidateItemTool>, Arc<CandidateList>) {
    let candidates = Arc::new(CandidateList::new());
    let validate = Arc::new(ValidateCandidateItemTool::new(
        manager.clone(),
        VisionClient::new(classificator_url),
        candidates.clone(),
    ));

    let mut set = ToolSet::new();
    register_page_tools(&mut set, manager.clone());
    set.register(validate.clone() as Arc<dyn Tool>);

    (set, validate, candidates)
}

async fn run(config: SessionConfig, classificator_url: &str) -> anyhow::Result<()> {
    let manager = Arc::new(SessionManager::new());
    let (set, validate, candidates) = build_tool_set(manager.clone(), classificator_url);

    let driver = manager
        .get_or_create(config)
        .await
        .context("establishing browser session")?;

    // The orchestrator's first observation is the freshly loaded start page.
    let opening_shot = driver.screenshot(None, false).await?;
    let mut stdout = tokio::io::stdout();
    emit(&mut stdout, json!({"type": "image", "path": opening_shot})).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let frame = match serde_json::from_str::<Request>(line) {
            Ok(Request::Call { tool, arguments }) => match set.dispatch(&tool, arguments).await {
                Ok(output) => serde_json::to_value(output)?,
                Err(e) => {
                    error!("Tool call failed: {}", e);
                    json!({"type": "error", "message": e.to_string()})
                }
            },
            Ok(Request::SetQuery { query }) => {
                info!("Query set: {}", query);
                validate.set_query(query);
                candidates.clear();
                json!({"type": "text", "content": "ok"})
            }
            Ok(Request::Reset) => match manager.reset().await {
                Ok(_) => {
                    // A reset starts a fresh conversation: accepted
                    // candidates and the query belong to the old one.
                    candidates.clear();
                    validate.clear_query();
                    json!({"type": "text", "content": "ok"})
                }
                Err(e) => json!({"type": "error", "message": e.to_string()}),
            },
            Ok(Request::Candidates) => {
                json!({"type": "products", "items": candidates.snapshot()})
            }
            Err(e) => json!({"type": "error", "message": format!("malformed request: {e}")}),
        };
        emit(&mut stdout, frame).await?;
    }

    info!("Input closed, shutting down");
    manager.close().await;
    Ok(())
}

async fn emit(stdout: &mut tokio::io::Stdout, frame: Value) -> anyhow::Result<()> {
    let mut line = serde_json::to_vec(&frame)?;
    line.push(b'\n');
    stdout.write_all(&line).await?;
    stdout.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call_request() {
        let req: Request =
            serde_json::from_str(r#"{"op":"call","tool":"click","arguments":{"x":500,"y":300}}"#)
                .unwrap();
        match req {
            Request::Call { tool, arguments } => {
                assert_eq!(tool, "click");
                assert_eq!(arguments["x"], 500);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn test_call_arguments_default_to_null() {
        let req: Request = serde_json::from_str(r#"{"op":"call","tool":"go_back"}"#).unwrap();
        match req {
            Request::Call { arguments, .. } => assert!(arguments.is_null()),
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn test_parse_control_requests() {
        assert!(matches!(
            serde_json::from_str(r#"{"op":"set_query","query":"red sweater"}"#),
            Ok(Request::SetQuery { .. })
        ));
        assert!(matches!(
            serde_json::from_str(r#"{"op":"reset"}"#),
            Ok(Request::Reset)
        ));
        assert!(matches!(
            serde_json::from_str(r#"{"op":"candidates"}"#),
            Ok(Request::Candidates)
        ));
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        assert!(serde_json::from_str::<Request>(r#"{"op":"quit"}"#).is_err());
    }
}
