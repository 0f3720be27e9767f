//! `prysm ask`: one message, answered on stdout.
//!
//! Boots the same runtime as `serve` without a listener, streams the answer
//! and flushes the session store before exiting.

use std::io::Write;
use std::sync::Arc;

use pr_domain::config::Config;

use crate::bootstrap;
use crate::runtime::{run_chat, ChatInput, LoopEvent};

pub struct AskArgs {
    pub input: ChatInput,
    pub json: bool,
}

pub async fn ask(config: Arc<Config>, args: AskArgs) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config).await?;

    let mut turn = run_chat(state.clone(), args.input).await;
    eprintln!("\x1b[2m[session: {}]\x1b[0m", turn.session_id);

    let mut text = String::new();
    let mut payloads = Vec::new();
    while let Some(event) = turn.events.recv().await {
        match event {
            LoopEvent::TextDelta(delta) => {
                if !args.json {
                    print!("{delta}");
                    std::io::stdout().flush().ok();
                }
                text.push_str(&delta);
            }
            LoopEvent::ToolOutput(payload) => {
                if !args.json {
                    println!("\n{payload}");
                }
                payloads.push(payload);
            }
        }
    }
    let outcome = turn
        .handle
        .await
        .map_err(|e| anyhow::anyhow!("chat task failed: {e}"))?;

    if args.json {
        let out = serde_json::json!({
            "session_id": turn.session_id,
            "content": text,
            "payloads": payloads,
            "rounds": outcome.rounds,
            "tool_calls": outcome.tool_calls,
            "failed": outcome.failed,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
    }

    if let Err(e) = state.sessions.flush().await {
        tracing::warn!(error = %e, "session store flush on exit failed");
    }
    if outcome.failed {
        anyhow::bail!("the answer was cut short by a backend failure");
    }
    Ok(())
}
