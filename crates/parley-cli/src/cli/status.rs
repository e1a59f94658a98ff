//! `parley status`: inspect the local activity record of a topic.

use anyhow::Result;
use chrono::Utc;
use console::style;

use parley_types::session::TopicId;

use crate::state::AppState;

use super::history::format_ago;

/// Show the remembered session for `topic`, if any.
///
/// Reading an expired record purges it, so an idle topic reports no record.
pub async fn status(state: &AppState, topic: &str, json: bool) -> Result<()> {
    let topic = TopicId::new(topic);
    let record = state.store.get(&topic).await;
    let threshold_secs = state.store.threshold().num_seconds();
    let now = Utc::now();

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "topic": topic,
            "data_dir": state.data_dir.display().to_string(),
            "storage": state.store.kv().describe(),
            "api_base_url": state.config.api_base_url,
            "inactivity_timeout_secs": threshold_secs,
            "record": record,
            "idle_secs": record.as_ref().map(|r| r.elapsed(now).num_seconds()),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Parley v{}",
        style("*").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("  {}", style("── Topic ──").dim());
    println!("  Topic:    {}", style(&topic).cyan());

    match &record {
        Some(record) => {
            let idle = record.elapsed(now);
            let remaining = (threshold_secs - idle.num_seconds()).max(0);
            println!("  Session:  {}", style(&record.session_id).bold());
            println!("  Active:   {}", format_ago(idle));
            if record.is_valid {
                println!(
                    "  Resumes:  {} (for another {}s)",
                    style("without revalidation").green(),
                    remaining
                );
            } else {
                println!(
                    "  Resumes:  {}",
                    style("only after server validation").yellow()
                );
            }
        }
        None => {
            println!(
                "  Session:  {}",
                style("none remembered; the next chat asks the server").dim()
            );
        }
    }
    println!();

    println!("  {}", style("── Client ──").dim());
    println!("  Data dir:   {}", state.data_dir.display());
    println!("  Storage:    {}", state.store.kv().describe());
    println!("  API:        {}", state.config.api_base_url);
    println!("  Idle limit: {threshold_secs}s");
    println!();

    Ok(())
}
