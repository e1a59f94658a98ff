//! `parley forget` and `parley sweep`: maintenance of local activity records.

use anyhow::Result;
use console::style;

use parley_types::session::TopicId;

use crate::state::AppState;

/// Delete the record for `topic`. The next chat asks the server afresh.
pub async fn forget(state: &AppState, topic: &str, json: bool) -> Result<()> {
    let topic = TopicId::new(topic);
    let existed = state.store.get(&topic).await.is_some();
    state.store.clear(&topic).await;

    if json {
        let out = serde_json::json!({ "topic": topic, "removed": existed });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if existed {
        println!(
            "  {} Forgot the session remembered for '{}'",
            style("✓").green().bold(),
            style(&topic).cyan()
        );
    } else {
        println!(
            "  {} Nothing remembered for '{}'",
            style("i").blue().bold(),
            style(&topic).cyan()
        );
    }
    Ok(())
}

/// Purge every expired or unreadable record.
pub async fn sweep(state: &AppState, json: bool) -> Result<()> {
    let removed = state.store.sweep_expired().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "removed": removed }))?);
    } else {
        println!(
            "  {} Removed {} expired record{}",
            style("✓").green().bold(),
            style(removed).bold(),
            if removed == 1 { "" } else { "s" }
        );
    }
    Ok(())
}
