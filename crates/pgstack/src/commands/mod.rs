pub mod destroy;
pub mod outputs;
pub mod preview;
pub mod up;
pub mod validate;

use colored::Colorize;
use pgstack_cloud::{ActionType, ApplyResult, Engine, GlobalState, Plan};
use std::collections::BTreeSet;

/// Print a plan in execution order
pub fn print_plan(plan: &Plan) {
    println!();
    if !plan.has_changes {
        println!("{}", "No changes. Resources are up to date.".green());
        return;
    }

    for action in &plan.actions {
        let marker = match action.action_type {
            ActionType::Create => "+".green(),
            ActionType::Update => "~".yellow(),
            ActionType::Replace => "±".magenta(),
            ActionType::Delete => "-".red(),
            ActionType::NoOp => " ".normal(),
        };
        let line = format!("{} {}", marker, action.resource_id);
        if action.changed.is_empty() {
            println!("  {}", line);
        } else {
            println!("  {} ({})", line, action.changed.join(", ").dimmed());
        }
    }

    println!();
    println!("{}", plan.summary().to_string().bold());
}

/// Check authentication of every provider the plan touches
pub async fn check_auth(engine: &Engine, plan: &Plan) -> anyhow::Result<()> {
    let needed: BTreeSet<&str> = plan
        .actions
        .iter()
        .filter(|a| a.action_type != ActionType::NoOp)
        .filter_map(|a| a.details.get("provider").and_then(|p| p.as_str()))
        .collect();

    for provider in engine.providers() {
        if !needed.contains(provider.name()) {
            continue;
        }
        let status = provider.check_auth().await?;
        if !status.authenticated {
            anyhow::bail!(
                "{} is not authenticated: {}",
                provider.display_name(),
                status.error.unwrap_or_default()
            );
        }
        println!(
            "  {} {} ({})",
            "✓".green(),
            provider.display_name(),
            status.account_info.unwrap_or_default()
        );
    }
    Ok(())
}

pub fn print_result(result: &ApplyResult) {
    println!();
    for success in &result.succeeded {
        println!("  {} {}", "✓".green(), success.message);
    }
    for failure in &result.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failure.action_id,
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }
    for skipped in &result.skipped {
        println!("  {} {} (dependency failed)", "-".yellow(), skipped);
    }
    println!();
    println!("Finished in {:.1}s", result.duration_ms as f64 / 1000.0);
}

pub fn print_outputs(state: &GlobalState, show_secrets: bool) {
    if state.outputs.is_empty() {
        println!("{}", "No outputs recorded.".yellow());
        return;
    }
    println!("{}", "Outputs:".bold());
    for (name, output) in &state.outputs {
        println!("  {}: {}", name.cyan(), output.display(show_secrets));
    }
}
