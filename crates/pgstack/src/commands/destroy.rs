use crate::context::StackContext;
use colored::Colorize;

pub async fn handle(ctx: &StackContext, yes: bool) -> anyhow::Result<()> {
    ctx.print_header("Destroying stack...");

    let store = ctx.store();
    let lock = store.acquire_lock().await?;
    let mut state = store.load().await?;

    if state.resources.is_empty() {
        println!();
        println!("{}", "Nothing to destroy.".green());
        lock.release().await?;
        return Ok(());
    }

    println!();
    let mut keys: Vec<&String> = state.resources.keys().collect();
    keys.sort();
    for key in keys {
        println!("  {} {}", "-".red(), key);
    }

    if !yes {
        println!();
        println!(
            "{}",
            "Warning: every resource above will be deleted.".yellow()
        );
        println!("Run again with --yes to destroy the stack");
        lock.release().await?;
        return Ok(());
    }

    let result = ctx.engine().destroy(&mut state, &store).await?;
    lock.release().await?;
    super::print_result(&result);

    if !result.is_success() {
        anyhow::bail!("{} resource(s) could not be deleted", result.failed.len());
    }
    println!("{}", "✓ Stack destroyed".green().bold());
    Ok(())
}
