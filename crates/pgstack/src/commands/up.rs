use crate::context::StackContext;
use colored::Colorize;
use pgstack_core::Revision;

pub async fn handle(ctx: &StackContext, revision: Revision, yes: bool) -> anyhow::Result<()> {
    ctx.print_header(&format!("Updating stack to revision {}...", revision));

    let set = ctx.declare(revision)?.to_resource_set()?;
    let store = ctx.store();
    let engine = ctx.engine();

    let lock = store.acquire_lock().await?;
    let mut state = store.load().await?;
    let plan = engine.plan(&set, &state)?;
    super::print_plan(&plan);

    if plan.has_changes && !yes {
        println!();
        println!("Run again with --yes to apply these changes");
        lock.release().await?;
        return Ok(());
    }

    if plan.has_changes {
        println!();
        println!("{}", "Checking provider authentication...".blue());
        super::check_auth(&engine, &plan).await?;
    }

    let result = engine.apply(&set, &plan, &mut state, &store).await?;
    lock.release().await?;

    if plan.has_changes {
        super::print_result(&result);
    }
    println!();
    super::print_outputs(&state, false);

    if !result.is_success() {
        anyhow::bail!(
            "{} action(s) failed, {} skipped",
            result.failed.len(),
            result.skipped.len()
        );
    }
    Ok(())
}
