use crate::context::StackContext;
use pgstack_core::Revision;

pub async fn handle(ctx: &StackContext, revision: Revision) -> anyhow::Result<()> {
    ctx.print_header(&format!("Previewing revision {}...", revision));

    let set = ctx.declare(revision)?.to_resource_set()?;
    let state = ctx.store().load().await?;
    let plan = ctx.engine().plan(&set, &state)?;

    super::print_plan(&plan);
    Ok(())
}
