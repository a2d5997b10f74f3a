use crate::context::StackContext;
use serde_json::{Map, Value};

pub async fn handle(ctx: &StackContext, show_secrets: bool, json: bool) -> anyhow::Result<()> {
    let state = ctx.store().load().await?;

    if json {
        let outputs: Map<String, Value> = state
            .outputs
            .iter()
            .map(|(name, output)| {
                let value = if output.secret && !show_secrets {
                    Value::String(output.display(false))
                } else {
                    output.value.clone()
                };
                (name.clone(), value)
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&outputs)?);
        return Ok(());
    }

    super::print_outputs(&state, show_secrets);
    Ok(())
}
