use crate::context::StackContext;
use colored::Colorize;
use pgstack_core::{Resource, ResourceKind, Revision};

pub fn handle(ctx: &StackContext, revision: Revision) -> anyhow::Result<()> {
    ctx.print_header("Validating stack...");

    let topology = match ctx.declare(revision) {
        Ok(topology) => topology,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ Configuration error".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", "✓ Stack is valid".green().bold());
    println!();
    println!("Revision {}:", revision.to_string().cyan());
    for resource in &topology.resources {
        println!("  - {} {}", resource.key().cyan(), describe(resource).dimmed());
    }
    println!("Exports:");
    for (name, output) in &topology.exports {
        println!("  - {} <- {}", name.cyan(), output);
    }
    Ok(())
}

fn describe(resource: &Resource) -> String {
    match &resource.kind {
        ResourceKind::ResourceGroup(group) => format!(
            "(location: {})",
            group.location.value().map(String::as_str).unwrap_or("?")
        ),
        ResourceKind::RandomPassword(password) => format!("(length: {})", password.length),
        ResourceKind::FlexibleServer(server) => {
            let mut parts = vec![
                format!("PostgreSQL {}", server.version),
                format!("{} / {}", server.sku.tier, server.sku.name),
            ];
            if let Some(storage) = server.storage {
                parts.push(format!("{} GB", storage.storage_size_gb));
            }
            if let Some(zone) = &server.availability_zone {
                parts.push(format!("zone {}", zone));
            }
            format!("({})", parts.join(", "))
        }
        ResourceKind::FirewallRule(rule) => {
            format!("({} - {})", rule.start_ip_address, rule.end_ip_address)
        }
    }
}
