//! `atlas tools` and `atlas routes`.

use crate::router::{all_routes, CostMode};
use crate::security::{SecurityTier, TierEnforcer};
use colored::Colorize;

/// Print the tools and categories a tier may use.
pub fn handle_tools(tier: SecurityTier) {
    let enforcer = TierEnforcer::new();

    println!("{}", format!("Allowed tools for {}", tier.label()).bold().underline());
    println!();

    let categories = enforcer
        .allowed_categories(tier)
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    println!("Categories: {}", categories);
    println!();

    println!("{:<20} {}", "Tool", "Category");
    println!("{}", "-".repeat(40));
    for tool in enforcer.allowed_tools(tier) {
        let category = enforcer
            .tool_category(tool)
            .map(|c| c.to_string())
            .unwrap_or_default();
        println!("{:<20} {}", tool.green(), category);
    }
}

/// Print the routing table, optionally for one cost mode.
pub fn handle_routes(cost_mode: Option<CostMode>) {
    println!("{}", "Model routing table".bold().underline());
    println!();
    println!(
        "{:<16} {:<18} {:<9} {:<10} {:<20} {:>10} {:>10} {:>7}",
        "Tier", "Task", "Mode", "Provider", "Model", "$/1k in", "$/1k out", "Max"
    );
    println!("{}", "-".repeat(108));

    for (task, tier, mode, config) in all_routes() {
        if cost_mode.is_some_and(|wanted| wanted != mode) {
            continue;
        }
        println!(
            "{:<16} {:<18} {:<9} {:<10} {:<20} {:>10.4} {:>10.4} {:>7}",
            tier.as_str(),
            task.as_str(),
            mode.as_str(),
            config.provider.as_str(),
            config.model_id,
            config.cost_per_1k_input,
            config.cost_per_1k_output,
            config.max_tokens
        );
    }
}
