//! `agentloop tools` — List the tools a policy runs with.

use agentloop_config::{AppConfig, PolicyKind};

pub async fn run(policy: Option<PolicyKind>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let policy = policy.unwrap_or(config.agent.policy);
    let registry = agentloop_tools::registry_for(policy, &config.tools)?;

    println!("Tools for {policy}:");
    for tool in registry.iter() {
        let direct = if tool.return_direct() { " (returns directly)" } else { "" };
        println!("  {}{direct}", tool.name());
        println!("      {}", tool.description());
    }
    if config.tools.serpapi_api_key.is_none() {
        println!();
        println!("  note: SERPAPI_API_KEY is not set; search calls will return an error observation");
    }
    Ok(())
}
