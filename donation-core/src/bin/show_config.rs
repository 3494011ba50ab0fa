use anyhow::Context;
use donation_core::{supported_tokens, DonationConfig};

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = DonationConfig::load().context("failed to load configuration")?;

    println!("{} {} configuration:\n", donation_core::NAME, donation_core::VERSION);
    println!("  Log level: {}", config.log_level);
    println!("  Balance cache TTL: {} ms", config.balances.cache_ttl_ms);
    println!("  Slow fetch threshold: {} ms", config.balances.slow_fetch_threshold_ms);
    println!("  Fetch timeout: {} ms", config.balances.fetch_timeout_ms);
    println!("  Retry delays: {:?} ms", config.balances.retry_delays_ms);
    println!("  Max retry attempts: {}", config.balances.max_retry_attempts);
    println!("\n  Chains:");
    for chain in &config.chains {
        let tokens: Vec<&str> = supported_tokens()
            .iter()
            .filter(|t| t.chain_id == chain.chain_id)
            .map(|t| t.symbol.as_str())
            .collect();
        println!("    {} ({})", chain.name, chain.chain_id);
        println!("      RPC URL: {}", chain.rpc_url);
        println!("      Explorer: {}", chain.explorer);
        println!(
            "      Donation contract: {}",
            chain.donation_contract.as_deref().unwrap_or("(not set)")
        );
        println!("      Tokens: {}", tokens.join(", "));
    }

    match config.validate() {
        Ok(()) => println!("\n  Configuration is valid"),
        Err(err) => println!("\n  Configuration problems: {}", err),
    }
    Ok(())
}
