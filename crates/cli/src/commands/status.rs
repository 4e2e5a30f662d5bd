//! `docforge status`: Show the effective configuration.

use docforge_config::AppConfig;
use docforge_core::ModelProvider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let key = |p: ModelProvider| if config.has_api_key(p) { "key set" } else { "no key" };

    println!("DocForge Status");
    println!("===============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.default_provider);
    println!(
        "  OpenAI:       {} ({})",
        config.providers.openai.model,
        key(ModelProvider::OpenAi)
    );
    println!(
        "  Anthropic:    {} ({})",
        config.providers.anthropic.model,
        key(ModelProvider::Anthropic)
    );
    println!("  Temperature:  {}", config.temperature);
    println!(
        "  Research:     {} rounds, {} snippets max, web search {}",
        config.research.max_rounds,
        config.research.max_snippets,
        if config.research.search_api_key.is_some() { "enabled" } else { "disabled" }
    );
    println!("  Drafting:     {} attempt(s), {}s timeout", config.drafting.max_attempts, config.drafting.timeout_secs);
    println!("  Output dir:   {}", config.render.output_dir.display());
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);
    match config.jobs.retention_secs {
        Some(secs) => println!("  Retention:    {secs}s"),
        None => println!("  Retention:    keep all jobs"),
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file; run `docforge onboard` to create one");
    }

    Ok(())
}
