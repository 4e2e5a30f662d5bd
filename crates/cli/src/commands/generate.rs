//! `docforge generate`: Run one generation job and wait for it.

use docforge_agent::JobRegistry;
use docforge_config::AppConfig;
use docforge_core::{DocumentRequest, DomainEvent, JobStatus, ModelProvider};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

pub struct GenerateArgs {
    pub topic: String,
    pub subtopic: Option<String>,
    pub key_points: Vec<String>,
    pub model: Option<ModelProvider>,
    pub research: bool,
    pub output: Option<String>,
}

/// Returns `Ok(false)` when the job ended in `error`.
pub async fn run(args: GenerateArgs) -> Result<bool, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let provider = args.model.unwrap_or(config.default_provider);

    // Fail before queueing a job that cannot draft
    if !config.has_api_key(provider) {
        let var = match provider {
            ModelProvider::OpenAi => "OPENAI_API_KEY",
            ModelProvider::Anthropic => "ANTHROPIC_API_KEY",
        };
        eprintln!();
        eprintln!("  ERROR: No API key configured for {provider}!");
        eprintln!();
        eprintln!("  Set {var} in your environment or a .env file,");
        eprintln!("  or add it to {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err(format!("No API key found for {provider}").into());
    }

    let mut request = DocumentRequest::new(args.topic)
        .with_key_points(args.key_points)
        .with_provider(provider)
        .with_research(args.research);
    if let Some(sub) = args.subtopic {
        request = request.with_subtopic(sub);
    }
    if let Some(out) = args.output {
        request = request.with_output_file(out);
    }

    let registry = JobRegistry::from_config(&config);
    let mut events = registry.events().subscribe();

    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match event.as_ref() {
                    DomainEvent::JobStatusChanged { status, message, .. } => {
                        if status.is_terminal() {
                            break;
                        }
                        println!("  [{status}] {message}");
                    }
                    DomainEvent::ResearchCompleted { rounds, snippets, .. } => {
                        println!("  Research: {snippets} snippets in {rounds} round(s)");
                    }
                    DomainEvent::ToolExecuted {
                        tool_name, success, hits, ..
                    } => {
                        tracing::debug!(tool = %tool_name, success, hits, "Tool executed");
                    }
                },
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let id = registry.create(request).await?;
    println!("  Job {} started", id.short());

    let snapshot = registry
        .wait(&id)
        .await
        .ok_or("job disappeared from the registry")?;
    let _ = tokio::time::timeout(Duration::from_secs(1), printer).await;

    match snapshot.status {
        JobStatus::Succeeded => {
            println!(
                "Document successfully generated: {}",
                snapshot.file_reference.unwrap_or_default()
            );
            Ok(true)
        }
        _ => {
            eprintln!(
                "Error generating document: {}",
                snapshot.error.unwrap_or_else(|| snapshot.message.clone())
            );
            Ok(false)
        }
    }
}
