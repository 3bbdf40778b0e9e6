//! Interactive GitHub user lookup through a tool-calling model.
//!
//! Usage:
//!   GOOGLE_API_KEY=... cargo run --example lookup
//!   cargo run --example lookup -- --secrets-file ~/.config/lookup/secrets.json
//!   OPENAI_API_KEY=sk-... cargo run --example lookup -- --provider openai --model gpt-4o-mini
//!
//! Type a GitHub username at the prompt. Ctrl-D or "exit" / "quit" to leave.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use github_lookup_agent::{
    load_credential, Agent, AgentConfig, AgentEvent, EnvSecretStore, FileSecretStore,
    GeminiProvider, GitHubUserTool, InferenceProvider, OpenAiProvider, SecretStore, ToolRegistry,
    GEMINI_KEY_SECRET,
};

#[derive(Parser)]
#[command(name = "lookup", about = "Ask a model about GitHub users")]
struct Cli {
    /// Provider: "gemini" or "openai"
    #[arg(long, default_value = "gemini")]
    provider: String,

    /// Model to use (defaults depend on provider)
    #[arg(long)]
    model: Option<String>,

    /// Model API base URL (defaults depend on provider)
    #[arg(long)]
    base_url: Option<String>,

    /// GitHub API base URL
    #[arg(long, default_value = github_lookup_agent::tools::GITHUB_API_URL)]
    github_url: String,

    /// Read secrets from this JSON file instead of the environment
    #[arg(long)]
    secrets_file: Option<PathBuf>,

    /// Max output tokens per model call
    #[arg(long, default_value_t = 1024)]
    max_tokens: u32,
}

fn build_provider(cli: &Cli, secrets: &dyn SecretStore) -> (Box<dyn InferenceProvider>, String) {
    let credential = |name: &str| {
        load_credential(secrets, name).unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        })
    };

    match cli.provider.as_str() {
        "gemini" => {
            let mut p = GeminiProvider::new(credential(GEMINI_KEY_SECRET));
            if let Some(ref url) = cli.base_url {
                p = p.with_base_url(url);
            }
            let model = cli.model.clone().unwrap_or_else(|| AgentConfig::default().model);
            (Box::new(p), model)
        }
        "openai" => {
            let base = cli
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com".into());
            let p = OpenAiProvider::new(base).with_api_key(credential("OPENAI_API_KEY"));
            let model = cli.model.clone().unwrap_or_else(|| "gpt-4o-mini".into());
            (Box::new(p), model)
        }
        other => {
            eprintln!("error: unknown provider '{other}'. Use 'gemini' or 'openai'.");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let secrets: Box<dyn SecretStore> = match cli.secrets_file {
        Some(ref path) => Box::new(FileSecretStore::new(path)),
        None => Box::new(EnvSecretStore),
    };
    let (provider, model) = build_provider(&cli, secrets.as_ref());

    let github = GitHubUserTool::new().with_base_url(&cli.github_url);
    let tools = ToolRegistry::new().add(GitHubUserTool::descriptor(), github);

    let config = AgentConfig {
        model: model.clone(),
        max_tokens: cli.max_tokens,
        ..AgentConfig::default()
    };

    let agent = Agent::new(provider, tools, config);

    eprintln!("github lookup");
    eprintln!("provider: {}", cli.provider);
    eprintln!("model: {model}");
    eprintln!("---");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        eprint!("\x1b[1;36musername>\x1b[0m ");
        io::stderr().flush().ok();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };

        let username = line.trim().trim_start_matches('@');
        if username.is_empty() {
            continue;
        }
        if matches!(username, "exit" | "quit" | "/q") {
            break;
        }

        let prompt = format!(
            "Tell me about the GitHub user \"{username}\": who they are, their bio, \
             and how many public repositories and followers they have."
        );

        let (tx, mut rx) = tokio::sync::mpsc::channel::<AgentEvent>(64);

        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    AgentEvent::ToolCall { name, arguments } => {
                        eprintln!("\x1b[33m  [tool: {name}]\x1b[0m {arguments}");
                    }
                    AgentEvent::ToolResult {
                        name,
                        output,
                        is_error,
                    } => {
                        let tag = if is_error { "error" } else { "result" };
                        let output = output.to_string();
                        let truncated = match output.char_indices().nth(200) {
                            Some((i, _)) => format!("{}...", &output[..i]),
                            None => output,
                        };
                        eprintln!("\x1b[33m  [{tag}: {name}]\x1b[0m {truncated}");
                    }
                    AgentEvent::Finished { model_calls } => {
                        eprintln!("\x1b[2m  ({model_calls} model calls)\x1b[0m");
                    }
                    _ => {}
                }
            }
        });

        match agent.invoke_streaming(&prompt, tx).await {
            Ok(result) => {
                printer.await.ok();
                eprint!("\x1b[1;32magent>\x1b[0m ");
                println!("{}", result.text);
                eprintln!(
                    "\x1b[2m  [{}in / {}out tokens]\x1b[0m",
                    result.usage.input_tokens, result.usage.output_tokens
                );
            }
            Err(e) => {
                printer.await.ok();
                eprintln!("\x1b[1;31merror:\x1b[0m {e}");
            }
        }
    }

    eprintln!("bye.");
}
