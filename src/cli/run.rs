// Copyright 2024-2026 IR Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Run subcommand: in-process generation, single-shot or interactive.

use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::EnvConfig;
use crate::engine::{GenerateOptions, GenerateParameters};
use crate::ffi;
use crate::server::{ApiError, Gateway};

/// Sampling flags given on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
}

impl Overrides {
    fn options(&self) -> GenerateOptions {
        let mut params = GenerateParameters::default();
        if let Some(v) = self.max_tokens {
            params.max_tokens = v;
        }
        if let Some(v) = self.temperature {
            params.temperature = v;
        }
        if let Some(v) = self.top_k {
            params.top_k = v;
        }
        if let Some(v) = self.top_p {
            params.top_p = v;
        }
        GenerateOptions::new(params)
    }
}

const HELP: &str = "Commands:\n  /reset   clear the conversation state\n  /help    show this help\n  /exit    leave (also /quit, /bye)";

/// Run `run <model> [prompt]`.
///
/// Returns exit code: 0 on success, 1 on failure, 2 on invalid options.
pub async fn run_model(
    config: EnvConfig,
    model: String,
    prompt: Option<String>,
    overrides: Overrides,
) -> i32 {
    let options = overrides.options();
    if let Err(e) = options.params.validate() {
        eprintln!("Error: {}", e);
        return 2;
    }

    let gateway = match Gateway::from_config(&config, ffi::default_api()) {
        Ok(gateway) => gateway,
        Err(e) => {
            eprintln!("Error starting engine: {}", e);
            return 1;
        }
    };
    if let Err(e) = gateway.ensure_model(&model).await {
        eprintln!("Error: {}", ApiError::from(e));
        gateway.close().await;
        return 1;
    }

    let code = match prompt {
        Some(prompt) => match stream_reply(&gateway, &model, prompt, options).await {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        None => repl(&gateway, &model, options).await,
    };
    gateway.close().await;
    code
}

async fn repl(gateway: &Gateway, model: &str, options: GenerateOptions) -> i32 {
    println!("Model: {}", model);
    println!("Type a prompt and press Enter. /help for commands.\n");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!(">>> ");
        if io::stdout().flush().is_err() {
            return 1;
        }

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return 0,
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                return 1;
            }
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/exit" | "/quit" | "/bye" => return 0,
            "/help" => {
                println!("{}", HELP);
                continue;
            }
            "/reset" => {
                match gateway.reset().await {
                    Ok(()) => println!("Context reset."),
                    Err(e) => eprintln!("Error: {}", e),
                }
                continue;
            }
            _ if input.starts_with('/') => {
                println!("Unknown command {}. /help for commands.", input);
                continue;
            }
            _ => {}
        }

        if let Err(e) = stream_reply(gateway, model, input.to_string(), options).await {
            eprintln!("Error: {}", e);
        }
    }
}

/// Print units to stdout as they arrive, then a newline.
async fn stream_reply(
    gateway: &Gateway,
    model: &str,
    prompt: String,
    options: GenerateOptions,
) -> Result<(), ApiError> {
    let mut units = gateway
        .generate_stream(model, prompt, options)
        .await
        .map_err(ApiError::from_generation)?;

    let mut stdout = io::stdout();
    while let Some(unit) = units.recv().await {
        print!("{}", unit);
        let _ = stdout.flush();
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_defaults() {
        let overrides = Overrides {
            max_tokens: Some(8),
            top_k: Some(0),
            ..Overrides::default()
        };
        let params = overrides.options().params;
        assert_eq!(params.max_tokens, 8);
        assert_eq!(params.top_k, 0);
        assert_eq!(params.temperature, GenerateParameters::default().temperature);
    }

    #[tokio::test]
    async fn test_invalid_options_exit_2() {
        let overrides = Overrides {
            top_p: Some(1.5),
            ..Overrides::default()
        };
        let code = run_model(EnvConfig::default(), "tiny".into(), None, overrides).await;
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_single_shot_against_registered_model() {
        let dir = tempfile::TempDir::new().unwrap();
        let model = dir.path().join("tiny.gguf");
        std::fs::write(&model, vec![0u8; 4096]).unwrap();
        let config = EnvConfig {
            base_dir: dir.path().join("home"),
            ..EnvConfig::default()
        };

        let code = run_model(
            config.clone(),
            model.display().to_string(),
            Some("hello world".into()),
            Overrides::default(),
        )
        .await;
        assert_eq!(code, 0);

        let code = run_model(config, "missing".into(), Some("hi".into()), Overrides::default())
            .await;
        assert_eq!(code, 1);
    }
}
