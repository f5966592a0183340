// Copyright 2024-2026 IR Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command-line interface.
//!
//! ```text
//! ir serve [--addr HOST:PORT] [--backend cpu|metal]
//! ir run <model> [prompt] [--max-tokens N] [--temperature T] [--top-k K] [--top-p P]
//! ir list
//! ir info <model>
//! ir add <name> <path> [--force] [--architecture A] [--parameters P] [--quantization Q]
//! ir rm <name>
//! ir config
//! ```
//!
//! Every command returns a process exit code: 0 on success, 1 on failure,
//! 2 on bad arguments.

mod config_cmd;
mod models_cmd;
mod run;
mod serve;

pub use config_cmd::print_config;
pub use models_cmd::{format_size, print_manifest, print_models};

use clap::{Parser, Subcommand};

use crate::config::EnvConfig;
use crate::ffi::Backend;

/// ir - local inference gateway
#[derive(Debug, Parser)]
#[command(name = "ir")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Address to bind, as host:port or :port
        #[arg(long)]
        addr: Option<String>,

        /// Compute backend (cpu or metal)
        #[arg(long)]
        backend: Option<Backend>,
    },

    /// Generate from a model, once or interactively
    Run {
        /// Model name or path
        model: String,

        /// Prompt; starts an interactive session when omitted
        prompt: Option<String>,

        /// Maximum tokens to generate
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f32>,

        /// Top-k sampling
        #[arg(long)]
        top_k: Option<u32>,

        /// Top-p nucleus sampling
        #[arg(long)]
        top_p: Option<f32>,

        /// Compute backend (cpu or metal)
        #[arg(long)]
        backend: Option<Backend>,
    },

    /// List registered models
    #[command(alias = "ls")]
    List,

    /// Show a registered model's manifest
    Info {
        /// Model name
        model: String,
    },

    /// Register a model file under a name
    Add {
        /// Model name
        name: String,

        /// Path to the model file
        path: std::path::PathBuf,

        /// Replace an existing model with the same name
        #[arg(long)]
        force: bool,

        #[arg(long)]
        architecture: Option<String>,

        #[arg(long)]
        parameters: Option<String>,

        #[arg(long)]
        quantization: Option<String>,
    },

    /// Remove a registered model
    Rm {
        /// Model name
        name: String,
    },

    /// Print the effective configuration
    Config,
}

/// Run `command` against `config` and return the process exit code.
pub async fn dispatch(command: Commands, mut config: EnvConfig) -> i32 {
    match command {
        Commands::Serve { addr, backend } => {
            if let Some(addr) = addr {
                if let Err(e) = config.set_addr(&addr) {
                    eprintln!("Error: {}", e);
                    return 2;
                }
            }
            if let Some(backend) = backend {
                config.backend = backend;
            }
            serve::run_serve(config).await
        }
        Commands::Run {
            model,
            prompt,
            max_tokens,
            temperature,
            top_k,
            top_p,
            backend,
        } => {
            if let Some(backend) = backend {
                config.backend = backend;
            }
            let overrides = run::Overrides {
                max_tokens,
                temperature,
                top_k,
                top_p,
            };
            run::run_model(config, model, prompt, overrides).await
        }
        Commands::List => models_cmd::run_list(&config),
        Commands::Info { model } => models_cmd::run_info(&config, &model),
        Commands::Add {
            name,
            path,
            force,
            architecture,
            parameters,
            quantization,
        } => {
            let options = crate::models::RegisterOptions {
                overwrite: force,
                architecture,
                parameters,
                quantization,
            };
            models_cmd::run_add(&config, &name, &path, options)
        }
        Commands::Rm { name } => models_cmd::run_rm(&config, &name),
        Commands::Config => {
            print_config(&config);
            0
        }
    }
}
