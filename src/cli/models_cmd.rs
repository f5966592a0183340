// Copyright 2024-2026 IR Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Model registry subcommands: list, info, add, rm.
//!
//! These work directly on the manifest store under `IR_HOME`; no server
//! needs to be running.

use std::path::Path;

use crate::config::EnvConfig;
use crate::models::{ModelManifest, ModelResolver, RegisterOptions};

fn open_resolver(config: &EnvConfig) -> Option<ModelResolver> {
    match ModelResolver::open(&config.base_dir) {
        Ok(resolver) => Some(resolver),
        Err(e) => {
            eprintln!(
                "Error opening model store at {}: {}",
                config.base_dir.display(),
                e
            );
            None
        }
    }
}

/// Run `list`. Returns exit code: 0 on success, 1 on failure.
pub fn run_list(config: &EnvConfig) -> i32 {
    let Some(resolver) = open_resolver(config) else {
        return 1;
    };
    match resolver.list() {
        Ok(mut manifests) => {
            manifests.sort_by(|a, b| a.name.cmp(&b.name));
            print_models(&manifests);
            0
        }
        Err(e) => {
            eprintln!("Error listing models: {}", e);
            1
        }
    }
}

/// Run `info <model>`.
pub fn run_info(config: &EnvConfig, name: &str) -> i32 {
    let Some(resolver) = open_resolver(config) else {
        return 1;
    };
    match resolver.get(name) {
        Ok(manifest) => {
            print_manifest(&manifest);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Run `add <name> <path>`.
pub fn run_add(config: &EnvConfig, name: &str, path: &Path, options: RegisterOptions) -> i32 {
    let Some(resolver) = open_resolver(config) else {
        return 1;
    };
    match resolver.register(name, path, &options) {
        Ok(manifest) => {
            println!(
                "Added '{}' ({}) -> {}",
                manifest.name,
                format_size(manifest.size),
                manifest.path.display()
            );
            0
        }
        Err(crate::models::ResolveError::Conflict(name)) => {
            eprintln!("Error: model '{}' already exists (use --force to replace it)", name);
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Run `rm <name>`.
pub fn run_rm(config: &EnvConfig, name: &str) -> i32 {
    let Some(resolver) = open_resolver(config) else {
        return 1;
    };
    match resolver.remove(name) {
        Ok(()) => {
            println!("Removed '{}'", name);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Format and print registered models as a table.
pub fn print_models(manifests: &[ModelManifest]) {
    if manifests.is_empty() {
        println!("No models registered. Add one with `ir add <name> <path>`.");
        return;
    }

    println!(
        "{:<30} {:>10} {:<14} {:<14} {:<20}",
        "NAME", "SIZE", "QUANTIZATION", "ARCHITECTURE", "ADDED"
    );
    for m in manifests {
        println!(
            "{:<30} {:>10} {:<14} {:<14} {:<20}",
            truncate(&m.name, 29),
            format_size(m.size),
            truncate(m.quantization.as_deref().unwrap_or("-"), 13),
            truncate(m.architecture.as_deref().unwrap_or("-"), 13),
            m.added_at.format("%Y-%m-%d %H:%M"),
        );
    }
}

/// Print every field of one manifest.
pub fn print_manifest(manifest: &ModelManifest) {
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    println!("Name:          {}", manifest.name);
    println!("Path:          {}", manifest.path.display());
    println!("Size:          {} ({} bytes)", format_size(manifest.size), manifest.size);
    println!("Architecture:  {}", or_dash(&manifest.architecture));
    println!("Parameters:    {}", or_dash(&manifest.parameters));
    println!("Quantization:  {}", or_dash(&manifest.quantization));
    println!("Added:         {}", manifest.added_at.to_rfc3339());
}

/// Human-readable byte count using 1024-based units.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> EnvConfig {
        EnvConfig {
            base_dir: dir.path().join("home"),
            ..EnvConfig::default()
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(4096), "4.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ééé", 2), "éé");
    }

    #[test]
    fn test_print_models_empty_and_populated() {
        print_models(&[]);
        print_models(&[ModelManifest {
            name: "tiny".into(),
            path: "/models/tiny.gguf".into(),
            size: 4096,
            architecture: None,
            parameters: None,
            quantization: Some("q4_0".into()),
            added_at: Utc::now(),
        }]);
    }

    #[test]
    fn test_add_info_rm_exit_codes() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let model = dir.path().join("tiny.gguf");
        std::fs::write(&model, vec![0u8; 4096]).unwrap();

        assert_eq!(run_add(&config, "tiny", &model, RegisterOptions::default()), 0);
        assert_eq!(run_add(&config, "tiny", &model, RegisterOptions::default()), 1);
        let force = RegisterOptions {
            overwrite: true,
            ..RegisterOptions::default()
        };
        assert_eq!(run_add(&config, "tiny", &model, force), 0);

        assert_eq!(run_info(&config, "tiny"), 0);
        assert_eq!(run_list(&config), 0);
        assert_eq!(run_rm(&config, "tiny"), 0);
        assert_eq!(run_rm(&config, "tiny"), 1);
        assert_eq!(run_info(&config, "tiny"), 1);
    }

    #[test]
    fn test_add_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let missing = dir.path().join("nope.gguf");
        assert_eq!(run_add(&config, "nope", &missing, RegisterOptions::default()), 1);
    }
}
