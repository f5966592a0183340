// Copyright 2024-2026 IR Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Config CLI subcommand: print the effective configuration.

use crate::config::{EffectiveConfig, EnvConfig};

/// Print every effective value as `key = value`, one per line.
pub fn print_config(config: &EnvConfig) {
    for line in config_lines(&config.effective_config()) {
        println!("{}", line);
    }
}

fn config_lines(eff: &EffectiveConfig) -> Vec<String> {
    vec![
        format!("base_dir = {}", eff.base_dir),
        format!("addr = {}", eff.addr),
        format!("backend = {}", eff.backend),
        format!("log_format = {}", eff.log_format),
        format!("log_level = {}", eff.log_level),
        format!("stream_buffer = {}", eff.stream_buffer),
        format!("shutdown_timeout_secs = {}", eff.shutdown_timeout_secs),
    ]
}
