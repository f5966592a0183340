// Copyright 2024-2026 IR Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Serve subcommand: run the HTTP gateway until Ctrl+C.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::config::EnvConfig;
use crate::ffi;
use crate::server::{self, AppState, Gateway};
use crate::shutdown::{ShutdownCoordinator, ShutdownResult};

/// Run `serve`. Returns exit code: 0 on clean shutdown, 1 on failure.
pub async fn run_serve(config: EnvConfig) -> i32 {
    let gateway = match Gateway::from_config(&config, ffi::default_api()) {
        Ok(gateway) => gateway,
        Err(e) => {
            eprintln!("Error starting gateway: {}", e);
            return 1;
        }
    };
    tracing::info!(
        base_dir = %config.base_dir.display(),
        backend = %config.backend,
        "gateway ready"
    );

    let shutdown = ShutdownCoordinator::new();
    let state = Arc::new(AppState::new(gateway.clone(), shutdown.clone()));
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let addr = config.addr();

    let mut server_handle = tokio::spawn(async move {
        server::serve(&addr, state, async {
            let _ = stop_rx.await;
        })
        .await
    });

    // The server keeps running while draining so open streams can finish.
    let mut code = 0;
    tokio::select! {
        result = &mut server_handle => {
            code = report_server_exit(result);
            gateway.close().await;
            return code;
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                eprintln!("Failed to listen for Ctrl+C: {}", e);
                code = 1;
            }
        }
    }

    eprintln!("Shutdown signal received, draining...");
    match shutdown.initiate(config.shutdown_timeout).await {
        ShutdownResult::Complete => eprintln!("Drain complete"),
        ShutdownResult::Timeout { remaining } => {
            eprintln!("Shutdown timeout, {} requests remaining", remaining);
        }
    }

    let _ = stop_tx.send(());
    if report_server_exit(server_handle.await) != 0 {
        code = 1;
    }
    gateway.close().await;
    eprintln!("Shutdown complete");
    code
}

fn report_server_exit(
    result: Result<Result<(), server::ServerError>, tokio::task::JoinError>,
) -> i32 {
    match result {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            eprintln!("Server error: {}", e);
            1
        }
        Err(e) => {
            eprintln!("Server task failed: {}", e);
            1
        }
    }
}
