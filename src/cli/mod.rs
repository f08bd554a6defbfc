// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod args;
pub mod client;
pub mod download;
pub mod serve;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{ModelArgs, ServeArgs};
pub use client::{parse_text_queries, ClientArgs};
pub use download::DownloadArgs;
pub use serve::DetectArgs;

/// Fabstir Detect Node CLI
#[derive(Parser, Debug)]
#[command(name = "fabstir-detect-node")]
#[command(version)]
#[command(about = "Open-vocabulary object detection service (OWLv2)", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the model and serve POST /detect
    Serve(ServeArgs),

    /// Run detection on a local image
    Detect(DetectArgs),

    /// Send an image to a running server
    Client(ClientArgs),

    /// Download OWLv2 weights and tokenizer
    DownloadModel(DownloadArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve(args) => serve::serve(args).await,
        Commands::Detect(args) => serve::detect(args).await,
        Commands::Client(args) => client::run_client(args).await,
        Commands::DownloadModel(args) => download::download_model(args).await,
    }
}
