// SPDX-License-Identifier: BSD-3-Clause
use std::path::PathBuf;

/// Context-sensitive points-to propagation over JSON facts
#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Compare the result against a direct Datalog evaluation
    #[arg(long)]
    pub check: bool,

    /// Debug
    #[arg(long)]
    pub debug: bool,

    /// Facts file (JSON)
    #[arg()]
    pub facts: PathBuf,

    /// Only print variables whose name matches this regex
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Give up if a batch needs more steps than this
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Quiet
    #[arg(long)]
    pub quiet: bool,

    /// Tracing
    #[arg(long)]
    pub tracing: bool,

    /// Log every step
    #[arg(short, long)]
    pub verbose: bool,
}
