use anyhow::{Context, Result};
use clap::Parser;
use std::process::Command;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Parser)]
enum Cmd {
    /// Build the XDP packet counter object (always release)
    BuildEbpf {
        #[arg(long, default_value = "bpfel-unknown-none")]
        target: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Cmd::BuildEbpf { target } => build_ebpf(&target)?,
    }

    Ok(())
}

/// Debug builds pull in `LowerHex` formatting the BPF linker cannot handle,
/// so the object is always built in release mode.
fn cargo_args(target: &str) -> Vec<String> {
    [
        "+nightly",
        "build",
        "--package",
        "ip-hist-ebpf",
        "--target",
        target,
        "-Z",
        "build-std=core",
        "--release",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn build_ebpf(target: &str) -> Result<()> {
    let status = Command::new("cargo")
        .args(cargo_args(target))
        .status()
        .context("Failed to build eBPF program")?;

    if !status.success() {
        anyhow::bail!("Failed to build eBPF program");
    }

    println!("✓ eBPF program built successfully");
    println!("  Target: {target}");
    println!("  Object: target/{target}/release/ip-hist");

    Ok(())
}
