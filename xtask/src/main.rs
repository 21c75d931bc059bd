use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the fleet logistics workspace",
    long_about = "A unified CLI for running the delivery demo, benchmarks,\n\
                  and CI checks in the fleet logistics workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scripted delivery scenario
    Demo,
    /// Run Criterion benchmarks
    Bench,
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CiJob {
    /// cargo fmt --check
    Fmt,
    /// cargo clippy with warnings denied
    Clippy,
    /// cargo test across the workspace
    Test,
    /// fmt + clippy + test
    Check,
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Demo => {
            ensure_success(cargo(&[
                "run",
                "-p",
                "fleet_core",
                "--example",
                "delivery_run",
            ]));
        }
        Commands::Bench => {
            ensure_success(cargo(&["bench", "-p", "fleet_core"]));
        }
        Commands::Ci { job } => match job {
            CiJob::Fmt => ensure_success(cargo(&["fmt", "--all", "--", "--check"])),
            CiJob::Clippy => ensure_success(cargo(&[
                "clippy",
                "--workspace",
                "--all-targets",
                "--",
                "-D",
                "warnings",
            ])),
            CiJob::Test => ensure_success(cargo(&["test", "--workspace"])),
            CiJob::Check => {
                ensure_success(cargo(&["fmt", "--all", "--", "--check"]));
                ensure_success(cargo(&[
                    "clippy",
                    "--workspace",
                    "--all-targets",
                    "--",
                    "-D",
                    "warnings",
                ]));
                ensure_success(cargo(&["test", "--workspace"]));
            }
        },
    }
}

fn cargo(args: &[&str]) -> ExitStatus {
    Command::new("cargo")
        .args(args)
        .status()
        .unwrap_or_else(|error| {
            eprintln!("failed to spawn cargo {}: {error}", args.join(" "));
            exit(1);
        })
}

fn ensure_success(status: ExitStatus) {
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}
