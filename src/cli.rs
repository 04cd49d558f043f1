use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

pub fn build_cli() -> Command {
    Command::new("gh-rate-limit-exporter")
        .about("Prometheus exporter for GitHub API rate limits")
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .num_args(1)
                .help("Override RUST_LOG level (e.g., info, debug)"),
        )
        .arg(
            Arg::new("listen")
                .long("listen")
                .num_args(1)
                .help("Address to serve /metrics on (e.g., 0.0.0.0:8080)"),
        )
        .arg(
            Arg::new("credentials")
                .long("credentials")
                .num_args(1)
                .value_parser(value_parser!(PathBuf))
                .help("Path to the JSON or YAML credential file"),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Print version and exit")
                .action(ArgAction::SetTrue),
        )
}

pub fn init_logging(level: Option<&str>) {
    // Explicit level beats RUST_LOG, which beats the info default.
    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(lvl) = level {
        builder.parse_filters(lvl);
    }
    builder.init();
}
