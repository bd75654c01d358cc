use app_lib::commands::Cli;
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let my_level = if cli.verbose > 0 {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("app_lib", my_level)
        .parse_default_env()
        .init();

    if let Err(e) = app_lib::run(cli).await {
        eprintln!("错误：{:#}", e);
        std::process::exit(1);
    }
}
