use cbir::Opts;
use cbir::cli::SubCommandExtend;
use cbir::config::SubCommand;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();
    match &opts.subcmd {
        SubCommand::Generate(config) => config.run(&opts).await,
        SubCommand::Identify(config) => config.run(&opts).await,
        SubCommand::Extract(config) => config.run(&opts).await,
    }
}
