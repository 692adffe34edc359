use std::process::ExitCode;

use clap::Parser;
use forge_stats::config::{CommonArgs, Settings, ViewsArgs};
use forge_stats::render::{self, Format};
use forge_stats::views::fetch_views;
use forge_stats::{resolve, trace};

/// Print the traffic views of a GitHub repository.
#[derive(Parser)]
#[command(name = "repo-views", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    views: ViewsArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let settings = Settings::from_args(cli.common);
    if let Err(err) = trace::init(&settings.log_level) {
        eprintln!("warning: {err}");
    }

    match run(&settings, &cli.views).await {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: &Settings, args: &ViewsArgs) -> anyhow::Result<String> {
    let (repo, token) = resolve(settings.input_source().as_mut())?;
    let client = settings.client(token)?;
    let report = fetch_views(&client, &repo, args.options()).await?;

    Ok(match settings.format {
        Format::Text => render::views_text(&report),
        Format::Json => render::to_json(&report)? + "\n",
    })
}
