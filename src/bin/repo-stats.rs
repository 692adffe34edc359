use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use forge_stats::audience::fetch_audience;
use forge_stats::config::{CommonArgs, Settings, StatsArgs};
use forge_stats::render::{self, Format};
use forge_stats::stats::{RepoStats, fetch_stats};
use forge_stats::svg::{self, Theme};
use forge_stats::{resolve, trace};
use serde_json::json;

/// Print stars, forks and top contributors of a GitHub repository.
#[derive(Parser)]
#[command(name = "repo-stats", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    stats: StatsArgs,
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

    match run(&settings, &cli.stats).await {
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

async fn run(settings: &Settings, args: &StatsArgs) -> anyhow::Result<String> {
    let (repo, token) = resolve(settings.input_source().as_mut())?;
    let client = settings.client(token)?;
    let stats = fetch_stats(&client, &repo, args.options()).await?;

    let audience = match args.audience_options() {
        Some(options) => {
            let today = Utc::now().date_naive();
            Some(fetch_audience(&client, &repo, &options, today).await?)
        }
        None => None,
    };

    if let Some(dir) = &args.svg_dir {
        write_cards(dir, &stats)?;
    }

    Ok(match settings.format {
        Format::Text => {
            let mut out = render::stats_text(&stats);
            if let Some(audience) = &audience {
                out.push_str(&render::audience_text(audience));
            }
            out
        }
        Format::Json => {
            render::to_json(&json!({ "stats": stats, "audience": audience }))? + "\n"
        }
    })
}

fn write_cards(dir: &Path, stats: &RepoStats) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    for theme in [Theme::Dark, Theme::Light] {
        let path = dir.join(theme.file_name());
        fs::write(&path, svg::generate_svg(stats, theme))
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote stats card");
    }
    Ok(())
}
