use std::str::FromStr;

use serde::Serialize;

use crate::audience::AudienceReport;
use crate::stats::RepoStats;
use crate::views::ViewsReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown format {other:?} (expected text or json)")),
        }
    }
}

#[derive(Serialize)]
struct JsonOut<T> {
    ok: bool,
    data: T,
}

pub fn to_json<T: Serialize>(data: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonOut { ok: true, data })
}

pub fn views_text(report: &ViewsReport) -> String {
    let mut out = format!(
        "Traffic views for {}\nTotal views: {}\nUnique visitors: {}\n",
        report.repository, report.total_count, report.unique_count
    );

    if report.series.is_empty() {
        out.push_str("Daily breakdown: (none)\n");
        return out;
    }

    out.push_str("Daily breakdown:\n");
    let width = report
        .series
        .iter()
        .map(|p| p.timestamp.len())
        .max()
        .unwrap_or(0);
    for point in &report.series {
        out.push_str(&format!(
            "  {:<width$}  views: {:>5}  uniques: {:>5}\n",
            point.timestamp, point.count, point.uniques
        ));
    }
    out
}

pub fn stats_text(stats: &RepoStats) -> String {
    let mut out = format!(
        "Repository: {}\nStars: {}, Watches: {}, Forks: {}\n",
        stats.repository, stats.stars, stats.watchers, stats.forks
    );
    out.push_str(&format!(
        "Significant contributors (last {} commits):\n",
        stats.sampled_commits
    ));

    if stats.significant_users.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }

    let width = stats
        .significant_users
        .iter()
        .map(|c| c.login.len())
        .max()
        .unwrap_or(0);
    for (rank, c) in stats.significant_users.iter().enumerate() {
        out.push_str(&format!(
            "  {:>2}. {:<width$}  {}\n",
            rank + 1,
            c.login,
            c.contribution_count
        ));
    }
    out
}

pub fn audience_text(report: &AudienceReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Total unique users (starred, watched, forked): {}\n",
        report.sampled_users
    ));
    out.push_str(&format!(
        "Number of unique significant users: {}\n",
        report.significant_users
    ));
    out.push_str(&format!(
        "Number of unique users affiliated with {:?}: {}\n",
        report.org_keyword, report.affiliated_users
    ));
    out.push_str(&format!("Power users rate: {:.2}\n", report.power_user_rate));
    out.push_str(&format!("Affiliated users rate: {:.2}\n", report.affiliated_rate));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::RepositoryRef;
    use crate::stats::Contributor;
    use crate::views::ViewPoint;

    fn repo() -> RepositoryRef {
        RepositoryRef {
            owner: "acme".to_string(),
            name: "widget".to_string(),
        }
    }

    #[test]
    fn empty_views_print_explicit_zeros() {
        let report = ViewsReport {
            repository: repo(),
            total_count: 0,
            unique_count: 0,
            series: Vec::new(),
        };
        let text = views_text(&report);
        assert!(text.contains("Total views: 0"));
        assert!(text.contains("Unique visitors: 0"));
        assert!(text.contains("Daily breakdown: (none)"));
    }

    #[test]
    fn views_list_each_point() {
        let report = ViewsReport {
            repository: repo(),
            total_count: 42,
            unique_count: 10,
            series: vec![ViewPoint {
                timestamp: "2024-01-01T00:00:00Z".to_string(),
                count: 5,
                uniques: 3,
            }],
        };
        let text = views_text(&report);
        assert!(text.contains("Traffic views for acme/widget"));
        assert!(text.contains("2024-01-01T00:00:00Z  views:     5  uniques:     3"));
    }

    #[test]
    fn empty_stats_print_zeros_and_none() {
        let stats = RepoStats {
            repository: repo(),
            stars: 0,
            forks: 0,
            watchers: 0,
            significant_users: Vec::new(),
            sampled_commits: 0,
        };
        let text = stats_text(&stats);
        assert!(text.contains("Stars: 0, Watches: 0, Forks: 0"));
        assert!(text.contains("(none)"));
    }

    #[test]
    fn stats_rank_contributors() {
        let stats = RepoStats {
            repository: repo(),
            stars: 7,
            forks: 2,
            watchers: 3,
            significant_users: vec![
                Contributor {
                    login: "carol".to_string(),
                    contribution_count: 9,
                },
                Contributor {
                    login: "al".to_string(),
                    contribution_count: 5,
                },
            ],
            sampled_commits: 14,
        };
        let text = stats_text(&stats);
        assert!(text.contains("last 14 commits"));
        assert!(text.contains(" 1. carol  9"));
        assert!(text.contains(" 2. al     5"));
    }

    #[test]
    fn stats_text_is_line_per_fact() {
        let stats = RepoStats {
            repository: repo(),
            stars: 7,
            forks: 2,
            watchers: 3,
            significant_users: vec![Contributor {
                login: "carol".to_string(),
                contribution_count: 9,
            }],
            sampled_commits: 9,
        };
        assert_eq!(
            stats_text(&stats),
            "Repository: acme/widget\n\
             Stars: 7, Watches: 3, Forks: 2\n\
             Significant contributors (last 9 commits):\n\
             \x20  1. carol  9\n"
        );
    }

    #[test]
    fn audience_text_reports_counts_and_rates() {
        let report = AudienceReport {
            repository: repo(),
            org_keyword: "acme".to_string(),
            sampled_users: 4,
            significant_users: 1,
            affiliated_users: 2,
            power_user_rate: 0.25,
            affiliated_rate: 0.5,
        };
        assert_eq!(
            audience_text(&report),
            "Total unique users (starred, watched, forked): 4\n\
             Number of unique significant users: 1\n\
             Number of unique users affiliated with \"acme\": 2\n\
             Power users rate: 0.25\n\
             Affiliated users rate: 0.50\n"
        );
    }

    #[test]
    fn json_is_wrapped() {
        let stats = RepoStats {
            repository: repo(),
            stars: 1,
            forks: 0,
            watchers: 0,
            significant_users: Vec::new(),
            sampled_commits: 0,
        };
        let value: serde_json::Value = serde_json::from_str(&to_json(&stats).unwrap()).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["data"]["stars"], 1);
        assert_eq!(value["data"]["repository"]["owner"], "acme");
        assert_eq!(value["data"]["significant_users"], serde_json::json!([]));
    }

    #[test]
    fn format_parses() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert!("yaml".parse::<Format>().is_err());
    }
}
