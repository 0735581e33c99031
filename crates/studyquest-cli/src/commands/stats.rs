use chrono::Utc;
use serde::Serialize;
use studyquest_core::consistency::consistency_report;
use studyquest_core::storage::Stats;
use studyquest_core::{Config, ConsistencyReport, Database};

use super::resolve_user;

#[derive(Serialize)]
struct StatsView {
    user_id: String,
    #[serde(flatten)]
    stats: Stats,
    consistency: ConsistencyReport,
}

pub fn run(json: bool, user: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let user_id = resolve_user(user, &config);
    let db = Database::open()?;

    let stats = db.stats(&user_id, Utc::now())?;
    let consistency = consistency_report(&db.study_days(&user_id)?);
    let view = StatsView {
        user_id,
        stats,
        consistency,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        let stats = &view.stats;
        println!("User:          {}", view.user_id);
        println!(
            "Sessions:      {} ({} credited, {} rejected)",
            stats.total_sessions, stats.rewarded_sessions, stats.rejected_sessions
        );
        println!("Study time:    {}", format_secs(stats.total_study_secs));
        println!("Today:         {}", format_secs(stats.today_study_secs));
        println!("Experience:    {:.0}", stats.total_experience);
        println!(
            "Consistency:   {:.2} over {} study days",
            view.consistency.score, view.consistency.study_days
        );
    }
    Ok(())
}

fn format_secs(secs: u64) -> String {
    format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
