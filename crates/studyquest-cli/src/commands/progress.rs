use clap::Subcommand;
use serde::Serialize;
use studyquest_core::progression::{experience_required, total_experience_for_level};
use studyquest_core::{Config, Database, ProgressStore, Trophy, UserProgress};

use super::resolve_user;

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Show level, trophy and unlocked limits
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the experience curve for a range of levels
    Curve {
        #[arg(long, default_value = "1")]
        from: u32,
        #[arg(long, default_value = "10")]
        to: u32,
    },
}

#[derive(Serialize)]
struct ProgressView {
    user_id: String,
    level: u32,
    experience: f64,
    required: f64,
    progress_fraction: f64,
    trophy: Option<Trophy>,
    trophy_label: Option<String>,
    next_trophy_milestone: u32,
    post_character_limit: usize,
    daily_like_limit: u32,
}

impl ProgressView {
    fn new(user_id: String, progress: &UserProgress) -> Self {
        let trophy = progress.trophy();
        Self {
            user_id,
            level: progress.level,
            experience: progress.experience,
            required: progress.required(),
            progress_fraction: progress.progress_fraction(),
            trophy,
            trophy_label: trophy.map(|t| t.to_string()),
            next_trophy_milestone: progress.next_trophy_milestone(),
            post_character_limit: progress.post_character_limit(),
            daily_like_limit: progress.daily_like_limit(),
        }
    }
}

pub fn run(action: ProgressAction, user: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ProgressAction::Show { json } => {
            let config = Config::load()?;
            let user_id = resolve_user(user, &config);
            let db = Database::open()?;
            let progress = db.load_user_progress(&user_id)?;
            let view = ProgressView::new(user_id, &progress);

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("User:        {}", view.user_id);
                println!(
                    "Level:       {} ({:.0} / {:.0} XP, {:.0}%)",
                    view.level,
                    view.experience,
                    view.required,
                    view.progress_fraction * 100.0
                );
                println!("Trophy:      {}", view.trophy_label.as_deref().unwrap_or("-"));
                println!("Next trophy: level {}", view.next_trophy_milestone);
                println!("Post length: {} characters", view.post_character_limit);
                println!("Daily likes: {}", view.daily_like_limit);
            }
        }
        ProgressAction::Curve { from, to } => {
            if from == 0 || from > to {
                return Err(format!("invalid level range {from}..={to}").into());
            }
            println!("{:>8}  {:>14}  {:>16}", "level", "required", "total");
            for level in from..=to {
                println!(
                    "{:>8}  {:>14.1}  {:>16.1}",
                    level,
                    experience_required(level),
                    total_experience_for_level(level)
                );
            }
        }
    }
    Ok(())
}
