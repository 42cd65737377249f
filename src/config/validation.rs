//! Semantic validation of a parsed configuration.
//!
//! Collects every problem before failing, so an operator fixes the file
//! in one pass instead of replaying error-by-error.

use crate::error::ConfigError;

use super::schema::BotConfig;

/// Validates cross-field constraints that the schema cannot express.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] carrying all problems found,
/// semicolon-joined.
pub fn validate(config: &BotConfig) -> Result<(), ConfigError> {
    let mut problems = Vec::new();

    let c = &config.channels;
    let channels = [
        ("welcome", c.welcome),
        ("log", c.log),
        ("review", c.review),
        ("ticket_panel", c.ticket_panel),
        ("ticket_category", c.ticket_category),
        ("staff_apply", c.staff_apply),
        ("staff_results", c.staff_results),
        ("guess", c.guess),
    ];
    for (i, (name, id)) in channels.iter().enumerate() {
        for (other, other_id) in &channels[i + 1..] {
            if id == other_id {
                problems.push(format!("channels: {name} and {other} both point at {id}"));
            }
        }
    }

    let g = &config.giveaways;
    if g.min_duration_secs > g.max_duration_secs {
        problems.push(format!(
            "giveaways: min_duration_secs ({}) exceeds max_duration_secs ({})",
            g.min_duration_secs, g.max_duration_secs
        ));
    }
    if g.max_winners == 0 {
        problems.push("giveaways: max_winners must be at least 1".to_string());
    }
    if g.max_prize_chars == 0 {
        problems.push("giveaways: max_prize_chars must be at least 1".to_string());
    }

    let a = &config.applications;
    if a.questions.is_empty() {
        problems.push("applications: questions must not be empty".to_string());
    }
    if a.questions.iter().any(|q| q.trim().is_empty()) {
        problems.push("applications: questions must not be blank".to_string());
    }
    if a.answer_timeout_secs == 0 {
        problems.push("applications: answer_timeout_secs must be positive".to_string());
    }
    if a.reap_interval_secs == 0 {
        problems.push("applications: reap_interval_secs must be positive".to_string());
    }

    let game = &config.game;
    if game.min_bound < 2 {
        problems.push("game: min_bound must be at least 2".to_string());
    }
    if game.min_bound > game.max_bound {
        problems.push(format!(
            "game: min_bound ({}) exceeds max_bound ({})",
            game.min_bound, game.max_bound
        ));
    }

    if config.reviews.sites.iter().any(|s| s.trim().is_empty()) {
        problems.push("reviews: sites must not contain blank entries".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(problems.join("; ")))
    }
}
