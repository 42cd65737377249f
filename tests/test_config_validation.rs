//! End-to-end configuration loading through the public loader.

use std::io::Write;

use guildhall::config::load_config;
use guildhall::error::ConfigError;

const VALID: &str = r"
guild: 100
channels:
  welcome: 1
  log: 2
  review: 3
  ticket_panel: 4
  ticket_category: 5
  staff_apply: 6
  staff_results: 7
  guess: 8
permissions:
  admins: [900]
  staff: [901]
giveaways:
  max_winners: 10
applications:
  staff_role: 77
  questions:
    - Why do you want to join?
    - How active are you?
reviews:
  sites: [Trustpilot]
";

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn valid_file_loads_with_overrides_and_defaults() {
    let file = write_temp(VALID);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.giveaways.max_winners, 10);
    assert_eq!(config.giveaways.min_duration_secs, 10); // default
    assert_eq!(config.applications.questions.len(), 2);
    assert_eq!(config.permissions.staff.len(), 1);
    assert_eq!(config.reviews.sites, vec!["Trustpilot".to_string()]);
}

#[test]
fn semantic_problems_are_collected() {
    let broken = VALID
        .replace("  max_winners: 10", "  max_winners: 0\n  min_duration_secs: 900\n  max_duration_secs: 30")
        .replace(
            "  questions:\n    - Why do you want to join?\n    - How active are you?",
            "  questions: []",
        );
    let file = write_temp(&broken);

    let err = load_config(file.path()).unwrap_err();
    let ConfigError::Invalid(message) = err else {
        panic!("expected Invalid, got {err}");
    };
    assert!(message.contains("max_winners"));
    assert!(message.contains("min_duration_secs"));
    assert!(message.contains("questions"));
}

#[test]
fn unknown_keys_are_a_parse_error() {
    let file = write_temp(&format!("{VALID}\nextra_key: 1\n"));
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
