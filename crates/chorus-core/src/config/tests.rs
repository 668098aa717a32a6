use super::*;

#[test]
fn test_defaults_when_file_missing() {
    let cfg = load("/nonexistent/__chorus_config__.toml").unwrap();
    assert_eq!(cfg.chorus.human_label, "You");
    assert_eq!(cfg.scheduler.context_capacity, 50);
    assert_eq!(cfg.scheduler.human_priority, 1000);
    assert_eq!(cfg.delay.mention_floor_ms, 400);
    assert!((cfg.delay.mention_discount - 0.35).abs() < f64::EPSILON);
    assert_eq!(cfg.delay.catch_up_scale_ms, 1500);
    assert_eq!(cfg.autonomous.retry_interval_secs, 30);
    assert_eq!(cfg.autonomous.silence_timeout_secs, 120);
    assert!(cfg.participants.is_empty());
}

#[test]
fn test_parse_participants() {
    let toml_str = r#"
        [chorus]
        human_label = "Ada"
        seed = 7

        [scheduler]
        sleep_threshold = 4

        [[participants]]
        id = "p1"
        alias = "claude"
        display_name = "Claude Sonnet"
        emoji = "🤖"
        provider = "ollama"

        [[participants]]
        id = "p2"
        alias = "gpt"
        active = false
        lines = ["hello", "indeed"]
    "#;
    let cfg = parse(toml_str).unwrap();
    assert_eq!(cfg.chorus.human_label, "Ada");
    assert_eq!(cfg.chorus.seed, Some(7));
    assert_eq!(cfg.scheduler.sleep_threshold, 4);
    assert_eq!(cfg.participants.len(), 2);
    assert_eq!(cfg.participants[0].provider, "ollama");
    assert_eq!(
        cfg.participants[0].display_name.as_deref(),
        Some("Claude Sonnet")
    );
    assert!(cfg.participants[0].active, "active defaults to true");
    assert!(!cfg.participants[1].active);
    assert_eq!(cfg.participants[1].provider, "scripted");
    assert_eq!(cfg.participants[1].lines.len(), 2);
}

#[test]
fn test_parse_invalid_toml_is_config_error() {
    let err = parse("[scheduler\ncontext_capacity = ").unwrap_err();
    assert!(matches!(err, ChorusError::Config(_)));
}

#[test]
fn test_delay_minimums_raised_to_mention_floor() {
    let toml_str = r#"
        [delay]
        human_min_ms = 100
        human_max_ms = 50
        mention_floor_ms = 400
    "#;
    let cfg = parse(toml_str).unwrap();
    assert_eq!(cfg.delay.human_min_ms, 400);
    assert_eq!(cfg.delay.human_max_ms, 400);
}

#[test]
fn test_bad_mention_discount_falls_back() {
    let delay = DelayConfig {
        mention_discount: 1.5,
        ..Default::default()
    }
    .validated();
    assert!((delay.mention_discount - 0.35).abs() < f64::EPSILON);

    let delay = DelayConfig {
        mention_discount: f64::NAN,
        ..Default::default()
    }
    .validated();
    assert!((delay.mention_discount - 0.35).abs() < f64::EPSILON);
}

#[test]
fn test_zero_sizes_are_clamped() {
    let toml_str = r#"
        [scheduler]
        context_capacity = 0
        max_queue_len = 0
        sleep_threshold = 0

        [autonomous]
        min_delay_secs = 30
        max_delay_secs = 10
    "#;
    let cfg = parse(toml_str).unwrap();
    assert_eq!(cfg.scheduler.context_capacity, 1);
    assert_eq!(cfg.scheduler.max_queue_len, 1);
    assert_eq!(cfg.scheduler.sleep_threshold, 1);
    assert_eq!(cfg.autonomous.max_delay_secs, 30);
}

#[test]
fn test_provider_sections() {
    let toml_str = r#"
        [provider.ollama]
        model = "mistral"

        [provider.openai]
        base_url = "https://openrouter.ai/api/v1"
        api_key = "sk-test"
    "#;
    let cfg = parse(toml_str).unwrap();
    let ollama = cfg.provider.ollama.unwrap();
    assert_eq!(ollama.model, "mistral");
    assert_eq!(ollama.base_url, "http://localhost:11434");
    let openai = cfg.provider.openai.unwrap();
    assert_eq!(openai.api_key, "sk-test");
    assert_eq!(openai.model, "gpt-4o-mini");
}
