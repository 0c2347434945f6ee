// tests/config_loading.rs
//
// Config discovery: env-selected paths, missing-file fallbacks, threshold
// overrides and the shipped config files. Env-mutating tests run serially.

use std::{env, fs};

use politicview::config::llm::LlmConfig;
use politicview::config::Settings;

const ENV_KEYS: &[&str] = &[
    "PIPELINE_CONFIG_PATH",
    "RANK_MIN_SCORE_STRICT",
    "RANK_MIN_SCORE_LENIENT",
    "LLM_CONFIG_PATH",
];

fn clear_env() {
    for k in ENV_KEYS {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn missing_files_fall_back_to_defaults() {
    clear_env();
    let tmp = tempfile::tempdir().unwrap();
    env::set_var("PIPELINE_CONFIG_PATH", tmp.path().join("nope.toml"));
    env::set_var("LLM_CONFIG_PATH", tmp.path().join("nope.json"));

    let s = Settings::load().unwrap();
    assert_eq!(s.registry.len(), 4);
    assert_eq!(s.thresholds.strict, 40);
    assert_eq!(s.thresholds.lenient, 30);

    let llm = LlmConfig::load().unwrap();
    assert!(!llm.enabled);
    clear_env();
}

#[serial_test::serial]
#[test]
fn env_path_and_threshold_overrides() {
    clear_env();
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("pipeline.toml");
    fs::write(
        &p,
        r#"
[thresholds]
strict = 60
lenient = 20

[[parties]]
id = "NTK"
primary = ["ntk", "naam tamilar"]
leaders = ["seeman"]
"#,
    )
    .unwrap();
    env::set_var("PIPELINE_CONFIG_PATH", &p);
    env::set_var("RANK_MIN_SCORE_STRICT", "75");
    env::set_var("RANK_MIN_SCORE_LENIENT", "not-a-number");

    let s = Settings::load().unwrap();
    assert_eq!(s.registry.ids(), vec!["NTK"]);
    assert_eq!(s.thresholds.strict, 75);
    assert_eq!(s.thresholds.lenient, 20);
    clear_env();
}

#[serial_test::serial]
#[test]
fn malformed_files_are_errors() {
    clear_env();
    let tmp = tempfile::tempdir().unwrap();
    let toml = tmp.path().join("pipeline.toml");
    fs::write(&toml, "[scoring]\nprimary = \"lots\"").unwrap();
    env::set_var("PIPELINE_CONFIG_PATH", &toml);
    assert!(Settings::load().is_err());

    let json = tmp.path().join("llm.json");
    fs::write(&json, "{ not json").unwrap();
    env::set_var("LLM_CONFIG_PATH", &json);
    assert!(LlmConfig::load().is_err());
    clear_env();
}

#[test]
fn shipped_pipeline_config_matches_builtin_registry() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/pipeline.toml");
    let content = fs::read_to_string(path).unwrap();
    let s = Settings::from_toml_str(&content).unwrap();
    let builtin = Settings::default();
    assert_eq!(s.registry.ids(), builtin.registry.ids());
    for id in s.registry.ids() {
        assert_eq!(s.registry.lookup(id), builtin.registry.lookup(id), "{id}");
    }
    assert_eq!(s.weights, builtin.weights);
    assert_eq!(s.thresholds, builtin.thresholds);
    assert_eq!(s.region, builtin.region);
}

#[test]
fn shipped_llm_config_parses() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/llm.json");
    let cfg = LlmConfig::load_from_file(path).unwrap();
    assert_eq!(cfg.provider, "ollama");
    assert_eq!(cfg.model, None);
}
