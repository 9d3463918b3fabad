use std::env;
use std::sync::{Mutex, OnceLock};

use intake_cli::commands::{config, doctor, migrate, seed, start};
use serde_json::Value;

const VALID_ENV: &[(&str, &str)] = &[
    ("INTAKE_WHATSAPP_ACCESS_TOKEN", "EAAGm0PX4ZCpsBAKZCqX"),
    ("INTAKE_WHATSAPP_PHONE_NUMBER_ID", "109876543210"),
    ("INTAKE_WHATSAPP_VERIFY_TOKEN", "verify-me"),
    ("INTAKE_DATABASE_URL", "sqlite::memory:"),
];

#[test]
fn start_returns_success_with_valid_env() {
    with_env(VALID_ENV, || {
        let result = start::run();
        assert_eq!(result.exit_code, 0, "expected successful start preflight: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "start");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("graph.facebook.com/v18.0/109876543210/messages"));
    });
}

#[test]
fn start_returns_config_failure_without_credentials() {
    with_env(&[], || {
        let result = start::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "start");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(VALID_ENV, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_reports_connectivity_failure() {
    let mut vars = VALID_ENV.to_vec();
    vars.retain(|(key, _)| *key != "INTAKE_DATABASE_URL");
    vars.push(("INTAKE_DATABASE_URL", "sqlite:///nonexistent-dir/intake.db"));
    vars.push(("INTAKE_DATABASE_TIMEOUT_SECS", "2"));

    with_env(&vars, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "db_connectivity");
    });
}

#[test]
fn seed_creates_every_demo_listing() {
    with_env(VALID_ENV, || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.starts_with("demo listings: 6 created, 0 already present"));
        assert!(message.contains("47237"));
    });
}

#[test]
fn seed_into_shared_file_is_idempotent() {
    let directory = env::temp_dir().join(format!("intake-seed-{}", std::process::id()));
    std::fs::create_dir_all(&directory).expect("temp dir");
    let url = format!("sqlite://{}/intake.db?mode=rwc", directory.display());

    let mut vars = VALID_ENV.to_vec();
    vars.retain(|(key, _)| *key != "INTAKE_DATABASE_URL");
    vars.push(("INTAKE_DATABASE_URL", url.as_str()));

    with_env(&vars, || {
        let first = parse_payload(&seed::run().output);
        let second = parse_payload(&seed::run().output);

        assert_eq!(first["status"], "ok");
        assert_eq!(second["status"], "ok");
        let message = second["message"].as_str().unwrap_or_default();
        assert!(message.starts_with("demo listings: 0 created, 6 already present"), "{message}");
    });

    let _ = std::fs::remove_dir_all(directory);
}

#[test]
fn config_redacts_secrets_and_attributes_env_sources() {
    with_env(VALID_ENV, || {
        let output = config::run();

        assert!(output.contains("- whatsapp.access_token = EAAG*** (source: env (INTAKE_WHATSAPP_ACCESS_TOKEN))"));
        assert!(output.contains("- whatsapp.verify_token = <redacted>"));
        assert!(!output.contains("EAAGm0PX4ZCpsBAKZCqX"));
        assert!(output.contains("- server.port = 8080 (source: default)"));
    });
}

#[test]
fn doctor_json_reports_skipped_checks_without_config() {
    with_env(&[], || {
        let report: Value = serde_json::from_str(&doctor::run(true)).expect("doctor json");

        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][0]["name"], "config_validation");
        assert_eq!(report["checks"][0]["status"], "fail");
        assert_eq!(report["checks"][1]["status"], "skipped");
    });
}

#[test]
fn doctor_passes_with_valid_env() {
    with_env(VALID_ENV, || {
        let report: Value = serde_json::from_str(&doctor::run(true)).expect("doctor json");

        assert_eq!(report["overall_status"], "pass", "{report}");
        assert_eq!(report["checks"].as_array().map(Vec::len), Some(5));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "INTAKE_DATABASE_URL",
        "INTAKE_DATABASE_MAX_CONNECTIONS",
        "INTAKE_DATABASE_TIMEOUT_SECS",
        "INTAKE_WHATSAPP_ACCESS_TOKEN",
        "INTAKE_WHATSAPP_PHONE_NUMBER_ID",
        "INTAKE_WHATSAPP_VERIFY_TOKEN",
        "INTAKE_WHATSAPP_APP_SECRET",
        "INTAKE_WHATSAPP_API_BASE_URL",
        "INTAKE_WHATSAPP_API_VERSION",
        "INTAKE_LLM_PROVIDER",
        "INTAKE_LLM_API_KEY",
        "INTAKE_LLM_BASE_URL",
        "INTAKE_LLM_MODEL",
        "INTAKE_LLM_TIMEOUT_SECS",
        "INTAKE_SERVER_BIND_ADDRESS",
        "INTAKE_SERVER_PORT",
        "INTAKE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "INTAKE_SERVER_MEDIA_ROOT",
        "INTAKE_AUTOMATION_ENABLED",
        "INTAKE_AUTOMATION_WEBHOOK_URL",
        "INTAKE_LOGGING_LEVEL",
        "INTAKE_LOGGING_FORMAT",
        "INTAKE_LOG_LEVEL",
        "INTAKE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
