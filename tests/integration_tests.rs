//! Integration tests for l10n
//!
//! These tests drive the compiled binary against temporary projects.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create an l10n Command with no l10n settings leaking in from the environment
fn l10n() -> Command {
    let mut cmd = cargo_bin_cmd!("l10n");
    for key in ["L10N_RETRIES", "L10N_FAILURE_POLICY", "L10N_CHECK_CMD", "L10N_LOG"] {
        cmd.env_remove(key);
    }
    cmd
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Helper to create a project translating docs/*.md into es and de
fn create_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".l10n")).unwrap();
    write(
        dir.path(),
        "L10N.md",
        r#"+++
[llm]
translator_model = "gpt-test"

[[translate]]
source = "docs/*.md"
targets = ["es", "de"]
output = "i18n/{lang}/{relpath}"
+++
Product documentation for a build tool.
"#,
    );
    write(dir.path(), "docs/guide.md", "# Guide\n\nRun `make`.\n");
    dir
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_l10n_help() {
        l10n()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("translate"))
            .stdout(predicate::str::contains("status"));
    }

    #[test]
    fn test_l10n_version() {
        l10n().arg("--version").assert().success();
    }

    #[test]
    fn test_translate_help_lists_flags() {
        l10n()
            .args(["translate", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--force"))
            .stdout(predicate::str::contains("--keep-going"))
            .stdout(predicate::str::contains("--dry-run"));
    }

    #[test]
    fn test_no_sources_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".l10n")).unwrap();

        l10n()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("no sources found"));
    }
}

// =============================================================================
// Plan, Status and Check
// =============================================================================

mod inspection {
    use super::*;

    #[test]
    fn test_plan_lists_outputs() {
        let dir = create_project();

        l10n()
            .arg("--project-dir")
            .arg(dir.path())
            .arg("plan")
            .assert()
            .success()
            .stdout(predicate::str::contains("docs/guide.md"))
            .stdout(predicate::str::contains("i18n/es/guide.md"))
            .stdout(predicate::str::contains("via L10N.md"))
            .stdout(predicate::str::contains("1 sources, 2 outputs"));
    }

    #[test]
    fn test_status_reports_missing_outputs() {
        let dir = create_project();

        l10n()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .failure()
            .stdout(predicate::str::contains("missing"))
            .stderr(predicate::str::contains("translations out of date"));
    }

    #[test]
    fn test_check_missing_output_fails() {
        let dir = create_project();

        l10n()
            .current_dir(dir.path())
            .arg("check")
            .assert()
            .failure()
            .stderr(predicate::str::contains("missing output"));
    }

    #[test]
    fn test_check_detects_lost_inline_code() {
        let dir = create_project();
        write(dir.path(), "i18n/es/guide.md", "# Guía\n\nEjecuta make.\n");
        write(dir.path(), "i18n/de/guide.md", "# Anleitung\n\n`make` ausführen.\n");

        l10n()
            .current_dir(dir.path())
            .arg("check")
            .assert()
            .failure()
            .stderr(predicate::str::contains("preserve-check tool failed"));
    }

    #[test]
    fn test_invalid_descriptor_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "L10N.md", "+++\n[llm]\nprovider = \"openai\"\n");

        l10n()
            .arg("--project-dir")
            .arg(dir.path())
            .arg("plan")
            .assert()
            .failure()
            .stderr(predicate::str::contains("no closing +++"));
    }
}

// =============================================================================
// Init and Config
// =============================================================================

mod scaffolding {
    use super::*;

    #[test]
    fn test_init_creates_descriptor() {
        let dir = TempDir::new().unwrap();

        l10n()
            .current_dir(dir.path())
            .args(["init", "--targets", "es,fr"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created"));

        let content = fs::read_to_string(dir.path().join("L10N.md")).unwrap();
        assert!(content.contains("Target languages: Spanish (es), French (fr)."));
        assert!(content.contains(r#"targets = ["es", "fr"]"#));
        let gitattributes = fs::read_to_string(dir.path().join(".gitattributes")).unwrap();
        assert!(gitattributes.contains(".l10n/locks/** linguist-generated=true"));
    }

    #[test]
    fn test_init_refuses_existing_descriptor() {
        let dir = create_project();

        l10n()
            .current_dir(dir.path())
            .args(["init", "--targets", "es"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_init_requires_targets() {
        let dir = TempDir::new().unwrap();
        l10n().current_dir(dir.path()).arg("init").assert().failure();
    }

    #[test]
    fn test_config_init_and_validate() {
        let dir = create_project();

        l10n()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created config.toml"));
        assert!(dir.path().join(".l10n/config.toml").exists());

        l10n()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_config_show_reflects_env() {
        let dir = create_project();

        l10n()
            .current_dir(dir.path())
            .env("L10N_FAILURE_POLICY", "continue")
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("failure_policy = \"continue\""));
    }
}

// =============================================================================
// Clean
// =============================================================================

mod cleaning {
    use super::*;

    #[test]
    fn test_clean_removes_outputs() {
        let dir = create_project();
        write(dir.path(), "i18n/es/guide.md", "hola");

        l10n()
            .current_dir(dir.path())
            .args(["clean", "--dry-run"])
            .assert()
            .success();
        assert!(dir.path().join("i18n/es/guide.md").exists());

        l10n()
            .current_dir(dir.path())
            .arg("clean")
            .assert()
            .success()
            .stdout(predicate::str::contains("1 removed"));
        assert!(!dir.path().join("i18n/es/guide.md").exists());
    }
}

// =============================================================================
// Translate against a mock backend
// =============================================================================

mod translation {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn json_project(base_url: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".l10n")).unwrap();
        write(
            dir.path(),
            "L10N.md",
            &format!(
                r#"+++
[llm]
base_url = "{base_url}"
api_key = "test-key"
translator_model = "gpt-test"

[[translate]]
source = "strings/*.json"
targets = ["es"]
output = "i18n/{{lang}}/{{relpath}}"
+++
Short UI strings.
"#
            ),
        );
        write(dir.path(), "strings/app.json", "{\"greeting\": \"hello\"}\n");
        dir
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "choices": [
                { "message": { "role": "assistant", "content": content } }
            ]
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_translate_then_rerun_is_a_no_op() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("```json\n{\"greeting\": \"hola\"}\n```")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = json_project(&server.uri());

        l10n()
            .current_dir(dir.path())
            .arg("translate")
            .assert()
            .success()
            .stdout(predicate::str::contains("1 written"));

        let output = fs::read_to_string(dir.path().join("i18n/es/app.json")).unwrap();
        assert_eq!(output, "{\"greeting\": \"hola\"}");
        let lock =
            fs::read_to_string(dir.path().join(".l10n/locks/strings/app.json.lock")).unwrap();
        let lock: serde_json::Value = serde_json::from_str(&lock).unwrap();
        assert_eq!(lock["source_path"], "strings/app.json");
        assert_eq!(lock["outputs"]["es"]["path"], "i18n/es/app.json");

        l10n()
            .current_dir(dir.path())
            .arg("translate")
            .assert()
            .success()
            .stdout(predicate::str::contains("no translations needed"));

        l10n()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("1 ok"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_invalid_output_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{not json")))
            .expect(2)
            .mount(&server)
            .await;

        let dir = json_project(&server.uri());

        l10n()
            .current_dir(dir.path())
            .args(["translate", "--retries", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("syntax-validator tool failed"));
        assert!(!dir.path().join("i18n/es/app.json").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dry_run_makes_no_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let dir = json_project(&server.uri());

        l10n()
            .current_dir(dir.path())
            .args(["translate", "--dry-run"])
            .assert()
            .success()
            .stdout(predicate::str::contains("strings/app.json -> i18n/es/app.json (es)"));
    }
}
