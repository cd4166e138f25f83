// tests/config_loading.rs

mod common;
use crate::common::*;

use std::path::Path;

use buildflow::cli::CliArgs;
use buildflow::config::{load_and_validate, load_from_path};
use buildflow::errors::BuildflowError;
use buildflow::types::SequencePolicy;
use clap::Parser;

const SAMPLE: &str = r#"
[config]
sequence_policy = "fail_fast"
output_root = "dist"

[task.clean]
clean = "dist"

[task.clear-cache]
clear_cache = true

[task.styles]
cmd = "sass app/scss:app/css"
outputs = ["app/css"]
error_pattern = "(?i)error"

[task.lint]
cmd = "eslint app/js"

[task.bundle]
cmd = "esbuild app/js/main.js --bundle --minify --outdir=dist/js"
outputs = ["dist/js"]
env = { NODE_ENV = "production" }

[task.images]
cmd = "imagemin app/images --out-dir=dist/images"
inputs = ["app/images/**/*.{png,jpg,gif,svg}"]
outputs = ["dist/images"]
cache = true

[task.fonts]
copy = { from = "app/fonts", include = ["**/*"], to = "dist/fonts" }

[task.serve]
cmd = "browser-sync start --server app --files app"

[task.styles-then-bundle]
sequence = ["styles", "bundle"]

[task.assets]
parallel = ["lint", "images", "fonts", "styles-then-bundle"]

[task.build]
sequence = ["clean", "assets"]

[[watch]]
patterns = ["app/scss/**/*.scss"]
task = "styles"

[[watch]]
patterns = ["app/js/**/*.js"]
exclude = ["app/js/vendor/**"]
task = "lint"

[dev]
serve = "serve"
startup = ["styles", "lint"]
"#;

fn write_config(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("Buildflow.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn sample_config_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), SAMPLE);

    let cfg = load_and_validate(&path).unwrap();

    assert_eq!(cfg.config.sequence_policy, SequencePolicy::FailFast);
    assert_eq!(cfg.task.len(), 12);
    assert_eq!(cfg.watch.len(), 2);
    assert_eq!(cfg.watch[1].exclude, vec!["app/js/vendor/**"]);
    assert_eq!(cfg.dev.serve.as_deref(), Some("serve"));
    assert_eq!(cfg.dev.startup, vec!["styles", "lint"]);
    assert_eq!(cfg.task["bundle"].env["NODE_ENV"], "production");
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, BuildflowError::IoError(_)));
}

#[test]
fn malformed_toml_is_toml_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[task.styles\ncmd = ");
    assert!(matches!(
        load_from_path(&path).unwrap_err(),
        BuildflowError::TomlError(_)
    ));
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
        [task.styles]
        cmd = "sass"
        after = ["lint"]
        "#,
    );
    assert!(matches!(
        load_from_path(&path).unwrap_err(),
        BuildflowError::TomlError(_)
    ));
}

#[test]
fn invalid_sequence_policy_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
        [config]
        sequence_policy = "sometimes"

        [task.styles]
        cmd = "sass"
        "#,
    );
    assert!(load_and_validate(&path).is_err());
}

#[test]
fn dev_section_must_name_known_tasks() {
    let err = ConfigFileBuilder::new()
        .with_task("styles", TaskConfigBuilder::cmd("sass").build())
        .with_serve("serve")
        .try_build()
        .unwrap_err();
    assert!(matches!(err, BuildflowError::UnknownTask(ref t) if t.contains("serve")));
}

#[test]
fn builder_rejects_cycle_through_config() {
    let err = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::sequence(&["b"]).build())
        .with_task("b", TaskConfigBuilder::parallel(&["c"]).build())
        .with_task("c", TaskConfigBuilder::sequence(&["a"]).build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, BuildflowError::Cycle(_)));
}

#[tokio::test]
async fn clean_of_the_project_root_is_refused_before_running() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("app/scss")).unwrap();
    std::fs::write(dir.path().join("app/scss/main.scss"), b"body {}").unwrap();
    let path = write_config(
        dir.path(),
        r#"
        [task.clean]
        clean = "."
        "#,
    );

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, BuildflowError::ConfigError(_)), "{err}");

    let args =
        CliArgs::try_parse_from(["buildflow", "--config", path.to_str().unwrap(), "clean"])
            .unwrap();
    assert!(buildflow::run(args).await.is_err());
    assert!(dir.path().join("app/scss/main.scss").is_file());
}

#[tokio::test]
async fn dry_run_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("dist")).unwrap();
    let path = write_config(dir.path(), SAMPLE);

    let args = CliArgs::try_parse_from([
        "buildflow",
        "--config",
        path.to_str().unwrap(),
        "--dry-run",
        "clean",
    ])
    .unwrap();

    assert_eq!(buildflow::run(args).await.unwrap(), 0);
    assert!(dir.path().join("dist").exists());
}

#[tokio::test]
async fn run_reports_unknown_task_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), SAMPLE);

    let args = CliArgs::try_parse_from([
        "buildflow",
        "--config",
        path.to_str().unwrap(),
        "run",
        "deploy",
    ])
    .unwrap();

    let err = buildflow::run(args).await.unwrap_err();
    assert!(err.to_string().contains("deploy"), "{err}");
}

#[tokio::test]
async fn dry_run_of_unknown_task_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), SAMPLE);

    let args = CliArgs::try_parse_from([
        "buildflow",
        "--config",
        path.to_str().unwrap(),
        "--dry-run",
        "run",
        "deploy",
    ])
    .unwrap();

    let err = buildflow::run(args).await.unwrap_err();
    assert!(err.to_string().contains("Unknown task: deploy"), "{err}");
}

#[cfg(unix)]
#[tokio::test]
async fn cli_exit_codes_follow_the_signal() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
        [task.ok]
        cmd = "true"

        [task.broken]
        cmd = "echo 'lint: 1 problem' >&2; exit 1"

        [task.clean]
        clean = "dist"

        [task.build]
        parallel = ["ok", "broken"]
        "#,
    );
    std::fs::create_dir_all(dir.path().join("dist")).unwrap();

    let run = |sub: &'static str| {
        let args = CliArgs::try_parse_from(["buildflow", "--config", path.to_str().unwrap(), sub])
            .unwrap();
        buildflow::run(args)
    };

    assert_eq!(run("clean").await.unwrap(), 0);
    assert!(!dir.path().join("dist").exists());
    assert_eq!(run("build").await.unwrap(), 1);
}
