// tests/cli_run.rs

use assetflow::cli::CliArgs;
use assetflow::run;
use assetflow_test_utils::init_tracing;
use assetflow_test_utils::project::Project;

fn args(config: &std::path::Path, extra: &[&str]) -> CliArgs {
    use clap::Parser;
    let config = config.to_string_lossy().into_owned();
    let mut argv = vec!["assetflow", "--config", config.as_str()];
    argv.extend_from_slice(extra);
    CliArgs::try_parse_from(argv).unwrap()
}

#[tokio::test]
async fn once_runs_a_full_build() {
    init_tracing();
    let project = Project::new();
    project.write("index.html", "<p>\n  hi  </p>\n").write("robots.txt", "User-agent: *\n");
    let config = project.write_config(
        r#"
[[rule]]
sources = "*.txt"
targets = "meta/robots.txt"
"#,
    );

    run(args(&config, &["--once"])).await.unwrap();

    assert_eq!(project.read_target("index.html").unwrap(), "<p>hi</p>");
    assert_eq!(project.read_target("meta/robots.txt").unwrap(), "User-agent: *\n\n");
}

#[tokio::test]
async fn once_fails_when_a_file_fails() {
    init_tracing();
    let project = Project::new();
    project.write("site.less", "@import \"missing\";\n");
    let config = project.write_config("");

    assert!(run(args(&config, &["--once"])).await.is_err());
}

#[tokio::test]
async fn dry_run_processes_nothing() {
    init_tracing();
    let project = Project::new();
    project.write("index.html", "<p>hi</p>");
    let config = project.write_config("");

    run(args(&config, &["--dry-run"])).await.unwrap();

    assert!(!project.target("index.html").exists());
    assert!(!project.root().join(".assetflow").exists());
}
