//! Project generation through the scaffolder.

use nocode_playwright_lib::error::AppError;
use nocode_playwright_lib::models::{RawTestStep, TestCase, TestSuite};
use serde_json::{Map, json};

use super::mock_runner::exit;
use super::test_helpers::fixture;

/// (1) A page named "Login" becomes class `Login` with a `submit` accessor.
#[tokio::test]
async fn test_page_object_for_login_page() {
    let fx = fixture(exit(0, "", "")).await;
    let out = tempfile::tempdir().unwrap();

    let generated = fx
        .scaffolder()
        .generate_project(&[fx.suite.id], out.path(), &Map::new())
        .await
        .unwrap();

    let page_object = out.path().join("tests/pages/login_page.ts");
    assert!(generated.files.contains(&page_object));
    let code = std::fs::read_to_string(page_object).unwrap();
    assert!(code.contains("export class Login {"));
    assert!(code.contains("get submit(): Locator {"));
    assert!(code.contains("return this.page.locator(\"#submit\");"));
}

/// (2) A `type` step compiles to a fill call inside the suite's spec.
#[tokio::test]
async fn test_spec_contains_compiled_steps() {
    let fx = fixture(exit(0, "", "")).await;
    let out = tempfile::tempdir().unwrap();

    let generated = fx
        .scaffolder()
        .generate_project(&[fx.suite.id], out.path(), &Map::new())
        .await
        .unwrap();

    let spec = out.path().join("tests/sign_in.spec.ts");
    assert_eq!(generated.spec_files, vec![spec.clone()]);
    let code = std::fs::read_to_string(spec).unwrap();
    assert!(code.contains("await page.fill(\"#user\", \"alice\");"));
    assert!(code.contains("await page.click(\"#submit\");"));
    assert!(code.contains("await assertExpected(page, \"h1\", \"contains\", \"Welcome\");"));
    assert!(out.path().join("tests/helpers/assertions.ts").exists());
    assert!(out.path().join("playwright.config.ts").exists());
    assert!(out.path().join("package.json").exists());
}

/// (3) A relative output root is rejected before anything is written.
#[tokio::test]
async fn test_relative_output_root_rejected() {
    let fx = fixture(exit(0, "", "")).await;
    let relative = std::path::Path::new("relative/dir");

    let result = fx
        .scaffolder()
        .generate_project(&[fx.suite.id], relative, &Map::new())
        .await;

    assert!(matches!(result, Err(AppError::InvalidOutputPath(_))));
    assert!(!relative.exists());
}

/// (4) Same entities and configuration produce byte-identical files.
#[tokio::test]
async fn test_generation_is_deterministic() {
    let fx = fixture(exit(0, "", "")).await;
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let mut overrides = Map::new();
    overrides.insert("browsers".to_string(), json!(["firefox", "webkit"]));

    let a = fx
        .scaffolder()
        .generate_project(&[fx.suite.id], first.path(), &overrides)
        .await
        .unwrap();
    let b = fx
        .scaffolder()
        .generate_project(&[fx.suite.id], second.path(), &overrides)
        .await
        .unwrap();

    let relative = |root: &std::path::Path, paths: Vec<std::path::PathBuf>| {
        paths
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect::<Vec<_>>()
    };
    let a_paths = relative(first.path(), a.all_paths());
    let b_paths = relative(second.path(), b.all_paths());
    assert_eq!(a_paths, b_paths);

    for path in &a_paths {
        let left = std::fs::read(first.path().join(path)).unwrap();
        let right = std::fs::read(second.path().join(path)).unwrap();
        assert_eq!(left, right, "{} differs", path.display());
    }
}

/// (5) An unknown action fails the whole call and leaves the root empty.
#[tokio::test]
async fn test_unknown_action_writes_nothing() {
    let fx = fixture(exit(0, "", "")).await;
    let broken = TestSuite::new(
        fx.project.id,
        "Broken",
        vec![TestCase::new(
            "drags",
            vec![RawTestStep::new("drag", "#handle")],
        )],
    );
    fx.db.put_suite(broken.clone()).await;
    let out = tempfile::tempdir().unwrap();

    let result = fx
        .scaffolder()
        .generate_project(&[fx.suite.id, broken.id], out.path(), &Map::new())
        .await;

    assert!(matches!(result, Err(AppError::UnknownAction(_))));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}
