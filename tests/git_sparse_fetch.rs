//! Sparse single-file fetches against a real `git` binary.
//!
//! A throwaway bare-style origin is created next to the test's scratch space
//! and addressed as `<dir>/origin.git#<branch>:<path>`. These tests need
//! `git` on `PATH` and only run with `--features integration-tests`.

use std::path::Path;
use std::process::Command;

use hostprov::exit_codes;
use hostprov::git::{GitAuth, GitCli, GitOperations};
use hostprov::resolver::{Credentials, SourceResolver};
use hostprov::Error;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(["-c", "user.name=hostprov", "-c", "user.email=ops@example.com"])
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed", args);
}

/// An origin with `compose/prod.yml` and `README.md` on `main`, and an
/// extra file on `staging`.
fn origin(temp: &TempDir) -> String {
    let repo = temp.path().join("origin.git");
    std::fs::create_dir_all(repo.join("compose")).unwrap();
    git(&repo, &["init", "-q"]);
    git(&repo, &["checkout", "-q", "-b", "main"]);
    std::fs::write(repo.join("compose/prod.yml"), "services: {}\n").unwrap();
    std::fs::write(repo.join("README.md"), "# stack\n").unwrap();
    std::fs::write(repo.join("empty.txt"), "").unwrap();
    git(&repo, &["add", "."]);
    git(&repo, &["commit", "-q", "-m", "initial"]);
    git(&repo, &["checkout", "-q", "-b", "staging"]);
    std::fs::write(repo.join("compose/staging.yml"), "services: {x: {}}\n").unwrap();
    git(&repo, &["add", "."]);
    git(&repo, &["commit", "-q", "-m", "staging"]);
    git(&repo, &["checkout", "-q", "main"]);
    repo.display().to_string()
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_fetches_single_file() {
    let temp = TempDir::new().unwrap();
    let repo = origin(&temp);
    let dest = temp.path().join("out/prod.yml");

    let bytes = GitCli
        .fetch_file(&repo, "main", "compose/prod.yml", &GitAuth::default(), &dest)
        .unwrap();

    assert_eq!(bytes, 13);
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "services: {}\n");
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_fetches_from_named_branch() {
    let temp = TempDir::new().unwrap();
    let repo = origin(&temp);
    let resolver = SourceResolver::new(Credentials::default()).unwrap();

    let result = resolver
        .fetch_into_dir(&format!("{}#staging:compose/staging.yml", repo), temp.path())
        .unwrap();

    assert_eq!(result.path, temp.path().join("staging.yml"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_missing_file_in_repository() {
    let temp = TempDir::new().unwrap();
    let repo = origin(&temp);

    let err = GitCli
        .fetch_file(
            &repo,
            "main",
            "compose/staging.yml",
            &GitAuth::default(),
            &temp.path().join("staging.yml"),
        )
        .unwrap_err();

    assert!(matches!(err, Error::MissingRepoFile { .. }));
    assert_eq!(err.exit_code(), exit_codes::MISSING_REPO_FILE);
    assert!(!temp.path().join("staging.yml").exists());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_empty_file_counts_as_missing() {
    let temp = TempDir::new().unwrap();
    let repo = origin(&temp);

    let err = GitCli
        .fetch_file(
            &repo,
            "main",
            "empty.txt",
            &GitAuth::default(),
            &temp.path().join("empty.txt"),
        )
        .unwrap_err();

    assert_eq!(err.exit_code(), exit_codes::MISSING_REPO_FILE);
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_unknown_branch() {
    let temp = TempDir::new().unwrap();
    let repo = origin(&temp);

    let err = GitCli
        .fetch_file(
            &repo,
            "release",
            "compose/prod.yml",
            &GitAuth::default(),
            &temp.path().join("prod.yml"),
        )
        .unwrap_err();

    assert!(err.to_string().contains("release"));
}
