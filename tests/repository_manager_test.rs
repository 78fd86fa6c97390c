//! Tests for the repository_manager module
//!
//! Repository names come straight from URL path parameters, so the manager
//! must never resolve them outside its root.

mod test_helpers;

use refgate::git::repository_manager::{
    open_local_repository, validate_segment, RepositoryError, RepositoryLocation,
};
use refgate::git::RepositoryManager;
use url::Url;

use test_helpers::{Fixture, API_BASE_URL};

#[test]
fn test_manager_requires_existing_root() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temporary directory");
    let missing = temp_dir.path().join("missing");

    let result = RepositoryManager::new(missing, Url::parse(API_BASE_URL).unwrap());
    assert!(matches!(result, Err(RepositoryError::InvalidPath(_))));
}

/// Opens `{owner}/{repo}.git` and renders its API URL
#[test]
fn test_open_by_name() {
    let fixture = Fixture::new();
    let handle = fixture.handle();

    assert_eq!(handle.full_name, "alice/demo");
    assert_eq!(handle.api_url, "http://localhost:3000/api/v1/repos/alice/demo");
}

/// A repository directory without the `.git` suffix is found too
#[test]
fn test_open_without_git_suffix() {
    let fixture = Fixture::new();
    let plain = fixture.root.path().join("alice").join("plain");
    std::fs::create_dir_all(&plain).unwrap();
    test_helpers::git(&plain, &["init", "--bare", "--quiet"]);

    let handle = fixture.manager().open_by_name("alice", "plain");
    assert!(handle.is_ok(), "got {:?}", handle);
}

#[test]
fn test_unknown_repository() {
    let fixture = Fixture::new();
    let manager = fixture.manager();

    assert!(matches!(
        manager.open_by_name("alice", "missing"),
        Err(RepositoryError::NotFound(_))
    ));
    assert!(matches!(
        manager.open_by_name("bob", "demo"),
        Err(RepositoryError::NotFound(_))
    ));

    // A plain directory is not a repository
    std::fs::create_dir_all(fixture.root.path().join("alice").join("notes")).unwrap();
    assert!(matches!(
        manager.open_by_name("alice", "notes"),
        Err(RepositoryError::NotFound(_))
    ));
}

/// Path segments that would escape the root are rejected before touching the disk
#[test]
fn test_traversal_attempts_are_rejected() {
    let fixture = Fixture::new();
    let manager = fixture.manager();

    let attempts = [
        ("..", "demo"),
        ("alice", ".."),
        (".", "demo"),
        ("alice/..", "demo"),
        ("alice", "demo/../../etc"),
        ("alice", "..\\demo"),
        ("", "demo"),
        ("alice", ""),
        ("-alice", "demo"),
        ("alice", "demo\0"),
    ];

    for (owner, repo) in attempts {
        assert!(
            matches!(
                manager.open_by_name(owner, repo),
                Err(RepositoryError::InvalidPath(_))
            ),
            "{:?}/{:?} should be rejected",
            owner,
            repo
        );
    }
}

#[test]
fn test_segment_validation() {
    for valid in ["alice", "demo.git", "my-repo", "repo_1", "a.b"] {
        assert!(validate_segment(valid).is_ok(), "{} should be accepted", valid);
    }
    for invalid in ["", ".", "..", "a/b", "a\\b", "-x", "tab\there"] {
        assert!(validate_segment(invalid).is_err(), "{:?} should be rejected", invalid);
    }
}

#[test]
fn test_repository_location_parsing() {
    let location: RepositoryLocation = "alice/demo".parse().unwrap();
    assert_eq!(location.owner, "alice");
    assert_eq!(location.repo, "demo");
    assert_eq!(location.to_string(), "alice/demo");

    assert!("alice".parse::<RepositoryLocation>().is_err());
    assert!("alice/demo/extra".parse::<RepositoryLocation>().is_err());
    assert!("../demo".parse::<RepositoryLocation>().is_err());
}

/// URL path segments are escaped in rendered URLs
#[test]
fn test_api_url_escaping() {
    let fixture = Fixture::new();
    let manager = fixture.manager();
    let location = RepositoryLocation::new("alice", "my repo").unwrap();

    assert_eq!(
        manager.repository_api_url(&location),
        "http://localhost:3000/api/v1/repos/alice/my%20repo"
    );
}

#[test]
fn test_open_local_repository() {
    let fixture = Fixture::new();

    let handle = open_local_repository(
        fixture.repo_path.clone(),
        "local/demo",
        "http://localhost:3000/api/v1/repos/local/demo/",
        None,
    )
    .expect("Failed to open local repository");
    assert_eq!(handle.api_url, "http://localhost:3000/api/v1/repos/local/demo");

    let temp_dir = tempfile::tempdir().unwrap();
    let result = open_local_repository(temp_dir.path().to_path_buf(), "x/y", API_BASE_URL, None);
    assert!(matches!(result, Err(RepositoryError::InvalidPath(_))));
}
