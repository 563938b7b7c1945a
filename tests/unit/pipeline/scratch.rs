use super::*;
use std::collections::HashSet;

#[test]
fn create_makes_nested_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("a").join("b");
    let scratch = ScratchDir::create(&root).unwrap();
    assert!(root.is_dir());
    assert_eq!(scratch.root(), root.as_path());
}

#[test]
fn unique_paths_never_repeat() {
    let tmp = tempfile::tempdir().unwrap();
    let scratch = ScratchDir::create(tmp.path()).unwrap();
    let paths: HashSet<PathBuf> = (0..256)
        .map(|_| scratch.unique_path("compiled", "mp4"))
        .collect();
    assert_eq!(paths.len(), 256);

    let p = scratch.unique_path("compiled", "mp4");
    assert_eq!(p.parent(), Some(tmp.path()));
    assert_eq!(p.extension().and_then(|e| e.to_str()), Some("mp4"));
    let name = p.file_name().and_then(|n| n.to_str()).unwrap();
    assert!(name.starts_with("compiled-"));
    assert!(!p.exists());
}

#[test]
fn discard_removes_file_and_tolerates_missing() {
    let tmp = tempfile::tempdir().unwrap();
    let scratch = ScratchDir::create(tmp.path()).unwrap();
    let p = scratch.unique_path("compiled", "mp4");
    std::fs::write(&p, b"x").unwrap();

    scratch.discard(&p);
    assert!(!p.exists());
    scratch.discard(&p);
}

#[test]
fn create_fails_when_root_is_a_file() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("occupied");
    std::fs::write(&file, b"x").unwrap();
    assert!(matches!(
        ScratchDir::create(&file),
        Err(CompileError::Other(_))
    ));
}
