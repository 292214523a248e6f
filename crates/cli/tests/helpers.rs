use std::fs;
use std::path::Path;

use name_weaver::{
    canonicalize_or_current, hash_inputs, infer_project_name, resolve_against, sha256_bytes,
    sha256_file,
};
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_returns_cwd_for_dot() {
    let result = canonicalize_or_current(".").expect("canonicalize");
    assert_eq!(result, std::env::current_dir().expect("cwd"));
}

#[test]
fn canonicalize_or_current_resolves_existing_path() {
    let tmp = tempdir().expect("tempdir");
    let subdir = tmp.path().join("nested");
    fs::create_dir_all(&subdir).expect("create nested");

    let result = canonicalize_or_current(subdir.to_str().unwrap()).expect("canonicalize nested");
    assert_eq!(result, subdir.canonicalize().expect("canonicalize subdir"));
}

#[test]
fn canonicalize_or_current_joins_missing_relative_path() {
    let result = canonicalize_or_current("does-not-exist-yet").expect("fallback");
    assert!(result.is_absolute());
    assert!(result.ends_with("does-not-exist-yet"));
}

#[test]
fn infer_project_name_uses_last_path_component() {
    assert_eq!(infer_project_name(Path::new("/tmp/renaming-study")), "renaming-study");
}

#[test]
fn infer_project_name_falls_back_when_missing() {
    assert_eq!(infer_project_name(Path::new("/")), "unnamed-project");
}

#[test]
fn resolve_against_keeps_absolute_paths() {
    let root = Path::new("/work/project");
    assert_eq!(resolve_against(root, "data/preds.jsonl"), root.join("data/preds.jsonl"));
    let tmp = tempdir().expect("tempdir");
    let abs = tmp.path().join("x.jsonl");
    assert_eq!(resolve_against(root, abs.to_str().unwrap()), abs);
}

#[test]
fn sha256_helpers_agree() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("abc.txt");
    fs::write(&path, "abc").expect("write");

    let expected = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
    assert_eq!(sha256_bytes(b"abc"), expected);
    assert_eq!(sha256_file(&path).expect("hash file"), expected);
}

#[test]
fn hash_inputs_changes_when_a_file_changes_or_appears() {
    let tmp = tempdir().expect("tempdir");
    let a = tmp.path().join("a.jsonl");
    let b = tmp.path().join("b.jsonl");
    fs::write(&a, "{}\n").expect("write a");

    let before = hash_inputs(&[&a, &b]).expect("hash");
    assert_eq!(before, hash_inputs(&[&a, &b]).expect("hash again"));

    fs::write(&b, "{}\n").expect("write b");
    let with_b = hash_inputs(&[&a, &b]).expect("hash with b");
    assert_ne!(before, with_b);

    fs::write(&a, "{\"x\":1}\n").expect("rewrite a");
    assert_ne!(with_b, hash_inputs(&[&a, &b]).expect("hash rewritten"));
}
