use bagit::checksum::hash_file;
use bagit::{
    check_complete, check_valid, is_complete, is_valid, Algorithm, BagError, BagOptions, Bagger,
    Config, Manifest, Violation,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn sample_directory() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("a.txt"), b"hello").expect("write a.txt");
    fs::create_dir(dir.path().join("sub")).expect("mkdir sub");
    fs::write(dir.path().join("sub/b.txt"), b"world").expect("write b.txt");
    dir
}

fn bag(dir: &Path, algorithm: Algorithm) {
    Bagger::new(BagOptions {
        algorithm,
        ..BagOptions::default()
    })
    .bag_in_place(dir)
    .expect("bag in place");
}

#[test]
fn example_scenario() {
    let dir = sample_directory();
    let root = dir.path();
    bag(root, Algorithm::Md5);

    assert!(root.join("data/a.txt").is_file());
    assert!(root.join("data/sub/b.txt").is_file());

    let bagit_txt = fs::read_to_string(root.join("bagit.txt")).unwrap();
    assert_eq!(
        bagit_txt.lines().collect::<Vec<_>>(),
        vec!["BagIt-Version: 0.97", "Tag-File-Character-Encoding: UTF-8"]
    );

    let manifest = fs::read_to_string(root.join("manifest-md5.txt")).unwrap();
    let mut lines: Vec<&str> = manifest.lines().collect();
    lines.sort();
    assert_eq!(
        lines,
        vec![
            "5d41402abc4b2a76b9719d911017c592 data/a.txt",
            "7d793037a0760186574b0282f2f435e7 data/sub/b.txt",
        ]
    );

    assert!(is_valid(root).unwrap());

    fs::write(root.join("data/a.txt"), b"something else").unwrap();
    assert!(is_complete(root).unwrap());
    let report = check_valid(root).unwrap();
    assert!(!report.passed());
    let reason = report.violation.unwrap().to_string();
    assert!(reason.contains("data/a.txt"), "reason: {}", reason);
    assert!(reason.contains("md5"), "reason: {}", reason);
}

#[test]
fn recorded_digests_match_recomputed() {
    for algorithm in Algorithm::ALL {
        let dir = sample_directory();
        bag(dir.path(), algorithm);

        let manifest_path = dir.path().join(format!("manifest-{}.txt", algorithm));
        let manifest = Manifest::load(&manifest_path).unwrap();
        assert_eq!(manifest.algorithm(), algorithm);
        assert_eq!(manifest.len(), 2);

        for (path, digest) in manifest.entries() {
            let actual = hash_file(&dir.path().join(path), algorithm).unwrap();
            assert_eq!(&actual, digest, "{} {}", algorithm, path.display());
        }
    }
}

#[test]
fn valid_implies_complete_but_not_conversely() {
    let dir = sample_directory();
    bag(dir.path(), Algorithm::Sha256);
    assert!(is_valid(dir.path()).unwrap());
    assert!(is_complete(dir.path()).unwrap());

    // Flip a single byte.
    let target = dir.path().join("data/sub/b.txt");
    let mut bytes = fs::read(&target).unwrap();
    bytes[0] ^= 0x01;
    fs::write(&target, bytes).unwrap();

    assert!(is_complete(dir.path()).unwrap());
    assert!(!is_valid(dir.path()).unwrap());
}

#[test]
fn deleting_sole_manifest_breaks_completeness() {
    let dir = sample_directory();
    bag(dir.path(), Algorithm::Sha512);
    fs::remove_file(dir.path().join("manifest-sha512.txt")).unwrap();

    let report = check_complete(dir.path()).unwrap();
    assert_eq!(report.violation, Some(Violation::NoPayloadManifest));
}

#[test]
fn extra_payload_file_breaks_completeness() {
    let dir = sample_directory();
    bag(dir.path(), Algorithm::Sha1);
    fs::write(dir.path().join("data/new.txt"), b"not listed").unwrap();

    assert!(!is_complete(dir.path()).unwrap());
    assert!(!is_valid(dir.path()).unwrap());
}

#[test]
fn unsupported_algorithm_in_config_is_rejected() {
    let dir = sample_directory();
    let config_dir = TempDir::new().expect("tempdir");
    let config_path = config_dir.path().join("bagit.toml");
    fs::write(&config_path, "[bag]\nchecksum_algorithm = \"whirlpool\"\n").expect("write config");

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(matches!(err, BagError::Config(_)));
    assert!(err.to_string().contains("whirlpool"));

    assert!(!dir.path().join("data").exists());
    assert!(dir.path().join("a.txt").is_file());
}

#[test]
fn payload_covered_only_by_tag_manifest_is_incomplete() {
    let dir = sample_directory();
    bag(dir.path(), Algorithm::Sha256);

    fs::write(dir.path().join("data/extra.txt"), b"hello").expect("write extra");
    let digest = hash_file(&dir.path().join("data/extra.txt"), Algorithm::Sha256).expect("hash");
    fs::write(
        dir.path().join("tagmanifest-sha256.txt"),
        format!("{} data/extra.txt\n", digest),
    )
    .expect("write tag manifest");

    let report = check_complete(dir.path()).expect("check");
    assert_eq!(
        report.violation,
        Some(Violation::UnlistedPayloadFile {
            path: "data/extra.txt".to_string()
        })
    );
    assert!(!is_valid(dir.path()).expect("check"));
}
