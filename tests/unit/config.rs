use super::*;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "ctqc_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn empty_object_gives_defaults() {
    let cfg: ReportConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(cfg, ReportConfig::default());
    assert_eq!(cfg.labels, [2, 4]);
    assert_eq!(cfg.cuts, 7);
    assert!(cfg.segmentation_includes_mask);
    assert_eq!(cfg.figure_options().unwrap(), FigureOptions::default());
}

#[test]
fn validation_rejects_bad_values() {
    for json in [
        r#"{"cuts": 0}"#,
        r#"{"labels": [0]}"#,
        r#"{"labels": [2, 7]}"#,
        r#"{"labels": []}"#,
    ] {
        let cfg: ReportConfig = serde_json::from_str(json).unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, QcError::Config(_)), "{json}: {err}");
    }
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(serde_json::from_str::<ReportConfig>(r#"{"cut": 3}"#).is_err());
}

#[test]
fn from_path_reads_and_resolves_template() {
    let dir = temp_dir("config");
    let path = dir.join("qc.json");
    std::fs::write(
        &path,
        r#"{"labels": [3, 2, 3], "cuts": 4, "segmentation_includes_mask": false, "template": "page.html"}"#,
    )
    .unwrap();

    let cfg = ReportConfig::from_path(&path).unwrap();
    assert_eq!(cfg.template.as_deref(), Some(dir.join("page.html").as_path()));
    let opts = cfg.figure_options().unwrap();
    assert_eq!(opts.labels.values(), vec![3, 2]);
    assert_eq!(opts.cuts, 4);
    assert!(!opts.segmentation_includes_mask);
}

#[test]
fn from_path_errors() {
    let dir = temp_dir("config_err");
    let err = ReportConfig::from_path(&dir.join("missing.json")).unwrap_err();
    assert!(matches!(err, QcError::FileNotFound(_)));

    let bad = dir.join("bad.json");
    std::fs::write(&bad, "{ not json").unwrap();
    let err = ReportConfig::from_path(&bad).unwrap_err();
    assert!(matches!(err, QcError::Config(_)));

    let zero = dir.join("zero.json");
    std::fs::write(&zero, r#"{"cuts": 0}"#).unwrap();
    assert!(matches!(
        ReportConfig::from_path(&zero).unwrap_err(),
        QcError::Config(_)
    ));
}
