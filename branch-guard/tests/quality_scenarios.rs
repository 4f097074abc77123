//! End-to-end quality runs over export files.

use branch_guard::core::{
    PipelineConfig, PolicyKind, QualityPipeline, QualityResult, ViolationKind,
};
use branch_guard::sources::{metadata_from_path, records_from_path};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn write_file(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::File::create(&path)
        .and_then(|mut f| f.write_all(body.as_bytes()))
        .unwrap();
    path
}

async fn run_files(
    metadata: &std::path::Path,
    records: &std::path::Path,
    config: PipelineConfig,
) -> QualityResult {
    QualityPipeline::builder("scenario")
        .metadata(metadata_from_path(metadata).unwrap())
        .records(records_from_path(records).unwrap())
        .config(config)
        .build()
        .unwrap()
        .run()
        .await
        .unwrap()
}

const SYMPTOM_METADATA: &str = r#"[
    {"field_name": "record_id", "form_name": "intake", "branching_logic": ""},
    {"field_name": "has_symptom", "form_name": "intake", "branching_logic": ""},
    {"field_name": "symptom_detail", "form_name": "intake", "branching_logic": "[has_symptom] = '1'"}
]"#;

const SYMPTOM_RECORDS: &str = r#"[
    {"record_id": "1", "has_symptom": "1", "symptom_detail": ""},
    {"record_id": "2", "has_symptom": "0", "symptom_detail": ""},
    {"record_id": "3", "has_symptom": "1", "symptom_detail": "fever"}
]"#;

#[tokio::test]
async fn test_symptom_scenario_from_json_exports() {
    let dir = TempDir::new().unwrap();
    let metadata = write_file(&dir, "metadata.json", SYMPTOM_METADATA);
    let records = write_file(&dir, "records.json", SYMPTOM_RECORDS);

    let result = run_files(&metadata, &records, PipelineConfig::legacy()).await;
    let run = result.report();

    assert!(result.is_passed());
    assert_eq!(run.rules, 1);
    assert_eq!(run.records, 3);
    assert_eq!(run.report.checked, 3);
    assert_eq!(run.report.violation_count(), 1);

    let violation = &run.report.violations[0];
    assert_eq!(violation.record_index, 0);
    assert_eq!(violation.record_id.as_deref(), Some("1"));
    assert_eq!(violation.governed_field, "symptom_detail");
    assert_eq!(violation.trigger_field, "has_symptom");
    assert_eq!(violation.kind, ViolationKind::MissingValue);

    let score = run.score.value().unwrap();
    assert!((score - 66.67).abs() < 0.01, "score was {score}");
}

#[tokio::test]
async fn test_same_scenario_from_csv_exports() {
    let dir = TempDir::new().unwrap();
    let metadata = write_file(
        &dir,
        "dictionary.csv",
        concat!(
            "\"Variable / Field Name\",\"Form Name\",\"Field Type\",\"Branching Logic (Show field only if...)\"\n",
            "record_id,intake,text,\n",
            "has_symptom,intake,yesno,\n",
            "symptom_detail,intake,text,\"[has_symptom] = '1'\"\n",
        ),
    );
    let records = write_file(
        &dir,
        "records.csv",
        "record_id,has_symptom,symptom_detail\n1,1,\n2,0,\n3,1,fever\n",
    );

    let result = run_files(&metadata, &records, PipelineConfig::legacy()).await;
    assert_eq!(result.report().report.violation_count(), 1);
    assert_eq!(result.report().score.to_string(), "66.67%");
}

#[tokio::test]
async fn test_policies_disagree_on_unexpected_values() {
    let dir = TempDir::new().unwrap();
    let metadata = write_file(&dir, "metadata.json", SYMPTOM_METADATA);
    let records = write_file(
        &dir,
        "records.json",
        r#"[{"record_id": "1", "has_symptom": "0", "symptom_detail": "fever"}]"#,
    );

    let mut config = PipelineConfig::legacy();
    config.checker.policy = PolicyKind::Enhanced;
    let enhanced = run_files(&metadata, &records, config.clone()).await;
    assert_eq!(enhanced.report().report.violation_count(), 1);
    assert_eq!(
        enhanced.report().report.violations[0].kind,
        ViolationKind::UnexpectedValue
    );

    config.checker.policy = PolicyKind::Simple;
    let simple = run_files(&metadata, &records, config).await;
    assert!(simple.report().report.is_clean());
    assert_eq!(simple.report().score.value(), Some(100.0));
}

#[tokio::test]
async fn test_legacy_truncation_changes_the_verdict() {
    let dir = TempDir::new().unwrap();
    let metadata = write_file(
        &dir,
        "metadata.json",
        r#"[{"field_name": "serotype_detail", "branching_logic": "[dengue_type] = '12'"}]"#,
    );
    let records = write_file(
        &dir,
        "records.json",
        r#"[{"dengue_type": "12", "serotype_detail": "DENV-2"}]"#,
    );

    // legacy compares against '1', so the filled field looks unexpected
    let legacy = run_files(&metadata, &records, PipelineConfig::legacy()).await;
    assert_eq!(
        legacy.report().report.violations[0].kind,
        ViolationKind::UnexpectedValue
    );
    assert_eq!(legacy.report().report.violations[0].rule, "[dengue_type] = '1'");

    let corrected = run_files(&metadata, &records, PipelineConfig::corrected()).await;
    assert!(corrected.report().report.is_clean());
}

#[tokio::test]
async fn test_multi_condition_rules() {
    let dir = TempDir::new().unwrap();
    let metadata = write_file(
        &dir,
        "metadata.json",
        r#"[{"field_name": "hospital_name", "branching_logic": "[hospitalized] = '1' or [icu] = '1' and [alive] = '1'"}]"#,
    );
    // (hospitalized or icu) and alive, left to right
    let records = write_file(
        &dir,
        "records.json",
        r#"[
            {"hospitalized": "1", "icu": "0", "alive": "1", "hospital_name": "HC"},
            {"hospitalized": "1", "icu": "0", "alive": "0", "hospital_name": ""},
            {"hospitalized": "0", "icu": "1", "alive": "1", "hospital_name": ""},
            {"hospitalized": "0", "icu": "0", "alive": "1", "hospital_name": "HC"}
        ]"#,
    );

    let result = run_files(&metadata, &records, PipelineConfig::legacy()).await;
    let kinds: Vec<_> = result
        .report()
        .report
        .violations
        .iter()
        .map(|v| (v.record_index, v.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (2, ViolationKind::MissingValue),
            (3, ViolationKind::UnexpectedValue)
        ]
    );
    assert_eq!(result.report().score.value(), Some(50.0));
}

#[tokio::test]
async fn test_missing_reference_is_skipped_not_fatal() {
    let dir = TempDir::new().unwrap();
    let metadata = write_file(
        &dir,
        "metadata.json",
        r#"[
            {"field_name": "symptom_detail", "branching_logic": "[has_symptom] = '1'"},
            {"field_name": "onset_detail", "branching_logic": "[onset] = '1'"}
        ]"#,
    );
    // onset_detail is exported but its trigger `onset` is not
    let records = write_file(
        &dir,
        "records.json",
        r#"[
            {"has_symptom": "1", "symptom_detail": "", "onset_detail": ""},
            {"has_symptom": "0", "symptom_detail": "", "onset_detail": "x"},
            {"has_symptom": "1", "symptom_detail": "fever", "onset_detail": ""}
        ]"#,
    );

    let result = run_files(&metadata, &records, PipelineConfig::legacy()).await;
    let report = &result.report().report;
    assert_eq!(report.total_pairs, 6);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.checked, 3);
    assert!(report.missing_fields.contains("onset"));
    assert_eq!(result.report().score.to_string(), "66.67%");
}

#[tokio::test]
async fn test_empty_export_fails_threshold_with_sentinel() {
    let dir = TempDir::new().unwrap();
    let metadata = write_file(&dir, "metadata.json", SYMPTOM_METADATA);
    let records = write_file(&dir, "records.json", "[]");

    let result = run_files(
        &metadata,
        &records,
        PipelineConfig::legacy().with_min_quality(50.0),
    )
    .await;
    assert!(!result.is_passed());
    assert_eq!(result.report().score.to_string(), "n/a");
}

#[tokio::test]
async fn test_strict_mode_rejects_what_lenient_mode_keeps() {
    let dir = TempDir::new().unwrap();
    let metadata = write_file(
        &dir,
        "metadata.json",
        r#"[{"field_name": "detail", "branching_logic": "[a] = '1' and [b"}]"#,
    );
    let records = write_file(&dir, "records.json", r#"[{"a": "1", "detail": "x"}]"#);

    let lenient = run_files(&metadata, &records, PipelineConfig::legacy()).await;
    assert_eq!(lenient.report().rules, 1);
    assert!(lenient.report().rejected_rules.is_empty());
    assert!(lenient.report().report.is_clean());

    let strict = run_files(&metadata, &records, PipelineConfig::corrected()).await;
    assert_eq!(strict.report().rules, 0);
    assert_eq!(strict.report().rejected_rules[0].field_name, "detail");
    assert!(!strict.report().score.is_defined());
}

#[tokio::test]
async fn test_partitioned_pipeline_matches_sequential() {
    let dir = TempDir::new().unwrap();
    let metadata = write_file(&dir, "metadata.json", SYMPTOM_METADATA);
    let rows: Vec<String> = (0..40)
        .map(|i| {
            format!(
                r#"{{"record_id": "{i}", "has_symptom": "{}", "symptom_detail": "{}"}}"#,
                i % 2,
                if i % 3 == 0 { "x" } else { "" }
            )
        })
        .collect();
    let records = write_file(&dir, "records.json", &format!("[{}]", rows.join(",")));

    let sequential = run_files(&metadata, &records, PipelineConfig::legacy()).await;
    let mut config = PipelineConfig::legacy();
    config.checker.partitions = 6;
    let partitioned = run_files(&metadata, &records, config).await;

    assert_eq!(partitioned.report().report, sequential.report().report);
}

#[test]
fn test_config_file_round_trip() {
    let mut file = NamedTempFile::new().unwrap();
    let config = PipelineConfig::corrected().with_min_quality(80.0);
    file.write_all(serde_json::to_string(&config).unwrap().as_bytes())
        .unwrap();

    let loaded = PipelineConfig::from_json_file(file.path()).unwrap();
    assert_eq!(loaded, config);
}
