use weave_core::model::{EntryKey, PredictionEntry};
use weave_core::services::{
    adjust_for_missing, combine, dedup, program_id, EntryFlags, Evaluator, MembershipRecord,
    NameScorer, PartitionFilter, PartitionStats, ReferenceRecord, ReferenceSet, TrainMembership,
};

fn approx(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("partition has data");
    assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
}

#[test]
fn dedup_keeps_first_occurrence_and_reports_ratio() {
    let outcome = dedup(vec![
        PredictionEntry::new("p", "f", "v1", "count", "first"),
        PredictionEntry::new("p", "f", "v2", "index", "index"),
        PredictionEntry::new("p", "f", "v1", "count", "second"),
        PredictionEntry::new("p", "f", "v1", "count", "third"),
    ]);
    assert_eq!(outcome.raw, 4);
    assert_eq!(outcome.duplicates, 2);
    assert_eq!(outcome.entries.len(), 2);
    assert_eq!(outcome.entries[0].pred_name, "first");
    approx(outcome.duplicate_ratio(), 0.5);

    let again = dedup(outcome.entries.clone());
    assert_eq!(again.entries, outcome.entries);
    assert_eq!(again.duplicates, 0);

    assert_eq!(dedup(Vec::new()).duplicate_ratio(), None);
}

#[test]
fn program_id_is_prefix_before_first_underscore() {
    assert_eq!(program_id("p12_ls_ls.jsonl.gz"), "p12");
    assert_eq!(program_id("plain"), "plain");
}

#[test]
fn adjust_for_missing_reweights_means() {
    let stats = PartitionStats { count: 4, precision: Some(0.8), recall: Some(0.4) };
    let adjusted = adjust_for_missing(&stats, 1);
    assert_eq!(adjusted.count, 5);
    approx(adjusted.precision, 0.64);
    approx(adjusted.recall, 0.32);

    let only_missing = adjust_for_missing(&PartitionStats::default(), 3);
    assert_eq!(only_missing.count, 3);
    approx(only_missing.precision, 0.0);

    assert_eq!(adjust_for_missing(&PartitionStats::default(), 0), PartitionStats::default());
}

#[test]
fn empty_partitions_have_no_data() {
    let stats = PartitionStats::from_samples(Vec::new());
    assert!(!stats.has_data());
    assert_eq!(stats.precision, None);
}

#[test]
fn dirty_reference_records_map_to_program_file_names() {
    let record: ReferenceRecord =
        serde_json::from_str(r#"{"binary":"ls","funcname":"sub_1","ori_name":"count"}"#)
            .expect("dirty record");
    assert_eq!(record.key(), EntryKey::new("ls_ls.jsonl.gz", "sub_1", "count"));

    let keyed: ReferenceRecord =
        serde_json::from_str(r#"{"prog_name":"p","func_name":"f","varname":"v1"}"#)
            .expect("keyed record");
    let set = ReferenceSet::from_records(vec![keyed.clone(), keyed, record]);
    assert_eq!(set.len(), 2);
    assert!(set.contains(&EntryKey::new("p", "f", "v1")));
}

#[test]
fn entry_flags_classify_variables_and_function_names() {
    let mut membership = TrainMembership::new();
    membership.insert_function("p1", "sub_1", true);
    membership.insert_function("p1", "sub_2", false);
    let membership = membership.with_names(vec!["count".to_string()]);
    assert_eq!(membership.function_count(), 2);
    assert_eq!(membership.name_count(), 1);

    let variable = PredictionEntry::new("p1_bin", "sub_1", "v1", "count", "count");
    let flags = EntryFlags::compute(&variable, &membership, None);
    assert!(flags.is_variable && !flags.is_function);
    assert!(flags.func_in_train && flags.name_in_train && flags.non_empty);

    let own_name = PredictionEntry::new("p1_bin", "sub_2", "sub_2", "parse", "<emptyname>");
    let flags = EntryFlags::compute(&own_name, &membership, None);
    assert!(flags.is_function && !flags.is_variable);
    assert!(!flags.func_in_train && !flags.unclassified && !flags.non_empty);

    let callee = PredictionEntry::new("p1_bin", "sub_2", "sub_3", "lex", "lex");
    let flags = EntryFlags::compute(&callee, &membership, None);
    assert!(!flags.is_function && !flags.is_variable);

    let unknown = PredictionEntry::new("p9_bin", "sub_1", "v1", "x", "x");
    assert!(EntryFlags::compute(&unknown, &membership, None).unclassified);

    let reference = ReferenceSet::from_records(Vec::new());
    assert!(!EntryFlags::compute(&variable, &membership, Some(&reference)).is_variable);

    assert!(PartitionFilter::variables().in_train(true).matches(
        &EntryFlags::compute(&variable, &membership, None)
    ));
}

#[test]
fn evaluator_partitions_by_membership() {
    let membership = TrainMembership::from_records(vec![
        MembershipRecord("p1".into(), "sub_1".into(), "h1".into(), true, String::new()),
        MembershipRecord("p1".into(), "sub_2".into(), "h2".into(), false, String::new()),
    ]);
    let entries = vec![
        PredictionEntry::new("p1_a", "sub_1", "v1", "count", "count"),
        PredictionEntry::new("p1_a", "sub_1", "v1", "count", "duplicate"),
        PredictionEntry::new("p1_a", "sub_2", "v1", "index", "<emptyname>"),
        PredictionEntry::new("p1_a", "sub_2", "sub_2", "parse", "parse"),
        PredictionEntry::new("p2_b", "sub_9", "v4", "total", "sum_total"),
    ];
    let report = Evaluator::new(&membership, NameScorer::default()).evaluate(entries);

    assert_eq!(report.raw_entries, 5);
    assert_eq!(report.entries, 4);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.programs, 2);
    assert_eq!(report.functions, 3);
    assert_eq!(report.rescored, 4);
    assert_eq!(report.function_in_train, 1);
    assert_eq!(report.function_not_in_train, 3);
    assert_eq!(report.unclassified, 1);

    assert_eq!(report.variables.all.count, 3);
    approx(report.variables.in_train.precision, 1.0);
    assert_eq!(report.variables.not_in_train.count, 2);
    approx(report.variables.not_in_train.precision, 0.25);
    assert_eq!(report.variables.non_empty.count, 2);
    assert_eq!(report.function_names.all.count, 1);
    assert_eq!(report.function_names.in_train.count, 0);
    assert!(report.missing_as_wrong.is_none());

    let text = report.to_string();
    assert!(text.contains("functions in-train"));
    assert!(text.contains("n/a"));
}

#[test]
fn evaluator_counts_missing_reference_triples_as_wrong() {
    let mut membership = TrainMembership::new();
    membership.insert_function("p1", "sub_1", true);
    let keyed = |func: &str, var: &str| ReferenceRecord::Keyed {
        prog_name: "p1_a".into(),
        func_name: func.into(),
        varname: var.into(),
    };
    let reference = ReferenceSet::from_records(vec![
        keyed("sub_1", "v1"),
        keyed("sub_1", "v2"),
        keyed("sub_5", "v1"),
    ]);
    let entries = vec![PredictionEntry::new("p1_a", "sub_1", "v1", "count", "count")];
    let report = Evaluator::new(&membership, NameScorer::default())
        .with_reference(&reference)
        .evaluate(entries);

    let missing = report.missing_as_wrong.expect("reference given");
    assert_eq!(missing.missing, 2);
    assert_eq!(missing.missing_in_train, 1);
    assert_eq!(missing.missing_not_in_train, 1);
    approx(missing.in_train.precision, 0.5);
    assert_eq!(missing.not_in_train.count, 1);
    approx(missing.not_in_train.precision, 0.0);
    approx(missing.overall.precision, 1.0 / 3.0);
}

#[test]
fn combine_replaces_sentinels_with_default_entries() {
    let major = vec![
        PredictionEntry::new("p", "f", "v1", "index", "<unk>"),
        PredictionEntry::new("p", "f", "v2", "count", "count"),
        PredictionEntry::new("p", "f", "v3", "size", "<emptyname>"),
    ];
    let default = vec![
        PredictionEntry::new("p", "f", "v1", "index", "index"),
        PredictionEntry::new("p", "f", "v1", "index", "later"),
        PredictionEntry::new("p", "f", "v2", "count", "ignored"),
        PredictionEntry::new("p", "f", "v9", "extra", "extra"),
    ];
    let outcome = combine(major, default);

    let preds: Vec<&str> = outcome.entries.iter().map(|e| e.pred_name.as_str()).collect();
    assert_eq!(preds, vec!["index", "count", "<emptyname>"]);
    assert_eq!(outcome.substituted, 1);
}
