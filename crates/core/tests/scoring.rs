use weave_core::model::PredictionEntry;
use weave_core::services::{tokenize, NameScorer, ScoreMode, TokenizeOptions};

fn close(actual: (f64, f64), expected: (f64, f64)) -> bool {
    (actual.0 - expected.0).abs() < 1e-9 && (actual.1 - expected.1).abs() < 1e-9
}

#[test]
fn token_mode_scores_shared_sub_words() {
    let scorer = NameScorer::default();
    assert_eq!(scorer.score("buffer_len", "bufferLen"), (1.0, 1.0));
    assert_eq!(scorer.score("file_size", "size"), (1.0, 0.5));
    assert_eq!(scorer.score("size", "file_size"), (0.5, 1.0));
    assert_eq!(scorer.score("count", "index"), (0.0, 0.0));
}

#[test]
fn sentinel_predictions_score_zero() {
    let scorer = NameScorer::default();
    assert_eq!(scorer.score("count", "<emptyname>"), (0.0, 0.0));
    assert_eq!(scorer.score("count", "<unk>"), (0.0, 0.0));
    assert_eq!(scorer.score("count", ""), (0.0, 0.0));
}

#[test]
fn mangled_ground_truth_is_demangled_before_scoring() {
    let scorer = NameScorer::default();
    assert_eq!(scorer.score("_Z6helperv", "helper"), (1.0, 1.0));
}

#[test]
fn exact_mode_ignores_case_and_separators() {
    let scorer = NameScorer::new(ScoreMode::Exact, TokenizeOptions::default());
    assert_eq!(scorer.score("buffer_len", "BufferLen"), (1.0, 1.0));
    assert_eq!(scorer.score("buffer", "buf"), (0.0, 0.0));
    assert_eq!(scorer.score("___", "___"), (0.0, 0.0));
}

#[test]
fn tokenizer_splits_camel_case_and_optionally_digits() {
    let defaults = TokenizeOptions::default();
    let tokens: Vec<String> = tokenize("HTTPServer_port", &defaults).into_iter().collect();
    assert_eq!(tokens, vec!["http", "port", "server"]);
    assert_eq!(tokenize("buf2", &defaults).len(), 1);

    let digits = TokenizeOptions { split_digits: true, ..defaults };
    let tokens: Vec<String> = tokenize("buf2", &digits).into_iter().collect();
    assert_eq!(tokens, vec!["2", "buf"]);

    let flat = TokenizeOptions { split_camel_case: false, split_digits: false };
    assert_eq!(tokenize("fooBar", &flat).len(), 1);
}

#[test]
fn legacy_unk_prediction_is_rewritten_before_scoring() {
    let scorer = NameScorer::default();
    let mut entry = PredictionEntry::new("p", "f", "v1", "count", "UNK");
    scorer.score_entry(&mut entry);
    assert_eq!(entry.pred_name, "<emptyname>");
    assert_eq!(entry.precision, Some(0.0));
    assert_eq!(entry.recall, Some(0.0));
}

#[test]
fn score_entries_only_fills_missing_scores_unless_rescoring() {
    let scorer = NameScorer::default();
    let mut entries = vec![
        PredictionEntry::new("p", "f", "v1", "count", "count"),
        PredictionEntry::new("p", "f", "v2", "index", "index").with_scores(0.25, 0.25),
    ];
    assert_eq!(scorer.score_entries(&mut entries, false), 1);
    assert_eq!(entries[0].precision, Some(1.0));
    assert_eq!(entries[1].precision, Some(0.25));

    assert_eq!(scorer.score_entries(&mut entries, true), 2);
    assert!(close((entries[1].precision.unwrap(), entries[1].recall.unwrap()), (1.0, 1.0)));
}

#[test]
fn score_mode_parses_and_displays() {
    assert_eq!("EXACT".parse::<ScoreMode>().unwrap(), ScoreMode::Exact);
    assert_eq!(ScoreMode::Token.to_string(), "token");
    assert!("fuzzy".parse::<ScoreMode>().unwrap_err().contains("fuzzy"));
}
