//! Property tests for grading and worksheets.

use medialab_lab::worksheets::{missing_required, normalize_answers, worksheet};
use medialab_lab::{Award, Badge, Stage, MAX_CRITERION_SCORE};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn stage() -> impl Strategy<Value = Stage> {
    prop::sample::select(Stage::ALL.to_vec())
}

proptest! {
    #[test]
    fn badges_never_drop_as_score_rises(a in 0u32..=12, b in 0u32..=12) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(Badge::for_score(lo) <= Badge::for_score(hi));
        prop_assert!(Award::for_total(lo * 4) <= Award::for_total(hi * 4));
    }

    #[test]
    fn full_rubric_is_gold_only_at_ten_or_more(scores in prop::array::uniform3(0u8..=MAX_CRITERION_SCORE)) {
        let total: u32 = scores.iter().map(|&s| u32::from(s)).sum();
        prop_assert_eq!(Badge::for_score(total) == Some(Badge::Gold), total >= 10);
    }

    #[test]
    fn normalized_answers_only_hold_worksheet_fields(
        stage in stage(),
        answers in prop::collection::btree_map("[a-z_]{1,12}", "[ a-zA-Z]{0,16}", 0..8),
    ) {
        let normalized = normalize_answers(stage, answers);
        for (id, value) in &normalized {
            prop_assert!(worksheet(stage).iter().any(|f| f.id == id));
            prop_assert_eq!(value.trim(), value.as_str());
        }
    }

    #[test]
    fn filling_every_required_field_clears_missing(stage in stage(), text in "[a-zA-Z]{1,20}") {
        let answers: BTreeMap<String, String> = worksheet(stage)
            .iter()
            .filter(|f| f.required)
            .map(|f| (f.id.to_owned(), text.clone()))
            .collect();
        prop_assert!(missing_required(stage, &answers).is_empty());
        prop_assert!(!missing_required(stage, &BTreeMap::new()).is_empty());
    }
}
