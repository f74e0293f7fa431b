//! Stage worksheets.

use crate::stage::Stage;
use std::collections::BTreeMap;

/// One question on a worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorksheetField {
    /// Answer key.
    pub id: &'static str,
    /// Question shown to the student.
    pub label: &'static str,
    /// Must be answered before submitting.
    pub required: bool,
}

const fn field(id: &'static str, label: &'static str, required: bool) -> WorksheetField {
    WorksheetField {
        id,
        label,
        required,
    }
}

const DEVELOPMENT: &[WorksheetField] = &[
    field("idea", "Your film idea (write or draw description)", true),
    field("characters", "Describe your main character(s)", false),
    field("outline", "Story outline (Beginning / Middle / End)", true),
];

const PRE_PRODUCTION: &[WorksheetField] = &[
    field("team_roles", "Your team & roles (Director, Camera, Actor, Sound)", true),
    field("storyboard", "Storyboard overview (describe key scenes)", true),
    field("props", "Props & equipment list", false),
    field("script", "Short script or acting notes", false),
];

const PRODUCTION: &[WorksheetField] = &[
    field("setup", "How did you set up camera & tripod safely?", true),
    field("scenes", "What scenes did you film today?", true),
    field("soundcheck", "Sound check notes", false),
    field("review", "What went well? What to improve?", false),
];

const POST_PRODUCTION: &[WorksheetField] = &[
    field("editing", "What editing did you do (trim, order, transitions)?", true),
    field("audio_titles", "What did you add (music, SFX, titles)?", false),
    field("reflection", "Final reflection", true),
];

/// The worksheet for `stage`.
#[must_use]
pub fn worksheet(stage: Stage) -> &'static [WorksheetField] {
    match stage {
        Stage::Development => DEVELOPMENT,
        Stage::PreProduction => PRE_PRODUCTION,
        Stage::Production => PRODUCTION,
        Stage::PostProduction => POST_PRODUCTION,
    }
}

/// Required field ids with a blank or missing answer.
#[must_use]
pub fn missing_required(stage: Stage, answers: &BTreeMap<String, String>) -> Vec<&'static str> {
    worksheet(stage)
        .iter()
        .filter(|f| f.required)
        .filter(|f| answers.get(f.id).map_or(true, |v| v.trim().is_empty()))
        .map(|f| f.id)
        .collect()
}

/// Trims answers and drops ids the worksheet doesn't ask for.
#[must_use]
pub fn normalize_answers(stage: Stage, answers: BTreeMap<String, String>) -> BTreeMap<String, String> {
    let fields = worksheet(stage);
    answers
        .into_iter()
        .filter(|(id, _)| fields.iter().any(|f| f.id == id))
        .map(|(id, v)| (id, v.trim().to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn every_stage_has_required_fields() {
        for stage in Stage::ALL {
            assert!(worksheet(stage).iter().any(|f| f.required), "{stage}");
        }
    }

    #[test]
    fn blank_required_answers_are_missing() {
        let got = missing_required(
            Stage::Development,
            &answers(&[("idea", "A lost robot"), ("outline", "   ")]),
        );
        assert_eq!(got, vec!["outline"]);
    }

    #[test]
    fn complete_worksheet_has_nothing_missing() {
        let got = missing_required(
            Stage::PostProduction,
            &answers(&[("editing", "trimmed"), ("reflection", "fun")]),
        );
        assert!(got.is_empty());
    }

    #[test]
    fn normalize_trims_and_filters() {
        let got = normalize_answers(
            Stage::Production,
            answers(&[("setup", "  tripod low  "), ("bogus", "x")]),
        );
        assert_eq!(got, answers(&[("setup", "tripod low")]));
    }
}
