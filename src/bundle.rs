use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One generated study package for a topic/grade/subject. Immutable once
/// created; the only lifecycle operations are create, load, and delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyBundle {
    /// Stamped locally after parsing; any model-provided value is discarded.
    #[serde(default)]
    pub id: String,
    /// Milliseconds since epoch, stamped locally.
    #[serde(default)]
    pub created_at: i64,
    pub topic: String,
    pub grade: String,
    pub subject: String,
    pub summary: String,
    pub flashcards: Vec<Flashcard>,
    pub fill_in_the_blanks: Vec<FillInBlank>,
    pub true_false: Vec<TrueFalse>,
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillInBlank {
    /// Contains a single `_____` marker for the missing word.
    pub sentence: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrueFalse {
    pub statement: String,
    pub is_true: bool,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub scenario: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
    pub explanation: String,
}

impl StudyBundle {
    /// Boundary check applied right after parsing the model's structured
    /// output: section counts and option indices must match the requested
    /// schema before the rest of the app is allowed to rely on the value.
    pub fn validate_shape(&self) -> Result<()> {
        if !(5..=10).contains(&self.flashcards.len()) {
            anyhow::bail!("expected 5-10 flashcards, got {}", self.flashcards.len());
        }
        if self.fill_in_the_blanks.len() != 5 {
            anyhow::bail!(
                "expected 5 fill-in-the-blank items, got {}",
                self.fill_in_the_blanks.len()
            );
        }
        if self.true_false.len() != 5 {
            anyhow::bail!("expected 5 true/false items, got {}", self.true_false.len());
        }
        if self.scenarios.len() != 3 {
            anyhow::bail!("expected 3 scenarios, got {}", self.scenarios.len());
        }
        for (i, s) in self.scenarios.iter().enumerate() {
            if s.options.len() != 4 {
                anyhow::bail!("scenario {} has {} options, expected 4", i + 1, s.options.len());
            }
            if s.correct_answer_index > 3 {
                anyhow::bail!(
                    "scenario {} correct answer index {} out of range",
                    i + 1,
                    s.correct_answer_index
                );
            }
        }
        Ok(())
    }

    pub fn created_date(&self) -> String {
        chrono::DateTime::<chrono::Utc>::from_timestamp_millis(self.created_at)
            .map(|d| d.format("%b %e, %Y").to_string())
            .unwrap_or_default()
    }

    /// Flat text projection of the whole bundle for download. Read-only;
    /// not part of the persisted state.
    pub fn transcript(&self) -> String {
        let mut text = format!("TOPIC: {}\n", self.topic);
        text.push_str(&format!("SUBJECT: {} | GRADE: {}\n", self.subject, self.grade));
        text.push_str("================================================\n\n");
        text.push_str(&format!("[ SUMMARY ]\n{}\n\n", self.summary));

        text.push_str("[ FLASHCARDS ]\n");
        for (i, card) in self.flashcards.iter().enumerate() {
            text.push_str(&format!("{}. Q: {}\n   A: {}\n", i + 1, card.front, card.back));
            if let Some(note) = card.explanation.as_deref().filter(|n| !n.is_empty()) {
                text.push_str(&format!("   Note: {}\n", note));
            }
        }

        text.push_str("\n[ FILL IN THE BLANKS ]\n");
        for (i, item) in self.fill_in_the_blanks.iter().enumerate() {
            text.push_str(&format!("{}. {}\n   Answer: {}\n", i + 1, item.sentence, item.answer));
        }

        text.push_str("\n[ TRUE OR FALSE ]\n");
        for (i, q) in self.true_false.iter().enumerate() {
            text.push_str(&format!(
                "{}. {}\n   Answer: {} - {}\n",
                i + 1,
                q.statement,
                if q.is_true { "True" } else { "False" },
                q.explanation
            ));
        }

        text.push_str("\n[ SCENARIOS ]\n");
        for (i, s) in self.scenarios.iter().enumerate() {
            text.push_str(&format!("{}. {}\n   Q: {}\n", i + 1, s.scenario, s.question));
            for (j, opt) in s.options.iter().enumerate() {
                let letter = (b'A' + j as u8) as char;
                text.push_str(&format!("   {}) {}\n", letter, opt));
            }
            let letter = (b'A' + s.correct_answer_index.min(3) as u8) as char;
            text.push_str(&format!("   Correct: {}\n   Why: {}\n", letter, s.explanation));
        }

        text
    }

    /// Summary-only projection formatted for printing.
    pub fn printable_summary(&self) -> String {
        format!(
            "Summary: {}\nSubject: {} | Grade: {}\n\n{}\n",
            self.topic, self.subject, self.grade, self.summary
        )
    }

    pub fn transcript_filename(&self) -> String {
        format!("{}_study_guide.txt", slug(&self.topic))
    }

    pub fn summary_filename(&self) -> String {
        format!("{}_summary.txt", slug(&self.topic))
    }
}

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]+").unwrap());

fn slug(text: &str) -> String {
    NON_ALNUM.replace_all(text, "_").to_lowercase()
}

/// The closed set of school subjects offered in the create and solve forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Mathematics,
    Science,
    English,
    Urdu,
    SocialStudies,
    IslamicStudies,
    ComputerScience,
}

impl Subject {
    pub const ALL: [Subject; 7] = [
        Subject::Mathematics,
        Subject::Science,
        Subject::English,
        Subject::Urdu,
        Subject::SocialStudies,
        Subject::IslamicStudies,
        Subject::ComputerScience,
    ];
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Subject::Mathematics => "Mathematics",
            Subject::Science => "Science",
            Subject::English => "English",
            Subject::Urdu => "Urdu",
            Subject::SocialStudies => "Social Studies",
            Subject::IslamicStudies => "Islamic Studies",
            Subject::ComputerScience => "Computer Science",
        })
    }
}

/// Grade options offered in the forms, "1" through "11".
pub fn grade_options() -> Vec<String> {
    (1..=11).map(|g| g.to_string()).collect()
}

/// Input to bundle creation; discarded once the bundle or error is produced.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub topic: String,
    pub grade: String,
    pub subject: Subject,
    pub publisher: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppTheme {
    Light,
    Dark,
}

/// User preferences persisted as a single record. The field names mirror
/// the stored JSON from earlier versions of the app.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: AppTheme,
    #[serde(rename = "systemInstruction", default)]
    pub custom_instruction: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            theme: AppTheme::Dark,
            custom_instruction: String::new(),
        }
    }
}

#[cfg(test)]
impl StudyBundle {
    pub(crate) fn sample() -> Self {
        StudyBundle {
            id: "test-bundle".to_string(),
            created_at: 1_700_000_000_000,
            topic: "The Water Cycle".to_string(),
            grade: "5".to_string(),
            subject: "Science".to_string(),
            summary: "Water moves between the earth and the sky.".to_string(),
            flashcards: (0..5)
                .map(|i| Flashcard {
                    front: format!("front {}", i),
                    back: format!("back {}", i),
                    explanation: Some(format!("note {}", i)),
                })
                .collect(),
            fill_in_the_blanks: (0..5)
                .map(|i| FillInBlank {
                    sentence: format!("Blank {} is _____ here.", i),
                    answer: format!("answer {}", i),
                })
                .collect(),
            true_false: (0..5)
                .map(|i| TrueFalse {
                    statement: format!("statement {}", i),
                    is_true: i % 2 == 0,
                    explanation: format!("because {}", i),
                })
                .collect(),
            scenarios: (0..3)
                .map(|i| Scenario {
                    scenario: format!("scenario {}", i),
                    question: format!("question {}", i),
                    options: (0..4).map(|j| format!("option {}", j)).collect(),
                    correct_answer_index: 2,
                    explanation: format!("why {}", i),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_bundle_passes_shape_check() {
        assert!(StudyBundle::sample().validate_shape().is_ok());
    }

    #[test]
    fn shape_check_rejects_wrong_section_counts() {
        let mut bundle = StudyBundle::sample();
        bundle.flashcards.truncate(4);
        assert!(bundle.validate_shape().is_err());

        let mut bundle = StudyBundle::sample();
        bundle.fill_in_the_blanks.pop();
        assert!(bundle.validate_shape().is_err());

        let mut bundle = StudyBundle::sample();
        bundle.scenarios.pop();
        assert!(bundle.validate_shape().is_err());
    }

    #[test]
    fn shape_check_rejects_bad_scenarios() {
        let mut bundle = StudyBundle::sample();
        bundle.scenarios[0].options.pop();
        assert!(bundle.validate_shape().is_err());

        let mut bundle = StudyBundle::sample();
        bundle.scenarios[1].correct_answer_index = 4;
        assert!(bundle.validate_shape().is_err());
    }

    #[test]
    fn transcript_covers_every_section() {
        let text = StudyBundle::sample().transcript();
        assert!(text.starts_with("TOPIC: The Water Cycle\n"));
        assert!(text.contains("SUBJECT: Science | GRADE: 5"));
        assert!(text.contains("[ SUMMARY ]"));
        assert!(text.contains("[ FLASHCARDS ]"));
        assert!(text.contains("[ FILL IN THE BLANKS ]"));
        assert!(text.contains("[ TRUE OR FALSE ]"));
        assert!(text.contains("[ SCENARIOS ]"));
        assert!(text.contains("Correct: C)"));
    }

    #[test]
    fn transcript_filename_slugs_the_topic() {
        let mut bundle = StudyBundle::sample();
        bundle.topic = "Newton's 3rd Law!".to_string();
        assert_eq!(bundle.transcript_filename(), "newton_s_3rd_law__study_guide.txt");
    }

    #[test]
    fn preferences_default_to_dark_and_empty_instruction() {
        let prefs = Preferences::default();
        assert_eq!(prefs.theme, AppTheme::Dark);
        assert!(prefs.custom_instruction.is_empty());
    }

    #[test]
    fn preferences_round_trip_uses_legacy_field_names() {
        let prefs = Preferences {
            theme: AppTheme::Light,
            custom_instruction: "keep it short".to_string(),
        };
        let json = serde_json::to_string(&prefs).unwrap();
        assert!(json.contains("\"theme\":\"light\""));
        assert!(json.contains("\"systemInstruction\":\"keep it short\""));
        let back: Preferences = serde_json::from_str(&json).unwrap();
        assert_eq!(back.theme, AppTheme::Light);
        assert_eq!(back.custom_instruction, "keep it short");
    }
}
