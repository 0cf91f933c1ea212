pub mod navigator;
pub mod persistence;
pub mod presenter;
pub mod resolver;
pub mod routes;
pub mod scoring;
pub mod session;

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use thiserror::Error;

/// Personality archetype a question's answer scores towards.
///
/// Variants are declared in the lexicographic order of their identifiers, so the
/// derived `Ord` is the canonical order used for ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CategoryId {
    Explorer,
    TownPlanner,
    Villager,
}

impl CategoryId {
    pub const ALL: [CategoryId; 3] = [
        CategoryId::Explorer,
        CategoryId::TownPlanner,
        CategoryId::Villager,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryId::Explorer => "explorer",
            CategoryId::TownPlanner => "townPlanner",
            CategoryId::Villager => "villager",
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Answer {
    pub text: String,
    #[serde(rename = "type")]
    pub category: CategoryId,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuizQuestion {
    #[serde(rename = "question")]
    pub text: String,
    pub answers: Vec<Answer>,
}

impl QuizQuestion {
    pub fn answer_by_text(&self, text: &str) -> Option<&Answer> {
        self.answers.iter().find(|a| a.text == text)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResultEntry {
    pub title: String,
    pub name: String,
    pub description: String,
}

const DEFAULT_TITLE: &str = "Which archetype are you?";
const DEFAULT_INTRO: &str =
    "Answer a handful of questions and find out whether you are an Explorer, a Villager or a Town Planner.";
const DEFAULT_FRAMEWORK: &str = "Explorers, Villagers and Town Planners each thrive at a different stage of evolution: \
Explorers chart the uncharted and work with the novel, Villagers turn those discoveries into products, \
and Town Planners industrialise them into reliable, efficient utilities.";

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_intro() -> String {
    DEFAULT_INTRO.to_string()
}

fn default_framework() -> String {
    DEFAULT_FRAMEWORK.to_string()
}

/// Questions and result texts, loaded once before any route is served.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizData {
    pub quiz_questions: Vec<QuizQuestion>,
    pub results_data: BTreeMap<CategoryId, ResultEntry>,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_intro")]
    pub intro: String,
    #[serde(default = "default_framework")]
    pub framework: String,
}

#[derive(Debug, Error)]
pub enum QuizDataError {
    #[error("could not read quiz data: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse quiz data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("quiz data has no questions")]
    NoQuestions,
    #[error("question {0} has no answers")]
    NoAnswers(usize),
    #[error("no result entry for category '{0}'")]
    MissingResult(CategoryId),
    #[error("result name '{0}' is used more than once")]
    DuplicateName(String),
    #[error("result name '{0}' must not contain a comma")]
    InvalidName(String),
}

impl QuizData {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QuizDataError> {
        let file = File::open(path)?;
        let data: QuizData = serde_json::from_reader(BufReader::new(file))?;
        data.validate()?;
        Ok(data)
    }

    pub fn from_json(json: &str) -> Result<Self, QuizDataError> {
        let data: QuizData = serde_json::from_str(json)?;
        data.validate()?;
        Ok(data)
    }

    fn validate(&self) -> Result<(), QuizDataError> {
        if self.quiz_questions.is_empty() {
            return Err(QuizDataError::NoQuestions);
        }
        if let Some(idx) = self.quiz_questions.iter().position(|q| q.answers.is_empty()) {
            return Err(QuizDataError::NoAnswers(idx + 1));
        }

        let mut seen: Vec<&str> = Vec::new();
        for category in CategoryId::ALL {
            let entry = self
                .results_data
                .get(&category)
                .ok_or(QuizDataError::MissingResult(category))?;
            // The tie encoding joins names with commas
            if entry.name.contains(',') {
                return Err(QuizDataError::InvalidName(entry.name.clone()));
            }
            if seen.contains(&entry.name.as_str()) {
                return Err(QuizDataError::DuplicateName(entry.name.clone()));
            }
            seen.push(&entry.name);
        }
        Ok(())
    }

    pub fn question_count(&self) -> usize {
        self.quiz_questions.len()
    }

    pub fn question(&self, index: usize) -> Option<&QuizQuestion> {
        self.quiz_questions.get(index)
    }

    pub fn result(&self, category: CategoryId) -> Option<&ResultEntry> {
        self.results_data.get(&category)
    }

    pub fn category_by_name(&self, name: &str) -> Option<CategoryId> {
        self.results_data
            .iter()
            .find(|(_, entry)| entry.name == name)
            .map(|(category, _)| *category)
    }
}
