use std::collections::BTreeMap;

use super::CategoryId;

/// Tally of one quiz attempt: where the user is and how many answers went to
/// each category.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreState {
    pub current_question_index: usize,
    #[serde(deserialize_with = "deserialize_scores")]
    pub scores: BTreeMap<CategoryId, u32>,
}

impl Default for ScoreState {
    fn default() -> Self {
        Self::starting_at(0)
    }
}

impl ScoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh tally positioned at `index`, every score zero.
    pub fn starting_at(index: usize) -> Self {
        Self {
            current_question_index: index,
            scores: CategoryId::ALL.iter().map(|c| (*c, 0)).collect(),
        }
    }

    /// Awards one point to `category` and moves on to the next question.
    /// The caller checks that a question is left to answer.
    pub fn record_answer(&mut self, category: CategoryId) {
        *self.scores.entry(category).or_insert(0) += 1;
        self.current_question_index += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::starting_at(0);
    }

    pub fn score(&self, category: CategoryId) -> u32 {
        self.scores.get(&category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.scores.values().sum()
    }
}

// Older snapshots may lack a category; those count as zero.
fn deserialize_scores<'de, D>(deserializer: D) -> Result<BTreeMap<CategoryId, u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let mut scores: BTreeMap<CategoryId, u32> = serde::Deserialize::deserialize(deserializer)?;
    for category in CategoryId::ALL {
        scores.entry(category).or_insert(0);
    }
    Ok(scores)
}
