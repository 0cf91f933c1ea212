use super::scoring::ScoreState;
use super::{CategoryId, QuizData};

/// Canonical outcome of a finished quiz.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResultIdentity {
    Single(CategoryId),
    /// Two or more categories, always in canonical order.
    Tie(Vec<CategoryId>),
}

impl ResultIdentity {
    pub fn categories(&self) -> Vec<CategoryId> {
        match self {
            ResultIdentity::Single(category) => vec![*category],
            ResultIdentity::Tie(categories) => categories.clone(),
        }
    }
}

/// What a results route points at once decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultLookup {
    Found(ResultIdentity),
    NotFound,
}

const NAME_SEPARATOR: char = ',';

pub fn resolve(state: &ScoreState) -> ResultIdentity {
    let max = CategoryId::ALL
        .iter()
        .map(|c| state.score(*c))
        .max()
        .unwrap_or(0);

    // ALL is already in canonical order
    let winners: Vec<CategoryId> = CategoryId::ALL
        .iter()
        .copied()
        .filter(|c| state.score(*c) == max)
        .collect();

    match winners.as_slice() {
        [single] => ResultIdentity::Single(*single),
        _ => ResultIdentity::Tie(winners),
    }
}

/// Percent-encoded text form of `identity`, used as the last segment of the
/// results route.
pub fn encode(identity: &ResultIdentity, data: &QuizData) -> String {
    let names: Vec<&str> = identity
        .categories()
        .into_iter()
        .filter_map(|c| data.result(c))
        .map(|entry| entry.name.as_str())
        .collect();

    let encoded = urlencoding::encode(&names.join(",")).into_owned();
    // Links stay identical to the web version, which leaves these unescaped
    KEPT_AS_IS
        .iter()
        .fold(encoded, |acc, (escaped, plain)| acc.replace(escaped, plain))
}

const KEPT_AS_IS: [(&str, &str); 5] = [("%21", "!"), ("%27", "'"), ("%28", "("), ("%29", ")"), ("%2A", "*")];

pub fn decode(raw: &str, data: &QuizData) -> ResultLookup {
    let decoded = match urlencoding::decode(raw) {
        Ok(decoded) => decoded,
        Err(_) => return ResultLookup::NotFound,
    };

    if !decoded.contains(NAME_SEPARATOR) {
        return match data.category_by_name(&decoded) {
            Some(category) => ResultLookup::Found(ResultIdentity::Single(category)),
            None => ResultLookup::NotFound,
        };
    }

    let mut categories: Vec<CategoryId> = decoded
        .split(NAME_SEPARATOR)
        .filter_map(|name| data.category_by_name(name))
        .collect();
    categories.sort();
    categories.dedup();

    match categories.len() {
        0 => ResultLookup::NotFound,
        1 => ResultLookup::Found(ResultIdentity::Single(categories[0])),
        _ => ResultLookup::Found(ResultIdentity::Tie(categories)),
    }
}

/// Joins names for prose: `["A", "B", "C"]` becomes `"A, B and C"`.
pub fn join_names<S: AsRef<str>>(names: &[S]) -> String {
    match names {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [init @ .., last] => {
            let init: Vec<&str> = init.iter().map(|n| n.as_ref()).collect();
            format!("{} and {}", init.join(", "), last.as_ref())
        }
    }
}
