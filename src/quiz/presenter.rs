use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use rand::seq::SliceRandom;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, KeyboardButton, KeyboardMarkup, KeyboardRemove, ParseMode};
use teloxide::utils::html;

use super::resolver::join_names;
use super::routes::Route;
use super::{Answer, QuizData, QuizQuestion, ResultEntry};

pub type PresentResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub const START_BUTTON: &str = "Start the quiz";
pub const RESTART_BUTTON: &str = "Take the quiz again";
pub const FRAMEWORK_BUTTON: &str = "About the framework";
pub const CLOSE_BUTTON: &str = "Close";

const TIE_INTRO: &str = "You have a tie between the following archetypes. Each of these roles has its unique strengths, and your results suggest you're a blend of them.";
const NOT_FOUND_TITLE: &str = "Result not found";
const NOT_FOUND_TEXT: &str = "The result you are looking for does not exist.";
const ANSWER_RECEIVED_TEXT: &str = "Got it!";
const PROGRESS_CELLS: usize = 10;

/// Everything the state machine needs to put on screen.
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn show_home(&self, quiz: &QuizData) -> PresentResult;
    /// Answers are shuffled again on every call.
    async fn show_question(&self, question: &QuizQuestion, index: usize, count: usize) -> PresentResult;
    async fn show_result(&self, entry: &ResultEntry, share: &Route) -> PresentResult;
    async fn show_tie(&self, entries: &[&ResultEntry], share: &Route) -> PresentResult;
    async fn show_not_found(&self) -> PresentResult;
    async fn open_framework(&self, text: &str) -> PresentResult;
    async fn close_framework(&self) -> PresentResult;
    async fn disable_answers(&self) -> PresentResult;
    /// Resolves once the outbound transition has played.
    async fn transition_out(&self) -> PresentResult;
}

pub fn shuffled_answers(question: &QuizQuestion) -> Vec<&Answer> {
    let mut answers: Vec<&Answer> = question.answers.iter().collect();
    answers.shuffle(&mut rand::thread_rng());
    answers
}

/// `index` answered out of `count`, as a bar and a percentage.
pub fn progress_text(index: usize, count: usize) -> String {
    if count == 0 {
        return String::new();
    }
    let filled = index.min(count) * PROGRESS_CELLS / count;
    let percent = index.min(count) * 100 / count;
    format!(
        "{}{} {}%",
        "▰".repeat(filled),
        "▱".repeat(PROGRESS_CELLS - filled),
        percent
    )
}

pub fn question_text(question: &QuizQuestion, index: usize, count: usize) -> String {
    format!(
        "Question {} of {}\n{}\n\n{}",
        index + 1,
        count,
        progress_text(index, count),
        html::bold(&html::escape(&question.text))
    )
}

pub fn result_text(entry: &ResultEntry, share: &Route) -> String {
    format!(
        "{}\n\n{}\n\n{}",
        html::bold(&html::escape(&entry.title)),
        html::escape(&entry.description),
        share_text(share)
    )
}

pub fn tie_text(entries: &[&ResultEntry], share: &Route) -> String {
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    let heading = format!("You have a tie between {}!", join_names(&names));

    let mut text = format!("{}\n\n{}", html::bold(&html::escape(&heading)), TIE_INTRO);
    for entry in entries {
        text.push_str(&format!(
            "\n\n{}\n{}",
            html::bold(&html::escape(&entry.name)),
            html::escape(&entry.description)
        ));
    }
    text.push_str("\n\n");
    text.push_str(&share_text(share));
    text
}

fn share_text(share: &Route) -> String {
    format!("Share this result: {}", html::code_inline(&share.to_string()))
}

/// Renders into a Telegram chat. Every screen is a new message carrying its own
/// reply keyboard.
pub struct TelegramPresenter {
    bot: Bot,
    chat: ChatId,
    transition: Duration,
}

impl TelegramPresenter {
    pub fn new(bot: Bot, chat: ChatId, transition: Duration) -> Self {
        Self { bot, chat, transition }
    }

    async fn send(&self, text: String, keyboard: KeyboardMarkup) -> PresentResult {
        self.bot
            .send_message(self.chat, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard)
            .await?;
        Ok(())
    }
}

fn buttons(rows: &[&str]) -> KeyboardMarkup {
    KeyboardMarkup::new(
        rows.iter()
            .map(|text| vec![KeyboardButton::new(*text)])
            .collect::<Vec<_>>(),
    )
}

#[async_trait]
impl Presenter for TelegramPresenter {
    async fn show_home(&self, quiz: &QuizData) -> PresentResult {
        let text = format!(
            "{}\n\n{}",
            html::bold(&html::escape(&quiz.title)),
            html::escape(&quiz.intro)
        );
        self.send(text, buttons(&[START_BUTTON, FRAMEWORK_BUTTON])).await
    }

    async fn show_question(&self, question: &QuizQuestion, index: usize, count: usize) -> PresentResult {
        let mut rows: Vec<&str> = shuffled_answers(question)
            .into_iter()
            .map(|a| a.text.as_str())
            .collect();
        rows.push(FRAMEWORK_BUTTON);

        self.send(question_text(question, index, count), buttons(&rows)).await
    }

    async fn show_result(&self, entry: &ResultEntry, share: &Route) -> PresentResult {
        self.send(result_text(entry, share), buttons(&[RESTART_BUTTON, FRAMEWORK_BUTTON]))
            .await
    }

    async fn show_tie(&self, entries: &[&ResultEntry], share: &Route) -> PresentResult {
        self.send(tie_text(entries, share), buttons(&[RESTART_BUTTON, FRAMEWORK_BUTTON]))
            .await
    }

    async fn show_not_found(&self) -> PresentResult {
        let text = format!("{}\n\n{}", html::bold(NOT_FOUND_TITLE), NOT_FOUND_TEXT);
        self.send(text, buttons(&[RESTART_BUTTON])).await
    }

    async fn open_framework(&self, text: &str) -> PresentResult {
        let text = format!("{}\n\n{}", html::bold("The framework"), html::escape(text));
        self.send(text, buttons(&[CLOSE_BUTTON])).await
    }

    async fn close_framework(&self) -> PresentResult {
        // Going back re-renders the screen underneath
        Ok(())
    }

    async fn disable_answers(&self) -> PresentResult {
        self.bot
            .send_message(self.chat, ANSWER_RECEIVED_TEXT)
            .reply_markup(KeyboardRemove::new())
            .await?;
        Ok(())
    }

    async fn transition_out(&self) -> PresentResult {
        // A missing typing indicator shouldn't hold up the quiz
        if let Err(err) = self.bot.send_chat_action(self.chat, ChatAction::Typing).await {
            debug!("Could not show typing for {}: {}", self.chat.0, err);
        }
        tokio::time::sleep(self.transition).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::tests::sample;
    use crate::quiz::CategoryId;

    #[test]
    fn progress_reflects_answered_questions() {
        assert_eq!(progress_text(0, 10), "▱▱▱▱▱▱▱▱▱▱ 0%");
        assert_eq!(progress_text(3, 10), "▰▰▰▱▱▱▱▱▱▱ 30%");
        assert_eq!(progress_text(1, 3), "▰▰▰▱▱▱▱▱▱▱ 33%");
        assert_eq!(progress_text(3, 3), "▰▰▰▰▰▰▰▰▰▰ 100%");
        assert_eq!(progress_text(0, 0), "");
    }

    #[test]
    fn shuffle_keeps_every_answer() {
        let data = sample();
        let question = data.question(0).unwrap();
        for _ in 0..20 {
            let mut texts: Vec<&str> = shuffled_answers(question).iter().map(|a| a.text.as_str()).collect();
            texts.sort();
            let mut expected: Vec<&str> = question.answers.iter().map(|a| a.text.as_str()).collect();
            expected.sort();
            assert_eq!(texts, expected);
        }
    }

    #[test]
    fn question_text_numbers_from_one() {
        let data = sample();
        let text = question_text(data.question(1).unwrap(), 1, 3);
        assert!(text.starts_with("Question 2 of 3\n"));
        assert!(text.contains("<b>Your favourite kind of work is...</b>"));
    }

    #[test]
    fn tie_text_lists_every_archetype() {
        let data = sample();
        let entries: Vec<&ResultEntry> = [CategoryId::Explorer, CategoryId::TownPlanner, CategoryId::Villager]
            .iter()
            .map(|c| data.result(*c).unwrap())
            .collect();
        let share = Route::ResultFor("Explorer%2CTown%20Planner%2CVillager".to_string());

        let text = tie_text(&entries, &share);

        assert!(text.starts_with("<b>You have a tie between Explorer, Town Planner and Villager!</b>"));
        assert!(text.contains("<b>Town Planner</b>\nYou industrialise."));
        assert!(text.ends_with("<code>/results/Explorer%2CTown%20Planner%2CVillager</code>"));
    }

    #[test]
    fn result_text_escapes_content() {
        let entry = ResultEntry {
            title: "You & me".to_string(),
            name: "X".to_string(),
            description: "<script>".to_string(),
        };
        let text = result_text(&entry, &Route::ResultFor("X".to_string()));
        assert!(text.starts_with("<b>You &amp; me</b>\n\n&lt;script&gt;"));
    }
}
