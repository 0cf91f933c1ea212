use std::sync::Arc;

use log::{debug, info};

use super::resolver::{self, ResultIdentity, ResultLookup};
use super::routes::{History, Route};
use super::scoring::ScoreState;
use super::{CategoryId, QuizData};

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Screen {
    #[default]
    Home,
    /// 1-based question number.
    Question(usize),
    Results(ResultScreen),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ResultScreen {
    /// Computed from the tally; a redirect to the canonical route follows.
    Pending,
    Found(ResultIdentity),
    NotFound,
}

/// Everything the navigator knows about one chat between two updates.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Session {
    pub screen: Screen,
    /// The framework overlay sits on top of `screen` without replacing it.
    pub framework_open: bool,
    pub scores: ScoreState,
    /// Answer waiting for its transition-out to finish. Further answers are
    /// ignored while this is set.
    pub pending_answer: Option<CategoryId>,
    pub history: History,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    Restart,
    /// A route was reached. `persisted` is whatever the store held at that moment.
    Enter {
        route: Route,
        persisted: Option<ScoreState>,
    },
    Answer(CategoryId),
    TransitionFinished,
    CloseFramework,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ShowHome,
    ShowQuestion { index: usize },
    ShowResult(ResultIdentity),
    ShowNotFound,
    OpenFramework,
    CloseFramework,
    DisableAnswers,
    TransitionOut,
    Persist(ScoreState),
    ClearPersisted,
    Navigate(Route),
    Redirect(Route),
    Back,
}

#[derive(Debug)]
pub struct Transition {
    pub session: Session,
    pub effects: Vec<Effect>,
}

/// The quiz state machine. `handle` does no I/O: it returns the next session and
/// the effects the caller has to carry out, in order.
pub struct Navigator {
    quiz: Arc<QuizData>,
}

impl Navigator {
    pub fn new(quiz: Arc<QuizData>) -> Self {
        Self { quiz }
    }

    pub fn quiz(&self) -> &QuizData {
        &self.quiz
    }

    pub fn handle(&self, mut session: Session, event: Event) -> Transition {
        debug!("Handling {:?} on {:?}", event, session.screen);
        let mut effects = Vec::new();

        match event {
            Event::Start => {
                session.scores.reset();
                session.pending_answer = None;
                effects.push(Effect::ClearPersisted);
                effects.push(Effect::Navigate(Route::Question(1)));
            }
            Event::Restart => effects.push(Effect::Navigate(Route::Home)),
            Event::Enter { route, persisted } => self.enter(&mut session, route, persisted, &mut effects),
            Event::Answer(category) => self.answer(&mut session, category, &mut effects),
            Event::TransitionFinished => self.advance(&mut session, &mut effects),
            Event::CloseFramework => {
                if session.framework_open {
                    session.framework_open = false;
                    effects.push(Effect::CloseFramework);
                    effects.push(Effect::Back);
                }
            }
        }

        Transition { session, effects }
    }

    fn enter(&self, session: &mut Session, route: Route, persisted: Option<ScoreState>, effects: &mut Vec<Effect>) {
        if route != Route::Framework && session.framework_open {
            session.framework_open = false;
            effects.push(Effect::CloseFramework);
        }

        match route {
            Route::Home => {
                session.screen = Screen::Home;
                effects.push(Effect::ShowHome);
            }
            Route::QuizStart => effects.push(Effect::Redirect(Route::Question(1))),
            Route::Question(n) => self.enter_question(session, n, persisted, effects),
            Route::Results => self.compute_results(session, persisted, effects),
            Route::ResultFor(raw) => {
                let screen = match resolver::decode(&raw, &self.quiz) {
                    ResultLookup::Found(identity) => {
                        effects.push(Effect::ShowResult(identity.clone()));
                        ResultScreen::Found(identity)
                    }
                    ResultLookup::NotFound => {
                        effects.push(Effect::ShowNotFound);
                        ResultScreen::NotFound
                    }
                };
                session.screen = Screen::Results(screen);
                effects.push(Effect::ClearPersisted);
            }
            Route::Framework => {
                session.framework_open = true;
                effects.push(Effect::OpenFramework);
            }
            Route::Unknown(path) => {
                info!("Unrecognized route: {}", path);
                effects.push(Effect::Redirect(Route::Home));
            }
        }
    }

    fn enter_question(&self, session: &mut Session, n: usize, persisted: Option<ScoreState>, effects: &mut Vec<Effect>) {
        let count = self.quiz.question_count();
        if n < 1 || n > count {
            effects.push(Effect::Redirect(Route::Question(1)));
            return;
        }

        let index = n - 1;
        // Direct navigation wins over saved progress for another question
        session.scores = match persisted {
            Some(saved) if saved.current_question_index == index => saved,
            _ => ScoreState::starting_at(index),
        };
        session.pending_answer = None;
        session.screen = Screen::Question(n);

        effects.push(Effect::ShowQuestion { index });
        effects.push(Effect::Persist(session.scores.clone()));
    }

    fn compute_results(&self, session: &mut Session, persisted: Option<ScoreState>, effects: &mut Vec<Effect>) {
        let has_saved = persisted.is_some();
        if let Some(saved) = persisted {
            session.scores = saved;
        }

        if !has_saved && session.scores.current_question_index < self.quiz.question_count() {
            debug!("Results requested without a finished quiz");
            effects.push(Effect::Redirect(Route::Home));
            return;
        }

        let identity = resolver::resolve(&session.scores);
        session.screen = Screen::Results(ResultScreen::Pending);
        effects.push(Effect::ClearPersisted);
        effects.push(Effect::Redirect(Route::ResultFor(resolver::encode(&identity, &self.quiz))));
    }

    fn answer(&self, session: &mut Session, category: CategoryId, effects: &mut Vec<Effect>) {
        // The overlay covers the question, so its answers can't be picked
        let answerable = matches!(session.screen, Screen::Question(_))
            && !session.framework_open
            && session.pending_answer.is_none()
            && session.scores.current_question_index < self.quiz.question_count();
        if !answerable {
            debug!("Ignoring answer {} on {:?}", category, session.screen);
            return;
        }

        session.pending_answer = Some(category);
        effects.push(Effect::DisableAnswers);
        effects.push(Effect::TransitionOut);
    }

    fn advance(&self, session: &mut Session, effects: &mut Vec<Effect>) {
        let Some(category) = session.pending_answer.take() else {
            return;
        };

        session.scores.record_answer(category);
        effects.push(Effect::Persist(session.scores.clone()));

        let index = session.scores.current_question_index;
        if index >= self.quiz.question_count() {
            effects.push(Effect::Navigate(Route::Results));
        } else {
            effects.push(Effect::Navigate(Route::Question(index + 1)));
        }
    }
}
