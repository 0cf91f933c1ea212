use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, error, warn};
use teloxide::types::ChatId;

use super::navigator::{Effect, Event, Navigator, Session};
use super::persistence::QuizStateStore;
use super::presenter::{PresentResult, Presenter};
use super::resolver::{self, ResultIdentity};
use super::routes::Route;
use super::ResultEntry;

/// Upper bound on events handled for a single update, so a redirect cycle can't spin forever.
const MAX_EVENTS_PER_DISPATCH: usize = 32;

/// Carries out the navigator's effects for one chat: storage writes, history,
/// rendering and awaiting transitions.
pub struct SessionRunner<'a, P: Presenter> {
    navigator: &'a Navigator,
    store: &'a QuizStateStore,
    presenter: &'a P,
    chat: ChatId,
    transition_timeout: Duration,
}

impl<'a, P: Presenter> SessionRunner<'a, P> {
    pub fn new(
        navigator: &'a Navigator,
        store: &'a QuizStateStore,
        presenter: &'a P,
        chat: ChatId,
        transition_timeout: Duration,
    ) -> Self {
        Self {
            navigator,
            store,
            presenter,
            chat,
            transition_timeout,
        }
    }

    /// The user opened `route` directly.
    pub async fn visit(&self, mut session: Session, route: Route) -> Result<Session, Box<dyn std::error::Error + Send + Sync>> {
        session.history.push(route.clone());
        let event = self.enter(route).await;
        self.dispatch(session, event).await
    }

    /// Feeds `event` to the navigator and keeps going until no follow-up
    /// events remain. Returns the session to keep for the next update.
    pub async fn dispatch(&self, mut session: Session, event: Event) -> Result<Session, Box<dyn std::error::Error + Send + Sync>> {
        let mut queue = VecDeque::from([event]);
        let mut handled = 0;

        while let Some(event) = queue.pop_front() {
            handled += 1;
            if handled > MAX_EVENTS_PER_DISPATCH {
                error!("Chat {} exceeded {} events in one update, stopping", self.chat.0, MAX_EVENTS_PER_DISPATCH);
                break;
            }

            let transition = self.navigator.handle(session, event);
            session = transition.session;

            for effect in transition.effects {
                if let Some(next) = self.apply(&mut session, effect).await? {
                    queue.push_back(next);
                }
            }
        }

        Ok(session)
    }

    async fn apply(&self, session: &mut Session, effect: Effect) -> Result<Option<Event>, Box<dyn std::error::Error + Send + Sync>> {
        debug!("Chat {}: {:?}", self.chat.0, effect);
        let quiz = self.navigator.quiz();

        match effect {
            Effect::ShowHome => self.presenter.show_home(quiz).await?,
            Effect::ShowQuestion { index } => match quiz.question(index) {
                Some(question) => {
                    self.presenter
                        .show_question(question, index, quiz.question_count())
                        .await?
                }
                None => warn!("No question at index {}", index),
            },
            Effect::ShowResult(identity) => self.show_result(&identity).await?,
            Effect::ShowNotFound => self.presenter.show_not_found().await?,
            Effect::OpenFramework => self.presenter.open_framework(&quiz.framework).await?,
            Effect::CloseFramework => self.presenter.close_framework().await?,
            Effect::DisableAnswers => self.presenter.disable_answers().await?,
            Effect::TransitionOut => {
                self.await_transition().await?;
                return Ok(Some(Event::TransitionFinished));
            }
            Effect::Persist(state) => self.store.save(self.chat, &state).await,
            Effect::ClearPersisted => self.store.clear(self.chat).await,
            Effect::Navigate(route) => {
                session.history.push(route.clone());
                return Ok(Some(self.enter(route).await));
            }
            Effect::Redirect(route) => {
                session.history.replace(route.clone());
                return Ok(Some(self.enter(route).await));
            }
            Effect::Back => {
                let route = match session.history.back() {
                    Some(route) => route,
                    None => {
                        session.history.push(Route::Home);
                        Route::Home
                    }
                };
                return Ok(Some(self.enter(route).await));
            }
        }

        Ok(None)
    }

    async fn enter(&self, route: Route) -> Event {
        let persisted = self.store.load(self.chat).await;
        Event::Enter { route, persisted }
    }

    async fn await_transition(&self) -> PresentResult {
        match tokio::time::timeout(self.transition_timeout, self.presenter.transition_out()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Transition for chat {} did not finish within {:?}, moving on",
                    self.chat.0, self.transition_timeout
                );
                Ok(())
            }
        }
    }

    async fn show_result(&self, identity: &ResultIdentity) -> PresentResult {
        let quiz = self.navigator.quiz();
        let share = Route::ResultFor(resolver::encode(identity, quiz));

        let entries: Vec<&ResultEntry> = identity
            .categories()
            .into_iter()
            .filter_map(|c| quiz.result(c))
            .collect();

        match entries.as_slice() {
            [] => self.presenter.show_not_found().await,
            [single] => self.presenter.show_result(single, &share).await,
            _ => self.presenter.show_tie(&entries, &share).await,
        }
    }
}
