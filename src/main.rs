mod config;
mod quiz;

use std::sync::Arc;

use dotenv::dotenv;
use log::{error, info, warn};
use quiz::{
    navigator::{Event, Navigator, Screen, Session},
    persistence::QuizStateStore,
    presenter::{TelegramPresenter, CLOSE_BUTTON, FRAMEWORK_BUTTON, RESTART_BUTTON, START_BUTTON},
    routes::Route,
    session::SessionRunner,
    QuizData,
};
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, SqliteStorage, Storage},
    prelude::*,
    types::KeyboardRemove,
    utils::command::BotCommands,
};

use crate::config::Config;

type SessionDialogue = Dialogue<Session, ErasedStorage<Session>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Shown in the command menu. Every command is also a route.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "You can also send any of these paths:")]
enum Command {
    #[command(description = "go to the start screen")]
    Start,
    #[command(description = "start or continue the quiz")]
    Quiz,
    #[command(description = "see your result")]
    Results,
    #[command(description = "read about the framework")]
    Framework,
    #[command(description = "close the framework")]
    Close,
}

struct App {
    navigator: Navigator,
    store: QuizStateStore,
    config: Config,
}

#[tokio::main]
async fn main() {
    let dotenv_loaded = dotenv().is_ok();

    pretty_env_logger::init();
    info!("Starting archetype quiz bot...");
    if !dotenv_loaded {
        warn!("No .env file found, using the process environment only");
    }

    let config = Config::from_env().expect("Invalid configuration");
    let bot = Bot::from_env();

    info!("Loading quiz data from {}", config.data_path.display());
    let quiz = match QuizData::load(&config.data_path) {
        Ok(quiz) => quiz,
        Err(err) => {
            error!("Could not load the quiz: {}", err);
            run_unavailable(bot).await;
            return;
        }
    };
    info!("Loaded {} questions", quiz.question_count());

    info!("Opening progress storage at {}", config.db_path);
    let progress: Arc<ErasedStorage<String>> = SqliteStorage::open(&config.db_path, Json)
        .await
        .expect("Failed to open progress storage")
        .erase();

    info!("Opening session storage at {}", config.session_db_path);
    let sessions = open_sessions(&config.session_db_path)
        .await
        .expect("Failed to open session storage");

    if let Err(err) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Could not register bot commands: {}", err);
    }

    let app = Arc::new(App {
        navigator: Navigator::new(Arc::new(quiz)),
        store: QuizStateStore::new(progress),
        config,
    });

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<Session>, Session>()
            .endpoint(handle_message),
    )
    .dependencies(dptree::deps![app, sessions])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
}

/// Both storages use teloxide's dialogue table, so sessions get a file of their own.
async fn open_sessions(path: &str) -> Result<Arc<ErasedStorage<Session>>, Box<dyn std::error::Error + Send + Sync>> {
    Ok(SqliteStorage::open(path, Json).await?.erase())
}

const DATA_UNAVAILABLE_TEXT: &str = "Error\n\nCould not load the quiz. Please try again later.";

/// Without quiz data there is nothing to route to, so every message gets the same reply.
async fn run_unavailable(bot: Bot) {
    Dispatcher::builder(bot, Update::filter_message().endpoint(reply_unavailable))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn reply_unavailable(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, DATA_UNAVAILABLE_TEXT)
        .reply_markup(KeyboardRemove::new())
        .await?;
    Ok(())
}

/// What an incoming message asks for.
#[derive(Debug, PartialEq)]
enum Input {
    Visit(Route),
    Act(Event),
}

const DISMISS_KEYS: [&str; 3] = ["escape", "esc", "/close"];

fn translate(text: &str, session: &Session, quiz: &QuizData) -> Option<Input> {
    let text = text.trim();
    match text {
        START_BUTTON => return Some(Input::Act(Event::Start)),
        RESTART_BUTTON => return Some(Input::Act(Event::Restart)),
        FRAMEWORK_BUTTON => return Some(Input::Visit(Route::Framework)),
        CLOSE_BUTTON => return Some(Input::Act(Event::CloseFramework)),
        _ => {}
    }
    if DISMISS_KEYS.contains(&text.to_lowercase().as_str()) {
        return Some(Input::Act(Event::CloseFramework));
    }

    if let Screen::Question(n) = session.screen {
        let answer = quiz
            .question(n.saturating_sub(1))
            .and_then(|question| question.answer_by_text(text));
        if let Some(answer) = answer {
            return Some(Input::Act(Event::Answer(answer.category)));
        }
    }

    if text.starts_with('/') || text.starts_with("#!") {
        return Some(Input::Visit(Route::parse(text)));
    }
    None
}

const TEXT_ONLY_TEXT: &str = "Please send text or use the buttons below.";
const CHOOSE_OPTION_TEXT: &str = "Please choose one of the options, or send /start to begin.";

async fn handle_message(
    bot: Bot,
    dialogue: SessionDialogue,
    session: Session,
    msg: Message,
    app: Arc<App>,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, TEXT_ONLY_TEXT).await?;
        return Ok(());
    };

    let Some(input) = translate(text, &session, app.navigator.quiz()) else {
        bot.send_message(msg.chat.id, CHOOSE_OPTION_TEXT).await?;
        return Ok(());
    };

    let presenter = TelegramPresenter::new(bot.clone(), msg.chat.id, app.config.transition);
    let runner = SessionRunner::new(
        &app.navigator,
        &app.store,
        &presenter,
        msg.chat.id,
        app.config.transition_timeout,
    );

    let session = match input {
        Input::Visit(route) => runner.visit(session, route).await?,
        Input::Act(event) => runner.dispatch(session, event).await?,
    };

    dialogue.update(session).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::tests::sample;
    use crate::quiz::CategoryId;

    fn on_question(n: usize) -> Session {
        Session {
            screen: Screen::Question(n),
            ..Session::default()
        }
    }

    #[test]
    fn buttons_become_actions() {
        let quiz = sample();
        let session = Session::default();
        assert_eq!(translate(START_BUTTON, &session, &quiz), Some(Input::Act(Event::Start)));
        assert_eq!(translate(RESTART_BUTTON, &session, &quiz), Some(Input::Act(Event::Restart)));
        assert_eq!(
            translate(FRAMEWORK_BUTTON, &session, &quiz),
            Some(Input::Visit(Route::Framework))
        );
    }

    #[test]
    fn dismiss_keys_close_the_overlay() {
        let quiz = sample();
        for key in [CLOSE_BUTTON, "Escape", "esc", "/close"] {
            assert_eq!(
                translate(key, &Session::default(), &quiz),
                Some(Input::Act(Event::CloseFramework)),
                "{key}"
            );
        }
    }

    #[test]
    fn answer_text_matches_only_the_current_question() {
        let quiz = sample();
        assert_eq!(
            translate("Growing", &on_question(2), &quiz),
            Some(Input::Act(Event::Answer(CategoryId::Villager)))
        );
        assert_eq!(translate("Growing", &on_question(1), &quiz), None);
        assert_eq!(translate("Growing", &Session::default(), &quiz), None);
    }

    #[tokio::test]
    async fn mid_quiz_session_survives_a_restart() {
        let path = std::env::temp_dir()
            .join(format!("quiz-sessions-restart-{}.sqlite", std::process::id()))
            .to_string_lossy()
            .into_owned();
        let chat = ChatId(5);

        let storage = open_sessions(&path).await.unwrap();
        storage.update_dialogue(chat, on_question(2)).await.unwrap();

        let reopened = open_sessions(&path).await.unwrap();
        let session = reopened.get_dialogue(chat).await.unwrap().unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(session, on_question(2));
        assert_eq!(
            translate("Growing", &session, &sample()),
            Some(Input::Act(Event::Answer(CategoryId::Villager)))
        );
    }

    #[test]
    fn paths_become_visits() {
        let quiz = sample();
        let session = Session::default();
        assert_eq!(
            translate("/quiz/2", &session, &quiz),
            Some(Input::Visit(Route::Question(2)))
        );
        assert_eq!(
            translate("#!/results/Explorer", &session, &quiz),
            Some(Input::Visit(Route::ResultFor("Explorer".to_string())))
        );
        assert_eq!(
            translate("/whatever", &session, &quiz),
            Some(Input::Visit(Route::Unknown("/whatever".to_string())))
        );
    }
}
