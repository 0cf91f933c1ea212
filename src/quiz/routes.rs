use std::fmt;

/// Addressable screens. Users reach them by sending the path as a message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Route {
    Home,
    QuizStart,
    /// 1-based question number; 0 when the path segment was not a number.
    Question(usize),
    Results,
    /// Percent-encoded result identity, exactly as it appeared in the path.
    ResultFor(String),
    Framework,
    Unknown(String),
}

impl Route {
    pub fn parse(text: &str) -> Route {
        let text = text.trim();
        let path = text.strip_prefix("#!").unwrap_or(text);
        let path = match path.strip_suffix('/') {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => path,
        };

        let Some(path) = path.strip_prefix('/') else {
            return Route::Unknown(text.to_string());
        };

        let segments: Vec<&str> = path.split('/').collect();
        match segments.as_slice() {
            [""] | ["index"] | ["start"] => Route::Home,
            ["quiz"] => Route::QuizStart,
            ["quiz", n] => Route::Question(n.parse().unwrap_or(0)),
            ["results"] => Route::Results,
            ["results", identity] if !identity.is_empty() => Route::ResultFor(identity.to_string()),
            ["framework"] => Route::Framework,
            _ => Route::Unknown(text.to_string()),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => write!(f, "/"),
            Route::QuizStart => write!(f, "/quiz"),
            Route::Question(n) => write!(f, "/quiz/{}", n),
            Route::Results => write!(f, "/results"),
            Route::ResultFor(identity) => write!(f, "/results/{}", identity),
            Route::Framework => write!(f, "/framework"),
            Route::Unknown(path) => write!(f, "{}", path),
        }
    }
}

const MAX_HISTORY: usize = 64;

/// Back-stack of visited routes for one chat. The oldest entries fall off
/// once it grows past `MAX_HISTORY`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct History {
    entries: Vec<Route>,
}

impl History {
    pub fn current(&self) -> Option<&Route> {
        self.entries.last()
    }

    pub fn push(&mut self, route: Route) {
        if self.entries.len() >= MAX_HISTORY {
            self.entries.remove(0);
        }
        self.entries.push(route);
    }

    /// Replaces the current entry, like a redirect.
    pub fn replace(&mut self, route: Route) {
        self.entries.pop();
        self.entries.push(route);
    }

    /// Drops the current entry and returns the one before it.
    pub fn back(&mut self) -> Option<Route> {
        self.entries.pop();
        self.entries.last().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_route() {
        let cases = [
            ("/", Route::Home),
            ("/index", Route::Home),
            ("/start", Route::Home),
            ("/quiz", Route::QuizStart),
            ("/quiz/3", Route::Question(3)),
            ("/quiz/abc", Route::Question(0)),
            ("/quiz/-2", Route::Question(0)),
            ("/results", Route::Results),
            ("/results/Explorer%2CVillager", Route::ResultFor("Explorer%2CVillager".to_string())),
            ("/framework", Route::Framework),
        ];
        for (text, route) in cases {
            assert_eq!(Route::parse(text), route, "{text}");
        }
    }

    #[test]
    fn accepts_hashbang_and_trailing_slash() {
        assert_eq!(Route::parse("#!/quiz/2"), Route::Question(2));
        assert_eq!(Route::parse("/results/"), Route::Results);
        assert_eq!(Route::parse("  /framework  "), Route::Framework);
        assert_eq!(Route::parse("#!/"), Route::Home);
    }

    #[test]
    fn anything_else_is_unknown() {
        for text in ["/nope", "quiz/1", "/quiz/1/2", "/results/a/b", "hello", ""] {
            assert!(matches!(Route::parse(text), Route::Unknown(_)), "{text}");
        }
    }

    #[test]
    fn display_round_trips_known_routes() {
        for route in [
            Route::Home,
            Route::QuizStart,
            Route::Question(7),
            Route::Results,
            Route::ResultFor("Town%20Planner".to_string()),
            Route::Framework,
        ] {
            assert_eq!(Route::parse(&route.to_string()), route);
        }
    }

    #[test]
    fn history_goes_back_one_step() {
        let mut history = History::default();
        history.push(Route::Home);
        history.push(Route::Question(1));
        history.replace(Route::Question(2));
        history.push(Route::Framework);

        assert_eq!(history.back(), Some(Route::Question(2)));
        assert_eq!(history.back(), Some(Route::Home));
        assert_eq!(history.back(), None);
        assert_eq!(history.current(), None);
    }

    #[test]
    fn history_is_bounded() {
        let mut history = History::default();
        for n in 0..MAX_HISTORY + 10 {
            history.push(Route::Question(n));
        }
        assert_eq!(history.entries.len(), MAX_HISTORY);
        assert_eq!(history.entries[0], Route::Question(10));
        assert_eq!(history.current(), Some(&Route::Question(MAX_HISTORY + 9)));
    }
}
