/// A recognized user intent, derived from raw message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    InspireMe,
    RandomJoke,
    Help,
    None,
}

/// Keyword phrases in match order. The leading space is part of the phrase:
/// in a channel the keyword follows the bot mention, e.g. `<@U123> help`.
const KEYWORDS: [(&str, Command); 3] = [
    (" inspire me", Command::InspireMe),
    (" random joke", Command::RandomJoke),
    (" help", Command::Help),
];

impl Command {
    /// Case-sensitive substring match; the first phrase found wins.
    pub fn recognize(text: &str) -> Self {
        KEYWORDS
            .iter()
            .find(|(phrase, _)| text.contains(phrase))
            .map(|(_, command)| *command)
            .unwrap_or(Command::None)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::InspireMe => "inspire me",
            Command::RandomJoke => "random joke",
            Command::Help => "help",
            Command::None => "none",
        }
    }
}
