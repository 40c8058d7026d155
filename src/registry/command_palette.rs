//! Command palette commands and handlers.
//!
//! A symbol command fires when the input starts with its symbol (`=1+2`), a
//! keyword command when the input starts with its keyword and a space
//! (`/web anvil`). Anything else is fuzzy-matched against the command list.

use super::UnlocalizedString;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    SymbolCommand,
    KeywordCommand,
}

impl CommandType {
    /// The argument part of `input` if it addresses `command`
    fn argument<'a>(self, command: &str, input: &'a str) -> Option<&'a str> {
        let rest = input.strip_prefix(command)?;
        match self {
            Self::SymbolCommand => Some(rest),
            Self::KeywordCommand => rest.strip_prefix(' '),
        }
    }

    fn prefix(self, command: &str) -> String {
        match self {
            Self::SymbolCommand => command.to_string(),
            Self::KeywordCommand => format!("{command} "),
        }
    }
}

pub type DisplayCallback = Arc<dyn Fn(&str) -> String + Send + Sync>;
/// Runs the command. `Some` replaces the palette input with the returned text.
pub type ExecuteCallback = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;
pub type QueryCallback = Arc<dyn Fn(&str) -> Vec<QueryResult> + Send + Sync>;

pub struct Command {
    pub kind: CommandType,
    pub command: String,
    pub unlocalized_description: UnlocalizedString,
    pub display: DisplayCallback,
    pub execute: ExecuteCallback,
}

/// Result of a handler query
#[derive(Clone)]
pub struct QueryResult {
    pub name: String,
    pub callback: Arc<dyn Fn(&str) + Send + Sync>,
}

impl QueryResult {
    pub fn new(name: impl Into<String>, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            callback: Arc::new(callback),
        }
    }
}

/// Produces a dynamic list of results for its command prefix
pub struct Handler {
    pub kind: CommandType,
    pub command: String,
    pub query: QueryCallback,
    pub display: DisplayCallback,
}

/// One line shown in the palette
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
    /// Input to place in the palette when the suggestion is picked
    pub completion: String,
    pub score: i64,
}

#[derive(Default)]
pub struct CommandPalette {
    commands: Vec<Command>,
    handlers: Vec<Handler>,
}

impl CommandPalette {
    pub fn add(
        &mut self,
        kind: CommandType,
        command: impl Into<String>,
        unlocalized_description: impl Into<UnlocalizedString>,
        display: impl Fn(&str) -> String + Send + Sync + 'static,
        execute: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) {
        self.commands.push(Command {
            kind,
            command: command.into(),
            unlocalized_description: unlocalized_description.into(),
            display: Arc::new(display),
            execute: Arc::new(execute),
        });
    }

    pub fn add_handler(
        &mut self,
        kind: CommandType,
        command: impl Into<String>,
        query: impl Fn(&str) -> Vec<QueryResult> + Send + Sync + 'static,
        display: impl Fn(&str) -> String + Send + Sync + 'static,
    ) {
        self.handlers.push(Handler {
            kind,
            command: command.into(),
            query: Arc::new(query),
            display: Arc::new(display),
        });
    }

    /// Suggestions for `input`, best first.
    ///
    /// Commands addressed by their prefix rank above fuzzy matches.
    #[must_use]
    pub fn query(&self, input: &str) -> Vec<Suggestion> {
        let matcher = SkimMatcherV2::default();
        let mut suggestions = Vec::new();

        for command in &self.commands {
            if let Some(argument) = command.kind.argument(&command.command, input) {
                suggestions.push(Suggestion {
                    text: (command.display)(argument),
                    completion: input.to_string(),
                    score: i64::MAX,
                });
                continue;
            }

            let haystack = format!("{} {}", command.command, command.unlocalized_description);
            if let Some(score) = matcher.fuzzy_match(&haystack, input) {
                suggestions.push(Suggestion {
                    text: haystack,
                    completion: command.kind.prefix(&command.command),
                    score,
                });
            }
        }

        for handler in &self.handlers {
            if let Some(argument) = handler.kind.argument(&handler.command, input) {
                for result in (handler.query)(argument) {
                    suggestions.push(Suggestion {
                        text: (handler.display)(&result.name),
                        completion: format!("{}{}", handler.kind.prefix(&handler.command), result.name),
                        score: i64::MAX,
                    });
                }
            }
        }

        suggestions.sort_by(|a, b| b.score.cmp(&a.score));
        suggestions
    }

    /// Execute the command or handler addressed by `input`.
    ///
    /// Returns the text to put back into the palette, if the command produced one.
    pub fn execute(&self, input: &str) -> Option<String> {
        if let Some((command, argument)) = self
            .commands
            .iter()
            .find_map(|command| command.kind.argument(&command.command, input).map(|arg| (command, arg)))
        {
            return (command.execute)(argument);
        }

        for handler in &self.handlers {
            if let Some(argument) = handler.kind.argument(&handler.command, input) {
                if let Some(result) = (handler.query)(argument).into_iter().next() {
                    (result.callback)(argument);
                }
                return None;
            }
        }

        None
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.handlers.clear();
    }
}
