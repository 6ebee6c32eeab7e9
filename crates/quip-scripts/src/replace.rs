//! The replace script: lets users amend their previous messages with a
//! regular expression, either through `!replace` or the `s/pat/repl/`
//! shorthand.

use async_trait::async_trait;
use regex::Regex;
use std::collections::{HashMap, VecDeque};

use quip_core::text::shell_split;
use quip_core::{ParamDefault, ParamSpec, Reply, ResolvedParams, Result, Script, ScriptDescriptor};

const SYNTAX: &str = "Syntax: !replace [-l <line> | -s] <pattern> <repl>";

/// Which of the user's cached lines a substitution applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSelector {
    /// The most recent line.
    Latest,
    /// An explicit 1-based index, most recent first.
    Line(usize),
    /// The most recent line the pattern matches at all.
    Search,
}

/// Per-user rolling history of recent messages, most recent first, bounded
/// at `maxlines`.
#[derive(Debug)]
pub struct ReplaceCache {
    cache: HashMap<String, VecDeque<String>>,
    maxlines: usize,
}

impl ReplaceCache {
    pub fn new(maxlines: usize) -> Self {
        Self {
            cache: HashMap::new(),
            maxlines,
        }
    }

    /// Push a line to the front of the user's history, evicting the oldest
    /// beyond the line limit.
    pub fn record(&mut self, user: &str, text: &str) {
        let history = self.cache.entry(user.to_string()).or_default();
        history.push_front(text.to_string());
        history.truncate(self.maxlines);
    }

    /// Apply `pattern` → `replacement` to the selected line. `Ok` is the
    /// substituted text; `Err` is a user-facing explanation, never a panic
    /// or a propagated error.
    pub fn substitute(
        &self,
        user: &str,
        pattern: &str,
        replacement: &str,
        selector: LineSelector,
    ) -> std::result::Result<String, String> {
        let Some(history) = self.cache.get(user) else {
            return Err(format!("I have nothing from you yet, {user}!"));
        };
        let re = Regex::new(pattern)
            .map_err(|_| format!("But {user}, that's not valid regex!"))?;
        let line = match selector {
            LineSelector::Latest => history.front(),
            LineSelector::Line(n) => {
                if n == 0 {
                    None
                } else {
                    history.get(n - 1)
                }
            }
            LineSelector::Search => history.iter().find(|line| re.is_match(line)),
        };
        let line = line.ok_or_else(|| match selector {
            LineSelector::Search => "Unable to find anything that matches pattern!".to_string(),
            _ => "Invalid line number".to_string(),
        })?;
        Ok(re.replace_all(line, replacement).into_owned())
    }
}

// ── The script wrapper ─────────────────────────────────────────

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("shortcut", ParamDefault::Bool(true)),
    ParamSpec::new("maxlength", ParamDefault::Int(200)),
    ParamSpec::new("maxlines", ParamDefault::Int(10)),
];

pub const DESCRIPTOR: ScriptDescriptor = ScriptDescriptor {
    name: "replace",
    params: PARAMS,
    help: Some(
        "!replace [-l <line> | -s] <pattern> <replacement> - Replace pattern \
         from your previous message with replacement. Use the -l flag to \
         select a specific past line, or -s to find the most recent line the \
         pattern applies to. Also triggered by s/<pattern>/<replacement>/[line][s]",
    ),
    factory: Replace::factory,
};

pub struct Replace {
    cache: ReplaceCache,
    shortcut: bool,
    maxlength: usize,
}

struct ReplaceArgs {
    pattern: String,
    replacement: String,
    selector: LineSelector,
}

impl Replace {
    fn factory(params: &ResolvedParams) -> Result<Box<dyn Script>> {
        let shortcut = params.get_bool("shortcut")?;
        let maxlength = params.get_int("maxlength")?.max(0) as usize;
        let maxlines = params.get_int("maxlines")?.max(1) as usize;
        Ok(Box::new(Self {
            cache: ReplaceCache::new(maxlines),
            shortcut,
            maxlength,
        }))
    }

    /// Index of the first unescaped `/` in `text`, or `text.len()`.
    /// Backslash-escaped slashes do not terminate a field.
    fn find_delimiter(text: &str) -> usize {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut i = 0;
        while i < chars.len() {
            match chars[i].1 {
                '\\' => i += 2,
                '/' => return chars[i].0,
                _ => i += 1,
            }
        }
        text.len()
    }

    /// Split on unescaped `/` delimiters, keeping escapes intact.
    fn split_delimiter(mut text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        loop {
            let idx = Self::find_delimiter(text);
            if idx == text.len() {
                tokens.push(text.to_string());
                break;
            }
            tokens.push(text[..idx].to_string());
            text = &text[idx + 1..];
        }
        tokens
    }

    /// First run of digits in the flags field, if any.
    fn first_number(s: &str) -> Option<usize> {
        let digits: String = s
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }

    /// Parse either trigger syntax. `None` means "not our command" (the line
    /// gets recorded instead); `Some(Err(..))` is the syntax reply.
    fn parse(&self, text: &str) -> Option<std::result::Result<ReplaceArgs, String>> {
        if text.len() < 4 {
            return None;
        }
        if self.shortcut && text.starts_with("s/") {
            let tokens = Self::split_delimiter(text);
            if tokens.len() < 3 || tokens[1].is_empty() {
                return None;
            }
            let flags = tokens.get(3).map(String::as_str).unwrap_or("");
            // An explicit line number wins over search mode.
            let selector = match Self::first_number(flags) {
                Some(n) => LineSelector::Line(n),
                None if flags.contains('s') => LineSelector::Search,
                None => LineSelector::Latest,
            };
            return Some(Ok(ReplaceArgs {
                pattern: tokens[1].clone(),
                replacement: tokens[2].clone(),
                selector,
            }));
        }

        let mut words = text.split_whitespace();
        if words.next() != Some("!replace") {
            return None;
        }
        let tail = text.trim_start().strip_prefix("!replace").unwrap_or("");
        let tokens = match shell_split(tail) {
            Ok(tokens) => tokens,
            Err(_) => return Some(Err(SYNTAX.to_string())),
        };

        let mut line = None;
        let mut search = false;
        let mut positional = Vec::new();
        let mut iter = tokens.into_iter();
        while let Some(token) = iter.next() {
            match token.as_str() {
                "-l" | "--line" => {
                    let Some(n) = iter.next().and_then(|t| t.parse::<usize>().ok()) else {
                        return Some(Err(SYNTAX.to_string()));
                    };
                    line = Some(n);
                }
                "-s" | "--search" => search = true,
                _ => positional.push(token),
            }
        }
        // An explicit line number wins over search mode, as in the shorthand.
        let selector = match line {
            Some(n) => LineSelector::Line(n),
            None if search => LineSelector::Search,
            None => LineSelector::Latest,
        };
        let Ok([pattern, replacement]) = <[String; 2]>::try_from(positional) else {
            return Some(Err(SYNTAX.to_string()));
        };
        Some(Ok(ReplaceArgs {
            pattern,
            replacement,
            selector,
        }))
    }

    /// Truncate a substitution result to the abuse limit, marking the cut.
    fn clamp(&self, s: String) -> String {
        if self.maxlength > 0 && s.chars().count() > self.maxlength {
            let kept: String = s.chars().take(self.maxlength).collect();
            format!("{kept}[...]")
        } else {
            s
        }
    }
}

#[async_trait]
impl Script for Replace {
    fn name(&self) -> &'static str {
        "replace"
    }

    async fn on_message(
        &mut self,
        sender: &str,
        _channel: &str,
        text: &str,
    ) -> Result<Option<Reply>> {
        let Some(parsed) = self.parse(text) else {
            self.cache.record(sender, text);
            return Ok(None);
        };
        let reply = match parsed {
            Ok(args) => match self.cache.substitute(
                sender,
                &args.pattern,
                &args.replacement,
                args.selector,
            ) {
                Ok(result) => format!("{sender} meant: {}", self.clamp(result)),
                Err(explanation) => explanation,
            },
            Err(syntax) => syntax,
        };
        Ok(Some(Reply::One(reply)))
    }
}
