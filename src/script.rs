//! Event scripts for replaying interactions against a page.
//!
//! One command per line; blank lines and `#` comments are skipped.
//!
//! ```text
//! resize 375 800
//! advance 300
//! click .carousel__next
//! input .search-overlay__input tent poles
//! key Escape
//! cleanup cleanupCarousel
//! ```

use std::str::FromStr;

use crate::cleanup::CleanupReport;
use crate::dom::{Dom, ElementId, MemoryDom, Selector, SelectorError};
use crate::runtime::{Event, Page};

/// Errors from parsing or replaying a script.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("line {line}: unknown command `{command}`")]
    UnknownCommand { line: usize, command: String },
    #[error("line {line}: `{command}` expects {expected}")]
    MissingArgument {
        line: usize,
        command: &'static str,
        expected: &'static str,
    },
    #[error("line {line}: `{command}` does not take `{extra}`")]
    TrailingArgument {
        line: usize,
        command: &'static str,
        extra: String,
    },
    #[error("line {line}: invalid number `{value}`")]
    InvalidNumber { line: usize, value: String },
    #[error("line {line}: {source}")]
    Selector {
        line: usize,
        #[source]
        source: SelectorError,
    },
    #[error("line {line}: no element matches `{selector}`")]
    NoMatch { line: usize, selector: String },
    #[error("line {line}: nothing registered as `{hook}`")]
    UnknownHook { line: usize, hook: String },
}

/// An element picked by selector; the first match in document order is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub raw: String,
    pub selector: Selector,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Scroll(f64),
    Resize { width: f64, height: f64 },
    Advance(u64),
    Click(Target),
    Touch(Target),
    Enter(Target),
    Leave(Target),
    Load(Target),
    Input { target: Target, text: String },
    Submit(Target),
    Key(String),
    Cleanup(String),
    Teardown,
}

/// A command with the line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub line: usize,
    pub command: Command,
}

/// What a replay did.
#[derive(Debug, Default)]
pub struct ScriptOutcome {
    pub steps: usize,
    /// Reports from `cleanup` and `teardown` commands, in order.
    pub cleanups: Vec<CleanupReport>,
}

impl ScriptOutcome {
    /// Names of every teardown that failed during the replay.
    pub fn failed(&self) -> Vec<&str> {
        self.cleanups
            .iter()
            .flat_map(|r| r.failed.iter().map(String::as_str))
            .collect()
    }
}

struct Args<'a> {
    line: usize,
    command: &'static str,
    rest: &'a str,
}

impl<'a> Args<'a> {
    fn word(&mut self, expected: &'static str) -> Result<&'a str, ScriptError> {
        let rest = self.rest.trim_start();
        if rest.is_empty() {
            return Err(ScriptError::MissingArgument {
                line: self.line,
                command: self.command,
                expected,
            });
        }
        let (word, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        self.rest = tail;
        Ok(word)
    }

    fn number<T: FromStr>(&mut self, expected: &'static str) -> Result<T, ScriptError> {
        let word = self.word(expected)?;
        word.parse().map_err(|_| ScriptError::InvalidNumber {
            line: self.line,
            value: word.to_string(),
        })
    }

    /// Next word as a selector, for commands that take more after it.
    fn target(&mut self) -> Result<Target, ScriptError> {
        let raw = self.word("a selector")?;
        self.selector(raw)
    }

    /// The rest of the line as one selector, so lists like `img, .hero`
    /// and unsupported combinators are seen whole.
    fn whole_target(&mut self) -> Result<Target, ScriptError> {
        let raw = self.remainder();
        if raw.is_empty() {
            return Err(ScriptError::MissingArgument {
                line: self.line,
                command: self.command,
                expected: "a selector",
            });
        }
        self.rest = "";
        self.selector(raw)
    }

    fn selector(&self, raw: &str) -> Result<Target, ScriptError> {
        let selector = Selector::parse(raw).map_err(|source| ScriptError::Selector {
            line: self.line,
            source,
        })?;
        Ok(Target {
            raw: raw.to_string(),
            selector,
        })
    }

    fn remainder(&self) -> &'a str {
        self.rest.trim()
    }

    fn finish(&self) -> Result<(), ScriptError> {
        match self.remainder() {
            "" => Ok(()),
            extra => Err(ScriptError::TrailingArgument {
                line: self.line,
                command: self.command,
                extra: extra.to_string(),
            }),
        }
    }
}

fn parse_line(line: usize, text: &str) -> Result<Command, ScriptError> {
    let (name, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    let command: &'static str = match name {
        "scroll" => "scroll",
        "resize" => "resize",
        "advance" => "advance",
        "click" => "click",
        "touch" => "touch",
        "enter" => "enter",
        "leave" => "leave",
        "load" => "load",
        "input" => "input",
        "submit" => "submit",
        "key" => "key",
        "cleanup" => "cleanup",
        "teardown" => "teardown",
        other => {
            return Err(ScriptError::UnknownCommand {
                line,
                command: other.to_string(),
            });
        }
    };
    let mut args = Args { line, command, rest };
    let parsed = match command {
        "scroll" => Command::Scroll(args.number("an offset")?),
        "resize" => Command::Resize {
            width: args.number("a width and height")?,
            height: args.number("a width and height")?,
        },
        "advance" => Command::Advance(args.number("milliseconds")?),
        "click" => Command::Click(args.whole_target()?),
        "touch" => Command::Touch(args.whole_target()?),
        "enter" => Command::Enter(args.whole_target()?),
        "leave" => Command::Leave(args.whole_target()?),
        "load" => Command::Load(args.whole_target()?),
        "input" => {
            let target = args.target()?;
            let text = args.remainder().to_string();
            args.rest = "";
            Command::Input { target, text }
        }
        "submit" => Command::Submit(args.whole_target()?),
        "key" => Command::Key(args.word("a key name")?.to_string()),
        "cleanup" => Command::Cleanup(args.word("a component or hook name")?.to_string()),
        _ => Command::Teardown,
    };
    args.finish()?;
    Ok(parsed)
}

/// Parse a whole script.
///
/// # Errors
/// Returns the first malformed line.
pub fn parse_script(text: &str) -> Result<Vec<Step>, ScriptError> {
    text.lines()
        .enumerate()
        .map(|(i, raw)| (i + 1, raw.trim()))
        .filter(|(_, raw)| !raw.is_empty() && !raw.starts_with('#'))
        .map(|(line, raw)| parse_line(line, raw).map(|command| Step { line, command }))
        .collect()
}

fn resolve(page: &Page, line: usize, target: &Target) -> Result<ElementId, ScriptError> {
    let dom = page.dom();
    dom.query(dom.document_element(), &target.selector)
        .ok_or_else(|| ScriptError::NoMatch {
            line,
            selector: target.raw.clone(),
        })
}

/// Replay `steps` against `page`.
///
/// # Errors
/// Stops at the first step whose selector matches nothing or whose cleanup
/// hook is unknown.
pub fn run_script(page: &mut Page, steps: &[Step]) -> Result<ScriptOutcome, ScriptError> {
    let mut outcome = ScriptOutcome::default();
    for step in steps {
        let line = step.line;
        tracing::debug!(line, command = ?step.command, "script step");
        match &step.command {
            Command::Scroll(y) => page.scroll_to(*y),
            Command::Resize { width, height } => page.resize(*width, *height),
            Command::Advance(ms) => page.advance(*ms),
            Command::Click(t) => {
                let el = resolve(page, line, t)?;
                page.dispatch(Event::Click(el));
            }
            Command::Touch(t) => {
                let el = resolve(page, line, t)?;
                page.dispatch(Event::TouchStart(el));
            }
            Command::Enter(t) => {
                let el = resolve(page, line, t)?;
                page.dispatch(Event::PointerEnter(el));
            }
            Command::Leave(t) => {
                let el = resolve(page, line, t)?;
                page.dispatch(Event::PointerLeave(el));
            }
            Command::Load(t) => {
                let el = resolve(page, line, t)?;
                if let Some(dom) = page.host_mut::<MemoryDom>() {
                    dom.set_complete(el, true);
                }
                page.dispatch(Event::Load(el));
            }
            Command::Input { target, text } => {
                let el = resolve(page, line, target)?;
                page.dom_mut().set_value(el, text);
                page.dispatch(Event::Input(el));
            }
            Command::Submit(t) => {
                let el = resolve(page, line, t)?;
                page.dispatch(Event::Submit(el));
            }
            Command::Key(key) => page.dispatch(Event::KeyDown(key.clone())),
            Command::Cleanup(hook) => {
                let report = page.cleanup(hook).ok_or_else(|| ScriptError::UnknownHook {
                    line,
                    hook: hook.clone(),
                })?;
                outcome.cleanups.push(report);
            }
            Command::Teardown => outcome.cleanups.push(page.teardown()),
        }
        outcome.steps += 1;
    }
    Ok(outcome)
}
