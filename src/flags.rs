//! Custom flag value types
//!
//! These plug into clap through `Arg::value_parser`, e.g.
//! `Arg::new("tags").long("tags").value_parser(TagList::from_str)`.

use std::ops::Deref;
use std::str::FromStr;

use clap::ArgMatches;
use clap::parser::ValueSource;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlagError {
    #[error("unterminated {0} string")]
    Unterminated(char),
}

/// Split `s` into whitespace-separated fields. A field that starts with a
/// single or double quote runs to the next matching quote and keeps any
/// whitespace inside it. There are no escape sequences.
///
/// # Errors
///
/// Returns `FlagError::Unterminated` when a quoted field has no closing quote.
pub fn split_quoted(s: &str) -> Result<Vec<String>, FlagError> {
    let is_space = |c: char| matches!(c, ' ' | '\t' | '\n' | '\r');
    let mut fields = Vec::new();
    let mut rest = s;
    loop {
        rest = rest.trim_start_matches(is_space);
        let Some(first) = rest.chars().next() else {
            break;
        };
        if first == '\'' || first == '"' {
            let body = &rest[1..];
            let end = body.find(first).ok_or(FlagError::Unterminated(first))?;
            fields.push(body[..end].to_string());
            rest = &body[end + 1..];
            continue;
        }
        let end = rest.find(is_space).unwrap_or(rest.len());
        fields.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    Ok(fields)
}

/// A flag holding a space-separated list of possibly-quoted strings.
///
/// Parsing the empty string yields an empty list, so an `Option<QuotedList>`
/// tells "given but empty" apart from "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotedList(pub Vec<String>);

impl FromStr for QuotedList {
    type Err = FlagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        split_quoted(s).map(QuotedList)
    }
}

impl Deref for QuotedList {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

/// A comma-separated tag list (`a,b,c`).
///
/// Input containing a space or a single quote is read with the older
/// quoted-list syntax instead (`'a b c'`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagList(pub Vec<String>);

impl FromStr for TagList {
    type Err = FlagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(' ') || s.contains('\'') {
            return split_quoted(s).map(TagList);
        }
        Ok(TagList(
            s.split(',')
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
        ))
    }
}

impl Deref for TagList {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

/// A string flag that remembers whether it was explicitly set to a non-empty value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitString {
    pub value: String,
    pub explicit: bool,
}

impl ExplicitString {
    #[must_use]
    pub fn new(default: &str) -> Self {
        ExplicitString {
            value: default.to_string(),
            explicit: false,
        }
    }

    pub fn set(&mut self, value: &str) {
        self.value = value.to_string();
        if !value.is_empty() {
            self.explicit = true;
        }
    }

    /// Read flag `id` from parsed matches. Only a value typed on the command
    /// line counts as a `set`; clap defaults leave the flag at `default`.
    #[must_use]
    pub fn from_matches(matches: &ArgMatches, id: &str, default: &str) -> Self {
        let mut flag = ExplicitString::new(default);
        if let Ok(Some(value)) = matches.try_get_one::<String>(id)
            && matches.value_source(id) == Some(ValueSource::CommandLine)
        {
            flag.set(value);
        }
        flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, Command};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_split_quoted_empty_is_empty_list() {
        let empty = QuotedList(vec![]);
        assert_eq!(QuotedList::from_str("").unwrap(), empty);
        assert_eq!(QuotedList::from_str("  \t ").unwrap(), empty);
    }

    #[test]
    fn test_split_quoted_keeps_quoted_field() {
        assert_eq!(split_quoted("'a b' c").unwrap(), strings(&["a b", "c"]));
        assert_eq!(
            split_quoted(r#"-ldflags "-X main.v=1" -v"#).unwrap(),
            strings(&["-ldflags", "-X main.v=1", "-v"])
        );
        assert_eq!(split_quoted("''").unwrap(), strings(&[""]));
    }

    #[test]
    fn test_split_quoted_unterminated() {
        assert_eq!(split_quoted("a 'b c"), Err(FlagError::Unterminated('\'')));
        assert_eq!(split_quoted("\"x"), Err(FlagError::Unterminated('"')));
    }

    fn tags(value: &str) -> Vec<String> {
        TagList::from_str(value).unwrap().0
    }

    #[test]
    fn test_tag_list_comma_form() {
        assert_eq!(tags("a,b,,c"), strings(&["a", "b", "c"]));
        assert_eq!(tags(""), Vec::<String>::new());
        assert_eq!(tags(","), Vec::<String>::new());
    }

    #[test]
    fn test_tag_list_legacy_form() {
        assert_eq!(tags("a b"), strings(&["a", "b"]));
        assert_eq!(tags("'a'"), strings(&["a"]));
        // commas are not separators in the legacy form
        assert_eq!(tags("a,b c"), strings(&["a,b", "c"]));
    }

    #[test]
    fn test_explicit_string_set() {
        let mut flag = ExplicitString::new("a.out");
        flag.set("");
        assert_eq!(flag.value, "");
        assert!(!flag.explicit);
        flag.set("bin/tool");
        assert_eq!(flag.value, "bin/tool");
        assert!(flag.explicit);
    }

    fn output_flag() -> Command {
        Command::new("build")
            .no_binary_name(true)
            .arg(Arg::new("o").short('o').default_value("a.out"))
    }

    #[test]
    fn test_explicit_string_from_matches() {
        let matches = output_flag().try_get_matches_from(["-o", "out"]).unwrap();
        let flag = ExplicitString::from_matches(&matches, "o", "a.out");
        let expected = ExplicitString {
            value: "out".to_string(),
            explicit: true,
        };
        assert_eq!(flag, expected);

        let matches = output_flag()
            .try_get_matches_from(Vec::<String>::new())
            .unwrap();
        let flag = ExplicitString::from_matches(&matches, "o", "a.out");
        assert_eq!(flag, ExplicitString::new("a.out"));
    }

    #[test]
    fn test_quoted_list_as_value_parser() {
        let cmd = Command::new("build")
            .no_binary_name(true)
            .arg(
                Arg::new("flags")
                    .long("flags")
                    .value_parser(QuotedList::from_str),
            );
        let matches = cmd.clone().try_get_matches_from(["--flags="]).unwrap();
        let flags = matches.get_one::<QuotedList>("flags");
        assert_eq!(flags, Some(&QuotedList(vec![])));

        let matches = cmd.try_get_matches_from(Vec::<String>::new()).unwrap();
        assert!(matches.get_one::<QuotedList>("flags").is_none());
    }
}
