//! Help and usage text rendered from the command tree
//!
//! Groups render as a command listing, leaves and topics as their usage line
//! and long description. `help documentation` renders every node at once.

use std::fmt::Write as _;
use std::io::{self, BufWriter, Write};

use log::debug;

use crate::commands::{Command, Status, Streams};

/// Marker stripped from usage lines before they are shown
pub const FLAG_MARKER: &str = " --";

/// Help topic that renders the documentation of the whole tree
pub const DOCUMENTATION: &str = "documentation";

#[must_use]
pub fn strip_marker(usage_line: &str) -> String {
    usage_line.replace(FLAG_MARKER, "")
}

/// Uppercase the first character
#[must_use]
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Write `text` through a buffer and flush it before returning
fn write_buffered(w: &mut dyn Write, text: &str) -> io::Result<()> {
    let mut bw = BufWriter::new(w);
    bw.write_all(text.as_bytes())?;
    bw.flush()
}

pub struct Help<'a> {
    root: &'a Command,
}

impl<'a> Help<'a> {
    #[must_use]
    pub fn new(root: &'a Command) -> Self {
        Help { root }
    }

    /// The program name, which is the root's usage line
    #[must_use]
    pub fn prog(&self) -> &str {
        &self.root.usage_line
    }

    /// Render help for the node reached from the root by `args`.
    ///
    /// An unknown token reports the longest `help` invocation that would have
    /// worked and yields `Status::USAGE`.
    ///
    /// # Errors
    ///
    /// Returns the underlying error when writing to a stream fails.
    pub fn help(&self, args: &[String], io: &mut Streams<'_>) -> io::Result<Status> {
        if let [topic] = args
            && topic == DOCUMENTATION
            && self.root.find(DOCUMENTATION).is_none()
        {
            write_buffered(io.out, &self.documentation())?;
            return Ok(Status::SUCCESS);
        }

        let prog = self.prog();
        let mut cmd = self.root;
        for (i, arg) in args.iter().enumerate() {
            let Some(sub) = cmd.find(arg) else {
                let mut success = format!("{prog} help");
                if i > 0 {
                    success.push(' ');
                    success.push_str(&args[..i].join(" "));
                }
                debug!("Unknown help topic {arg:?} after {i} matched tokens");
                write_buffered(
                    io.err,
                    &format!(
                        "{prog} help {}: unknown help topic. Run '{success}'.\n",
                        args.join(" ")
                    ),
                )?;
                return Ok(Status::USAGE);
            };
            cmd = sub;
        }

        if cmd.is_group() {
            self.print_usage(io.out, cmd, args)?;
        } else {
            write_buffered(io.out, &leaf_help(cmd))?;
        }
        Ok(Status::SUCCESS)
    }

    /// Write the group listing of `cmd`, reached from the root by `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying error when writing fails.
    pub fn print_usage(&self, w: &mut dyn Write, cmd: &Command, path: &[String]) -> io::Result<()> {
        write_buffered(w, &self.group_usage(cmd, path))
    }

    fn group_usage(&self, cmd: &Command, path: &[String]) -> String {
        let prog = self.prog();
        let help_path = if path.is_empty() {
            String::new()
        } else {
            format!(" {}", path.join(" "))
        };

        let mut s = String::new();
        let _ = writeln!(s, "{}\n", cmd.long.trim());
        s.push_str("Usage:\n\n");
        let _ = writeln!(
            s,
            "\t{} <command> [arguments]\n",
            strip_marker(&cmd.usage_line)
        );
        s.push_str("The commands are:\n");
        for child in cmd.commands.iter().filter(|c| c.is_runnable() || c.is_group()) {
            let _ = write!(s, "\n\t{:<11} {}", child.name, child.short);
        }
        s.push_str("\n\n");
        let _ = writeln!(
            s,
            "Use \"{prog} help{help_path} <command>\" for more information about a command."
        );

        let topics: Vec<&Command> = cmd.commands.iter().filter(|c| c.is_topic()).collect();
        if path.is_empty() && !topics.is_empty() {
            s.push_str("\nAdditional help topics:\n");
            for topic in topics {
                let _ = write!(s, "\n\t{:<15} {}", topic.name, topic.short);
            }
            s.push_str("\n\n");
            let _ = writeln!(
                s,
                "Use \"{prog} help{help_path} <topic>\" for more information about that topic."
            );
        }
        s.push('\n');
        s
    }

    /// Documentation for the whole tree: the root listing, then every node in
    /// depth-first order.
    #[must_use]
    pub fn documentation(&self) -> String {
        let mut s = String::new();
        s.push_str(self.group_usage(self.root, &[]).trim());
        s.push_str("\n\n\n");
        let mut path = Vec::new();
        self.document_children(&mut s, self.root, &mut path);
        s
    }

    fn document_children(&self, s: &mut String, cmd: &Command, path: &mut Vec<String>) {
        for child in &cmd.commands {
            path.push(child.name.clone());
            if !child.short.is_empty() {
                let _ = write!(s, "{}\n\n", capitalize(&child.short));
            }
            if child.is_group() {
                s.push_str(&self.group_usage(child, path));
            } else {
                if child.is_runnable() {
                    let _ = write!(s, "Usage:\n\n\t{}\n\n", strip_marker(&child.usage_line));
                }
                let _ = write!(s, "{}\n\n\n", child.long.trim());
            }
            self.document_children(s, child, path);
            path.pop();
        }
    }
}

fn leaf_help(cmd: &Command) -> String {
    let mut s = String::new();
    if cmd.is_runnable() {
        let _ = write!(s, "usage: {}\n\n", strip_marker(&cmd.usage_line));
    }
    s.push_str(cmd.long.trim());
    s.push('\n');
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Invocation, RunResult};
    use crate::context::Context;

    fn noop(_: &Context, _: &Invocation, _: &mut Streams<'_>) -> RunResult {
        Ok(Status::SUCCESS)
    }

    fn tree() -> Command {
        Command::root(
            "tool",
            "\n  Tool manages things.\n",
            vec![
                Command::leaf(
                    "build",
                    "tool build [-o output] [packages]",
                    "compile packages",
                    "\nBuild compiles packages.\n",
                    noop,
                ),
                Command::group(
                    "mod",
                    "tool mod",
                    "module maintenance",
                    "Mod operates on modules.",
                    vec![
                        Command::leaf(
                            "download",
                            "tool mod download [-x] [modules]",
                            "download modules",
                            "Download fetches modules.",
                            noop,
                        ),
                        Command::leaf("verify", "tool mod verify", "verify modules", "", noop),
                    ],
                ),
                Command::leaf(
                    "tool",
                    "tool tool -- name [arguments]",
                    "run a tool",
                    "Tool runs a tool.",
                    noop,
                )
                .custom_flags(),
                Command::topic("environment", "environment variables", "The environment."),
            ],
        )
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn render(root: &Command, args: &[&str]) -> (Status, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let status = Help::new(root)
            .help(&strings(args), &mut Streams::new(&mut out, &mut err))
            .unwrap();
        (
            status,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(
            strip_marker("tool tool -- name [arguments]"),
            "tool tool name [arguments]"
        );
        assert_eq!(
            strip_marker("tool build [--tags list]"),
            "tool build [--tags list]"
        );
        assert_eq!(capitalize("compile packages"), "Compile packages");
        assert_eq!(capitalize("élan"), "Élan");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_root_usage() {
        let (status, out, err) = render(&tree(), &[]);
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(err, "");
        assert_eq!(
            out,
            "Tool manages things.\n\
             \n\
             Usage:\n\
             \n\
             \ttool <command> [arguments]\n\
             \n\
             The commands are:\n\
             \n\
             \tbuild       compile packages\n\
             \tmod         module maintenance\n\
             \ttool        run a tool\n\
             \n\
             Use \"tool help <command>\" for more information about a command.\n\
             \n\
             Additional help topics:\n\
             \n\
             \tenvironment     environment variables\n\
             \n\
             Use \"tool help <topic>\" for more information about that topic.\n\
             \n"
        );
    }

    #[test]
    fn test_group_usage() {
        let (status, out, _) = render(&tree(), &["mod"]);
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(
            out,
            "Mod operates on modules.\n\
             \n\
             Usage:\n\
             \n\
             \ttool mod <command> [arguments]\n\
             \n\
             The commands are:\n\
             \n\
             \tdownload    download modules\n\
             \tverify      verify modules\n\
             \n\
             Use \"tool help mod <command>\" for more information about a command.\n\
             \n"
        );
    }

    #[test]
    fn test_leaf_help() {
        let (status, out, _) = render(&tree(), &["mod", "download"]);
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(
            out,
            "usage: tool mod download [-x] [modules]\n\nDownload fetches modules.\n"
        );

        let (_, out, _) = render(&tree(), &["tool"]);
        assert_eq!(
            out,
            "usage: tool tool name [arguments]\n\nTool runs a tool.\n"
        );
    }

    #[test]
    fn test_topic_help_has_no_usage_line() {
        let (status, out, _) = render(&tree(), &["environment"]);
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(out, "The environment.\n");
    }

    #[test]
    fn test_unknown_topic_reports_consumed_prefix() {
        let (status, out, err) = render(&tree(), &["mod", "bogus", "deeper"]);
        assert_eq!(status, Status::USAGE);
        assert_eq!(out, "");
        assert_eq!(
            err,
            "tool help mod bogus deeper: unknown help topic. Run 'tool help mod'.\n"
        );

        let (status, _, err) = render(&tree(), &["bogus"]);
        assert_eq!(status, Status::USAGE);
        assert_eq!(
            err,
            "tool help bogus: unknown help topic. Run 'tool help'.\n"
        );
    }

    #[test]
    fn test_documentation() {
        let verify = Command::leaf("verify", "tool mod verify", "verify", "Verify.", noop);
        let root = Command::root(
            "tool",
            "Tool manages things.",
            vec![
                Command::leaf(
                    "build",
                    "tool build [packages]",
                    "compile packages",
                    "Build compiles.",
                    noop,
                ),
                Command::group(
                    "mod",
                    "tool mod",
                    "module maintenance",
                    "Mod operates on modules.",
                    vec![verify],
                ),
            ],
        );
        let (status, out, _) = render(&root, &["documentation"]);
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(out, Help::new(&root).documentation());
        assert!(out.starts_with("Tool manages things.\n\nUsage:\n"));
        assert!(out.contains(
            "Use \"tool help <command>\" for more information about a command.\n\n\n\
             Compile packages\n\nUsage:\n\n\ttool build [packages]\n\nBuild compiles.\n\n\n\
             Module maintenance\n\nMod operates on modules.\n"
        ));
        assert!(out.contains(
            "Use \"tool help mod <command>\" for more information about a command.\n\n"
        ));
        let last = "Verify\n\nUsage:\n\n\ttool mod verify\n\nVerify.\n\n\n";
        assert!(out.ends_with(last));
    }

    #[test]
    fn test_documentation_token_defers_to_real_topic() {
        let root = Command::root(
            "tool",
            "",
            vec![Command::topic("documentation", "docs", "Read the docs.")],
        );
        let (_, out, _) = render(&root, &["documentation"]);
        assert_eq!(out, "Read the docs.\n");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_returned() {
        let root = tree();
        let mut out = BrokenPipe;
        let mut err = Vec::new();
        let mut streams = Streams::new(&mut out, &mut err);
        let e = Help::new(&root).help(&[], &mut streams).unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::BrokenPipe);
    }
}
