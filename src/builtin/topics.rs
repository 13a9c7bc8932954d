use crate::commands::Command;

#[must_use]
pub fn environment() -> Command {
    Command::topic(
        "environment",
        "environment variables",
        "
Clitree consults environment variables for configuration. If a variable
is unset or empty, clitree uses the value stored in the configuration file,
which 'clitree env -w' and 'clitree env -u' maintain. Run 'clitree env' to
see the current settings.

\tCLITREE_ENV
\t\tThe location of the configuration file. Set to off to disable
\t\tthe file. It cannot be set using 'clitree env -w'.
\tCLITREE_FLAGS
\t\tA space-separated list of builder arguments, used by 'clitree build'
\t\twhen the --flags flag is not given.
\tCLITREE_LOG
\t\tA file receiving clitree's own log output instead of standard error.
\tCLITREE_MODCACHE
\t\tThe directory where 'clitree mod download' stores downloaded files.
\tCLITREE_TAGS
\t\tA comma-separated list of build tags, used by 'clitree build' when
\t\tthe --tags flag is not given.
",
    )
}

#[must_use]
pub fn buildtags() -> Command {
    Command::topic(
        "buildtags",
        "build constraints",
        "
A build tag names a condition under which a file is included in a build.
Tags are passed to 'clitree build' with the --tags flag as a
comma-separated list:

\tclitree build --tags netgo,osusergo ./cmd/app

The older space-separated form is still accepted when the list is quoted:

\tclitree build --tags 'netgo osusergo' ./cmd/app

Empty elements of a comma-separated list are ignored.
",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{FLAGS, LOG, MODCACHE, TAGS};

    #[test]
    fn test_environment_mentions_every_key() {
        let topic = environment();
        assert!(topic.is_topic());
        for key in [FLAGS, LOG, MODCACHE, TAGS] {
            assert!(topic.long.contains(key), "{key} is not documented");
        }
    }
}
