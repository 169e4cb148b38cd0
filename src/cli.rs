use crate::config::{Configuration, Mode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bulk find and replace across names and contents of a folder tree.
///
/// `replitex` substitutes a piece of text inside file names, folder names and
/// file contents. It can work in place or produce renamed and rewritten
/// copies, and it can preview every change before anything is touched.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Find and replace text in file names, folder names and file contents",
    long_about = "replitex - Bulk, rule-driven text substitution across a directory tree.

Modes:
  in-place       Rewrite contents, then rename matching entries where they are
  sibling-copy   Copy matching top-level entries next to the originals
  tree-copy      Copy matching entries at every level of the tree

QUICK EXAMPLES:
  replitex preview -d . -f OldName -r NewName             # Show what would change
  replitex run -d . -f OldName -r NewName --whole-word    # Apply in place
  replitex run -d . -f v1 -r v2 --mode tree-copy --yes    # Copy with new names
  replitex preview -d . -f foo -r bar --format json       # Machine-readable plan

For detailed help on any command, use: replitex <command> --help"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that starts a run.
#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// The working folder.
    #[arg(short, long, env = "REPLITEX_DIR")]
    pub dir: PathBuf,

    /// The text to search for. Always literal, never a pattern.
    #[arg(short, long)]
    pub find: Option<String>,

    /// The text to substitute. Always literal: `$1` stays `$1`.
    #[arg(short, long)]
    pub replace: Option<String>,

    /// How substitutions are applied.
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Match case exactly.
    #[arg(short = 'c', long)]
    pub case_sensitive: bool,

    /// Only match occurrences bounded by non-word characters.
    #[arg(short, long)]
    pub whole_word: bool,

    /// Do not descend into subfolders (in-place mode).
    #[arg(long)]
    pub no_recursive: bool,

    /// A comma-separated list of keywords. Entries whose path, name or
    /// content contains one are left alone.
    #[arg(short = 'k', long = "ignore-word", value_delimiter = ',')]
    pub ignore_words: Vec<String>,

    /// A comma-separated list of paths excluded with everything beneath them.
    #[arg(short = 'e', long = "ignore-path", value_delimiter = ',')]
    pub ignore_paths: Vec<PathBuf>,

    /// A comma-separated list of file extensions to exclude entirely.
    #[arg(short = 'x', long = "ignore-ext", value_delimiter = ',')]
    pub ignore_extensions: Vec<String>,

    /// A comma-separated list of encodings tried, in order, when reading files.
    #[arg(long = "encoding", value_delimiter = ',')]
    pub encodings: Vec<String>,

    /// Path to a YAML configuration file. Flags take precedence over it.
    #[arg(long, env = "REPLITEX_CONFIG")]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// The configuration described by the flags alone.
    pub fn to_configuration(&self, preview: bool) -> Configuration {
        let mut config = Configuration::new(
            self.dir.clone(),
            self.find.clone().unwrap_or_default(),
            self.replace.clone().unwrap_or_default(),
        );
        config.case_sensitive = self.case_sensitive;
        config.whole_word = self.whole_word;
        config.recursive = !self.no_recursive;
        config.mode = self.mode.unwrap_or_default();
        config.preview = preview;
        config.ignored_keywords.extend(self.ignore_words.iter().cloned());
        config.ignored_paths.extend(self.ignore_paths.iter().cloned());
        config
            .ignored_extensions
            .extend(self.ignore_extensions.iter().cloned());
        if !self.encodings.is_empty() {
            config.encodings = self.encodings.clone();
        }
        config
    }
}

/// The set of available commands for the `replitex` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply the substitution to the working folder
    ///
    /// EXAMPLES:
    ///   replitex run -d . -f OldName -r NewName
    ///   replitex run -d src -f foo -r bar -k temp,backup -x lock --yes
    ///   replitex run -d . --config rename.yaml --mode sibling-copy
    ///
    /// Config file format (rename.yaml):
    ///   find: OldName
    ///   replace: NewName
    ///   whole_word: true
    ///   ignored_keywords: [temp]
    Run {
        #[command(flatten)]
        args: RunArgs,

        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,

        /// Only print the final summary, not every action.
        #[arg(short, long)]
        quiet: bool,
    },

    /// List every change a run would make, without touching anything
    ///
    /// EXAMPLES:
    ///   replitex preview -d . -f foo -r bar
    ///   replitex preview -d . -f foo -r bar --mode tree-copy --summary
    ///   replitex preview -d . -f foo -r bar --format csv -o plan.csv
    Preview {
        #[command(flatten)]
        args: RunArgs,

        /// The output format for the planned changes (`text`, `json` or `csv`).
        #[arg(long = "format", default_value = "text")]
        format: String,

        /// Path to the output file. If omitted, the plan is written to standard output.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include a count of planned changes per kind (text format only).
        #[arg(long)]
        summary: bool,
    },
}

/// Parses command-line arguments and returns the populated `Args` struct.
pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_become_configuration() {
        let args = Args::parse_from([
            "replitex",
            "preview",
            "-d",
            "/work",
            "-f",
            "foo",
            "-r",
            "bar",
            "--mode",
            "tree-copy",
            "--whole-word",
            "--no-recursive",
            "-k",
            "temp,Backup",
            "-x",
            "log",
            "--encoding",
            "utf-8,latin1",
        ]);
        let Commands::Preview { args, format, .. } = args.command else {
            panic!("expected preview");
        };
        assert_eq!(format, "text");

        let config = args.to_configuration(true);
        assert_eq!(config.search, "foo");
        assert_eq!(config.replacement, "bar");
        assert_eq!(config.mode, Mode::TreeCopy);
        assert!(config.whole_word && !config.case_sensitive && !config.recursive);
        assert!(config.preview);
        assert_eq!(config.ignored_keywords.len(), 2);
        assert!(config.ignored_extensions.contains("log"));
        assert_eq!(config.encodings, vec!["utf-8", "latin1"]);
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["replitex", "run", "-d", ".", "-f", "a", "--yes"]);
        let Commands::Run { args, yes, quiet } = args.command else {
            panic!("expected run");
        };
        assert!(yes && !quiet);
        let config = args.to_configuration(false);
        assert_eq!(config.mode, Mode::InPlace);
        assert!(config.recursive);
        assert_eq!(config.replacement, "");
        assert_eq!(config.encodings.len(), 3);
    }
}
