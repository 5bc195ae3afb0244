//! User-facing output for the downloader CLI.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt::Display;
use std::io::Write;

/// Write `message` followed by a newline, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Summary line printed after a successful batch.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use vsix_downloader::output::success_message;
///
/// let msg = success_message(2, Utf8Path::new("vscode_exts"));
/// assert_eq!(msg, "Downloaded 2 extensions to vscode_exts");
/// ```
#[must_use]
pub fn success_message(count: usize, dest_dir: &Utf8Path) -> String {
    let plural = if count == 1 { "extension" } else { "extensions" };
    format!("Downloaded {count} {plural} to {dest_dir}")
}

/// One line per saved artefact, indented under the summary.
#[must_use]
pub fn saved_paths_listing(paths: &[Utf8PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("  {path}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0 extensions")]
    #[case(1, "1 extension to")]
    #[case(3, "3 extensions")]
    fn success_message_pluralises_correctly(#[case] count: usize, #[case] expected: &str) {
        let msg = success_message(count, Utf8Path::new("/tmp"));
        assert!(msg.contains(expected), "message: {msg}");
    }

    #[test]
    fn listing_indents_each_path() {
        let paths = vec![
            Utf8PathBuf::from("exts/a.vsix"),
            Utf8PathBuf::from("exts/b.vsix"),
        ];
        assert_eq!(saved_paths_listing(&paths), "  exts/a.vsix\n  exts/b.vsix");
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "hello");
        assert_eq!(buffer, b"hello\n");
    }
}
