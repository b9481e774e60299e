//! Line diffs between an expect file and fresh output.
use colored::Colorize;
use difference::{Changeset, Difference};
use std::fmt;

/// Which side of the diff a line comes from.
#[derive(PartialEq, Debug, Clone, Copy)]
enum Mode {
    Same,
    Add,
    Rem,
}

#[derive(PartialEq, Debug)]
struct Lineno(Option<usize>);

impl fmt::Display for Lineno {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            None => f.pad(""),
            Some(lineno) => f.pad(&lineno.to_string()),
        }
    }
}

#[derive(PartialEq, Debug)]
struct DiffLine<'a> {
    mode: Mode,
    old: Lineno,
    new: Lineno,
    text: &'a str,
}

/// Expand a changeset into lines numbered on both sides.
fn numbered_lines(changes: &Changeset) -> Vec<DiffLine<'_>> {
    let (mut old, mut new) = (0, 0);
    let mut out = Vec::new();

    for diff in &changes.diffs {
        let (mode, text) = match diff {
            Difference::Same(x) => (Mode::Same, x),
            Difference::Add(x) => (Mode::Add, x),
            Difference::Rem(x) => (Mode::Rem, x),
        };
        for line in text.split('\n') {
            let (old_no, new_no) = match mode {
                Mode::Same => {
                    old += 1;
                    new += 1;
                    (Some(old), Some(new))
                }
                Mode::Add => {
                    new += 1;
                    (None, Some(new))
                }
                Mode::Rem => {
                    old += 1;
                    (Some(old), None)
                }
            };
            out.push(DiffLine {
                mode,
                old: Lineno(old_no),
                new: Lineno(new_no),
                text: line.trim_end(),
            });
        }
    }
    out
}

/// Render a diff from `org` to `new` with line numbers for both sides.
/// Added lines are green, removed lines red.
pub fn gen_diff(org: &str, new: &str) -> String {
    let changes = Changeset::new(org, new, "\n");
    let mut buf = String::new();

    for line in numbered_lines(&changes) {
        let (marker, text) = match line.mode {
            Mode::Add => ("+".green(), line.text.green()),
            Mode::Rem => ("-".red(), line.text.red()),
            Mode::Same => (" ".normal(), line.text.dimmed()),
        };
        buf.push_str(&format!(
            "{:>3} {:>3}│{}{}\n",
            line.old, line.new, marker, text
        ));
    }

    buf.trim_end().to_string()
}
