//! Unified-diff parser.
//!
//! Converts the raw `git diff` text returned by the GitHub API into a
//! structured, line-addressable model (`DiffFile` → `DiffHunk` → `DiffLine`)
//! that the position mapper can resolve comments against.
//!
//! The scan is a single left-to-right pass driven by an explicit state
//! machine (`BeforeFile` / `InFile` / `InHunk` / `SkippingHunk`), so counter
//! state can never leak across files and the skip-on-malformed-header
//! behavior is a named transition instead of an accidental side effect.
//!
//! Parsing never fails: malformed hunk headers, binary patches and stray
//! prelude lines are tolerated and skipped.

/// Kind of a recorded diff line.
///
/// The set is closed: additions and deletions are emitted by [`parse`];
/// `Context` exists because the coordinate model admits it, but context
/// lines are structural only (they advance the running line counter and
/// produce no record).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    Addition,
    Deletion,
    Context,
}

/// One recorded line of a diff hunk.
///
/// `line` is the line number in the relevant file version: the new-file
/// number for additions, the old-file-adjacent number for deletions
/// (the new-file counter minus one — the new-file line the deletion sits
/// next to, mirroring how review UIs display removed lines).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub line: u32,
    /// Line text with the leading `+`/`-` marker stripped.
    pub content: String,
}

/// A diff hunk parsed from an `@@ -old,len +new,len @@` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: u32,
    pub new_start: u32,
    /// Recorded changes in diff-text order.
    pub changes: Vec<DiffLine>,
}

/// All hunks of one file, keyed by its `b/`-side path with the prefix
/// stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffFile {
    pub path: String,
    pub hunks: Vec<DiffHunk>,
}

/// Scanner states. Transitions happen on line-prefix classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Nothing seen yet; everything before the first `diff --git` is ignored.
    BeforeFile,
    /// A file header was seen but no hunk header yet; `---`/`+++` file
    /// headers land here and are ignored.
    InFile,
    /// Inside a well-formed hunk; `+`/`-`/` ` lines are classified.
    InHunk,
    /// Inside a hunk whose header could not be parsed; its lines are
    /// dropped and the hunk closes zero-length at the next boundary.
    SkippingHunk,
}

/// Parses raw unified-diff text into per-file hunks.
///
/// Never fails on malformed input; unparseable hunk headers yield an empty
/// hunk and the scan continues at the next boundary.
pub fn parse(raw: &str) -> Vec<DiffFile> {
    let mut out: Vec<DiffFile> = Vec::new();
    let mut cur_file: Option<DiffFile> = None;
    let mut cur_hunk: Option<DiffHunk> = None;
    let mut counter: u32 = 0;
    let mut state = State::BeforeFile;

    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            close_hunk(&mut cur_file, &mut cur_hunk);
            close_file(&mut out, &mut cur_file);
            let path = new_side_path(rest);
            if path.is_empty() {
                // Truncated header with no extractable path: no file entry.
                state = State::BeforeFile;
            } else {
                cur_file = Some(DiffFile {
                    path,
                    hunks: Vec::new(),
                });
                counter = 0;
                state = State::InFile;
            }
            continue;
        }

        match state {
            State::BeforeFile => {
                // Stray prelude before the first file header.
            }
            State::InFile | State::InHunk | State::SkippingHunk => {
                if line.starts_with("@@") {
                    close_hunk(&mut cur_file, &mut cur_hunk);
                    match parse_hunk_header(line) {
                        Some((old_start, new_start)) => {
                            cur_hunk = Some(DiffHunk {
                                old_start,
                                new_start,
                                changes: Vec::new(),
                            });
                            counter = new_start;
                            state = State::InHunk;
                        }
                        None => {
                            // Malformed header: keep a zero-length hunk open
                            // and drop its lines until the next boundary.
                            cur_hunk = Some(DiffHunk {
                                old_start: 0,
                                new_start: 0,
                                changes: Vec::new(),
                            });
                            state = State::SkippingHunk;
                        }
                    }
                } else if state == State::InHunk {
                    scan_hunk_line(line, &mut cur_hunk, &mut counter);
                }
                // InFile: `---`/`+++`/index lines before the first hunk.
                // SkippingHunk: lines of a malformed hunk. Both ignored.
            }
        }
    }

    close_hunk(&mut cur_file, &mut cur_hunk);
    close_file(&mut out, &mut cur_file);
    out
}

/// Classifies one line inside a well-formed hunk and updates the running
/// new-file counter.
fn scan_hunk_line(line: &str, cur_hunk: &mut Option<DiffHunk>, counter: &mut u32) {
    let Some(hunk) = cur_hunk.as_mut() else {
        return;
    };
    if let Some(content) = line.strip_prefix('+') {
        hunk.changes.push(DiffLine {
            kind: DiffLineKind::Addition,
            line: *counter,
            content: content.to_string(),
        });
        *counter += 1;
    } else if let Some(content) = line.strip_prefix('-') {
        // Deletions consume old-file lines, not new-file lines: record the
        // adjacent new-file position and leave the counter alone. Known
        // limitation: runs of consecutive deletions all map to the same
        // adjacent line.
        hunk.changes.push(DiffLine {
            kind: DiffLineKind::Deletion,
            line: counter.saturating_sub(1),
            content: content.to_string(),
        });
    } else if line.starts_with(' ') {
        *counter += 1;
    }
    // Anything else (`\ No newline at end of file`, binary markers) is
    // ignored.
}

/// Extracts the `b/`-side path from the remainder of a `diff --git` header,
/// stripping the `b/` prefix.
fn new_side_path(rest: &str) -> String {
    let token = rest.split_whitespace().nth(1).unwrap_or("");
    token.strip_prefix("b/").unwrap_or(token).to_string()
}

/// Parses `@@ -old,olen +new,nlen @@` into `(old_start, new_start)`.
/// Returns `None` when either range token is missing or non-numeric.
fn parse_hunk_header(line: &str) -> Option<(u32, u32)> {
    let mut tokens = line.split(' ').skip(1);
    let old = tokens.next()?.strip_prefix('-')?;
    let new = tokens.next()?.strip_prefix('+')?;
    let old_start: u32 = old.split(',').next()?.parse().ok()?;
    let new_start: u32 = new.split(',').next()?.parse().ok()?;
    Some((old_start, new_start))
}

fn close_hunk(cur_file: &mut Option<DiffFile>, cur_hunk: &mut Option<DiffHunk>) {
    if let (Some(file), Some(hunk)) = (cur_file.as_mut(), cur_hunk.take()) {
        file.hunks.push(hunk);
    }
}

fn close_file(out: &mut Vec<DiffFile>, cur_file: &mut Option<DiffFile>) {
    if let Some(file) = cur_file.take() {
        out.push(file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "\
diff --git a/a.py b/a.py
index 1111111..2222222 100644
--- a/a.py
+++ b/a.py
@@ -1,3 +1,4 @@
 x=1
+y=2
 z=3
";

    #[test]
    fn addition_line_numbers_follow_the_running_counter() {
        let files = parse(SIMPLE);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "a.py");

        let hunk = &files[0].hunks[0];
        assert_eq!(hunk.old_start, 1);
        assert_eq!(hunk.new_start, 1);

        // Counter starts at 1; " x=1" bumps it to 2; "+y=2" is recorded at 2.
        assert_eq!(
            hunk.changes,
            vec![DiffLine {
                kind: DiffLineKind::Addition,
                line: 2,
                content: "y=2".into(),
            }]
        );
    }

    #[test]
    fn deletion_keeps_counter_and_maps_to_adjacent_line() {
        let raw = "\
diff --git a/m.rs b/m.rs
@@ -10,3 +10,3 @@
 fn keep() {}
-fn old() {}
+fn new() {}
";
        let files = parse(raw);
        let changes = &files[0].hunks[0].changes;
        assert_eq!(
            changes,
            &vec![
                DiffLine {
                    kind: DiffLineKind::Deletion,
                    line: 10, // counter is 11 after the context line
                    content: "fn old() {}".into(),
                },
                DiffLine {
                    kind: DiffLineKind::Addition,
                    line: 11,
                    content: "fn new() {}".into(),
                },
            ]
        );
    }

    #[test]
    fn content_round_trip_reproduces_marker_lines() {
        let raw = "\
diff --git a/one.txt b/one.txt
--- a/one.txt
+++ b/one.txt
@@ -1,2 +1,3 @@
 ctx
+added one
-removed one
@@ -8,1 +9,2 @@
+added two
diff --git a/two.txt b/two.txt
--- a/two.txt
+++ b/two.txt
@@ -1,1 +1,1 @@
-gone
+here
";
        let files = parse(raw);
        let contents: Vec<&str> = files
            .iter()
            .flat_map(|f| f.hunks.iter())
            .flat_map(|h| h.changes.iter())
            .map(|c| c.content.as_str())
            .collect();
        assert_eq!(
            contents,
            vec!["added one", "removed one", "added two", "gone", "here"]
        );
    }

    #[test]
    fn stray_prelude_before_first_header_is_ignored() {
        let raw = "\
some noise
+not a change
@@ -1,1 +1,1 @@
diff --git a/f.txt b/f.txt
@@ -1,1 +1,2 @@
+real
";
        let files = parse(raw);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "f.txt");
        assert_eq!(files[0].hunks.len(), 1);
        assert_eq!(files[0].hunks[0].changes[0].content, "real");
    }

    #[test]
    fn file_with_no_hunks_is_still_emitted() {
        let raw = "\
diff --git a/first.txt b/first.txt
@@ -1,1 +1,2 @@
+x
diff --git a/renamed.txt b/renamed.txt
similarity index 100%
rename from old_name.txt
rename to renamed.txt
";
        let files = parse(raw);
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].path, "renamed.txt");
        assert!(files[1].hunks.is_empty());
    }

    #[test]
    fn malformed_hunk_header_yields_zero_length_hunk() {
        let raw = "\
diff --git a/f.txt b/f.txt
@@ garbage @@
+dropped
-also dropped
@@ -5,2 +5,3 @@
 ctx
+kept
";
        let files = parse(raw);
        assert_eq!(files[0].hunks.len(), 2);
        assert!(files[0].hunks[0].changes.is_empty());
        assert_eq!(files[0].hunks[1].changes[0].content, "kept");
        assert_eq!(files[0].hunks[1].changes[0].line, 6);
    }

    #[test]
    fn truncated_file_header_creates_no_file_entry() {
        let raw = "\
diff --git a/only-one-side
@@ -1,1 +1,1 @@
+orphan
diff --git a/ok.txt b/ok.txt
@@ -1,1 +1,2 @@
+kept
";
        let files = parse(raw);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "ok.txt");
    }

    #[test]
    fn hunk_header_without_lengths_parses() {
        let raw = "\
diff --git a/f.txt b/f.txt
@@ -3 +4 @@
+solo
";
        let files = parse(raw);
        let hunk = &files[0].hunks[0];
        assert_eq!((hunk.old_start, hunk.new_start), (3, 4));
        assert_eq!(hunk.changes[0].line, 4);
    }

    #[test]
    fn no_newline_marker_is_ignored() {
        let raw = "\
diff --git a/f.txt b/f.txt
@@ -1,1 +1,1 @@
-old
\\ No newline at end of file
+new
\\ No newline at end of file
";
        let files = parse(raw);
        assert_eq!(files[0].hunks[0].changes.len(), 2);
        assert_eq!(files[0].hunks[0].changes[1].line, 1);
    }

    #[test]
    fn counters_do_not_leak_across_files() {
        let raw = "\
diff --git a/one.txt b/one.txt
@@ -90,2 +90,3 @@
 ctx
+high line
diff --git a/two.txt b/two.txt
@@ -1,1 +1,2 @@
+low line
";
        let files = parse(raw);
        assert_eq!(files[0].hunks[0].changes[0].line, 91);
        assert_eq!(files[1].hunks[0].changes[0].line, 1);
    }

    #[test]
    fn deleted_file_hunk_saturates_instead_of_underflowing() {
        // `@@ -1,2 +0,0 @@` — whole-file deletion puts the counter at 0.
        let raw = "\
diff --git a/gone.txt b/gone.txt
@@ -1,2 +0,0 @@
-first
-second
";
        let files = parse(raw);
        let changes = &files[0].hunks[0].changes;
        assert_eq!(changes[0].line, 0);
        assert_eq!(changes[1].line, 0);
    }

    #[test]
    fn consecutive_deletions_share_the_adjacent_line_number() {
        // Documented limitation of the deletion rule (`counter - 1`): a run
        // of deletions with no interleaved addition collapses onto one line.
        let raw = "\
diff --git a/f.txt b/f.txt
@@ -5,4 +5,1 @@
 ctx
-a
-b
-c
";
        let files = parse(raw);
        let lines: Vec<u32> = files[0].hunks[0].changes.iter().map(|c| c.line).collect();
        assert_eq!(lines, vec![5, 5, 5]);
    }
}
