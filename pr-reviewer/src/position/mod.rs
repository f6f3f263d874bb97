//! Comment position mapping.
//!
//! Translates a candidate comment's (file, line, change-type) into the
//! coordinates the review-comment API needs. Two coordinate systems exist:
//!
//! - **Line and side** (current API): file line number plus `LEFT`/`RIGHT`,
//!   with an optional start/end range for multi-line bodies.
//! - **Legacy diff position**: a 1-based counter over every line emitted in
//!   the file's diff text, in textual order.
//!
//! Both are backends behind one [`PositionBackend::resolve`] contract.
//! Resolution is a pure function of its inputs: no I/O, no shared state,
//! idempotent by construction. A target that never appears among the file's
//! emitted diff lines resolves to `None` — never a wrong anchor.

use crate::parser::{DiffFile, DiffLineKind};
use crate::review::ChangeType;

/// Which version of the file a comment anchors to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Pre-change file version (deletions).
    Left,
    /// Post-change file version (additions).
    Right,
}

/// Single line or inclusive range covered by an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorLoc {
    Line(u32),
    Range { start: u32, end: u32 },
}

/// Fully resolved line-and-side coordinate for one comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentAnchor {
    pub path: String,
    pub side: Side,
    pub loc: AnchorLoc,
    /// Head commit the anchor is valid against. Passed in explicitly; the
    /// mapper never fetches it (anchors go stale against old commits, and a
    /// hidden fetch would hide that failure mode).
    pub commit_id: String,
}

/// What the completion service pointed at.
#[derive(Debug, Clone)]
pub struct AnchorTarget<'a> {
    pub file: &'a str,
    pub line: u32,
    pub change_type: ChangeType,
}

/// Coordinate produced by [`PositionBackend::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappedPosition {
    LineAndSide(CommentAnchor),
    Legacy { path: String, position: u32 },
}

/// Coordinate system selected by target-platform capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionBackend {
    /// Modern line + side coordinates (ranges supported).
    #[default]
    LineAndSide,
    /// Legacy 1-based diff-position counter.
    LegacyPosition,
}

impl PositionBackend {
    /// Resolves one comment target against the structured diff.
    ///
    /// `body` is the comment text; a multi-line body widens a line-and-side
    /// anchor into a range on the same side. Returns `None` when the target
    /// (file, line) has no corresponding emitted diff line.
    pub fn resolve(
        &self,
        diff: &[DiffFile],
        target: &AnchorTarget<'_>,
        body: &str,
        head_sha: &str,
    ) -> Option<MappedPosition> {
        match self {
            PositionBackend::LineAndSide => {
                resolve_line_side(diff, target, body, head_sha).map(MappedPosition::LineAndSide)
            }
            PositionBackend::LegacyPosition => {
                diff_position(diff, target.file, target.line).map(|position| {
                    MappedPosition::Legacy {
                        path: normalize_path(target.file).to_string(),
                        position,
                    }
                })
            }
        }
    }
}

/// Resolves a target to a line-and-side anchor.
///
/// Side selection: additions anchor `RIGHT` (new file), deletions `LEFT`
/// (old file). A modification anchors `RIGHT` unless the target line exists
/// only as a deletion, in which case it falls back to `LEFT`.
pub fn resolve_line_side(
    diff: &[DiffFile],
    target: &AnchorTarget<'_>,
    body: &str,
    head_sha: &str,
) -> Option<CommentAnchor> {
    let path = normalize_path(target.file);
    let file = diff.iter().find(|f| f.path == path)?;

    let mut added = false;
    let mut deleted = false;
    for change in file.hunks.iter().flat_map(|h| h.changes.iter()) {
        if change.line == target.line {
            match change.kind {
                DiffLineKind::Addition => added = true,
                DiffLineKind::Deletion => deleted = true,
                DiffLineKind::Context => {}
            }
        }
    }

    let side = match target.change_type {
        ChangeType::Addition if added => Side::Right,
        ChangeType::Deletion if deleted => Side::Left,
        // A claimed modification is anchored to whichever version of the
        // line the diff actually touched, preferring the new file.
        ChangeType::Modification if added => Side::Right,
        ChangeType::Modification if deleted => Side::Left,
        _ => return None,
    };

    let body_lines = body.lines().count().max(1) as u32;
    let loc = if body_lines > 1 {
        AnchorLoc::Range {
            start: target.line,
            end: target.line + body_lines - 1,
        }
    } else {
        AnchorLoc::Line(target.line)
    };

    Some(CommentAnchor {
        path: path.to_string(),
        side,
        loc,
        commit_id: head_sha.to_string(),
    })
}

/// Computes the legacy diff position for a (file, line) pair: a 1-based
/// counter over every emitted diff line across all of the file's hunks, in
/// textual order. Returns the position of the first emitted line whose
/// number matches, or `None` if the line never appears.
pub fn diff_position(diff: &[DiffFile], file: &str, line: u32) -> Option<u32> {
    let path = normalize_path(file);
    let file = diff.iter().find(|f| f.path == path)?;

    let mut position: u32 = 0;
    for hunk in &file.hunks {
        for change in &hunk.changes {
            position += 1;
            if change.line == line {
                return Some(position);
            }
        }
    }
    None
}

/// Strips the `b/` diff prefix if the caller passed an unnormalized path.
fn normalize_path(path: &str) -> &str {
    path.strip_prefix("b/").unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    const HEAD: &str = "abc123";

    fn sample_diff() -> Vec<parser::DiffFile> {
        parser::parse(
            "\
diff --git a/a.py b/a.py
@@ -1,3 +1,4 @@
 x=1
+y=2
 z=3
@@ -10,3 +11,3 @@
 ctx
-old_line
+new_line
diff --git a/b.py b/b.py
@@ -1,1 +1,1 @@
-only_deleted
+replacement
",
        )
    }

    fn target(file: &str, line: u32, change_type: crate::review::ChangeType) -> AnchorTarget<'_> {
        AnchorTarget {
            file,
            line,
            change_type,
        }
    }

    #[test]
    fn addition_anchors_right() {
        let diff = sample_diff();
        let t = target("a.py", 2, crate::review::ChangeType::Addition);
        let anchor = resolve_line_side(&diff, &t, "one line", HEAD).unwrap();
        assert_eq!(anchor.side, Side::Right);
        assert_eq!(anchor.loc, AnchorLoc::Line(2));
        assert_eq!(anchor.commit_id, HEAD);
    }

    #[test]
    fn deletion_anchors_left() {
        let diff = sample_diff();
        let t = target("a.py", 11, crate::review::ChangeType::Deletion);
        let anchor = resolve_line_side(&diff, &t, "body", HEAD).unwrap();
        assert_eq!(anchor.side, Side::Left);
    }

    #[test]
    fn modification_prefers_right_falls_back_left() {
        let diff = sample_diff();
        // Line 12 exists as an addition → RIGHT.
        let t = target("a.py", 12, crate::review::ChangeType::Modification);
        let anchor = resolve_line_side(&diff, &t, "body", HEAD).unwrap();
        assert_eq!(anchor.side, Side::Right);

        // b.py line 0: the deletion recorded at counter-1 = 0, no addition
        // there → LEFT.
        let t = target("b.py", 0, crate::review::ChangeType::Modification);
        let anchor = resolve_line_side(&diff, &t, "body", HEAD).unwrap();
        assert_eq!(anchor.side, Side::Left);
    }

    #[test]
    fn multi_line_body_widens_to_range() {
        let diff = sample_diff();
        let t = target("a.py", 2, crate::review::ChangeType::Addition);
        let body = "line one\nline two\nline three";
        let anchor = resolve_line_side(&diff, &t, body, HEAD).unwrap();
        assert_eq!(anchor.loc, AnchorLoc::Range { start: 2, end: 4 });
        assert_eq!(anchor.side, Side::Right);
    }

    #[test]
    fn hallucinated_line_is_not_found() {
        let diff = sample_diff();
        let t = target("a.py", 999, crate::review::ChangeType::Addition);
        assert!(resolve_line_side(&diff, &t, "body", HEAD).is_none());

        let t = target("missing.py", 1, crate::review::ChangeType::Addition);
        assert!(resolve_line_side(&diff, &t, "body", HEAD).is_none());
    }

    #[test]
    fn addition_target_on_deleted_only_line_is_not_found() {
        let diff = sample_diff();
        // a.py line 11 was only deleted; an addition claim must not anchor.
        let t = target("a.py", 11, crate::review::ChangeType::Addition);
        assert!(resolve_line_side(&diff, &t, "body", HEAD).is_none());
    }

    #[test]
    fn resolve_is_idempotent() {
        let diff = sample_diff();
        let t = target("a.py", 2, crate::review::ChangeType::Addition);
        let backend = PositionBackend::LineAndSide;
        let first = backend.resolve(&diff, &t, "body", HEAD);
        let second = backend.resolve(&diff, &t, "body", HEAD);
        assert_eq!(first, second);
    }

    #[test]
    fn legacy_position_counts_across_hunks() {
        let diff = sample_diff();
        // a.py emits: +y=2 (1), -old_line (2), +new_line (3).
        assert_eq!(diff_position(&diff, "a.py", 2), Some(1));
        assert_eq!(diff_position(&diff, "a.py", 11), Some(2));
        assert_eq!(diff_position(&diff, "a.py", 12), Some(3));
        assert_eq!(diff_position(&diff, "a.py", 999), None);
    }

    #[test]
    fn legacy_backend_produces_positions() {
        let diff = sample_diff();
        let t = target("b.py", 1, crate::review::ChangeType::Addition);
        let mapped = PositionBackend::LegacyPosition
            .resolve(&diff, &t, "body", HEAD)
            .unwrap();
        assert_eq!(
            mapped,
            MappedPosition::Legacy {
                path: "b.py".into(),
                position: 2,
            }
        );
    }

    #[test]
    fn unnormalized_b_prefixed_path_still_resolves() {
        let diff = sample_diff();
        let t = target("b/a.py", 2, crate::review::ChangeType::Addition);
        assert!(resolve_line_side(&diff, &t, "body", HEAD).is_some());
    }
}
