//! Find where a `before` snippet lives in a file.
//!
//! An exact occurrence always wins. Otherwise candidate frames are opened
//! between lines resembling the first and last `before` lines, filled with
//! the closest match for every `before` line, and scored; the lowest score
//! wins if it is under the configured threshold.

use crate::config::{LevenshteinWeights, LocateSettings};
use crate::patch::distance::weighted_levenshtein;
use crate::patch::frame::Frame;
use crate::patch::ranking::{CodeMatch, LineMatch, RankingList};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocateError {
    #[error("cannot locate an empty `before` snippet")]
    EmptyBefore,

    #[error("No frames found.\n\n{before}")]
    NoFrames { before: String },

    #[error("The best match is too different from the original code (score {score:.2} > {max:.2}).")]
    ScoreTooHigh { score: f64, max: f64 },
}

/// How a region was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Located {
    /// 1-based inclusive range and its score
    pub code_match: CodeMatch,
    pub kind: MatchKind,
}

/// Locate `before` in `content`, exactly if possible, fuzzily otherwise.
pub fn locate(content: &str, before: &str, settings: &LocateSettings) -> Result<Located, LocateError> {
    if before.is_empty() {
        return Err(LocateError::EmptyBefore);
    }

    if let Some(code_match) = locate_exact(content, before) {
        debug!(start = code_match.start, end = code_match.end, "exact match");
        return Ok(Located {
            code_match,
            kind: MatchKind::Exact,
        });
    }

    let code_match = locate_fuzzy(content, before, settings)?;
    debug!(
        start = code_match.start,
        end = code_match.end,
        score = code_match.distance,
        "fuzzy match"
    );
    Ok(Located {
        code_match,
        kind: MatchKind::Fuzzy,
    })
}

/// First verbatim occurrence of `before`, as a 1-based line range with score 0.
pub fn locate_exact(content: &str, before: &str) -> Option<CodeMatch> {
    if before.is_empty() {
        return None;
    }
    let offset = content.find(before)?;
    let start = 1 + content[..offset].matches('\n').count();
    let line_count = before.lines().count().max(1);
    Some(CodeMatch {
        start,
        end: start + line_count - 1,
        distance: 0.0,
    })
}

/// Best-scoring frame for `before`, or an error when none is close enough.
pub fn locate_fuzzy(
    content: &str,
    before: &str,
    settings: &LocateSettings,
) -> Result<CodeMatch, LocateError> {
    let before_lines: Vec<&str> = before.lines().collect();
    let (Some(first), Some(last)) = (before_lines.first(), before_lines.last()) else {
        return Err(LocateError::EmptyBefore);
    };

    let file_lines: Vec<&str> = content.split('\n').collect();
    let mut frames = select_frames(&file_lines, first, last, before_lines.len(), settings);
    if frames.is_empty() {
        return Err(LocateError::NoFrames {
            before: before.to_string(),
        });
    }

    let mut covered = vec![false; file_lines.len()];
    for frame in &frames {
        for line in frame.lines() {
            covered[line] = true;
        }
    }

    for (before_idx, line) in before_lines.iter().enumerate() {
        let candidates = closest_lines(
            file_lines
                .iter()
                .enumerate()
                .filter(|(idx, _)| covered[*idx])
                .map(|(idx, text)| (idx, *text)),
            line,
            settings.line_candidates,
            settings.weights,
        );
        for frame in &mut frames {
            frame.add_matched_lines(before_idx, &candidates);
        }
    }

    let mut best: Option<CodeMatch> = None;
    for frame in &frames {
        let candidate = frame.to_match();
        if best.map_or(true, |current| candidate.distance < current.distance) {
            best = Some(candidate);
        }
    }

    let best = best.ok_or_else(|| LocateError::NoFrames {
        before: before.to_string(),
    })?;
    debug!(frames = frames.len(), score = best.distance, "scored frames");

    if best.distance > settings.max_score {
        return Err(LocateError::ScoreTooHigh {
            score: best.distance,
            max: settings.max_score,
        });
    }
    Ok(best)
}

/// Frames between each close match of `first` and the close matches of
/// `last` within the window after it.
fn select_frames(
    file_lines: &[&str],
    first: &str,
    last: &str,
    before_len: usize,
    settings: &LocateSettings,
) -> Vec<Frame> {
    let starts = closest_lines(
        file_lines.iter().copied().enumerate(),
        first,
        settings.start_candidates,
        settings.weights,
    );

    let mut frames = Vec::new();
    for start in starts {
        let window_end = file_lines
            .len()
            .min(start.index + settings.end_window_factor * before_len);
        let window = file_lines
            .get(start.index..window_end)
            .unwrap_or_default()
            .iter()
            .copied()
            .enumerate()
            .map(|(offset, text)| (start.index + offset, text));

        for end in closest_lines(window, last, settings.end_candidates, settings.weights) {
            frames.push(Frame::new(start, end, before_len));
        }
    }
    frames
}

/// The `limit` lines closest to `target`, best first, earlier lines first on ties.
fn closest_lines<'a>(
    lines: impl Iterator<Item = (usize, &'a str)>,
    target: &str,
    limit: usize,
    weights: LevenshteinWeights,
) -> Vec<LineMatch> {
    let mut ranking = RankingList::new(limit);
    ranking.extend(lines.map(|(index, text)| {
        LineMatch::new(index, weighted_levenshtein(text, target, weights))
    }));
    ranking.into_vec()
}
