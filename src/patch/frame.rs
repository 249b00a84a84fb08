//! Candidate regions for a fuzzy `before` snippet.

use crate::patch::ranking::{CodeMatch, LineMatch};
use std::collections::BTreeMap;

/// A candidate region of the file, `[start, end]` as 0-based line indexes,
/// together with the file lines matched to each `before` line.
#[derive(Debug, Clone)]
pub struct Frame {
    start: usize,
    end: usize,
    before_len: usize,
    matched: BTreeMap<usize, LineMatch>,
}

impl Frame {
    /// Open a frame from the matches of the first and last `before` lines.
    pub fn new(start: LineMatch, end: LineMatch, before_len: usize) -> Self {
        let mut frame = Self {
            start: start.index,
            end: end.index,
            before_len,
            matched: BTreeMap::new(),
        };
        frame.add_matched_line(0, start);
        frame.add_matched_line(before_len.saturating_sub(1), end);
        frame
    }

    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }

    /// Line indexes covered by this frame.
    pub fn lines(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }

    /// Record `candidate` for `before_idx` if it lies inside the frame.
    ///
    /// Each `before` line keeps its closest match; the earlier one wins ties.
    pub fn add_matched_line(&mut self, before_idx: usize, candidate: LineMatch) -> bool {
        if !self.contains(candidate.index) {
            return false;
        }
        match self.matched.get(&before_idx) {
            Some(existing) if existing.distance <= candidate.distance => {}
            _ => {
                self.matched.insert(before_idx, candidate);
            }
        }
        true
    }

    /// Record the first of `candidates` (best first) that lies inside the frame.
    pub fn add_matched_lines(&mut self, before_idx: usize, candidates: &[LineMatch]) {
        for candidate in candidates {
            if self.add_matched_line(before_idx, *candidate) {
                return;
            }
        }
    }

    /// `avg_distance * (2 - coverage) * (1 - correlation)`; lower is better
    /// and 0 is a perfect, in-order, complete match.
    pub fn score(&self) -> f64 {
        if self.matched.is_empty() || self.before_len == 0 {
            return f64::INFINITY;
        }

        let n = self.matched.len() as f64;
        let total: usize = self.matched.values().map(|m| m.distance).sum();
        let avg_distance = total as f64 / n;
        let coverage = n / self.before_len as f64;

        let file_idx: Vec<f64> = self.matched.values().map(|m| m.index as f64).collect();
        let before_idx: Vec<f64> = self.matched.keys().map(|&i| i as f64).collect();
        let correlation = pearson(&file_idx, &before_idx);

        avg_distance * (2.0 - coverage) * (1.0 - correlation)
    }

    /// The frame as a 1-based line range.
    pub fn to_match(&self) -> CodeMatch {
        CodeMatch {
            start: self.start + 1,
            end: self.end + 1,
            distance: self.score(),
        }
    }
}

/// Pearson correlation of two equally long samples; 0 when it is undefined
/// (fewer than two points or a constant sample).
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }

    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    let r = covariance / (var_x * var_y).sqrt();
    if r.is_nan() {
        0.0
    } else {
        r.clamp(-1.0, 1.0)
    }
}
