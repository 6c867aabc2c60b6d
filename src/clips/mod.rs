//! Retention-informed clip scoring for short-form extraction.
//!
//! Scores script segments for clip-worthiness, optionally re-weighted by
//! the source video's audience retention curve: segments overlapping
//! top-quintile watch ratios get boosted, bottom-quintile overlaps are
//! penalized.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::domain::RetentionPoint;

/// Score added to clips overlapping top-quintile retention.
const HIGH_RETENTION_BONUS: i32 = 6;

/// Score removed from clips overlapping bottom-quintile retention.
const LOW_RETENTION_PENALTY: i32 = 3;

/// A parsed script segment with its narration and visual cues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub text: String,
    pub visuals: Vec<String>,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end_sec - self.start_sec
    }
}

/// A scored clip candidate, ready for extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipCandidate {
    pub name: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub score: i32,
    /// Leading sentence of the clip's narration
    pub hook_text: String,
}

/// Score segments (and adjacent pairs) for clip-worthiness and return
/// candidates within the duration bounds, best first.
///
/// Scoring rubric:
/// - +5 hook / intro segments
/// - +4 self-contained segments (opening text plus a concluding cue)
/// - +3 segments with at least two visual markers
/// - +4 optimal duration (20-50 s), +2 merely in-bounds
/// - retention overlap: +6 top quintile, -3 bottom quintile
pub fn find_best_clips(
    segments: &[Segment],
    min_duration: f64,
    max_duration: f64,
    retention: Option<&[RetentionPoint]>,
) -> Vec<ClipCandidate> {
    if segments.is_empty() {
        return Vec::new();
    }

    let mut candidates = Vec::new();

    for segment in segments {
        let duration = segment.duration();
        if duration < min_duration || duration > max_duration {
            continue;
        }
        candidates.push(ClipCandidate {
            name: segment.name.clone(),
            start_sec: segment.start_sec,
            end_sec: segment.end_sec,
            score: score_segment(segment)
                + duration_score(duration, min_duration, max_duration),
            hook_text: leading_sentence(&segment.text),
        });
    }

    // Adjacent segments that together fit the bounds compete as one clip.
    for pair in segments.windows(2) {
        let combined_start = pair[0].start_sec;
        let combined_end = pair[1].end_sec;
        let combined_duration = combined_end - combined_start;
        if combined_duration < min_duration || combined_duration > max_duration {
            continue;
        }
        let base = score_segment(&pair[0]).max(score_segment(&pair[1])) + 1;
        candidates.push(ClipCandidate {
            name: format!("{} + {}", pair[0].name, pair[1].name),
            start_sec: combined_start,
            end_sec: combined_end,
            score: base + duration_score(combined_duration, min_duration, max_duration),
            hook_text: leading_sentence(&pair[0].text),
        });
    }

    if let Some(points) = retention {
        apply_retention_weighting(&mut candidates, segments, points);
    }

    candidates.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.start_sec.partial_cmp(&b.start_sec).unwrap_or(Ordering::Equal))
    });
    candidates
}

/// Intrinsic clip-worthiness of a single segment, before duration scoring.
fn score_segment(segment: &Segment) -> i32 {
    let mut score = 0;
    let name_lower = segment.name.to_lowercase();

    if ["hook", "intro", "opening"]
        .iter()
        .any(|kw| name_lower.contains(kw))
    {
        score += 5;
    }

    // Self-contained: enough opening text plus some concluding language
    let text_lower = segment.text.to_lowercase();
    const CONCLUSION_CUES: [&str; 9] = [
        "subscribe",
        "like",
        "comment",
        "follow",
        "remember",
        "so next time",
        "mind blown",
        "the answer",
        "that's why",
    ];
    let has_conclusion = CONCLUSION_CUES.iter().any(|cue| text_lower.contains(cue));
    if segment.text.len() > 30 && has_conclusion {
        score += 4;
    }

    if segment.visuals.len() >= 2 {
        score += 3;
    }

    score
}

fn duration_score(duration: f64, min_duration: f64, max_duration: f64) -> i32 {
    if (20.0..=50.0).contains(&duration) {
        4
    } else if (min_duration..=max_duration).contains(&duration) {
        2
    } else {
        0
    }
}

fn leading_sentence(text: &str) -> String {
    text.split('.').next().unwrap_or("").trim().to_string()
}

/// Boost clips overlapping elevated retention, penalize dead zones.
fn apply_retention_weighting(
    candidates: &mut [ClipCandidate],
    segments: &[Segment],
    points: &[RetentionPoint],
) {
    if points.is_empty() {
        return;
    }

    let mut by_ratio: Vec<f64> = points.iter().map(|p| p.audience_watch_ratio).collect();
    by_ratio.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let (top_threshold, bottom_threshold) = if by_ratio.len() >= 5 {
        (
            by_ratio[(by_ratio.len() as f64 * 0.8) as usize],
            by_ratio[(by_ratio.len() as f64 * 0.2) as usize],
        )
    } else {
        // Too few points to derive quintiles; use fixed cutoffs
        (1.2, 0.5)
    };

    // Clip times are seconds; the curve is in elapsed fractions of the
    // source video, estimated from the last segment's end.
    let source_duration = segments
        .iter()
        .map(|s| s.end_sec)
        .fold(0.0_f64, f64::max)
        .max(1.0);

    for clip in candidates.iter_mut() {
        let start_pct = clip.start_sec / source_duration;
        let end_pct = clip.end_sec / source_duration;

        let overlapping: Vec<f64> = points
            .iter()
            .filter(|p| (start_pct..=end_pct).contains(&p.elapsed_pct))
            .map(|p| p.audience_watch_ratio)
            .collect();

        if overlapping.is_empty() {
            continue;
        }

        let avg_ratio = overlapping.iter().sum::<f64>() / overlapping.len() as f64;
        if avg_ratio >= top_threshold {
            clip.score += HIGH_RETENTION_BONUS;
        } else if avg_ratio <= bottom_threshold {
            clip.score -= LOW_RETENTION_PENALTY;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(name: &str, start: f64, end: f64, text: &str, visuals: usize) -> Segment {
        Segment {
            name: name.to_string(),
            start_sec: start,
            end_sec: end,
            text: text.to_string(),
            visuals: (0..visuals).map(|i| format!("visual {i}")).collect(),
        }
    }

    fn point(elapsed_pct: f64, ratio: f64) -> RetentionPoint {
        RetentionPoint {
            elapsed_pct,
            audience_watch_ratio: ratio,
            relative_performance: 0.0,
        }
    }

    #[test]
    fn test_empty_segments_yield_no_clips() {
        assert!(find_best_clips(&[], 15.0, 59.0, None).is_empty());
    }

    #[test]
    fn test_duration_bounds_respected() {
        let segments = vec![
            segment("Too short", 0.0, 5.0, "Quick beat", 0),
            segment("Fits", 5.0, 35.0, "A solid standalone story", 0),
            segment("Too long", 35.0, 180.0, "Rambling chapter", 0),
        ];
        let clips = find_best_clips(&segments, 15.0, 59.0, None);
        for clip in &clips {
            let duration = clip.end_sec - clip.start_sec;
            assert!((15.0..=59.0).contains(&duration), "{}: {duration}", clip.name);
        }
        assert!(clips.iter().any(|c| c.name == "Fits"));
        assert!(!clips.iter().any(|c| c.name == "Too long"));
    }

    #[test]
    fn test_scores_sort_non_increasing() {
        let segments = vec![
            segment("Middle", 30.0, 60.0, "Body content with detail", 0),
            segment("Hook", 0.0, 30.0, "The opener everyone sees. Remember this", 3),
            segment("Outro", 60.0, 95.0, "Thanks and subscribe for more", 1),
        ];
        let clips = find_best_clips(&segments, 15.0, 59.0, None);
        assert!(!clips.is_empty());
        for pair in clips.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_hook_segment_outscores_plain_segment() {
        let segments = vec![
            segment("Hook", 0.0, 30.0, "Something wild happens here", 2),
            segment("Chapter 2", 30.0, 60.0, "Something wild happens here", 2),
        ];
        let clips = find_best_clips(&segments, 15.0, 59.0, None);
        let hook = clips.iter().find(|c| c.name == "Hook").unwrap();
        let plain = clips.iter().find(|c| c.name == "Chapter 2").unwrap();
        assert!(hook.score > plain.score);
    }

    #[test]
    fn test_hook_text_is_leading_sentence() {
        let segments = vec![segment(
            "Intro",
            0.0,
            25.0,
            "This is the first sentence. And this is the second",
            0,
        )];
        let clips = find_best_clips(&segments, 15.0, 59.0, None);
        assert_eq!(clips[0].hook_text, "This is the first sentence");
    }

    #[test]
    fn test_adjacent_segments_combine() {
        let segments = vec![
            segment("Part A", 0.0, 20.0, "Setup", 0),
            segment("Part B", 20.0, 40.0, "Payoff", 0),
        ];
        let clips = find_best_clips(&segments, 15.0, 59.0, None);
        assert!(clips.iter().any(|c| c.name == "Part A + Part B"));
    }

    #[test]
    fn test_high_retention_never_lowers_score() {
        let segments = vec![
            segment("Intro", 0.0, 30.0, "Hook text here", 2),
            segment("Middle", 30.0, 60.0, "Middle content", 1),
        ];

        let without = find_best_clips(&segments, 15.0, 59.0, None);
        let retention = vec![
            point(0.0, 1.5),
            point(0.1, 1.4),
            point(0.2, 1.3),
            point(0.5, 0.3),
            point(0.8, 0.2),
        ];
        let with = find_best_clips(&segments, 15.0, 59.0, Some(&retention));

        let intro_without = without.iter().find(|c| c.name == "Intro").unwrap();
        let intro_with = with.iter().find(|c| c.name == "Intro").unwrap();
        assert!(intro_with.score >= intro_without.score);
    }

    #[test]
    fn test_low_retention_overlap_penalized() {
        let segments = vec![
            segment("Intro", 0.0, 30.0, "Hook text", 0),
            segment("Dead zone", 30.0, 60.0, "Filler", 0),
        ];
        let retention = vec![
            point(0.1, 1.5),
            point(0.3, 1.4),
            point(0.6, 0.1),
            point(0.8, 0.1),
            point(0.95, 0.1),
        ];

        let without = find_best_clips(&segments, 15.0, 59.0, None);
        let with = find_best_clips(&segments, 15.0, 59.0, Some(&retention));

        let dead_without = without.iter().find(|c| c.name == "Dead zone").unwrap();
        let dead_with = with.iter().find(|c| c.name == "Dead zone").unwrap();
        assert!(dead_with.score < dead_without.score);
    }

    #[test]
    fn test_sparse_retention_uses_fixed_cutoffs() {
        let segments = vec![segment("Intro", 0.0, 30.0, "Hook text", 0)];
        // Fewer than 5 points: 1.3 clears the fixed 1.2 cutoff
        let retention = vec![point(0.1, 1.3), point(0.4, 1.3)];

        let without = find_best_clips(&segments, 15.0, 59.0, None);
        let with = find_best_clips(&segments, 15.0, 59.0, Some(&retention));
        assert_eq!(with[0].score, without[0].score + HIGH_RETENTION_BONUS);
    }
}
