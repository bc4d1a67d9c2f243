//! Numbers behind the end-of-session card and the trend dashboard. Rendering
//! is left to the client.

use serde::Serialize;

use crate::models::{Category, Emotion, HistoryRecord, SessionCounters};

/// Order used for listing and for breaking ties (first wins).
pub const REPORT_ORDER: [Emotion; 5] = [
    Emotion::Focused,
    Emotion::Stressed,
    Emotion::Angry,
    Emotion::Sad,
    Emotion::Happy,
];

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmotionShare {
    pub emotion: Emotion,
    pub count: u64,
    /// Share of emotion ticks, 0-100.
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    AboveAverage,
    BelowAverage,
    NoBaseline,
}

impl Verdict {
    pub fn message(&self) -> &'static str {
        match self {
            Verdict::AboveAverage => {
                "You were distracted more than your average today, try to focus more"
            }
            Verdict::BelowAverage => "You were distracted less than your average today, good job!",
            Verdict::NoBaseline => "First tracked session. Your average starts here.",
        }
    }
}

fn shares(counters: &SessionCounters) -> Vec<EmotionShare> {
    let total = counters.emotion_total();
    REPORT_ORDER
        .iter()
        .map(|&emotion| {
            let count = counters.get(Category::Emotion(emotion));
            let percent = if total == 0 {
                0.0
            } else {
                100.0 * count as f64 / total as f64
            };
            EmotionShare {
                emotion,
                count,
                percent,
            }
        })
        .collect()
}

fn leading(shares: &[EmotionShare]) -> Option<Emotion> {
    let mut best: Option<&EmotionShare> = None;
    for share in shares.iter().filter(|share| share.count > 0) {
        if best.map_or(true, |top| share.count > top.count) {
            best = Some(share);
        }
    }
    best.map(|share| share.emotion)
}

/// One finished session compared against the sessions before it.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub sequence_id: i64,
    pub session_id: String,
    pub emotions: Vec<EmotionShare>,
    pub dominant_emotion: Option<Emotion>,
    pub distractions: u64,
    pub average_distractions: Option<f64>,
    pub verdict: Verdict,
    pub message: String,
}

impl SessionSummary {
    /// `prior` are the sessions to compare against; `record` itself is
    /// skipped if it shows up there.
    pub fn build(record: &HistoryRecord, prior: &[HistoryRecord]) -> Self {
        let emotions = shares(&record.counters);
        let baseline: Vec<u64> = prior
            .iter()
            .filter(|other| other.sequence_id != record.sequence_id)
            .map(|other| other.counters.distraction)
            .collect();

        let average_distractions = if baseline.is_empty() {
            None
        } else {
            Some(baseline.iter().sum::<u64>() as f64 / baseline.len() as f64)
        };

        let distractions = record.counters.distraction;
        let verdict = match average_distractions {
            None => Verdict::NoBaseline,
            Some(average) if distractions as f64 >= average => Verdict::AboveAverage,
            Some(_) => Verdict::BelowAverage,
        };

        Self {
            sequence_id: record.sequence_id,
            session_id: record.session_id.clone(),
            dominant_emotion: leading(&emotions),
            emotions,
            distractions,
            average_distractions,
            verdict,
            message: verdict.message().to_string(),
        }
    }
}

/// Totals across the retained history.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub sessions: usize,
    pub emotions: Vec<EmotionShare>,
    pub highest_emotion: Option<Emotion>,
    /// Distractions per session, oldest first.
    pub distraction_series: Vec<u64>,
    /// Mean of the series, one decimal.
    pub average_distractions: Option<f64>,
}

impl TrendReport {
    /// Accepts records in any order.
    pub fn build(records: &[HistoryRecord]) -> Self {
        let mut ordered: Vec<&HistoryRecord> = records.iter().collect();
        ordered.sort_by_key(|record| record.sequence_id);

        let mut totals = SessionCounters::default();
        for record in &ordered {
            for emotion in Emotion::ALL {
                let category = Category::Emotion(emotion);
                let sum = totals.get(category).saturating_add(record.counters.get(category));
                set_emotion(&mut totals, emotion, sum);
            }
        }

        let emotions = shares(&totals);
        let distraction_series: Vec<u64> =
            ordered.iter().map(|record| record.counters.distraction).collect();
        let average_distractions = if distraction_series.is_empty() {
            None
        } else {
            let mean =
                distraction_series.iter().sum::<u64>() as f64 / distraction_series.len() as f64;
            Some((mean * 10.0).round() / 10.0)
        };

        Self {
            sessions: ordered.len(),
            highest_emotion: leading(&emotions),
            emotions,
            distraction_series,
            average_distractions,
        }
    }
}

fn set_emotion(counters: &mut SessionCounters, emotion: Emotion, value: u64) {
    match emotion {
        Emotion::Angry => counters.angry = value,
        Emotion::Stressed => counters.stressed = value,
        Emotion::Happy => counters.happy = value,
        Emotion::Sad => counters.sad = value,
        Emotion::Focused => counters.focused = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EndReason;
    use chrono::Utc;

    fn record(seq: i64, counters: SessionCounters) -> HistoryRecord {
        let now = Utc::now();
        HistoryRecord {
            sequence_id: seq,
            session_id: format!("s{seq}"),
            started_at: now,
            ended_at: now,
            end_reason: EndReason::Stopped,
            counters,
        }
    }

    fn distractions(seq: i64, n: u64) -> HistoryRecord {
        record(
            seq,
            SessionCounters {
                distraction: n,
                ..SessionCounters::default()
            },
        )
    }

    #[test]
    fn percentages_cover_emotion_ticks_only() {
        let current = record(
            9,
            SessionCounters {
                focused: 6,
                happy: 2,
                sad: 2,
                distraction: 40,
                ..SessionCounters::default()
            },
        );
        let summary = SessionSummary::build(&current, &[]);

        let focused = summary.emotions.iter().find(|s| s.emotion == Emotion::Focused).unwrap();
        assert!((focused.percent - 60.0).abs() < 1e-9);
        let total: f64 = summary.emotions.iter().map(|s| s.percent).sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(summary.dominant_emotion, Some(Emotion::Focused));
        assert_eq!(summary.verdict, Verdict::NoBaseline);
        assert_eq!(summary.average_distractions, None);
    }

    #[test]
    fn empty_session_has_no_dominant_emotion() {
        let summary = SessionSummary::build(&record(1, SessionCounters::default()), &[]);
        assert!(summary.emotions.iter().all(|s| s.percent == 0.0));
        assert_eq!(summary.dominant_emotion, None);
    }

    #[test]
    fn matching_the_average_counts_as_above() {
        let prior = [distractions(1, 1), distractions(2, 3)];
        let summary = SessionSummary::build(&distractions(3, 2), &prior);
        assert_eq!(summary.average_distractions, Some(2.0));
        assert_eq!(summary.verdict, Verdict::AboveAverage);

        let better = SessionSummary::build(&distractions(3, 1), &prior);
        assert_eq!(better.verdict, Verdict::BelowAverage);
        assert!(better.message.contains("good job"));
    }

    #[test]
    fn current_record_is_not_its_own_baseline() {
        let current = distractions(4, 10);
        let summary = SessionSummary::build(&current, &[current.clone(), distractions(3, 2)]);
        assert_eq!(summary.average_distractions, Some(2.0));
    }

    #[test]
    fn ties_go_to_report_order() {
        let counters = SessionCounters {
            happy: 3,
            stressed: 3,
            ..SessionCounters::default()
        };
        let summary = SessionSummary::build(&record(1, counters), &[]);
        assert_eq!(summary.dominant_emotion, Some(Emotion::Stressed));
    }

    #[test]
    fn trend_orders_series_and_rounds_average() {
        let records = [
            record(
                7,
                SessionCounters {
                    happy: 5,
                    distraction: 2,
                    ..SessionCounters::default()
                },
            ),
            record(
                5,
                SessionCounters {
                    focused: 3,
                    distraction: 1,
                    ..SessionCounters::default()
                },
            ),
            record(
                6,
                SessionCounters {
                    happy: 1,
                    distraction: 1,
                    ..SessionCounters::default()
                },
            ),
        ];
        let report = TrendReport::build(&records);

        assert_eq!(report.sessions, 3);
        assert_eq!(report.distraction_series, vec![1, 1, 2]);
        assert_eq!(report.average_distractions, Some(1.3));
        assert_eq!(report.highest_emotion, Some(Emotion::Happy));
        let happy = report.emotions.iter().find(|s| s.emotion == Emotion::Happy).unwrap();
        assert_eq!(happy.count, 6);
    }

    #[test]
    fn empty_history_trend() {
        let report = TrendReport::build(&[]);
        assert_eq!(report.sessions, 0);
        assert_eq!(report.average_distractions, None);
        assert_eq!(report.highest_emotion, None);
    }
}
