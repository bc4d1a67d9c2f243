use serde::{Deserialize, Serialize};

/// The five emotional states the monitor tracks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Stressed,
    Happy,
    Sad,
    Focused,
}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::Angry,
        Emotion::Stressed,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Focused,
    ];

    /// Maps a raw face-analyzer label onto one of the tracked emotions.
    ///
    /// Labels the analyzer may produce that have no direct counterpart fold into
    /// the nearest state: fear and disgust read as stress, neutral and surprise
    /// as focus. Anything unrecognised counts as stress.
    pub fn from_raw(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "angry" => Emotion::Angry,
            "fear" | "disgust" => Emotion::Stressed,
            "happy" => Emotion::Happy,
            "sad" => Emotion::Sad,
            "neutral" | "surprise" => Emotion::Focused,
            _ => Emotion::Stressed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Stressed => "stressed",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Focused => "focused",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Emotion::Angry => "Angry",
            Emotion::Stressed => "Stressed",
            Emotion::Happy => "Happy",
            Emotion::Sad => "Sad",
            Emotion::Focused => "Focused",
        }
    }
}

/// A counter slot in [`SessionCounters`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Emotion(Emotion),
    Distraction,
}

impl From<Emotion> for Category {
    fn from(emotion: Emotion) -> Self {
        Category::Emotion(emotion)
    }
}

/// Per-category tallies for one monitoring session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionCounters {
    pub angry: u64,
    pub stressed: u64,
    pub happy: u64,
    pub sad: u64,
    pub focused: u64,
    pub distraction: u64,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> u64 {
        match category {
            Category::Emotion(Emotion::Angry) => self.angry,
            Category::Emotion(Emotion::Stressed) => self.stressed,
            Category::Emotion(Emotion::Happy) => self.happy,
            Category::Emotion(Emotion::Sad) => self.sad,
            Category::Emotion(Emotion::Focused) => self.focused,
            Category::Distraction => self.distraction,
        }
    }

    pub fn bump(&mut self, category: impl Into<Category>) {
        let slot = match category.into() {
            Category::Emotion(Emotion::Angry) => &mut self.angry,
            Category::Emotion(Emotion::Stressed) => &mut self.stressed,
            Category::Emotion(Emotion::Happy) => &mut self.happy,
            Category::Emotion(Emotion::Sad) => &mut self.sad,
            Category::Emotion(Emotion::Focused) => &mut self.focused,
            Category::Distraction => &mut self.distraction,
        };
        *slot = slot.saturating_add(1);
    }

    /// Sum of all emotion slots; distraction events are not emotion ticks.
    pub fn emotion_total(&self) -> u64 {
        Emotion::ALL
            .iter()
            .map(|emotion| self.get(Category::Emotion(*emotion)))
            .sum()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_labels_fold_into_tracked_emotions() {
        assert_eq!(Emotion::from_raw("angry"), Emotion::Angry);
        assert_eq!(Emotion::from_raw("Fear"), Emotion::Stressed);
        assert_eq!(Emotion::from_raw("disgust"), Emotion::Stressed);
        assert_eq!(Emotion::from_raw("HAPPY"), Emotion::Happy);
        assert_eq!(Emotion::from_raw("sad"), Emotion::Sad);
        assert_eq!(Emotion::from_raw("neutral"), Emotion::Focused);
        assert_eq!(Emotion::from_raw("surprise"), Emotion::Focused);
        assert_eq!(Emotion::from_raw("confused"), Emotion::Stressed);
    }

    #[test]
    fn bump_touches_only_its_slot() {
        let mut counters = SessionCounters::new();
        counters.bump(Emotion::Happy);
        counters.bump(Emotion::Happy);
        counters.bump(Category::Distraction);

        assert_eq!(counters.happy, 2);
        assert_eq!(counters.distraction, 1);
        assert_eq!(counters.emotion_total(), 2);

        counters.reset();
        assert_eq!(counters, SessionCounters::default());
    }
}
