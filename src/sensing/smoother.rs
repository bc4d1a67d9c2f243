use std::collections::VecDeque;

pub const DEFAULT_WINDOW: usize = 5;

/// Majority vote over the last `capacity` raw labels.
///
/// Ties go to the label that first appears when the window is scanned from
/// oldest to newest.
#[derive(Debug, Clone)]
pub struct LabelSmoother<T> {
    window: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone + PartialEq> LabelSmoother<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, label: T) -> T {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(label.clone());
        self.stable().unwrap_or(label)
    }

    /// Current majority, or `None` before the first push.
    pub fn stable(&self) -> Option<T> {
        let mut tally: Vec<(&T, usize)> = Vec::with_capacity(self.window.len());
        for label in &self.window {
            match tally.iter_mut().find(|(seen, _)| *seen == label) {
                Some((_, count)) => *count += 1,
                None => tally.push((label, 1)),
            }
        }

        let mut best: Option<(&T, usize)> = None;
        for (label, count) in tally {
            if best.map_or(true, |(_, top)| count > top) {
                best = Some((label, count));
            }
        }
        best.map(|(label, _)| label.clone())
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Emotion;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn majority_wins_within_window() {
        let mut smoother = LabelSmoother::new(5);
        assert_eq!(smoother.push(Emotion::Happy), Emotion::Happy);
        assert_eq!(smoother.push(Emotion::Sad), Emotion::Happy);
        assert_eq!(smoother.push(Emotion::Sad), Emotion::Sad);
        assert_eq!(smoother.push(Emotion::Happy), Emotion::Happy);
    }

    #[test]
    fn tie_goes_to_first_seen() {
        let mut smoother = LabelSmoother::new(4);
        smoother.push(Emotion::Focused);
        smoother.push(Emotion::Angry);
        smoother.push(Emotion::Angry);
        assert_eq!(smoother.push(Emotion::Focused), Emotion::Focused);
    }

    #[test]
    fn oldest_label_is_evicted() {
        let mut smoother = LabelSmoother::new(3);
        smoother.push(Emotion::Angry);
        smoother.push(Emotion::Angry);
        smoother.push(Emotion::Happy);
        // window: angry, happy, happy
        assert_eq!(smoother.push(Emotion::Happy), Emotion::Happy);
        assert_eq!(smoother.len(), 3);
    }

    #[test]
    fn reset_forgets_previous_session() {
        let mut smoother = LabelSmoother::new(5);
        smoother.push(Emotion::Sad);
        smoother.push(Emotion::Sad);
        smoother.reset();
        assert!(smoother.is_empty());
        assert_eq!(smoother.stable(), None);
        assert_eq!(smoother.push(Emotion::Happy), Emotion::Happy);
    }

    #[test]
    fn output_is_always_a_label_still_in_window() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut smoother = LabelSmoother::new(5);
        let mut recent: VecDeque<Emotion> = VecDeque::new();

        for _ in 0..500 {
            let label = Emotion::ALL[rng.gen_range(0..Emotion::ALL.len())];
            if recent.len() == 5 {
                recent.pop_front();
            }
            recent.push_back(label);

            let stable = smoother.push(label);
            assert!(recent.contains(&stable));
        }
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut smoother = LabelSmoother::new(0);
        assert_eq!(smoother.capacity(), 1);
        smoother.push(Emotion::Sad);
        assert_eq!(smoother.push(Emotion::Happy), Emotion::Happy);
    }
}
