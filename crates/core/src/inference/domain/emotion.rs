use std::fmt;

/// Emotion categories in the order the scoring model emits them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Emotion {
    Neutral,
    Happy,
    Surprise,
    Sadness,
    Anger,
    Disgust,
    Fear,
    Contempt,
}

/// Category table: index = position in the model's output vector.
pub const CATEGORIES: [Emotion; 8] = [
    Emotion::Neutral,
    Emotion::Happy,
    Emotion::Surprise,
    Emotion::Sadness,
    Emotion::Anger,
    Emotion::Disgust,
    Emotion::Fear,
    Emotion::Contempt,
];

impl Emotion {
    /// Looks up a category id. Ids past the end of the table have no label.
    pub fn from_index(index: usize) -> Option<Emotion> {
        CATEGORIES.get(index).copied()
    }

    /// Maps attribute names used by the cloud face API.
    pub fn from_name(name: &str) -> Option<Emotion> {
        match name.to_ascii_lowercase().as_str() {
            "neutral" => Some(Emotion::Neutral),
            "happy" | "happiness" => Some(Emotion::Happy),
            "surprise" => Some(Emotion::Surprise),
            "sadness" => Some(Emotion::Sadness),
            "anger" => Some(Emotion::Anger),
            "disgust" => Some(Emotion::Disgust),
            "fear" => Some(Emotion::Fear),
            "contempt" => Some(Emotion::Contempt),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Surprise => "surprise",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Contempt => "contempt",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Index and value of the highest score.
///
/// The running maximum starts at 0.0 and only moves on a strictly greater
/// score, so ties resolve to the lowest index and an all-zero (or empty)
/// vector yields index 0.
pub fn argmax(scores: &[f64]) -> (usize, f64) {
    let mut best = (0, 0.0);
    for (index, &score) in scores.iter().enumerate() {
        if score > best.1 {
            best = (index, score);
        }
    }
    best
}

/// Name and value of the highest positive score, first one wins on ties.
pub fn strongest<'a, I>(scores: I) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut best: Option<(&'a str, f64)> = None;
    for (name, score) in scores {
        if score > best.map_or(0.0, |(_, s)| s) {
            best = Some((name, score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_table_order_matches_model_output() {
        let labels: Vec<&str> = CATEGORIES.iter().map(|e| e.label()).collect();
        assert_eq!(
            labels,
            [
                "neutral", "happy", "surprise", "sadness", "anger", "disgust", "fear", "contempt"
            ]
        );
    }

    #[test]
    fn test_from_index_out_of_table_is_none() {
        assert_eq!(Emotion::from_index(7), Some(Emotion::Contempt));
        assert_eq!(Emotion::from_index(8), None);
    }

    #[rstest]
    #[case::happiness("happiness", Some(Emotion::Happy))]
    #[case::uppercase("Anger", Some(Emotion::Anger))]
    #[case::unknown("boredom", None)]
    fn test_from_name(#[case] name: &str, #[case] expected: Option<Emotion>) {
        assert_eq!(Emotion::from_name(name), expected);
    }

    #[test]
    fn test_argmax_tie_keeps_first() {
        let (index, score) = argmax(&[0.5, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(index, 0);
        assert_relative_eq!(score, 0.5);
        assert_eq!(Emotion::from_index(index), Some(Emotion::Neutral));
    }

    #[test]
    fn test_argmax_picks_sadness() {
        let (index, score) = argmax(&[0.1, 0.2, 0.05, 0.9, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(index, 3);
        assert_relative_eq!(score, 0.9);
        assert_eq!(Emotion::from_index(index), Some(Emotion::Sadness));
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::all_zero(&[0.0, 0.0, 0.0])]
    #[case::all_negative(&[-1.0, -0.5])]
    fn test_argmax_defaults_to_zero(#[case] scores: &[f64]) {
        assert_eq!(argmax(scores).0, 0);
    }

    #[test]
    fn test_argmax_ignores_nan() {
        assert_eq!(argmax(&[0.2, f64::NAN, 0.1]).0, 0);
    }

    #[test]
    fn test_argmax_short_vector_stays_in_range() {
        assert_eq!(argmax(&[0.1, 0.7]).0, 1);
    }

    #[test]
    fn test_strongest_picks_max() {
        let scores = [("anger", 0.1), ("happiness", 0.8), ("neutral", 0.1)];
        assert_eq!(strongest(scores), Some(("happiness", 0.8)));
    }

    #[test]
    fn test_strongest_tie_keeps_first_seen() {
        let scores = [("anger", 0.5), ("fear", 0.5)];
        assert_eq!(strongest(scores).map(|(n, _)| n), Some("anger"));
    }

    #[test]
    fn test_strongest_all_zero_is_none() {
        assert_eq!(strongest([("anger", 0.0)]), None);
    }
}
