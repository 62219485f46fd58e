use std::fmt;

use serde::{Deserialize, Serialize};

/// The seven classes of the facial emotion model, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Sad,
    Disgust,
    Angry,
    Neutral,
    Fear,
    Surprise,
    Happy,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Sad,
        Emotion::Disgust,
        Emotion::Angry,
        Emotion::Neutral,
        Emotion::Fear,
        Emotion::Surprise,
        Emotion::Happy,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Sad => "sad",
            Emotion::Disgust => "disgust",
            Emotion::Angry => "angry",
            Emotion::Neutral => "neutral",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
            Emotion::Happy => "happy",
        }
    }

    /// Chinese label.
    pub fn cn(self) -> &'static str {
        match self {
            Emotion::Sad => "悲伤",
            Emotion::Disgust => "厌恶",
            Emotion::Angry => "生气",
            Emotion::Neutral => "中性",
            Emotion::Fear => "恐惧",
            Emotion::Surprise => "惊讶",
            Emotion::Happy => "高兴",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_order() {
        assert_eq!(Emotion::from_index(0), Some(Emotion::Sad));
        assert_eq!(Emotion::from_index(3), Some(Emotion::Neutral));
        assert_eq!(Emotion::from_index(6), Some(Emotion::Happy));
        assert_eq!(Emotion::from_index(7), None);
        for (i, e) in Emotion::ALL.iter().enumerate() {
            assert_eq!(e.index(), i);
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(Emotion::Disgust.to_string(), "disgust");
        assert_eq!(Emotion::Happy.cn(), "高兴");
        assert_eq!(serde_json::to_string(&Emotion::Fear).unwrap(), "\"fear\"");
    }
}
