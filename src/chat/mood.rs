// src/chat/mood.rs
// Mood shown by the assistant's face while it answers

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Neutral,
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Neutral => "neutral",
        })
    }
}

/// Pluggable sentiment model; only the three-way outcome matters here
pub trait MoodClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Mood;
}

/// Word-list classifier used when no model-backed one is injected
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconMood;

const HAPPY_WORDS: &[&str] = &[
    "happy", "glad", "great", "love", "wonderful", "awesome", "thanks", "thank", "excited",
    "joy", "fun", "amazing", "beautiful", "yay", "excellent", "delighted",
];

const SAD_WORDS: &[&str] = &[
    "sad", "angry", "hate", "afraid", "scared", "terrible", "awful", "cry", "lonely", "upset",
    "tired", "stuck", "frustrated", "worried", "grief", "disgusting", "fear",
];

impl MoodClassifier for LexiconMood {
    fn classify(&self, text: &str) -> Mood {
        let (mut happy, mut sad) = (0usize, 0usize);
        for word in text
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            if HAPPY_WORDS.contains(&word.as_str()) {
                happy += 1;
            } else if SAD_WORDS.contains(&word.as_str()) {
                sad += 1;
            }
        }

        match happy.cmp(&sad) {
            std::cmp::Ordering::Greater => Mood::Happy,
            std::cmp::Ordering::Less => Mood::Sad,
            std::cmp::Ordering::Equal => Mood::Neutral,
        }
    }
}
