use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LeadError;

/// Marketing channels a lead can be attributed to. Closed set, canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    Instagram,
    TikTok,
    YouTube,
    Lemon8,
    #[serde(rename = "LINE")]
    Line,
    #[serde(rename = "ラグジュアリーカード")]
    LuxuryCard,
    #[serde(rename = "ホームページ")]
    Homepage,
    #[serde(rename = "チラシ")]
    Flyer,
    #[serde(rename = "その他（紹介等）")]
    Referral,
    #[serde(rename = "CLASSY(雑誌)")]
    Classy,
}

impl Channel {
    pub const ALL: [Channel; 10] = [
        Channel::Instagram,
        Channel::TikTok,
        Channel::YouTube,
        Channel::Lemon8,
        Channel::Line,
        Channel::LuxuryCard,
        Channel::Homepage,
        Channel::Flyer,
        Channel::Referral,
        Channel::Classy,
    ];

    /// Label as it appears in the form answers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Instagram => "Instagram",
            Self::TikTok => "TikTok",
            Self::YouTube => "YouTube",
            Self::Lemon8 => "Lemon8",
            Self::Line => "LINE",
            Self::LuxuryCard => "ラグジュアリーカード",
            Self::Homepage => "ホームページ",
            Self::Flyer => "チラシ",
            Self::Referral => "その他（紹介等）",
            Self::Classy => "CLASSY(雑誌)",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::TikTok => "tiktok",
            Self::YouTube => "youtube",
            Self::Lemon8 => "lemon8",
            Self::Line => "line",
            Self::LuxuryCard => "luxury_card",
            Self::Homepage => "homepage",
            Self::Flyer => "flyer",
            Self::Referral => "referral",
            Self::Classy => "classy",
        }
    }

    /// Position in the canonical order.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|c| c == self).unwrap_or(0)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Channel {
    type Err = LeadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_channel(s).ok_or_else(|| LeadError::UnknownChannel(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Keyword heuristics, evaluated in order; first match wins.
const HEURISTICS: &[(&[&str], Channel)] = &[
    (&["instagram", "インスタ"], Channel::Instagram),
    (&["tiktok", "ティックトック"], Channel::TikTok),
    (&["youtube", "ユーチューブ"], Channel::YouTube),
    (&["lemon8", "レモン"], Channel::Lemon8),
    (&["line", "ライン"], Channel::Line),
    (&["ラグジュアリー", "luxury"], Channel::LuxuryCard),
    (&["ホームページ", "hp", "web"], Channel::Homepage),
    (&["チラシ", "flyer"], Channel::Flyer),
    (&["紹介", "その他"], Channel::Referral),
    (&["classy", "雑誌"], Channel::Classy),
];

fn exact_match(value: &str) -> Option<Channel> {
    Channel::ALL
        .iter()
        .find(|c| c.label() == value || c.key() == value)
        .copied()
}

fn keyword_match(value: &str) -> Option<Channel> {
    let lower = value.to_lowercase();
    HEURISTICS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, channel)| *channel)
}

/// Map a free-text "how did you hear about us" answer onto a channel.
/// `None` means the row is unattributed.
pub fn normalize_channel(raw: &str) -> Option<Channel> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    exact_match(trimmed).or_else(|| keyword_match(trimmed))
}
