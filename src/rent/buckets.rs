use std::sync::OnceLock;

use regex::Regex;

use super::RentParse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub label: &'static str,
    /// Upper bound in yen; `None` for the open top band.
    pub max: Option<u32>,
}

impl Bucket {
    /// Value reported for answers in this band.
    pub fn ceiling(&self) -> u32 {
        self.max.unwrap_or(OPEN_BUCKET_VALUE)
    }
}

const OPEN_BUCKET_VALUE: u32 = 510_000;

pub const BUCKETS: &[Bucket] = &[
    Bucket { label: "~50,000円", max: Some(50_000) },
    Bucket { label: "51,000~75,000円", max: Some(75_000) },
    Bucket { label: "76,000~100,000円", max: Some(100_000) },
    Bucket { label: "101,000~125,000円", max: Some(125_000) },
    Bucket { label: "126,000~150,000円", max: Some(150_000) },
    Bucket { label: "151,000~170,000円", max: Some(170_000) },
    Bucket { label: "171,000~200,000円", max: Some(200_000) },
    Bucket { label: "201,000~225,000円", max: Some(225_000) },
    Bucket { label: "226,000~250,000円", max: Some(250_000) },
    Bucket { label: "251,000~275,000円", max: Some(275_000) },
    Bucket { label: "276,000~300,000円", max: Some(300_000) },
    Bucket { label: "301,000~325,000円", max: Some(325_000) },
    Bucket { label: "326,000~350,000円", max: Some(350_000) },
    Bucket { label: "351,000~375,000円", max: Some(375_000) },
    Bucket { label: "376,000~400,000円", max: Some(400_000) },
    Bucket { label: "401,000~425,000円", max: Some(425_000) },
    Bucket { label: "426,000~450,000円", max: Some(450_000) },
    Bucket { label: "451,000~475,000円", max: Some(475_000) },
    Bucket { label: "476,000~500,000円", max: Some(500_000) },
    Bucket { label: "510,000円~", max: None },
];

/// First band whose upper bound covers `amount`. Amounts between two bands'
/// nominal ranges (e.g. 50,500) fall into the next band up.
pub fn bucket_for(amount: u32) -> &'static Bucket {
    BUCKETS
        .iter()
        .find(|b| b.max.map_or(true, |max| amount <= max))
        .unwrap_or(&BUCKETS[BUCKETS.len() - 1])
}

// ---- Amount extraction ----

const RANGE_SEPARATORS: &[&str] = &["~", "〜", "～", "-", "ー", "から"];

fn amount_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*(万|マン|萬)?").ok())
        .as_ref()
}

fn fold_width(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - 0xFEE0),
            '．' => Some('.'),
            ',' | '，' | '、' => None,
            other => Some(other),
        })
        .collect()
}

fn amount_in(segment: &str) -> Option<u64> {
    let caps = amount_pattern()?.captures(segment)?;
    let number: f64 = caps[1].parse().ok()?;
    let yen = if caps.get(2).is_some() || number < 100.0 {
        number * 10_000.0
    } else {
        number
    };
    Some(yen.round() as u64)
}

/// Largest amount mentioned in the answer, in yen.
pub fn extract_amount(raw: &str) -> Option<u64> {
    let mut segments = vec![fold_width(raw)];
    for sep in RANGE_SEPARATORS {
        segments = segments
            .iter()
            .flat_map(|s| s.split(sep).map(str::to_string).collect::<Vec<_>>())
            .collect();
    }
    segments.iter().filter_map(|s| amount_in(s)).max()
}

pub(crate) fn from_amount(raw: &str, amount: u64) -> RentParse {
    if amount == 0 {
        return RentParse::invalid(raw);
    }
    let bucket = bucket_for(u32::try_from(amount).unwrap_or(u32::MAX));
    RentParse {
        value: Some(bucket.ceiling()),
        original: raw.to_string(),
        bucket: Some(bucket.label),
    }
}

pub fn parse(raw: &str) -> RentParse {
    match extract_amount(raw.trim()) {
        Some(amount) => from_amount(raw, amount),
        None => RentParse::invalid(raw),
    }
}
