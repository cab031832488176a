use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use super::{RentParse, OPEN_ENDED_CEILING};

/// Answers seen in the form, mapped to the yen ceiling they express.
/// A value of 0 marks answers with no usable amount ("none", "depends").
const OBSERVED_ANSWERS: &[(&str, u32)] = &[
    ("~60,000円", 60000),
    ("~70,000円", 70000),
    ("~80,000円", 80000),
    ("~90,000円", 90000),
    ("~100,000円", 100000),
    ("~110,000円", 110000),
    ("~120,000円", 120000),
    ("~130,000円", 130000),
    ("~140,000円", 140000),
    ("~150,000円", 150000),
    ("~160,000円", 160000),
    ("~170,000円", 170000),
    ("~180,000円", 180000),
    ("~190,000円", 190000),
    ("~200,000円", 200000),
    ("201,000~250,000円", 250000),
    ("251,000~300,000円", 300000),
    ("301,000~350,000円", 350000),
    ("351,000~400,000円", 400000),
    ("401,000円~", 500000),
    ("〜100,000", 100000),
    ("〜100000", 100000),
    ("〜13万", 130000),
    ("〜14万前後", 140000),
    ("〜17", 170000),
    ("〜20万円", 200000),
    ("〜24万", 250000),
    ("〜7万", 70000),
    ("〜9万円", 90000),
    ("~10.5万", 110000),
    ("~80,000、85,000~の場合ネット込", 90000),
    ("¥200000", 200000),
    ("10", 100000),
    ("10-25", 250000),
    ("10〜14", 140000),
    ("10〜20万", 200000),
    ("10.5万までなら", 110000),
    ("100000〜110000", 110000),
    ("100万以内", 100000),
    ("10万", 100000),
    ("10万〜12万", 120000),
    ("10万から13万くらい", 130000),
    ("10万ぐらい", 100000),
    ("10万以下", 100000),
    ("10万以内", 100000),
    ("10万位ない", 100000),
    ("10万円", 100000),
    ("10万円くらい", 100000),
    ("10万円以下", 100000),
    ("10万円以内", 100000),
    ("10万円前後", 100000),
    ("10万円前後、", 100000),
    ("10万前後", 100000),
    ("10万未満理想", 100000),
    ("11.5:", 120000),
    ("１１万", 110000),
    ("11万以下", 110000),
    ("11万円", 110000),
    ("11万円〜12万円", 120000),
    ("12-13万", 130000),
    ("12.5万円 ~130,000", 130000),
    ("120000", 120000),
    ("12万", 120000),
    ("12万以下", 120000),
    ("12万円", 120000),
    ("12万円まで", 120000),
    ("13", 130000),
    ("13〜14万", 140000),
    ("130,000(駐車場込み)", 130000),
    ("13000", 130000),
    ("130000", 130000),
    ("13以下", 130000),
    ("13万", 130000),
    ("13万以下", 130000),
    ("13万以下（駐車場込みでこれくらいが理想", 130000),
    ("13万円", 130000),
    ("13万円以下", 130000),
    ("14.5万", 150000),
    ("14~18", 180000),
    ("140000", 140000),
    ("14万", 140000),
    ("14万円", 140000),
    ("15", 150000),
    ("15〜20", 200000),
    ("15〜22万円", 250000),
    ("15〜48", 401000),
    ("15.5万", 160000),
    ("１５～１８万", 180000),
    ("150,000", 150000),
    ("150,000以下", 150000),
    ("150000", 150000),
    ("15万", 150000),
    ("15万〜20万", 200000),
    ("15万以下", 150000),
    ("15万以内", 150000),
    ("15万位内", 150000),
    ("15万円", 150000),
    ("15万円以下", 150000),
    ("15万円程度", 150000),
    ("15万円程度まで", 150000),
    ("15万管理費込み", 150000),
    ("15万前後", 150000),
    ("15万程度", 150000),
    ("16", 160000),
    ("16〜22万円", 250000),
    ("16万", 160000),
    ("16万以内", 160000),
    ("16万円前後", 160000),
    ("17.5万", 180000),
    ("170000", 170000),
    ("17マン", 170000),
    ("17万以下", 170000),
    ("17万位内", 170000),
    ("17万円以下", 170000),
    ("18", 180000),
    ("180,000円", 180000),
    ("18万", 180000),
    ("18万まで", 180000),
    ("18万以下", 180000),
    ("18万以内で、もっと安いと嬉しいです", 180000),
    ("18万円まで", 180000),
    ("20", 200000),
    ("20万", 200000),
    ("２０万", 200000),
    ("20万以内", 200000),
    ("20万位内", 200000),
    ("20万円まで", 200000),
    ("20万円以下が理想", 200000),
    ("20万前後", 200000),
    ("20万程度", 200000),
    ("20萬", 200000),
    ("210000円", 250000),
    ("22万", 250000),
    ("23万以下", 250000),
    ("24", 250000),
    ("25", 250000),
    ("250000", 250000),
    ("25万", 250000),
    ("25万まで", 250000),
    ("25万以下", 250000),
    ("25万以内", 250000),
    ("25万円前後", 250000),
    ("25万前後", 250000),
    ("26万円", 300000),
    ("30", 300000),
    ("30万ほどまで", 300000),
    ("30万円", 300000),
    ("30万円まで", 300000),
    ("30万円以内", 300000),
    ("35以内", 350000),
    ("40", 400000),
    ("400,000", 400000),
    ("400000以下", 400000),
    ("40万まで", 400000),
    ("40万以内", 400000),
    ("4０万前後", 400000),
    ("45マン以内", 401000),
    ("45以下", 401000),
    ("500,000円", 401000),
    ("50万以下", 401000),
    ("55000", 60000),
    ("5万", 60000),
    ("60,000円以内", 60000),
    ("65,000", 70000),
    ("65000まで", 70000),
    ("6万から10万前後", 100000),
    ("6万以下", 60000),
    ("7-10万くらい", 100000),
    ("70,000円", 70000),
    ("75000以内", 80000),
    ("7万", 70000),
    ("7万から13万", 130000),
    ("7万以下を希望だけど、7.5万まで許容範囲です", 80000),
    ("7万以下希望", 70000),
    ("7万円", 70000),
    ("8,5000円", 90000),
    ("8.5", 90000),
    ("85,000", 90000),
    ("85000", 90000),
    ("8万", 80000),
    ("８万", 80000),
    ("8万以内", 80000),
    ("8万円", 80000),
    ("8万円くらい", 80000),
    ("8万円以内", 80000),
    ("8万円前後", 80000),
    ("9.5", 100000),
    ("9.5万", 100000),
    ("9.5万以下", 100000),
    ("9.5万以内", 100000),
    ("90,000", 90000),
    ("90000", 90000),
    ("95000", 100000),
    ("9万", 90000),
    ("9万円以内", 90000),
    ("9万円台", 100000),
    ("9万程度", 90000),
    ("MAX15万まで", 150000),
    ("できれば20万以下(管理費/駐車場代込み)", 200000),
    ("ない", 0),
    ("管理費込み11万ぐらいまで", 110000),
    ("希望は10万 とにかく多頭飼い可能物件", 100000),
    ("十万以下", 100000),
    ("駐車場込みでMAX15万", 150000),
    ("部屋次第", 0),
];

static ANSWER_MAP: OnceLock<HashMap<&'static str, u32>> = OnceLock::new();

fn answer_map() -> &'static HashMap<&'static str, u32> {
    ANSWER_MAP.get_or_init(|| OBSERVED_ANSWERS.iter().copied().collect())
}

struct Fallbacks {
    ceiling: Regex,
    range: Regex,
    open_ended: Regex,
}

fn fallbacks() -> Option<&'static Fallbacks> {
    static FALLBACKS: OnceLock<Option<Fallbacks>> = OnceLock::new();
    FALLBACKS
        .get_or_init(|| {
            const AMOUNT: &str = r"([0-9]{1,3}(?:,[0-9]{3})*|[0-9]+)";
            const TILDE: &str = "[~〜～]";
            Some(Fallbacks {
                ceiling: Regex::new(&format!("^{TILDE}{AMOUNT}円$")).ok()?,
                range: Regex::new(&format!("^{AMOUNT}{TILDE}{AMOUNT}円$")).ok()?,
                open_ended: Regex::new(&format!("^{AMOUNT}円{TILDE}$")).ok()?,
            })
        })
        .as_ref()
}

fn amount(digits: &str) -> Option<u32> {
    digits.replace(',', "").parse().ok().filter(|v| *v > 0)
}

/// Exact lookup first, then the `~N円` / `N~M円` / `N円~` answer shapes.
pub fn parse(raw: &str) -> RentParse {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return RentParse::invalid(raw);
    }

    if let Some(&value) = answer_map().get(trimmed) {
        return match value {
            0 => RentParse::invalid(raw),
            v => RentParse::valid(raw, v),
        };
    }

    let Some(patterns) = fallbacks() else {
        return RentParse::invalid(raw);
    };
    if let Some(caps) = patterns.ceiling.captures(trimmed) {
        if let Some(v) = amount(&caps[1]) {
            return RentParse::valid(raw, v);
        }
    }
    if let Some(caps) = patterns.range.captures(trimmed) {
        if let Some(v) = amount(&caps[2]) {
            return RentParse::valid(raw, v);
        }
    }
    if patterns.open_ended.is_match(trimmed) {
        return RentParse::valid(raw, OPEN_ENDED_CEILING);
    }

    RentParse::invalid(raw)
}

/// Canonical text for a parsed value; re-parses to the same value.
pub fn render(value: u32) -> String {
    format!("~{}円", crate::fmt::thousands(value as u64))
}

#[cfg(test)]
pub(crate) fn observed_answers() -> &'static [(&'static str, u32)] {
    OBSERVED_ANSWERS
}
