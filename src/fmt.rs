/// Digits with comma thousands separators: 1234567 -> 1,234,567
pub fn thousands(val: u64) -> String {
    let digits = val.to_string();
    let mut with_commas = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format a yen amount rounded to the whole yen: ¥1,234
pub fn yen(val: f64) -> String {
    let rounded = val.round();
    let body = thousands(rounded.abs() as u64);
    if rounded < 0.0 {
        format!("-¥{body}")
    } else {
        format!("¥{body}")
    }
}

/// Round to the nearest thousand yen before formatting. Used for rent figures.
pub fn yen_rounded(val: f64) -> String {
    yen((val / 1000.0).round() * 1000.0)
}

pub fn percent(val: f64) -> String {
    format!("{val:.1}%")
}

pub fn format_bytes(size: u64) -> String {
    if size < 1024 {
        format!("{size} B")
    } else if size < 1024 * 1024 {
        format!("{:.1} KB", size as f64 / 1024.0)
    } else {
        format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(150_000), "150,000");
        assert_eq!(thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_yen_formatting() {
        assert_eq!(yen(1234.4), "¥1,234");
        assert_eq!(yen(1234.5), "¥1,235");
        assert_eq!(yen(0.0), "¥0");
        assert_eq!(yen(-500.0), "-¥500");
    }

    #[test]
    fn test_yen_rounded_to_thousand() {
        assert_eq!(yen_rounded(123_456.0), "¥123,000");
        assert_eq!(yen_rounded(123_500.0), "¥124,000");
        assert_eq!(yen_rounded(499.0), "¥0");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(12.345), "12.3%");
        assert_eq!(percent(0.0), "0.0%");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
