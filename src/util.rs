const SHORT_ID_EDGE: usize = 6;

/// Long ids (addresses, hashes) are cut to their head and tail.
pub fn short_id(id: &str) -> String {
    let count = id.chars().count();
    if count <= SHORT_ID_EDGE * 2 + 2 {
        return id.to_owned();
    }

    let head = id.chars().take(SHORT_ID_EDGE).collect::<String>();
    let tail = id.chars().skip(count - SHORT_ID_EDGE).collect::<String>();
    format!("{head}..{tail}")
}

pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}
