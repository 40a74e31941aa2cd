const MONTH_ABBREV: [&str; 12] = [
    "Янв", "Фев", "Мар", "Апр", "Май", "Июн", "Июл", "Авг", "Сен", "Окт", "Ноя", "Дек",
];

/// Get the quarter (1-4) for a calendar month (1-12).
pub fn quarter_of_month(month: u8) -> u8 {
    (month.clamp(1, 12) - 1) / 3 + 1
}

/// First month (1-12) of a quarter (1-4). Out-of-range quarters clamp.
pub fn quarter_start_month(quarter: u8) -> u8 {
    (quarter.clamp(1, 4) - 1) * 3 + 1
}

/// Fixed 3-letter label for a month, used as the month bucket label.
pub fn month_abbrev(month: u8) -> &'static str {
    MONTH_ABBREV
        .get(usize::from(month).wrapping_sub(1))
        .copied()
        .unwrap_or("???")
}

/// Round to 2 decimals, half away from zero.
pub fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_of_month() {
        assert_eq!(quarter_of_month(1), 1);
        assert_eq!(quarter_of_month(3), 1);
        assert_eq!(quarter_of_month(4), 2);
        assert_eq!(quarter_of_month(6), 2);
        assert_eq!(quarter_of_month(7), 3);
        assert_eq!(quarter_of_month(12), 4);
    }

    #[test]
    fn test_quarter_start_month() {
        assert_eq!(quarter_start_month(1), 1);
        assert_eq!(quarter_start_month(2), 4);
        assert_eq!(quarter_start_month(4), 10);
        assert_eq!(quarter_start_month(0), 1);
        assert_eq!(quarter_start_month(9), 10);
    }

    #[test]
    fn test_month_abbrev() {
        assert_eq!(month_abbrev(1), "Янв");
        assert_eq!(month_abbrev(12), "Дек");
        assert_eq!(month_abbrev(0), "???");
        assert_eq!(month_abbrev(13), "???");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(125.0), 125.0);
        assert_eq!(round2(1.0 / 3.0), 0.33);
        assert_eq!(round2(2.675_000_1), 2.68);
        assert_eq!(round2(0.0), 0.0);
    }
}
