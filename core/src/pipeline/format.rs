// Display formatting for processed rows
use chrono::NaiveDate;

/// `1234.5` -> `$1,234.50`; negatives keep the sign in front of the symbol
pub fn currency(amount: f64) -> String {
    if !amount.is_finite() {
        return "$0.00".to_string();
    }
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = group_thousands(cents / 100);
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${whole}.{:02}", cents % 100)
}

/// Currency string or None for unknown amounts
pub fn currency_opt(amount: Option<f64>) -> Option<String> {
    amount.map(currency)
}

/// `MM/DD/YYYY`, the form the dashboard tables show
pub fn display_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

/// Signed percentage with one decimal, e.g. `+33.3%`
pub fn percent(value: f64) -> String {
    format!("{value:+.1}%")
}

fn group_thousands(mut n: u64) -> String {
    let mut groups = Vec::new();
    loop {
        let chunk = n % 1_000;
        n /= 1_000;
        if n == 0 {
            groups.push(chunk.to_string());
            break;
        }
        groups.push(format!("{chunk:03}"));
    }
    groups.reverse();
    groups.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_groups_and_rounds() {
        assert_eq!(currency(0.0), "$0.00");
        assert_eq!(currency(5.5), "$5.50");
        assert_eq!(currency(1234.567), "$1,234.57");
        assert_eq!(currency(1_000_000.0), "$1,000,000.00");
        assert_eq!(currency(-42.1), "-$42.10");
    }

    #[test]
    fn percent_is_signed() {
        assert_eq!(percent(33.333), "+33.3%");
        assert_eq!(percent(-5.0), "-5.0%");
    }

    #[test]
    fn dates_render_us_style() {
        let d = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        assert_eq!(display_date(d), "07/04/2024");
    }
}
