/// Currency suffix used on every displayed price (Mauritanian ouguiya)
pub const PRICE_SUFFIX: &str = "UM";

// fr-FR groups thousands with a narrow no-break space
const GROUP_SEPARATOR: char = '\u{202f}';

/// Format an amount in cents the way the storefront displays it:
/// `189900` becomes `1 899,00 UM`.
pub fn format_price(amount_cents: i64) -> String {
    let negative = amount_cents < 0;
    let abs = amount_cents.unsigned_abs();
    let units = (abs / 100).to_string();
    let cents = abs % 100;

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(digit);
    }

    format!(
        "{}{},{:02} {}",
        if negative { "-" } else { "" },
        grouped,
        cents,
        PRICE_SUFFIX
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_small_amounts() {
        assert_eq!(format_price(0), "0,00 UM");
        assert_eq!(format_price(5), "0,05 UM");
        assert_eq!(format_price(1899), "18,99 UM");
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(format_price(189_900), "1\u{202f}899,00 UM");
        assert_eq!(format_price(123_456_789), "1\u{202f}234\u{202f}567,89 UM");
    }

    #[test]
    fn keeps_sign() {
        assert_eq!(format_price(-2599), "-25,99 UM");
    }
}
