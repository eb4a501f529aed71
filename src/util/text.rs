use std::{collections::HashSet, str::FromStr};

use anyhow::{anyhow, Result};
use encoding_rs::GBK;
use rust_decimal::Decimal;

const NUMBER_ESCAPE_CHAR: &[char] = &['元', '%', ',', ' ', '"', '\n'];

/// Converts a GBK encoded byte slice to a UTF-8 `String`.
///
/// Sina's quote endpoint answers in GBK, the names inside the quote line are
/// garbled unless decoded this way.
///
/// # Returns
///
/// * `Result<String>`: the decoded text, or an error when the input holds bytes
///   that are not valid GBK.
pub fn gbk_2_utf8(data: &[u8]) -> Result<String> {
    let (text, _, had_errors) = GBK.decode(data);
    if had_errors {
        return Err(anyhow!("Failed to GBK.decode {} bytes", data.len()));
    }

    Ok(text.into_owned())
}

/// Parses a decimal value from a given string.
///
/// The string may contain thousands separators and the characters in
/// `NUMBER_ESCAPE_CHAR`; they are removed before parsing.
///
/// # Example
///
/// ```
/// let decimal_value = parse_decimal("1,234.56", None).unwrap();
/// ```
pub fn parse_decimal(s: &str, escape_chars: Option<Vec<char>>) -> Result<Decimal> {
    let cleaned = clean_escape_chars(s, escape_chars);
    Decimal::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as Decimal because {:?}", cleaned, why))
}

/// Removes a set of escape characters from a given string.
pub(crate) fn clean_escape_chars(s: &str, escape_chars: Option<Vec<char>>) -> String {
    let mut combined: Vec<char> = NUMBER_ESCAPE_CHAR.to_vec();
    if let Some(ec) = escape_chars {
        combined.extend(ec);
    }

    let filters = combined.iter().collect::<HashSet<_>>();
    s.chars().filter(|c| !filters.contains(c)).collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_gbk_2_utf8() {
        let (bytes, _, _) = GBK.encode("纳指100ETF,620.51");
        assert_eq!(gbk_2_utf8(&bytes).unwrap(), "纳指100ETF,620.51");
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("1,234.56", None).unwrap(), dec!(1234.56));
        assert_eq!(parse_decimal(" 2.5 元", None).unwrap(), dec!(2.5));
        assert_eq!(parse_decimal("(3.10)", Some(vec!['(', ')'])).unwrap(), dec!(3.10));
        assert!(parse_decimal("-", None).is_err());
        assert!(parse_decimal("", None).is_err());
    }

    #[test]
    fn test_clean_escape_chars() {
        let result = clean_escape_chars("台積電% 元 ,", Some(vec!['台']));
        assert_eq!(result, "積電");
    }
}
