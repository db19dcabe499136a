//! Custom value parsers for CLI arguments.

use courier_common_http::FieldMap;

/// Parse a key=value pair.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("Invalid key=value pair: {s}"))?;
    let key = &s[..pos];
    if key.is_empty() {
        return Err(format!("Missing key in: {s}"));
    }
    Ok((key.to_string(), s[pos + 1..].to_string()))
}

/// Collect repeated pairs into a map. Later keys win.
pub fn field_map(pairs: &[(String, String)]) -> FieldMap {
    pairs.iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("name=neo").unwrap(),
            ("name".to_string(), "neo".to_string())
        );
        assert_eq!(
            parse_key_value("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_key_value("empty=").unwrap().1, "");
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_field_map_last_wins() {
        let pairs = vec![
            ("a".to_string(), "1".to_string()),
            ("a".to_string(), "2".to_string()),
        ];
        assert_eq!(field_map(&pairs).get("a").map(String::as_str), Some("2"));
        assert!(field_map(&[]).is_empty());
    }
}
