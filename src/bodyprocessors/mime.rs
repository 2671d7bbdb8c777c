//! Structured parsing of media-type shaped header values.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Parse a `type/subtype; key=value; key="quoted"` header value.
///
/// Returns the lowercased media type and its parameters (names lowercased,
/// quoted values unescaped). A `;` inside a quoted value does not end the
/// parameter. Also used for `Content-Disposition`, whose leading token is a
/// bare disposition name rather than a type/subtype.
pub(crate) fn parse_media_type(value: &str) -> Result<(String, HashMap<String, String>)> {
    let malformed = || Error::MalformedMediaType {
        value: value.to_string(),
    };

    // Single pass: cut segments at ';' only outside quoted spans.
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    for c in value.chars() {
        if in_quotes {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_quotes = false;
            }
            current.push(c);
        } else if c == ';' {
            segments.push(current);
            current = String::new();
        } else {
            if c == '"' {
                in_quotes = true;
            }
            current.push(c);
        }
    }
    if in_quotes {
        return Err(malformed());
    }
    segments.push(current);

    let mut segments = segments.into_iter();
    let media_type = segments
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if media_type.is_empty() || media_type.contains(char::is_whitespace) {
        return Err(malformed());
    }

    let mut params = HashMap::new();
    for segment in segments {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (name, raw) = segment.split_once('=').ok_or_else(malformed)?;
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(malformed());
        }
        let raw = raw.trim();
        let parsed = if let Some(quoted) = raw.strip_prefix('"') {
            let mut out = String::new();
            let mut chars = quoted.chars();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    }
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => out.push(c),
                }
            }
            if !closed {
                return Err(malformed());
            }
            out
        } else {
            raw.to_string()
        };
        params.insert(name, parsed);
    }
    Ok((media_type, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_type() {
        let (mt, params) =
            parse_media_type("multipart/form-data; boundary=XyZ").unwrap();
        assert_eq!(mt, "multipart/form-data");
        assert_eq!(params.get("boundary").map(String::as_str), Some("XyZ"));
    }

    #[test]
    fn test_parse_quoted_params() {
        let (mt, params) =
            parse_media_type(r#"form-data; name="fi;eld"; filename="a \"b\".txt""#).unwrap();
        assert_eq!(mt, "form-data");
        assert_eq!(params.get("name").map(String::as_str), Some("fi;eld"));
        assert_eq!(params.get("filename").map(String::as_str), Some(r#"a "b".txt"#));
    }

    #[test]
    fn test_parse_semicolon_and_escape_inside_quotes() {
        let (_, params) =
            parse_media_type(r#"form-data; filename="one;two\";three""#).unwrap();
        assert_eq!(
            params.get("filename").map(String::as_str),
            Some(r#"one;two";three"#)
        );
    }

    #[test]
    fn test_parse_case_folding() {
        let (mt, params) = parse_media_type("Multipart/Form-Data; BOUNDARY=x").unwrap();
        assert_eq!(mt, "multipart/form-data");
        assert_eq!(params.get("boundary").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_malformed() {
        assert!(parse_media_type("").is_err());
        assert!(parse_media_type("   ; boundary=x").is_err());
        assert!(parse_media_type("multipart/form-data; boundary").is_err());
        assert!(parse_media_type(r#"form-data; name="unclosed"#).is_err());
    }
}
