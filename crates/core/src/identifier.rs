use compact_str::CompactString;

use crate::error::ConfigError;

/// The two quote characters the templater accepts for identifier
/// quoting.
pub const VALID_QUOTE_CHARS: [char; 2] = ['\'', '`'];

/// A value already known to be safe to splice into rendered SQL verbatim,
/// bypassing the auto-bind wrapping — used by the `sqlsafe` filter and
/// the quoted output of [`quote_identifier`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlSafe(pub CompactString);

impl SqlSafe {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for SqlSafe {
    fn from(value: String) -> Self {
        SqlSafe(CompactString::from(value))
    }
}

/// Validate a configured identifier quote character.
pub fn validate_quote_char(quote: char) -> Result<(), ConfigError> {
    if VALID_QUOTE_CHARS.contains(&quote) {
        Ok(())
    } else {
        Err(ConfigError::InvalidQuoteChar(quote))
    }
}

/// Quote and dot-join a single identifier or dotted identifier path,
/// doubling any embedded occurrence of the quote character.
pub fn quote_identifier<'a>(
    quote: char,
    segments: impl IntoIterator<Item = &'a str>,
) -> SqlSafe {
    let mut out = CompactString::default();
    let mut first = true;
    for segment in segments {
        if !first {
            out.push('.');
        }
        first = false;
        out.push(quote);
        for ch in segment.chars() {
            out.push(ch);
            if ch == quote {
                out.push(ch);
            }
        }
        out.push(quote);
    }
    SqlSafe(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_identifier_is_quoted() {
        let safe = quote_identifier('\'', ["users"]);
        assert_eq!(safe.as_str(), "'users'");
    }

    #[test]
    fn dotted_path_is_joined_with_dots() {
        let safe = quote_identifier('`', ["schema", "users", "id"]);
        assert_eq!(safe.as_str(), "`schema`.`users`.`id`");
    }

    #[test]
    fn embedded_quote_char_is_doubled() {
        let safe = quote_identifier('\'', ["o'brien"]);
        assert_eq!(safe.as_str(), "'o''brien'");
        // single dotted-quoted token, no inner unescaped quote survives:
        // the two chars after "o" are both apostrophes, deliberately,
        // never a lone one.
    }

    #[test]
    fn rejects_unsupported_quote_chars() {
        assert!(validate_quote_char('"').is_err());
        assert!(validate_quote_char('\'').is_ok());
        assert!(validate_quote_char('`').is_ok());
    }
}
