//! Recognizer for `contains([literal, ...], ref.name)` validation conditions.
//!
//! Only this one shape is recognized; any other condition yields `None`.
//! Both lists must be fully literal before values can be compared.

use serde::Serialize;

/// A recognized `contains([...], ref.name)` condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiteralListPattern {
    /// Literal values in source order.
    pub values: Vec<String>,
    /// The name part of the reference (`environment` in `var.environment`).
    pub reference: String,
    /// The condition as written.
    pub raw: String,
}

impl LiteralListPattern {
    /// Attempts to recognize the pattern in `condition`.
    ///
    /// ```
    /// use modbreak_core::pattern::LiteralListPattern;
    ///
    /// let p = LiteralListPattern::parse(r#"contains(["dev", "prod"], var.environment)"#).unwrap();
    /// assert_eq!(p.values, vec!["dev", "prod"]);
    /// assert_eq!(p.reference, "environment");
    ///
    /// assert!(LiteralListPattern::parse("contains(var.allowed, var.environment)").is_none());
    /// ```
    #[must_use]
    pub fn parse(condition: &str) -> Option<Self> {
        let mut cursor = Cursor::new(condition);
        cursor.keyword("contains")?;
        cursor.punct('(')?;
        let values = cursor.literal_list()?;
        cursor.punct(',')?;
        let reference = cursor.reference()?;
        cursor.punct(')')?;
        cursor.end()?;
        Some(Self {
            values,
            reference,
            raw: condition.to_string(),
        })
    }
}

/// Values present in `old`'s list but not in `new`'s, in `old`'s order.
///
/// Empty when either side is absent.
#[must_use]
pub fn find_removed_values(
    old: Option<&LiteralListPattern>,
    new: Option<&LiteralListPattern>,
) -> Vec<String> {
    let (Some(old), Some(new)) = (old, new) else {
        return Vec::new();
    };
    old.values
        .iter()
        .filter(|v| !new.values.contains(v))
        .cloned()
        .collect()
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.peek().copied()
    }

    fn punct(&mut self, expected: char) -> Option<()> {
        self.skip_ws();
        self.chars.next_if_eq(&expected).map(|_| ())
    }

    fn identifier(&mut self) -> Option<String> {
        self.skip_ws();
        let first = self
            .chars
            .next_if(|c| c.is_ascii_alphabetic() || *c == '_')?;
        let mut ident = String::from(first);
        while let Some(c) = self
            .chars
            .next_if(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        {
            ident.push(c);
        }
        Some(ident)
    }

    fn keyword(&mut self, expected: &str) -> Option<()> {
        (self.identifier()? == expected).then_some(())
    }

    /// `ident.ident`, returning the second segment.
    fn reference(&mut self) -> Option<String> {
        self.identifier()?;
        // No whitespace is allowed inside a traversal.
        self.chars.next_if_eq(&'.')?;
        if !matches!(self.chars.peek(), Some(c) if c.is_ascii_alphabetic() || *c == '_') {
            return None;
        }
        self.identifier()
    }

    fn literal_list(&mut self) -> Option<Vec<String>> {
        self.punct('[')?;
        let mut values = Vec::new();
        loop {
            match self.peek()? {
                ']' => {
                    self.chars.next();
                    return Some(values);
                }
                '"' | '\'' => {
                    values.push(self.string_literal()?);
                    match self.peek()? {
                        ',' => {
                            self.chars.next();
                        }
                        ']' => {}
                        _ => return None,
                    }
                }
                _ => return None,
            }
        }
    }

    fn string_literal(&mut self) -> Option<String> {
        let quote = self.chars.next()?;
        let mut value = String::new();
        loop {
            match self.chars.next()? {
                '\\' => value.push(self.chars.next()?),
                c if c == quote => return Some(value),
                c => value.push(c),
            }
        }
    }

    fn end(&mut self) -> Option<()> {
        self.peek().is_none().then_some(())
    }
}
