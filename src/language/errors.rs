use crate::language::{lexer::LexError, span::Span};

#[derive(Clone, Debug, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Zero-width spans point at something missing, such as a `;`, rather
    /// than at text that is wrong.
    pub fn is_missing_token(&self) -> bool {
        self.span.is_empty()
    }
}

impl From<LexError> for SyntaxError {
    fn from(err: LexError) -> Self {
        Self::new(err.message, err.span)
    }
}

/// Everything wrong with one script, ordered by position in the source.
#[derive(Clone, Debug, Default)]
pub struct SyntaxErrors {
    pub errors: Vec<SyntaxError>,
}

impl SyntaxErrors {
    pub fn new(mut errors: Vec<SyntaxError>) -> Self {
        errors.sort_by_key(|err| err.span.start);
        Self { errors }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyntaxError> {
        self.errors.iter()
    }
}

impl From<Vec<LexError>> for SyntaxErrors {
    fn from(errors: Vec<LexError>) -> Self {
        Self::new(errors.into_iter().map(SyntaxError::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::lexer::lex;

    #[test]
    fn errors_are_ordered_by_position() {
        let errors = SyntaxErrors::new(vec![
            SyntaxError::new("late", Span::new(10, 12)),
            SyntaxError::new("early", Span::new(2, 2)),
        ]);
        let messages: Vec<_> = errors.iter().map(|err| err.message.as_str()).collect();
        assert_eq!(messages, vec!["early", "late"]);
        assert!(errors.errors[0].is_missing_token());
        assert!(!errors.errors[1].is_missing_token());
    }

    #[test]
    fn lexer_errors_convert_without_help() {
        let errors = SyntaxErrors::from(lex("let a = #;").unwrap_err());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors[0].message, "Unexpected character `#`");
        assert_eq!(errors.errors[0].span, Span::new(8, 9));
        assert!(errors.errors[0].help.is_none());
    }
}
