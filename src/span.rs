use std::fmt::Display;

/// Source range of a token, 1-based. The end position points just past the
/// last character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Span {
    pub fn point(line: usize, column: usize) -> Span {
        Span {
            start_line: line,
            start_column: column,
            end_line: line,
            end_column: column,
        }
    }
}

impl std::ops::Add<Span> for Span {
    type Output = Span;

    fn add(self, other: Span) -> Span {
        let (start, end) = if (self.start_line, self.start_column)
            <= (other.start_line, other.start_column)
        {
            (self, other)
        } else {
            (other, self)
        };

        Span {
            start_line: start.start_line,
            start_column: start.start_column,
            end_line: end.end_line,
            end_column: end.end_column,
        }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.start_line, self.start_column)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_add_orders_endpoints() {
        let a = Span {
            start_line: 2,
            start_column: 4,
            end_line: 2,
            end_column: 6,
        };
        let b = Span {
            start_line: 1,
            start_column: 1,
            end_line: 1,
            end_column: 3,
        };
        let joined = a + b;
        assert_eq!(joined.start_line, 1);
        assert_eq!(joined.start_column, 1);
        assert_eq!(joined.end_line, 2);
        assert_eq!(joined.end_column, 6);
    }
}
