use std::{fmt, rc::Rc};

use crate::common::source::Source;

/// A `Span` refers to a section of a `Source`, along with the line and
/// column at which that section begins. Unlike a `&str`, a `Span` keeps
/// a reference-counted handle on the `Source` it came from, so it can
/// always be rendered for a diagnostic.
#[derive(Debug, Clone)]
pub struct Span {
    pub source: Rc<Source>,
    pub offset: usize,
    pub length: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(
        source: &Rc<Source>,
        offset: usize,
        length: usize,
        line: usize,
        column: usize,
    ) -> Span {
        Span { source: Rc::clone(source), offset, length, line, column }
    }

    /// A zero-length span pointing just past the end of the source,
    /// used for end-of-input diagnostics.
    pub fn eof(source: &Rc<Source>, line: usize, column: usize) -> Span {
        Span::new(source, source.contents.len(), 0, line, column)
    }

    /// Returns the text this span covers.
    pub fn contents(&self) -> &str {
        &self.source.contents[self.offset..self.offset + self.length]
    }

    /// Combines two spans from the same source into the span that
    /// covers both (and everything in between).
    pub fn combine(a: &Span, b: &Span) -> Span {
        assert!(Rc::ptr_eq(&a.source, &b.source), "can't combine spans from different sources");

        let (first, second) = if a.offset <= b.offset { (a, b) } else { (b, a) };
        let offset = first.offset;
        let end = (a.offset + a.length).max(b.offset + b.length);

        Span {
            source: Rc::clone(&first.source),
            offset,
            length: end - offset,
            line: first.line,
            column: first.column,
        }
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Span) -> bool {
        Rc::ptr_eq(&self.source, &other.source)
            && self.offset == other.offset
            && self.length == other.length
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source.path.display(), self.line, self.column)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn combination() {
        let source = Source::source("heck, that's awesome");
        let a = Span::new(&source, 0, 5, 1, 1);
        let b = Span::new(&source, 11, 2, 1, 12);
        let combined = Span::combine(&a, &b);

        assert_eq!(combined.offset, 0);
        assert_eq!(combined.length, 13);
    }

    #[test]
    fn contents() {
        let source = Source::source("hello, world!");
        let span = Span::new(&source, 0, 5, 1, 1);
        assert_eq!(span.contents(), "hello");
    }
}
