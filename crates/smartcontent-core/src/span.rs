/// Byte range into the normalized input.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// The slice of `source` covered by this span, or `None` when the span does
    /// not fall on character boundaries of `source`.
    pub fn text<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.start..self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::Span;

    #[test]
    fn text_respects_char_boundaries() {
        let source = "añb";
        let span = Span { start: 1, end: 3 };
        assert_eq!(span.text(source), Some("ñ"));
        assert_eq!(Span { start: 2, end: 3 }.text(source), None);
        assert_eq!(Span { start: 3, end: 1 }.text(source), None);
    }
}
