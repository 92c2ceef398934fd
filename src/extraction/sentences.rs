//! Sentence splitting with byte offsets.

/// A sentence and where it starts in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentence<'a> {
    /// The sentence text.
    pub text: &'a str,
    /// Byte offset of the first character.
    pub start: usize,
}

impl Sentence<'_> {
    /// Exclusive end offset.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split after `.` or `?` followed by whitespace.
///
/// The separating whitespace character is dropped. Abbreviations of the
/// form `e.g.` and `Mr.` do not end a sentence.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<Sentence<'_>> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;

    for (pos, &(offset, c)) in chars.iter().enumerate() {
        if !c.is_whitespace() || pos == 0 {
            continue;
        }
        let prev = |back: usize| pos.checked_sub(back).map(|i| chars[i].1);

        if !matches!(prev(1), Some('.' | '?')) {
            continue;
        }
        // "e.g. ", "i.e. "
        if let (Some(a), Some('.'), Some(b)) = (prev(4), prev(3), prev(2))
            && is_word(a)
            && is_word(b)
        {
            continue;
        }
        // "Mr. ", "Dr. "
        if let (Some(a), Some(b), Some('.')) = (prev(3), prev(2), prev(1))
            && a.is_ascii_uppercase()
            && b.is_ascii_lowercase()
        {
            continue;
        }

        sentences.push(Sentence {
            text: &text[start..offset],
            start,
        });
        start = offset + c.len_utf8();
    }

    sentences.push(Sentence {
        text: &text[start..],
        start,
    });
    sentences
}
