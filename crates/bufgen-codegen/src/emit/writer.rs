/// Line-oriented source buffer with four-space indentation.
#[derive(Debug, Default)]
pub struct SourceWriter {
    out: String,
    depth: usize,
}

impl SourceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line at the current indentation.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    /// Append an empty line unless the buffer is empty or already ends in one.
    pub fn blank(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") && !self.out.ends_with("{\n") {
            self.out.push('\n');
        }
    }

    /// Append `head {` (or a bare `{` for an empty head) and indent.
    pub fn open(&mut self, head: impl AsRef<str>) {
        let head = head.as_ref();
        if head.is_empty() {
            self.line("{");
        } else {
            self.line(format!("{head} {{"));
        }
        self.depth += 1;
    }

    /// Dedent and append `}` followed by `suffix`.
    pub fn close(&mut self, suffix: &str) {
        self.dedent();
        self.line(format!("}}{suffix}"));
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nests_blocks() {
        let mut out = SourceWriter::new();
        out.blank();
        out.open("mod a");
        out.blank();
        out.line("const X: u8 = 1;");
        out.open("");
        out.close(",");
        out.blank();
        out.blank();
        out.line("");
        out.close("");
        assert_eq!(
            out.finish(),
            "mod a {\n    const X: u8 = 1;\n    {\n    },\n\n\n}\n"
        );
    }
}
