use std::io::{self, Write};
use std::time::Duration;

const CURSOR: &str = "▌";

/// Writes `text` a character at a time behind a block cursor. ANSI escape
/// sequences are written whole and cost no delay. A zero delay writes
/// everything at once.
pub async fn reveal<W: Write>(out: &mut W, text: &str, delay: Duration) -> io::Result<()> {
    if delay.is_zero() {
        out.write_all(text.as_bytes())?;
        return out.flush();
    }

    let mut chars = text.chars().peekable();
    let mut buf = [0u8; 4];
    while let Some(c) = chars.next() {
        if c == '\x1B' {
            let mut sequence = String::from(c);
            while let Some(&next) = chars.peek() {
                sequence.push(next);
                chars.next();
                if next.is_ascii_alphabetic() && next != '[' {
                    break;
                }
            }
            out.write_all(sequence.as_bytes())?;
            continue;
        }

        out.write_all(c.encode_utf8(&mut buf).as_bytes())?;
        if c.is_whitespace() {
            continue;
        }
        write!(out, "{CURSOR}")?;
        out.flush()?;
        tokio::time::sleep(delay).await;
        // Step back over the cursor so the next character replaces it.
        write!(out, "\x08 \x08")?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible(bytes: &[u8]) -> String {
        let mut screen = String::new();
        for c in String::from_utf8_lossy(bytes).chars() {
            match c {
                '\x08' => {
                    screen.pop();
                }
                _ => screen.push(c),
            }
        }
        screen
    }

    #[tokio::test]
    async fn zero_delay_writes_text_verbatim() {
        let mut out = Vec::new();
        reveal(&mut out, "hello\nworld", Duration::ZERO).await.unwrap();
        assert_eq!(out, b"hello\nworld");
    }

    #[tokio::test]
    async fn reveal_leaves_only_the_text_on_screen() {
        let mut out = Vec::new();
        reveal(&mut out, "hi there", Duration::from_millis(1)).await.unwrap();
        let screen = visible(&out);
        assert_eq!(screen, "hi there");
        assert!(!screen.contains(CURSOR));
    }

    #[tokio::test]
    async fn escape_sequences_are_not_split() {
        let mut out = Vec::new();
        reveal(&mut out, "\x1B[1mok\x1B[22m", Duration::from_millis(1)).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("\x1B[1mo"));
        assert!(text.ends_with("\x1B[22m"));
    }
}
