//! Cleanup applied to model replies before they are rendered. Models tend to
//! emit Markdown that is almost, but not quite, what a CommonMark parser wants.

const FENCE: &str = "```";

pub fn normalize(reply: &str) -> String {
    let reply = split_inline_fences(reply);
    let mut lines: Vec<String> = Vec::new();
    let mut in_code = false;

    for line in reply.lines() {
        if line.trim_start().starts_with(FENCE) {
            in_code = !in_code;
            lines.push(line.to_string());
            continue;
        }
        if in_code {
            lines.push(line.to_string());
            continue;
        }

        let line = tidy_numbered_item(line);
        let line = match line.strip_prefix("* ") {
            Some(rest) => format!("- {rest}"),
            None => line,
        };
        let line = if is_bold_only(&line) {
            format!("## {}", line.trim_end())
        } else {
            line
        };
        lines.push(line);
    }

    let mut normalized = lines.join("\n");
    if reply.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

/// "```let x = 1;```" on one line becomes a real fenced block.
fn split_inline_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let Some(close) = after_open.find(FENCE) else {
            break;
        };
        let inner = &after_open[..close];
        out.push_str(&rest[..open]);
        if !inner.is_empty() && !inner.contains('\n') && !inner.contains('`') {
            out.push_str(FENCE);
            out.push('\n');
            out.push_str(inner);
            out.push('\n');
            out.push_str(FENCE);
        } else {
            out.push_str(&rest[open..open + FENCE.len() * 2 + close]);
        }
        rest = &after_open[close + FENCE.len()..];
    }
    out.push_str(rest);
    out
}

/// Collapses the whitespace after a list number: "1.   item" -> "1. item".
fn tidy_numbered_item(line: &str) -> String {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];
    let digits = body.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return line.to_string();
    }

    let after = &body[digits..];
    match after.strip_prefix('.') {
        Some(tail) if tail.starts_with(char::is_whitespace) => {
            format!("{indent}{}. {}", &body[..digits], tail.trim_start())
        }
        _ => line.to_string(),
    }
}

fn is_bold_only(line: &str) -> bool {
    let line = line.trim_end();
    line.len() > 4 && line.starts_with("**") && line.ends_with("**") && !line[2..line.len() - 2].contains("**")
}
