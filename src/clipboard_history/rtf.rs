//! Plain-text extraction from RTF
//!
//! Used when an entry carries RTF but no plain text and the clipboard
//! backend cannot write RTF itself. Only the visible text survives;
//! formatting, tables of fonts/colors and embedded pictures are dropped.

/// Destinations whose content is never visible text
const HIDDEN_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "listtable",
    "listoverridetable",
];

/// Extract the visible text of an RTF document.
///
/// Paragraph and line breaks become `\n` and `\tab` becomes `\t`.
/// `\'hh` escapes decode as Latin-1, `\uN` as a Unicode scalar.
/// Trailing line breaks are trimmed.
pub fn rtf_to_plain_text(rtf: &str) -> String {
    let mut out = String::with_capacity(rtf.len() / 2);
    // Hidden flag for each open group
    let mut groups: Vec<bool> = Vec::new();
    let mut hidden = false;
    // Fallback characters still to drop after a \uN
    let mut skip_fallback = 0usize;
    let mut chars = rtf.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                groups.push(hidden);
                skip_fallback = 0;
            }
            '}' => {
                hidden = groups.pop().unwrap_or(false);
                skip_fallback = 0;
            }
            '\r' | '\n' => {}
            '\\' => {
                let Some(&next) = chars.peek() else {
                    break;
                };
                if next.is_ascii_alphabetic() {
                    let mut word = String::new();
                    while let Some(&ch) = chars.peek() {
                        if !ch.is_ascii_alphabetic() {
                            break;
                        }
                        word.push(ch);
                        chars.next();
                    }
                    let mut param = String::new();
                    if chars.peek() == Some(&'-') {
                        param.push('-');
                        chars.next();
                    }
                    while let Some(&ch) = chars.peek() {
                        if !ch.is_ascii_digit() {
                            break;
                        }
                        param.push(ch);
                        chars.next();
                    }
                    // A single space delimits the control word
                    if chars.peek() == Some(&' ') {
                        chars.next();
                    }

                    if HIDDEN_DESTINATIONS.contains(&word.as_str()) {
                        hidden = true;
                        continue;
                    }
                    if hidden {
                        continue;
                    }
                    match word.as_str() {
                        "par" | "line" | "sect" | "page" => out.push('\n'),
                        "tab" => out.push('\t'),
                        "u" => {
                            if let Some(ch) = param
                                .parse::<i32>()
                                .ok()
                                .map(|n| if n < 0 { n + 65536 } else { n })
                                .and_then(|n| char::from_u32(n as u32))
                            {
                                out.push(ch);
                            }
                            skip_fallback = 1;
                        }
                        _ => {}
                    }
                    continue;
                }

                chars.next();
                match next {
                    '*' => hidden = true,
                    '\'' => {
                        let hex: String = chars.by_ref().take(2).collect();
                        if hidden {
                            continue;
                        }
                        if skip_fallback > 0 {
                            skip_fallback -= 1;
                            continue;
                        }
                        if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                            out.push(char::from(byte));
                        }
                    }
                    '\\' | '{' | '}' if !hidden => out.push(next),
                    '~' if !hidden => out.push('\u{a0}'),
                    '_' if !hidden => out.push('-'),
                    '\r' | '\n' if !hidden => out.push('\n'),
                    _ => {}
                }
            }
            _ if hidden => {}
            _ if skip_fallback > 0 => skip_fallback -= 1,
            _ => out.push(c),
        }
    }

    let trimmed = out.trim_end_matches(['\n', '\r']).len();
    out.truncate(trimmed);
    out
}
