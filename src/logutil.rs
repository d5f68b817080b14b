//! Logging helpers for player-supplied text (chat lines, guild descriptions) so log
//! lines stay single-line and Minecraft formatting codes do not leak into log files.

const MAX_PREVIEW: usize = 200;

/// Escape a string for single-line logging:
/// - `\n`, `\r`, `\t` and backslash are escaped
/// - other control characters become `\xNN`
/// - `§x` formatting codes are stripped
///
/// Strings longer than 200 characters are cut with an ellipsis.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    let mut chars = s.chars();
    let mut count = 0usize;
    while let Some(ch) = chars.next() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '§' => {
                chars.next();
                continue;
            }
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
        count += 1;
    }
    out
}
