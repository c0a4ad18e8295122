use simd_json::{Error as SimdJsonError, OwnedValue};

use crate::PipelineError;

const PREVIEW_LEN: usize = 100;

/// Extracts the next complete top-level JSON object from the front of `buffer`.
///
/// Returns the decoded object together with the unconsumed tail of the buffer.
/// When the buffer only holds whitespace, an incomplete object, or text that
/// does not start with `{`, the result is `(None, buffer)` and nothing is consumed.
///
/// A brace-balanced span that fails to decode is reported as
/// [`PipelineError::MalformedFrame`]; the buffer is left untouched so the caller
/// decides whether to skip the span or stop.
pub fn extract_frame(buffer: &[u8]) -> Result<(Option<OwnedValue>, &[u8]), PipelineError> {
    let Some(end) = frame_end(buffer) else {
        return Ok((None, buffer));
    };
    let start = skip_whitespace(buffer);
    let consumed = consume_line_ending(buffer, end);
    let span = &buffer[start..end];

    let value = decode_frame(span).map_err(|source| PipelineError::MalformedFrame {
        consumed,
        preview: preview(span),
        source,
    })?;
    Ok((Some(value), &buffer[consumed..]))
}

/// Finds the byte offset just past the closing brace of the object that starts
/// the buffer (after leading whitespace).
///
/// Braces and brackets inside string literals, including escaped quotes, are
/// ignored. Nested objects and arrays are tracked by depth, so only the brace
/// that closes the outermost object ends the frame.
pub fn frame_end(bytes: &[u8]) -> Option<usize> {
    let start = skip_whitespace(bytes);
    if bytes.get(start) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, &c) in bytes[start..].iter().enumerate() {
        match (in_string, escape, c) {
            (true, false, b'\\') => escape = true,
            (true, true, _) => escape = false,
            (true, false, b'"') => in_string = false,
            (false, _, b'"') => in_string = true,
            (false, _, b'{' | b'[') => depth += 1,
            (false, _, b'}' | b']') => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Returns the length of the first line when it is complete and cannot start
/// a frame (prose, code fences). Lines starting with `{` are never noise.
pub fn skip_noise_line(bytes: &[u8]) -> Option<usize> {
    let start = skip_whitespace(bytes);
    match bytes.get(start) {
        None | Some(b'{') => None,
        Some(_) => bytes[start..]
            .iter()
            .position(|&c| c == b'\n')
            .map(|nl| start + nl + 1),
    }
}

fn skip_whitespace(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .position(|c| !c.is_ascii_whitespace())
        .unwrap_or(bytes.len())
}

// Horizontal whitespace after the closing brace and a single newline belong to the frame.
fn consume_line_ending(bytes: &[u8], end: usize) -> usize {
    let mut pos = end;
    while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t' | b'\r') {
        pos += 1;
    }
    if bytes.get(pos) == Some(&b'\n') {
        pos += 1;
    }
    pos
}

fn decode_frame(span: &[u8]) -> Result<OwnedValue, SimdJsonError> {
    // simd_json parses in place, so it needs its own copy of the span.
    let mut scratch = span.to_vec();
    match simd_json::to_owned_value(&mut scratch) {
        Ok(value) => Ok(value),
        #[cfg(feature = "relaxed")]
        Err(e) => std::str::from_utf8(span)
            .ok()
            .and_then(|text| json5::from_str::<OwnedValue>(text).ok())
            .ok_or(e),
        #[cfg(not(feature = "relaxed"))]
        Err(e) => Err(e),
    }
}

fn preview(span: &[u8]) -> String {
    String::from_utf8_lossy(span).chars().take(PREVIEW_LEN).collect()
}
