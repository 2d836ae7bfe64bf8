// ============================================================================
// snapbrush CLI — optional startup flags
// ============================================================================
//
// Usage examples:
//   snapbrush                          (interactive session)
//   snapbrush screenshot               (capture, write screenshot.png, exit)
//   snapbrush brush_color=skyblue
//   snapbrush BRUSH_RADIUS 12.5 brush_color RED
//
// The grammar is deliberately dash-less: `<flag>=<value>` or `<flag> <value>`,
// flag names case-insensitive. Every parse failure is fatal — `main` prints
// the diagnostic plus a usage hint and exits with code 1.

use crate::annotate::{MAX_BRUSH_RADIUS, MIN_BRUSH_RADIUS};
use crate::picker;

/// Upper bound on a single flag value. Values beyond this are a fatal error,
/// never silently truncated.
pub const MAX_VALUE_LEN: usize = 1024;

#[derive(Debug, Default, PartialEq)]
pub struct CliOptions {
    /// Capture and write the full frame immediately, no interactive view.
    pub screenshot: bool,
    /// Starting brush color, validated against the palette.
    pub brush_color: Option<[u8; 4]>,
    /// Starting brush radius, validated against the brush clamp range.
    pub brush_radius: Option<f32>,
}

pub fn usage() -> String {
    format!(
        "usage: snapbrush [<flag>=<value> | <flag> <value>]...\n\
         \n\
         flags (case-insensitive):\n\
         \x20 screenshot             capture the screen and exit immediately\n\
         \x20 brush_color=<name>     starting brush color\n\
         \x20 brush_radius=<float>   starting brush radius ({MIN_BRUSH_RADIUS}..{MAX_BRUSH_RADIUS})\n\
         \n\
         colors: {}",
        picker::palette_names()
    )
}

/// Parse raw process arguments (program name already stripped).
pub fn parse(args: &[String]) -> Result<CliOptions, String> {
    let mut opts = CliOptions::default();
    let mut iter = args.iter();

    while let Some(token) = iter.next() {
        let (flag, inline_value) = match token.split_once('=') {
            Some((flag, value)) => (flag, Some(value.to_string())),
            None => (token.as_str(), None),
        };
        let flag = flag.to_ascii_lowercase();

        match flag.as_str() {
            "screenshot" => {
                opts.screenshot = match inline_value.as_deref() {
                    Some(v) => parse_bool(v)
                        .ok_or_else(|| format!("invalid boolean for 'screenshot': '{v}'"))?,
                    // Space form: a following boolean token is the value;
                    // anything else leaves the bare flag meaning `true`.
                    None => match iter.as_slice().first().and_then(|v| parse_bool(v)) {
                        Some(value) => {
                            iter.next();
                            value
                        }
                        None => true,
                    },
                };
            }
            "brush_color" => {
                let value = flag_value(&flag, inline_value, &mut iter)?;
                opts.brush_color = Some(picker::color_by_name(&value).ok_or_else(|| {
                    format!(
                        "unknown color '{value}' (valid: {})",
                        picker::palette_names()
                    )
                })?);
            }
            "brush_radius" => {
                let value = flag_value(&flag, inline_value, &mut iter)?;
                let radius: f32 = value
                    .parse()
                    .map_err(|_| format!("invalid brush radius '{value}': not a number"))?;
                if !radius.is_finite() {
                    return Err(format!("invalid brush radius '{value}': not finite"));
                }
                if !(MIN_BRUSH_RADIUS..=MAX_BRUSH_RADIUS).contains(&radius) {
                    return Err(format!(
                        "brush radius {radius} out of range ({MIN_BRUSH_RADIUS}..{MAX_BRUSH_RADIUS})"
                    ));
                }
                opts.brush_radius = Some(radius);
            }
            other => {
                return Err(format!("unknown flag '{other}'"));
            }
        }
    }

    Ok(opts)
}

/// Resolve a flag's value from either grammar form and enforce the fatal
/// value-capacity contract.
fn flag_value(
    flag: &str,
    inline: Option<String>,
    iter: &mut std::slice::Iter<String>,
) -> Result<String, String> {
    let value = match inline {
        Some(v) => v,
        None => iter
            .next()
            .cloned()
            .ok_or_else(|| format!("flag '{flag}' is missing a value"))?,
    };
    if value.len() > MAX_VALUE_LEN {
        return Err(format!(
            "flag value exceeds the {MAX_VALUE_LEN}-byte capacity ({} bytes)",
            value.len()
        ));
    }
    Ok(value)
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
