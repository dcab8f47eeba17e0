//! Hex colour handling for widget theming.

/// Parse `#rrggbb` (the leading `#` is optional) into its channels.
pub fn parse_hex_color(input: &str) -> Option<[u8; 3]> {
    let hex = input.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Format channels as lowercase `#rrggbb`.
pub fn format_hex_color(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Lighten (positive `percent`) or darken (negative) a colour.
///
/// Each channel moves by `percent` of its own value and is clamped to
/// 0..=255. Returns `None` when `hex` is not a valid colour.
pub fn adjust_color(hex: &str, percent: f64) -> Option<String> {
    let rgb = parse_hex_color(hex)?;
    let shift = |c: u8| {
        let c = f64::from(c);
        (c + c * percent / 100.0).clamp(0.0, 255.0).round() as u8
    };
    Some(format_hex_color([shift(rgb[0]), shift(rgb[1]), shift(rgb[2])]))
}
