/// Local file name for a downloaded stem: `{sanitized_input_stem}_{stem}.{extension}`.
///
/// `song (live).mp3` + `vocals` + `wav` gives `song_live_vocals.wav`.
pub fn download_filename(source_name: &str, stem: &str, extension: &str) -> String {
    let name = source_name.rsplit(['/', '\\']).next().unwrap_or(source_name);
    let base = match name.rsplit_once('.') {
        Some((base, _ext)) if !base.is_empty() => base,
        _ => name,
    };
    let sanitized = sanitize(base);
    format!("{sanitized}_{stem}.{extension}")
}

fn sanitize(input: &str) -> String {
    // Same character policy as the backend applies to uploads.
    let cleaned: String = input
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    let mut final_name = compacted.trim_matches(&['_', '.'][..]).to_string();
    if final_name.is_empty() {
        final_name = "audio".to_string();
    }
    if final_name.chars().count() > 80 {
        final_name = final_name.chars().take(80).collect();
    }
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
