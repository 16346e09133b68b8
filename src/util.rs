use anyhow::{bail, Context};

/// Parse a time given as seconds ("90", "90.5") or minutes and seconds
/// ("1:30", "1:30.5").
pub fn parse_time(input: &str) -> anyhow::Result<f32> {
    let input = input.trim();
    let secs = match input.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u32 = minutes
                .parse()
                .with_context(|| format!("Invalid minutes in time '{input}'"))?;
            let seconds: f32 = seconds
                .parse()
                .with_context(|| format!("Invalid seconds in time '{input}'"))?;
            if !(0.0..60.0).contains(&seconds) {
                bail!("Seconds must be below 60 in time '{input}'");
            }
            minutes as f32 * 60.0 + seconds
        }
        None => input
            .parse::<f32>()
            .with_context(|| format!("Invalid time '{input}' (expected e.g. 90, 90.5 or 1:30)"))?,
    };

    if !secs.is_finite() || secs < 0.0 {
        bail!("Time must be a non-negative number of seconds, got '{input}'");
    }
    Ok(secs)
}

/// "12.3s" under a minute, "m:ss.ss" from there on.
pub fn format_time(secs: f32) -> String {
    if secs < 60.0 {
        format!("{secs:.1}s")
    } else {
        let minutes = (secs / 60.0).floor();
        let rest = secs - minutes * 60.0;
        format!("{}:{:05.2}", minutes as u32, rest)
    }
}

/// Compute RMS level in dB (relative to full scale).
/// Returns -infinity for empty or all-zero input.
pub fn rms_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return f32::NEG_INFINITY;
    }

    let sum_sq: f32 = samples.iter().map(|&s| s * s).sum();
    let rms = (sum_sq / samples.len() as f32).sqrt();

    if rms == 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * rms.log10()
    }
}
