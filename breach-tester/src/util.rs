use anyhow::{Context, Result, bail};
use chrono::Utc;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse a level list such as `1-10,15,40-42` into ascending, de-duplicated levels.
pub fn parse_levels(input: &str) -> Result<Vec<u32>> {
    let mut levels = Vec::new();
    for token in split_csv(input) {
        if let Some((start, end)) = token.split_once('-') {
            let start = parse_level(start)?;
            let end = parse_level(end)?;
            if start > end {
                bail!("Level range {token} runs backwards");
            }
            levels.extend(start..=end);
        } else {
            levels.push(parse_level(&token)?);
        }
    }
    levels.sort_unstable();
    levels.dedup();
    if levels.is_empty() {
        bail!("No levels selected");
    }
    Ok(levels)
}

fn parse_level(token: &str) -> Result<u32> {
    let level: u32 = token
        .trim()
        .parse()
        .with_context(|| format!("Unrecognized level: {token}"))?;
    if level == 0 {
        bail!("Levels start at 1");
    }
    Ok(level)
}

/// UTC timestamp stamped into machine-readable reports.
pub fn report_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
