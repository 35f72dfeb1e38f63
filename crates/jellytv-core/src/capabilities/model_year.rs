//! Platform-year inference from version numbers, model names and firmware strings

use regex::Regex;
use std::sync::LazyLock;

/// Year-code letters used in panel model names
const YEAR_CODES: &[(char, u16)] = &[
    ('J', 2015),
    ('K', 2016),
    ('M', 2017),
    ('N', 2018),
    ('R', 2019),
    ('T', 2020),
    ('A', 2021),
    ('B', 2022),
    ('C', 2023),
    ('D', 2024),
    ('F', 2025),
];

/// Versions further past the table than this are treated as garbage
const MAX_RELEASES_PAST_TABLE: f32 = 30.0;

/// Platform release each model year shipped with
const PLATFORM_VERSIONS: &[(f32, u16)] = &[
    (2.3, 2015),
    (2.4, 2016),
    (3.0, 2017),
    (4.0, 2018),
    (5.0, 2019),
    (5.5, 2020),
    (6.0, 2021),
    (6.5, 2022),
    (7.0, 2023),
    (8.0, 2024),
    (9.0, 2025),
];

/// Premium line: `QE55Q80TAT`, `QN65QN90B`, `QE65LS03TAU`, `QE65Q7FN`
static PREMIUM_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:QE|QN|QA|GQ|QH)\d{2}(?:QN|LS|Q|S)(?:\d{2,3}|\dF)([A-Z])")
        .expect("premium line pattern")
});

/// Standard line: `UE55TU8000`, `UN55NU7100`, `UE40J5200`
static STANDARD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:UE|UN|UA|GU|HG)\d{2}([A-Z])[A-Z]?\d{4}").expect("standard line pattern")
});

/// Region/size prefix skipped by the last-resort scan
static MODEL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}\d{2}").expect("model prefix pattern"));

static FIRMWARE_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])(20[1-3][0-9])(?:[^0-9]|$)").expect("firmware year pattern")
});

/// Model year for a year-code letter
pub fn year_for_code(code: char) -> Option<u16> {
    YEAR_CODES
        .iter()
        .find(|(c, _)| *c == code.to_ascii_uppercase())
        .map(|(_, year)| *year)
}

/// Model year for a numeric platform version (`6.5` → 2022)
pub fn year_for_platform_version(version: f32) -> Option<u16> {
    if !version.is_finite() {
        return None;
    }
    let (last_version, last_year) = *PLATFORM_VERSIONS.last()?;
    if version > last_version {
        // one major release per year past the table
        let extra = (version - last_version).floor();
        if extra > MAX_RELEASES_PAST_TABLE {
            return None;
        }
        return last_year.checked_add(extra as u16);
    }
    PLATFORM_VERSIONS
        .iter()
        .rev()
        .find(|(v, _)| version + 0.001 >= *v)
        .map(|(_, year)| *year)
}

/// Platform version a model year shipped with (inverse of [`year_for_platform_version`])
pub fn platform_version_for_year(year: u16) -> f32 {
    let (first_version, first_year) = PLATFORM_VERSIONS[0];
    if year <= first_year {
        return first_version;
    }
    match PLATFORM_VERSIONS.iter().find(|(_, y)| *y == year) {
        Some((v, _)) => *v,
        None => {
            let (last_version, last_year) = PLATFORM_VERSIONS[PLATFORM_VERSIONS.len() - 1];
            last_version + year.saturating_sub(last_year) as f32
        }
    }
}

/// Model year from a model-name string.
///
/// The premium naming scheme is tried first, then the standard one; a pattern
/// that matches but captures a letter outside the year table counts as no match.
/// As a last resort every letter after the region/size prefix is checked
/// against the year table.
pub fn year_from_model(model: &str) -> Option<u16> {
    let model = model.trim().to_ascii_uppercase();
    if model.is_empty() {
        return None;
    }

    for pattern in [&*PREMIUM_LINE, &*STANDARD_LINE] {
        let year = pattern
            .captures(&model)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().chars().next())
            .and_then(year_for_code);
        if year.is_some() {
            return year;
        }
    }

    let rest = match MODEL_PREFIX.find(&model) {
        Some(prefix) => &model[prefix.end()..],
        None => model.as_str(),
    };
    rest.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .find_map(year_for_code)
}

/// First plausible 4-digit year inside a firmware version string
pub fn year_from_firmware(firmware: &str) -> Option<u16> {
    FIRMWARE_YEAR
        .captures_iter(firmware)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u16>().ok())
        .find(|year| (2015..=2035).contains(year))
}
