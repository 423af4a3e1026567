//! Glyph placement for the blood-drop timeline.
//!
//! Positions are in screen pixels relative to the timeline panel. Everything is
//! a function of the conflict's day counts and bloodiness except the size
//! jitter, which is drawn from the session's `Entropy`.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::data::conflict::{Conflict, Entropy};
use crate::logging::{log, obj, Domain, Level};

pub const DAYS_PER_YEAR: f64 = 365.0;
pub const PX_PER_WAR_YEAR: f64 = 20.0;
pub const ORIGIN_X: f64 = 20.0;
pub const PEACE_GAP_X: f64 = 40.0;
pub const AFTERMATH_STEP_X: f64 = 15.0;
pub const MAX_WAR_DROPS: usize = 25;
pub const MAX_AFTERMATH_DROPS: usize = 15;

const WAR_COLORS: [&str; 5] = ["#8b0000", "#a00000", "#b50000", "#c00000", "#d10000"];
const AFTERMATH_COLORS: [&str; 5] = ["#ff4500", "#ff5722", "#ff7043", "#ff8a65", "#ffab91"];
const PEACE_MARKER_COLOR: &str = "#ff7700";
const END_MARKER_COLOR: &str = "#2ca02c";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    War,
    Peace,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlyphKind {
    Drop,
    PeaceMarker,
    EndMarker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Glyph {
    pub kind: GlyphKind,
    pub section: Section,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub color: String,
    pub delay_ms: u64,
    pub z: i64,
}

fn drop_count(days: i64, cap: usize) -> usize {
    let years = (days.max(0) as f64 / DAYS_PER_YEAR).ceil() as usize;
    years.min(cap)
}

pub fn war_drop_count(c: &Conflict) -> usize {
    drop_count(c.war_to_peace_days, MAX_WAR_DROPS)
}

pub fn aftermath_drop_count(c: &Conflict) -> usize {
    drop_count(c.peace_to_end_days, MAX_AFTERMATH_DROPS)
}

/// x of the peace marker and the peace-year label.
pub fn peace_x(c: &Conflict) -> f64 {
    ORIGIN_X + c.war_to_peace_days as f64 / DAYS_PER_YEAR * PX_PER_WAR_YEAR
}

/// x of the end marker and the end-year label.
pub fn end_x(c: &Conflict) -> f64 {
    peace_x(c) + PEACE_GAP_X + aftermath_drop_count(c) as f64 * AFTERMATH_STEP_X
}

fn palette_index(i: usize, n: usize) -> usize {
    let bucket = (i as f64 / (n as f64 / WAR_COLORS.len() as f64)).floor() as usize;
    bucket.min(WAR_COLORS.len() - 1)
}

/// Glyphs for one section of the timeline, in paint order.
pub fn blood_trail<E: Entropy + ?Sized>(c: &Conflict, section: Section, entropy: &mut E) -> Vec<Glyph> {
    let mut glyphs = Vec::new();
    let n = match section {
        Section::War => war_drop_count(c),
        Section::Peace | Section::End => aftermath_drop_count(c),
    };

    for i in 0..n {
        let fi = i as f64;
        let y = 50.0 + (fi * 0.5).sin() * 5.0;
        let (x, scale, delay_ms, color) = match section {
            Section::War => (
                ORIGIN_X + fi * PX_PER_WAR_YEAR,
                1.0 - fi * 0.01 + entropy.unit() * 0.1,
                (i * 100) as u64,
                WAR_COLORS[palette_index(i, n)],
            ),
            Section::Peace | Section::End => (
                peace_x(c) + PEACE_GAP_X + fi * AFTERMATH_STEP_X,
                (0.7 - fi * 0.04 + entropy.unit() * 0.05).max(0.3),
                ((n + i) * 100) as u64,
                AFTERMATH_COLORS[palette_index(i, n)],
            ),
        };
        glyphs.push(Glyph {
            kind: GlyphKind::Drop,
            section,
            x,
            y,
            scale,
            color: color.to_string(),
            delay_ms,
            z: (n - i) as i64,
        });
    }

    match section {
        Section::War => {}
        Section::Peace => glyphs.push(Glyph {
            kind: GlyphKind::PeaceMarker,
            section,
            x: peace_x(c),
            y: 40.0,
            scale: 1.3,
            color: PEACE_MARKER_COLOR.to_string(),
            delay_ms: 500,
            z: 50,
        }),
        Section::End => glyphs.push(Glyph {
            kind: GlyphKind::EndMarker,
            section,
            x: end_x(c),
            y: 50.0,
            scale: 1.0,
            color: END_MARKER_COLOR.to_string(),
            delay_ms: 1500,
            z: 50,
        }),
    }
    glyphs
}

/// All three sections, war first.
pub fn timeline<E: Entropy + ?Sized>(c: &Conflict, entropy: &mut E) -> Vec<Glyph> {
    let mut glyphs = blood_trail(c, Section::War, entropy);
    glyphs.extend(blood_trail(c, Section::Peace, entropy));
    glyphs.extend(blood_trail(c, Section::End, entropy));
    log(
        Level::Trace,
        Domain::Layout,
        "timeline",
        obj(&[("conflict", json!(c.id)), ("glyphs", json!(glyphs.len()))]),
    );
    glyphs
}

/// Filled/unfilled drops of the five-drop rating.
pub fn bloodiness_rating(level: u8) -> [bool; 5] {
    let mut out = [false; 5];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = i < level as usize;
    }
    out
}

pub fn blood_fact(bloodiness: u8) -> &'static str {
    if bloodiness >= 4 {
        "Extremely high-intensity conflict with massive casualties and widespread devastation."
    } else if bloodiness >= 3 {
        "High-intensity conflict with significant casualties and regional impact."
    } else {
        "Moderate-intensity conflict with targeted violence and localized impact."
    }
}

/// Day count shown as whole years.
pub fn years(days: i64) -> i64 {
    (days as f64 / DAYS_PER_YEAR).round() as i64
}
