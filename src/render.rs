//! Plain-text rendering of the timeline screen.

use std::fmt::Write;

use crate::data::conflict::Conflict;
use crate::layout::{self, Glyph, GlyphKind, Section};
use crate::session::{Phase, SelectionState};

pub const TIMELINE_COLUMNS: usize = 72;

const TITLE: &str = "BLOODLINES OF WAR";
const SUBTITLE: &str = "The Crimson Path from Conflict to Peace";

/// The whole screen for the current state. `glyphs` is the layout of the
/// selected conflict; ignored unless the state is ready.
pub fn screen(state: &SelectionState, glyphs: &[Glyph]) -> String {
    let mut out = String::new();
    match (state.phase, state.selected_conflict()) {
        (Phase::Loading, _) => {
            out.push_str("Loading War Timeline...\n");
            return out;
        }
        (Phase::NoData, _) | (Phase::Ready, None) => {
            if let Some(err) = &state.error {
                let _ = writeln!(out, "{}", err);
            }
            out.push_str("No conflict data available\n");
            return out;
        }
        (Phase::Ready, Some(conflict)) => {
            let _ = writeln!(out, "{:^width$}", TITLE, width = TIMELINE_COLUMNS);
            let _ = writeln!(out, "{:^width$}", SUBTITLE, width = TIMELINE_COLUMNS);
            out.push('\n');
            if state.load_failed {
                if let Some(err) = &state.error {
                    let _ = writeln!(out, "! {} (showing built-in conflicts)", err);
                    out.push('\n');
                }
            }
            out.push_str(&selector(state));
            out.push('\n');
            out.push_str(&header(conflict));
            out.push_str(&timeline_rows(conflict, glyphs, state.animation_armed));
            out.push('\n');
            out.push_str(&stats(conflict));
        }
    }
    out
}

pub fn selector(state: &SelectionState) -> String {
    let mut out = String::new();
    for (i, c) in state.sample_set.iter().enumerate() {
        if state.selected == Some(i) {
            let _ = writeln!(out, " > [{}] {}", i + 1, c.name);
        } else {
            let _ = writeln!(out, "   [{}] {}", i + 1, c.name);
        }
    }
    out
}

fn header(c: &Conflict) -> String {
    let rating: String = layout::bloodiness_rating(c.bloodiness)
        .iter()
        .map(|filled| if *filled { '●' } else { '○' })
        .collect();
    let mut out = String::new();
    let _ = writeln!(out, "{}", c.name);
    let _ = writeln!(out, "{}", c.location);
    let _ = writeln!(out, "{}", c.sides);
    let _ = writeln!(
        out,
        "Bloodiness {}   {} years",
        rating,
        layout::years(c.total_days)
    );
    out.push('\n');
    out
}

fn glyph_char(g: &Glyph) -> char {
    match (g.kind, g.section) {
        (GlyphKind::PeaceMarker, _) => 'P',
        (GlyphKind::EndMarker, _) => 'E',
        (GlyphKind::Drop, Section::War) => '#',
        (GlyphKind::Drop, _) => '*',
    }
}

/// Drop row, axis and year labels. Drops stay hidden until the animation is armed.
pub fn timeline_rows(c: &Conflict, glyphs: &[Glyph], armed: bool) -> String {
    let max_x = glyphs
        .iter()
        .map(|g| g.x)
        .fold(layout::end_x(c), f64::max)
        .max(1.0);
    let col = |x: f64| ((x / max_x) * (TIMELINE_COLUMNS - 1) as f64).round() as usize;

    let mut drops = vec![' '; TIMELINE_COLUMNS];
    if armed {
        let mut painted: Vec<&Glyph> = glyphs.iter().collect();
        painted.sort_by_key(|g| g.z);
        for g in painted {
            let at = col(g.x).min(TIMELINE_COLUMNS - 1);
            drops[at] = glyph_char(g);
        }
    }

    let mut labels = vec![' '; TIMELINE_COLUMNS + 6];
    for (x, year) in [
        (layout::ORIGIN_X, c.start_year),
        (layout::peace_x(c), c.peace_year),
        (layout::end_x(c), c.end_year),
    ] {
        let start = col(x).min(TIMELINE_COLUMNS - 1);
        for (offset, ch) in year.to_string().chars().enumerate() {
            if let Some(slot) = labels.get_mut(start + offset) {
                *slot = ch;
            }
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", drops.iter().collect::<String>().trim_end());
    let _ = writeln!(out, "{}", "-".repeat(TIMELINE_COLUMNS));
    let _ = writeln!(out, "{}", labels.iter().collect::<String>().trim_end());
    out
}

fn stats(c: &Conflict) -> String {
    let mut out = String::new();
    for (label, days) in [
        ("WAR DURATION", c.war_to_peace_days),
        ("PEACE TO END", c.peace_to_end_days),
        ("TOTAL CONFLICT", c.total_days),
    ] {
        let _ = writeln!(
            out,
            "{:<16}{:>4} years  ({} days)",
            label,
            layout::years(days),
            group_thousands(days)
        );
    }
    out.push('\n');
    let _ = writeln!(out, "BLOOD FACTS");
    let _ = writeln!(out, "{}", layout::blood_fact(c.bloodiness));
    out
}

pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        format!("-{}", out)
    } else {
        out
    }
}
