//! Chat line classification
//!
//! Dungeon entry, run start and run end are announced in chat. This module
//! turns raw chat lines into [`SessionSignal`]s; everything else is ignored.

use super::dungeon::SessionSignal;

/// Marker that starts a formatting code
const FORMAT_MARKER: char = '§';

const ENTERED_PREFIX: &str = "entered The Catacombs, ";
const CLASS_NPC_GREETING: &str = "[NPC] Mort: Talk to me to change your class";
const RUN_START_LINE: &str = "[NPC] Mort: Here, I found this map when I first entered the dungeon.";
const RUN_END_BANNER: &str = "> EXTRA STATS <";

/// Remove formatting codes (a marker followed by one code character).
///
/// # Examples
///
/// ```
/// use room_secrets::core::chat::strip_formatting;
///
/// assert_eq!(strip_formatting("§a§lHello §rworld"), "Hello world");
/// ```
pub fn strip_formatting(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == FORMAT_MARKER {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

/// Floor number from its display form: "Entrance" is 0, roman numerals
/// I to VII are 1 to 7.
pub fn parse_floor(text: &str) -> Option<u32> {
    let floor = match text.trim() {
        "Entrance" => 0,
        "I" => 1,
        "II" => 2,
        "III" => 3,
        "IV" => 4,
        "V" => 5,
        "VI" => 6,
        "VII" => 7,
        _ => return None,
    };
    Some(floor)
}

/// Map a chat line to a session signal, if it is one of the dungeon lines.
pub fn classify_chat_line(line: &str) -> Option<SessionSignal> {
    let plain = strip_formatting(line);
    let plain = plain.trim();

    if let Some(idx) = plain.find(ENTERED_PREFIX) {
        let rest = &plain[idx + ENTERED_PREFIX.len()..];
        let floor = rest
            .strip_prefix("Floor ")
            .unwrap_or(rest)
            .trim_end_matches(['!', '.'])
            .trim();
        return Some(SessionSignal::DungeonEntered {
            floor: parse_floor(floor),
        });
    }
    if plain.starts_with(CLASS_NPC_GREETING) {
        return Some(SessionSignal::DungeonEntered { floor: None });
    }
    if plain == RUN_START_LINE {
        return Some(SessionSignal::RunStarted);
    }
    if plain == RUN_END_BANNER {
        return Some(SessionSignal::RunEnded);
    }
    None
}
