//! PGN parsing utilities: a lightweight regex-based parser.
//!
//! Only the pieces the analyzer needs: the seven-tag roster subset we keep in
//! [`GameMetadata`] and the mainline SAN moves. Comments, variations and NAGs
//! are discarded.

use std::sync::OnceLock;

use regex::Regex;

use crate::game_data::{GameData, GameMetadata};
use crate::replay::STANDARD_START_FEN;

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\[(\w+)\s+"([^"]*)"\]"#).expect("header pattern"))
}

fn move_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:O-O-O|O-O|0-0-0|0-0)[+#]?|[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=?[QRBN])?[+#]?",
        )
        .expect("move pattern")
    })
}

/// Parse a PGN string into a [`GameData`].
///
/// Returns `None` for games without moves and for games that start from a
/// custom position (`[SetUp "1"]` with a non-standard FEN), since the analyzer
/// always replays from the initial position.
pub fn parse_pgn(pgn: &str) -> Option<GameData> {
    let mut white = "Unknown".to_string();
    let mut black = "Unknown".to_string();
    let mut result = "*".to_string();
    let mut date = None;
    let mut event = None;
    let mut eco = None;
    let mut setup = None;
    let mut fen = None;

    for cap in header_re().captures_iter(pgn) {
        let value = cap[2].to_string();
        match &cap[1] {
            "White" => white = value,
            "Black" => black = value,
            "Result" => result = value,
            "Date" => date = Some(value),
            "Event" => event = Some(value),
            "ECO" => eco = Some(value),
            "SetUp" => setup = Some(value),
            "FEN" => fen = Some(value),
            _ => {}
        }
    }

    if setup.as_deref() == Some("1") {
        if let Some(ref f) = fen {
            if f != STANDARD_START_FEN {
                return None;
            }
        }
    }

    let moves = extract_moves(pgn);
    if moves.is_empty() {
        return None;
    }

    Some(GameData {
        metadata: GameMetadata {
            white,
            black,
            result,
            date,
            event,
            eco,
        },
        moves,
        pgn: pgn.to_string(),
    })
}

/// Extract mainline SAN moves from PGN movetext.
///
/// Also accepts a bare move list such as `"e4 e5 Nf3"`.
pub fn extract_moves(pgn: &str) -> Vec<String> {
    let movetext = strip_bracketed(pgn, '[', ']');
    let movetext = strip_bracketed(&movetext, '{', '}');
    let movetext = strip_line_comments(&movetext);
    let movetext = strip_bracketed(&movetext, '(', ')');

    movetext
        .split_whitespace()
        .filter(|token| !token.starts_with('$'))
        .flat_map(|token| move_re().find_iter(token).map(|m| m.as_str().to_string()))
        .collect()
}

/// Drop `;` comments, which run to the end of their line.
fn strip_line_comments(text: &str) -> String {
    text.lines()
        .map(|line| line.split_once(';').map_or(line, |(before, _)| before))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove every `open … close` span, honouring nesting (variations nest).
fn strip_bracketed(text: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        if c == open {
            depth += 1;
            out.push(' ');
        } else if c == close && depth > 0 {
            depth -= 1;
        } else if depth == 0 {
            out.push(c);
        }
    }
    out
}
