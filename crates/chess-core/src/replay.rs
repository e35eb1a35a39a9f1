//! SAN replay from the initial position.
//!
//! A move list is replayed in full before anything else looks at it, so a
//! single illegal move rejects the whole record.

use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, CastlingSide, Chess, Color, EnPassantMode, Move, Position, Role};

use crate::error::ReplayError;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// Side that plays the given 0-based ply (even = white).
    pub fn of_ply(ply: usize) -> Self {
        if ply % 2 == 0 {
            Side::White
        } else {
            Side::Black
        }
    }

    pub fn is_white(self) -> bool {
        self == Side::White
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Piece {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl From<Role> for Piece {
    fn from(role: Role) -> Self {
        match role {
            Role::Pawn => Piece::Pawn,
            Role::Knight => Piece::Knight,
            Role::Bishop => Piece::Bishop,
            Role::Rook => Piece::Rook,
            Role::Queen => Piece::Queen,
            Role::King => Piece::King,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveFlags {
    pub capture: bool,
    pub en_passant: bool,
    pub castle_kingside: bool,
    pub castle_queenside: bool,
    pub promotion: bool,
}

impl MoveFlags {
    fn of(mv: &Move) -> Self {
        Self {
            capture: mv.is_capture(),
            en_passant: mv.is_en_passant(),
            castle_kingside: mv.castling_side() == Some(CastlingSide::KingSide),
            castle_queenside: mv.castling_side() == Some(CastlingSide::QueenSide),
            promotion: mv.is_promotion(),
        }
    }

    /// Captures (en passant included) and promotions.
    pub fn is_tactical(&self) -> bool {
        self.capture || self.en_passant || self.promotion
    }

    pub fn is_castle(&self) -> bool {
        self.castle_kingside || self.castle_queenside
    }
}

/// One legal ply, already validated against the position it was played in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedMove {
    /// Canonical SAN including the `+`/`#` suffix.
    pub san: String,
    /// UCI with standard castling notation (`e1g1`).
    pub uci: String,
    pub piece: Piece,
    pub from: String,
    pub to: String,
    pub promotion: Option<Piece>,
    pub flags: MoveFlags,
}

impl PlayedMove {
    /// File letter of the destination square (`'a'..='h'`).
    pub fn to_file(&self) -> char {
        self.to.chars().next().unwrap_or('a')
    }

    /// Rank number of the destination square (1..=8).
    pub fn to_rank(&self) -> u8 {
        self.to
            .chars()
            .nth(1)
            .and_then(|c| c.to_digit(10))
            .map_or(0, |d| d as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// The side to move is mated.
    Checkmate,
    Stalemate,
    InsufficientMaterial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayedPosition {
    pub fen: String,
    pub side_to_move: Side,
    pub terminal: Option<Terminal>,
}

impl ReplayedPosition {
    /// Describe the position in `fen`, including whether the game is over.
    pub fn from_fen(fen: &str) -> Result<Self, ReplayError> {
        position_from_fen(fen).map(|pos| Self::of(&pos))
    }

    fn of(pos: &Chess) -> Self {
        let terminal = if pos.is_checkmate() {
            Some(Terminal::Checkmate)
        } else if pos.is_stalemate() {
            Some(Terminal::Stalemate)
        } else if pos.is_insufficient_material() {
            Some(Terminal::InsufficientMaterial)
        } else {
            None
        };

        Self {
            fen: Fen::from_position(pos.clone(), EnPassantMode::Legal).to_string(),
            side_to_move: pos.turn().into(),
            terminal,
        }
    }
}

/// A fully replayed move list.
///
/// `positions[i]` is the position before `moves[i]`; `positions` therefore has
/// one more entry than `moves`.
#[derive(Debug, Clone)]
pub struct Replay {
    pub positions: Vec<ReplayedPosition>,
    pub moves: Vec<PlayedMove>,
}

impl Replay {
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Replay SAN moves from the standard initial position.
pub fn replay_san<S: AsRef<str>>(moves: &[S]) -> Result<Replay, ReplayError> {
    let mut pos = Chess::default();
    let mut positions = Vec::with_capacity(moves.len() + 1);
    let mut played = Vec::with_capacity(moves.len());
    positions.push(ReplayedPosition::of(&pos));

    for (ply, raw) in moves.iter().enumerate() {
        let raw = raw.as_ref();
        let invalid = |reason: String| ReplayError::InvalidMove {
            ply,
            san: raw.to_string(),
            reason,
        };

        let san: San = normalize_san(raw)
            .parse()
            .map_err(|e| invalid(format!("not SAN ({e})")))?;
        let mv = san
            .to_move(&pos)
            .map_err(|e| invalid(format!("illegal in this position ({e})")))?;

        played.push(play(&mut pos, &mv));
        positions.push(ReplayedPosition::of(&pos));
    }

    Ok(Replay {
        positions,
        moves: played,
    })
}

/// Convert an engine UCI move to a [`PlayedMove`] in the given position.
pub fn uci_to_san(fen: &str, uci: &str) -> Result<PlayedMove, ReplayError> {
    let mut pos = position_from_fen(fen)?;
    let invalid = |reason: String| ReplayError::InvalidUci {
        uci: uci.to_string(),
        reason,
    };
    let uci_move: UciMove = uci.parse().map_err(|e| invalid(format!("{e}")))?;
    let mv = uci_move.to_move(&pos).map_err(|e| invalid(format!("{e}")))?;
    Ok(play(&mut pos, &mv))
}

pub fn position_from_fen(fen: &str) -> Result<Chess, ReplayError> {
    let parsed: Fen = fen
        .parse()
        .map_err(|e| ReplayError::InvalidFen(format!("{fen}: {e}")))?;
    parsed
        .into_position::<Chess>(CastlingMode::Standard)
        .map_err(|e| ReplayError::InvalidFen(format!("{fen}: {e}")))
}

/// Number of plies already played in a FEN position, from its move counters.
pub fn plies_played(fen: &str) -> usize {
    let mut fields = fen.split_whitespace().skip(1);
    let black_to_move = fields.next() == Some("b");
    let fullmoves = fields
        .nth(3)
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    (fullmoves - 1) * 2 + usize::from(black_to_move)
}

fn play(pos: &mut Chess, mv: &Move) -> PlayedMove {
    let san = San::from_move(&*pos, mv).to_string();
    let uci = mv.to_uci(CastlingMode::Standard).to_string();
    pos.play_unchecked(mv);

    let suffix = if pos.is_checkmate() {
        "#"
    } else if pos.is_check() {
        "+"
    } else {
        ""
    };

    PlayedMove {
        san: format!("{san}{suffix}"),
        from: uci.get(0..2).unwrap_or_default().to_string(),
        to: uci.get(2..4).unwrap_or_default().to_string(),
        uci,
        piece: mv.role().into(),
        promotion: mv.promotion().map(Piece::from),
        flags: MoveFlags::of(mv),
    }
}

/// Strip annotation suffixes and accept zero-style castling.
fn normalize_san(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_end_matches(|c: char| matches!(c, '+' | '#' | '!' | '?'));
    match trimmed {
        "0-0" => "O-O".to_string(),
        "0-0-0" => "O-O-O".to_string(),
        other => other.to_string(),
    }
}
