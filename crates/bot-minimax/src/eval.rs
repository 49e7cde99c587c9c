//! Static evaluation.
//!
//! Scores are in centipawns from the point of view of the side to move. The
//! evaluation blends four terms: material, piece-square tables, mobility and
//! a pawn shield around the king.

use chess_rules::{Color, Position, Role};
use shakmaty::{attacks, Bitboard, Board, Piece, Square};

/// Piece values in centipawns
pub const PAWN_VALUE: i32 = 100;
pub const KNIGHT_VALUE: i32 = 320;
pub const BISHOP_VALUE: i32 = 330;
pub const ROOK_VALUE: i32 = 500;
pub const QUEEN_VALUE: i32 = 900;

/// Bonus per square a knight, bishop, rook or queen attacks.
const MOBILITY_WEIGHT: i32 = 2;

/// Bonus per friendly pawn next to the king.
const KING_SHIELD_WEIGHT: i32 = 10;

// Piece-square tables, from white's side of the board: the first row is the
// eighth rank, the last row the first.
#[rustfmt::skip]
const PAWN_PST: [i32; 64] = [
     0,  0,   0,   0,   0,   0,  0,  0,
    50, 50,  50,  50,  50,  50, 50, 50,
    10, 10,  20,  30,  30,  20, 10, 10,
     5,  5,  10,  25,  25,  10,  5,  5,
     0,  0,   0,  20,  20,   0,  0,  0,
     5, -5, -10,   0,   0, -10, -5,  5,
     5, 10,  10, -20, -20,  10, 10,  5,
     0,  0,   0,   0,   0,   0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT_PST: [i32; 64] = [
    -50, -40, -30, -30, -30, -30, -40, -50,
    -40, -20,   0,   0,   0,   0, -20, -40,
    -30,   0,  10,  15,  15,  10,   0, -30,
    -30,   5,  15,  20,  20,  15,   5, -30,
    -30,   0,  15,  20,  20,  15,   0, -30,
    -30,   5,  10,  15,  15,  10,   5, -30,
    -40, -20,   0,   5,   5,   0, -20, -40,
    -50, -40, -30, -30, -30, -30, -40, -50,
];

#[rustfmt::skip]
const BISHOP_PST: [i32; 64] = [
    -20, -10, -10, -10, -10, -10, -10, -20,
    -10,   0,   0,   0,   0,   0,   0, -10,
    -10,   0,   5,  10,  10,   5,   0, -10,
    -10,   5,   5,  10,  10,   5,   5, -10,
    -10,   0,  10,  10,  10,  10,   0, -10,
    -10,  10,  10,  10,  10,  10,  10, -10,
    -10,   5,   0,   0,   0,   0,   5, -10,
    -20, -10, -10, -10, -10, -10, -10, -20,
];

#[rustfmt::skip]
const ROOK_PST: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     5, 10, 10, 10, 10, 10, 10,  5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
     0,  0,  0,  5,  5,  0,  0,  0,
];

#[rustfmt::skip]
const QUEEN_PST: [i32; 64] = [
    -20, -10, -10, -5, -5, -10, -10, -20,
    -10,   0,   0,  0,  0,   0,   0, -10,
    -10,   0,   5,  5,  5,   5,   0, -10,
     -5,   0,   5,  5,  5,   5,   0,  -5,
      0,   0,   5,  5,  5,   5,   0,  -5,
    -10,   5,   5,  5,  5,   5,   0, -10,
    -10,   0,   5,  0,  0,   0,   0, -10,
    -20, -10, -10, -5, -5, -10, -10, -20,
];

#[rustfmt::skip]
const KING_PST: [i32; 64] = [
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -20, -30, -30, -40, -40, -30, -30, -20,
    -10, -20, -20, -20, -20, -20, -20, -10,
     20,  20,   0,   0,   0,   0,  20,  20,
     20,  30,  10,   0,   0,  10,  30,  20,
];

/// Material value of a piece. The king has none.
pub fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => PAWN_VALUE,
        Role::Knight => KNIGHT_VALUE,
        Role::Bishop => BISHOP_VALUE,
        Role::Rook => ROOK_VALUE,
        Role::Queen => QUEEN_VALUE,
        Role::King => 0,
    }
}

fn table(role: Role) -> &'static [i32; 64] {
    match role {
        Role::Pawn => &PAWN_PST,
        Role::Knight => &KNIGHT_PST,
        Role::Bishop => &BISHOP_PST,
        Role::Rook => &ROOK_PST,
        Role::Queen => &QUEEN_PST,
        Role::King => &KING_PST,
    }
}

/// Index into a table laid out from white's side.
fn table_index(square: Square, color: Color) -> usize {
    match color {
        // a1 is square 0 but the last row of the table
        Color::White => usize::from(square.flip_vertical()),
        Color::Black => usize::from(square),
    }
}

/// Total material of one side.
pub fn material(board: &Board, color: Color) -> i32 {
    Role::ALL
        .iter()
        .map(|&role| piece_value(role) * board.by_piece(Piece { color, role }).count() as i32)
        .sum()
}

fn placement(board: &Board, color: Color) -> i32 {
    let mut score = 0;
    for role in Role::ALL {
        for square in board.by_piece(Piece { color, role }) {
            score += table(role)[table_index(square, color)];
        }
    }
    score
}

fn mobility(board: &Board, color: Color) -> i32 {
    let own = board.by_color(color);
    let mut reach = 0;
    for role in [Role::Knight, Role::Bishop, Role::Rook, Role::Queen] {
        let piece = Piece { color, role };
        for square in board.by_piece(piece) {
            let targets: Bitboard = attacks::attacks(square, piece, board.occupied()) & !own;
            reach += targets.count() as i32;
        }
    }
    reach * MOBILITY_WEIGHT
}

fn king_shield(board: &Board, color: Color) -> i32 {
    let Some(king) = board.king_of(color) else {
        return 0;
    };
    let shield = attacks::king_attacks(king) & board.pawns() & board.by_color(color);
    shield.count() as i32 * KING_SHIELD_WEIGHT
}

fn side_score(board: &Board, color: Color) -> i32 {
    material(board, color) + placement(board, color) + mobility(board, color) + king_shield(board, color)
}

/// Evaluates the position for the side to move.
pub fn evaluate(position: &Position) -> i32 {
    let board = position.board();
    let score = side_score(board, Color::White) - side_score(board, Color::Black);
    match position.turn() {
        Color::White => score,
        Color::Black => -score,
    }
}

/// Material balance for the side to move, ignoring everything else.
pub fn material_balance(position: &Position) -> i32 {
    let board = position.board();
    let us = position.turn();
    material(board, us) - material(board, us.other())
}
