//! Packet and nodelist filename grammar.
//!
//! ```text
//! <league:3 decimal><game:1 letter B|F><source:2 hex><dest:2 hex>.<seq:3 decimal>
//! ```
//! Example: `555B0201.001` = league 555, game B, source 0x02, dest 0x01, seq 1.
//!
//! Two special names bypass this grammar entirely: `BRNODES.<league>` and
//! `FENODES.<league>` (see [`parse_nodelist_name`]).

use nova_hub_common::{GameType, PacketName};

/// Parse a packet filename. Case-insensitive on input; canonical form is
/// always uppercase (see [`format`]).
pub fn parse(name: &str) -> Option<PacketName> {
    let upper = name.to_ascii_uppercase();
    let bytes = upper.as_bytes();

    // 3 digits + 1 letter + 2 hex + 2 hex + '.' + 3 digits = 12 bytes.
    if bytes.len() != 12 {
        return None;
    }
    if bytes[8] != b'.' {
        return None;
    }

    let league_number = &upper[0..3];
    if !league_number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let game = match upper.as_bytes()[3] {
        b'B' => GameType::B,
        b'F' => GameType::F,
        _ => return None,
    };

    let source = &upper[4..6];
    let dest = &upper[6..8];
    if !is_hex_pair(source) || !is_hex_pair(dest) {
        return None;
    }

    let seq_str = &upper[9..12];
    if !seq_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let sequence_number: u16 = seq_str.parse().ok()?;
    if sequence_number > 999 {
        return None;
    }

    Some(PacketName {
        league_number: league_number.to_string(),
        game,
        source_bbs_index: source.to_string(),
        dest_bbs_index: dest.to_string(),
        sequence_number,
    })
}

fn is_hex_pair(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Format parts back into the canonical uppercase filename.
pub fn format(parts: &PacketName) -> String {
    format!(
        "{:0>3}{}{:0>2}{:0>2}.{:0>3}",
        parts.league_number,
        parts.game.as_char(),
        parts.source_bbs_index.to_ascii_uppercase(),
        parts.dest_bbs_index.to_ascii_uppercase(),
        parts.sequence_number,
    )
}

/// A nodelist filename: `BRNODES.<NNN>` (game B) or `FENODES.<NNN>` (game F).
/// These never pass through [`parse`] — they are recognized by prefix only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodelistName {
    pub game: GameType,
    pub league_number: String,
}

pub fn parse_nodelist_name(name: &str) -> Option<NodelistName> {
    let upper = name.to_ascii_uppercase();
    let (prefix, game) = if let Some(rest) = upper.strip_prefix("BRNODES.") {
        (rest, GameType::B)
    } else if let Some(rest) = upper.strip_prefix("FENODES.") {
        (rest, GameType::F)
    } else {
        return None;
    };

    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(NodelistName {
        game,
        league_number: prefix.to_string(),
    })
}

pub fn is_nodelist_name(name: &str) -> bool {
    parse_nodelist_name(name).is_some()
}

pub fn format_nodelist_name(game: GameType, league_number: &str) -> String {
    let prefix = match game {
        GameType::B => "BRNODES",
        GameType::F => "FENODES",
    };
    format!("{prefix}.{league_number}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_name() {
        let parsed = parse("555B0201.001").unwrap();
        assert_eq!(parsed.league_number, "555");
        assert_eq!(parsed.game, GameType::B);
        assert_eq!(parsed.source_bbs_index, "02");
        assert_eq!(parsed.dest_bbs_index, "01");
        assert_eq!(parsed.sequence_number, 1);
    }

    #[test]
    fn parses_lowercase_and_stores_uppercase() {
        let parsed = parse("555b0201.001").unwrap();
        assert_eq!(format(&parsed), "555B0201.001");
    }

    #[test]
    fn rejects_malformed_grammar() {
        assert!(parse("555B0201001").is_none()); // missing dot
        assert!(parse("55B0201.001").is_none()); // short league
        assert!(parse("555X0201.001").is_none()); // bad game letter
        assert!(parse("555BZZ01.001").is_none()); // non-hex source
        assert!(parse("555B0201.1").is_none()); // short sequence
    }

    #[test]
    fn format_round_trips() {
        let parts = PacketName {
            league_number: "013".to_string(),
            game: GameType::F,
            source_bbs_index: "0a".to_string(),
            dest_bbs_index: "ff".to_string(),
            sequence_number: 7,
        };
        assert_eq!(format(&parts), "013F0AFF.007");
    }

    #[test]
    fn recognizes_nodelist_names_case_insensitively() {
        let n = parse_nodelist_name("brnodes.013").unwrap();
        assert_eq!(n.game, GameType::B);
        assert_eq!(n.league_number, "013");

        let n = parse_nodelist_name("FENODES.555").unwrap();
        assert_eq!(n.game, GameType::F);

        assert!(parse_nodelist_name("BRNODES.").is_none());
        assert!(parse_nodelist_name("BRNODES.5X5").is_none());
        assert!(!is_nodelist_name("555B0201.001"));
    }

    #[test]
    fn nodelist_names_never_parse_as_packets() {
        assert!(parse("BRNODES.013").is_none());
        assert!(parse("FENODES.555").is_none());
    }

    #[test]
    fn format_nodelist_round_trips() {
        assert_eq!(format_nodelist_name(GameType::B, "013"), "BRNODES.013");
        assert_eq!(format_nodelist_name(GameType::F, "555"), "FENODES.555");
    }
}
