// Core types shared across the simulation.
//
// Defines tile coordinates (`Coord`), player and character identifiers,
// block hashes, and coin amounts. All types derive or implement `Serialize`
// and `Deserialize` so world states can be snapshotted and compared.
//
// **Critical constraint: determinism.** `Coord` ordering (row-major: y, then
// x) and `CharacterId` ordering (player name, then index) decide the
// iteration order of every map in the world state, and therefore which
// random draws each entity receives. Do not change either ordering.

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

// ---------------------------------------------------------------------------
// Coins
// ---------------------------------------------------------------------------

/// A coin amount in the smallest unit.
pub type Amount = i64;

/// One whole coin.
pub const COIN: Amount = 100_000_000;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A tile position on the map. `x` grows east, `y` grows south.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance (king moves) between two tiles.
    pub fn distance(self, other: Self) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.y.cmp(&other.y).then(self.x.cmp(&other.x))
    }
}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Serde adapter for `BTreeMap<Coord, V>`: encodes the map as an ordered
/// sequence of `(coord, value)` pairs, since JSON object keys must be strings.
pub mod coord_map {
    use super::*;

    pub fn serialize<V, S>(map: &BTreeMap<Coord, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        V: Serialize,
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(map.len()))?;
        for entry in map {
            seq.serialize_element(&entry)?;
        }
        seq.end()
    }

    pub fn deserialize<'de, V, D>(deserializer: D) -> Result<BTreeMap<Coord, V>, D::Error>
    where
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        struct PairsVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for PairsVisitor<V> {
            type Value = BTreeMap<Coord, V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a sequence of [coord, value] pairs")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut map = BTreeMap::new();
                while let Some((coord, value)) = seq.next_element::<(Coord, V)>()? {
                    if map.insert(coord, value).is_some() {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate tile {coord} in map"
                        )));
                    }
                }
                Ok(map)
            }
        }

        deserializer.deserialize_seq(PairsVisitor(PhantomData))
    }
}

// ---------------------------------------------------------------------------
// Players and characters
// ---------------------------------------------------------------------------

/// Maximum length of a player name in bytes.
pub const MAX_NAME_LENGTH: usize = 10;

/// A player's identity: the name registered on chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `name` is acceptable as a player name: 1 to 10 characters of
    /// ASCII letters, digits, `_` and `-`, plus single spaces that are
    /// neither leading nor trailing.
    pub fn is_valid_name(name: &str) -> bool {
        if name.is_empty() || name.len() > MAX_NAME_LENGTH {
            return false;
        }
        if name.starts_with(' ') || name.ends_with(' ') || name.contains("  ") {
            return false;
        }
        name.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b' ')
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

/// One character of one player. Index 0 is the player's general.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId {
    pub player: PlayerId,
    pub index: u32,
}

impl CharacterId {
    pub fn new(player: PlayerId, index: u32) -> Self {
        Self { player, index }
    }

    pub fn is_general(&self) -> bool {
        self.index == 0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.player, self.index)
    }
}

// ---------------------------------------------------------------------------
// Block hashes
// ---------------------------------------------------------------------------

/// A 256-bit block hash in internal (little-endian) byte order.
///
/// Displayed and serialized in the conventional reversed hex form. The
/// all-zero hash is the "no commitment" sentinel used by fee estimation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    pub const ZERO: BlockHash = BlockHash([0; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse the reversed hex form produced by `Display`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        bytes.reverse();
        Some(Self(bytes))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = self.0;
        bytes.reverse();
        f.write_str(&hex::encode(bytes))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({self})")
    }
}

// Custom serde: serialize as the hex string so hashes can be used as JSON
// map keys (serde_json requires string keys).
impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        BlockHash::from_hex(&s).ok_or_else(|| serde::de::Error::custom("invalid block hash"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_ordering_is_row_major() {
        let a = Coord::new(5, 1);
        let b = Coord::new(0, 2);
        let c = Coord::new(6, 1);
        assert!(a < b);
        assert!(a < c);
        let mut v = vec![b, c, a];
        v.sort();
        assert_eq!(v, vec![a, c, b]);
    }

    #[test]
    fn coord_distance_is_chebyshev() {
        assert_eq!(Coord::new(0, 0).distance(Coord::new(3, -2)), 3);
        assert_eq!(Coord::new(4, 4).distance(Coord::new(4, 4)), 0);
    }

    #[test]
    fn character_id_orders_by_player_then_index() {
        let a1 = CharacterId::new("a".into(), 1);
        let a0 = CharacterId::new("a".into(), 0);
        let b0 = CharacterId::new("b".into(), 0);
        assert!(a0 < a1);
        assert!(a1 < b0);
        assert_eq!(a1.to_string(), "a.1");
        assert!(a0.is_general());
    }

    #[test]
    fn player_name_rules() {
        assert!(PlayerId::is_valid_name("domob"));
        assert!(PlayerId::is_valid_name("a b-c_9"));
        assert!(PlayerId::is_valid_name("0123456789"));
        assert!(!PlayerId::is_valid_name(""));
        assert!(!PlayerId::is_valid_name("01234567890"));
        assert!(!PlayerId::is_valid_name(" lead"));
        assert!(!PlayerId::is_valid_name("trail "));
        assert!(!PlayerId::is_valid_name("two  sp"));
        assert!(!PlayerId::is_valid_name("bad!"));
        assert!(!PlayerId::is_valid_name("ümlaut"));
    }

    #[test]
    fn block_hash_hex_is_reversed() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        let hash = BlockHash(bytes);
        let s = hash.to_string();
        assert!(s.ends_with("ab"));
        assert!(s.starts_with("00"));
        assert_eq!(BlockHash::from_hex(&s), Some(hash));
        assert_eq!(BlockHash::from_hex("zz"), None);
    }

    #[test]
    fn block_hash_serializes_as_string() {
        let hash = BlockHash([7; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "07".repeat(32)));
        let back: BlockHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
        assert!(BlockHash::ZERO.is_zero());
        assert!(!hash.is_zero());
    }

    #[test]
    fn coord_map_roundtrip() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Wrapper {
            #[serde(with = "coord_map")]
            tiles: BTreeMap<Coord, u32>,
        }
        let mut tiles = BTreeMap::new();
        tiles.insert(Coord::new(3, 1), 10);
        tiles.insert(Coord::new(0, 2), 20);
        let w = Wrapper { tiles };
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(
            json,
            r#"{"tiles":[[{"x":3,"y":1},10],[{"x":0,"y":2},20]]}"#
        );
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back, w);
    }

    #[test]
    fn coord_map_rejects_duplicates() {
        #[derive(Deserialize, Debug)]
        struct Wrapper {
            #[serde(with = "coord_map")]
            #[allow(dead_code)]
            tiles: BTreeMap<Coord, u32>,
        }
        let json = r#"{"tiles":[[{"x":1,"y":1},1],[{"x":1,"y":1},2]]}"#;
        assert!(serde_json::from_str::<Wrapper>(json).is_err());
    }
}
