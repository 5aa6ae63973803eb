//! Fixed-width deck hash codec.
//!
//! A deck hash is a header token (the hero) followed by component tokens of a
//! fixed width. Token contents are opaque: only the simulator knows what they
//! mean, so nothing here validates them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token widths used to slice a deck hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckLayout {
    pub header_width: usize,
    pub token_width: usize,
}

impl Default for DeckLayout {
    fn default() -> Self {
        Self {
            header_width: 5,
            token_width: 5,
        }
    }
}

/// A single component (card) or header (hero) token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// A component token together with the byte offset it was sliced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub offset: usize,
    pub token: Token,
}

/// An encoded deck. Immutable: every mutation returns a new `Deck`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deck(String);

impl Deck {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Header (hero) token, if the hash is at least one header wide.
    #[must_use]
    pub fn header(&self, layout: DeckLayout) -> Option<Token> {
        self.0.get(..layout.header_width).map(Token::new)
    }

    /// Component tokens sliced at `header_width + k * token_width`.
    ///
    /// A trailing partial token is not a component; see [`Deck::remainder`].
    #[must_use]
    pub fn components(&self, layout: DeckLayout) -> Vec<Token> {
        self.slots(layout).into_iter().map(|slot| slot.token).collect()
    }

    /// Same slicing as [`Deck::components`], keeping each token's offset.
    #[must_use]
    pub fn slots(&self, layout: DeckLayout) -> Vec<Slot> {
        let mut slots = Vec::new();
        if layout.token_width == 0 {
            return slots;
        }
        let mut offset = layout.header_width;
        while let Some(raw) = self.0.get(offset..offset + layout.token_width) {
            slots.push(Slot {
                offset,
                token: Token::new(raw),
            });
            offset += layout.token_width;
        }
        slots
    }

    /// Bytes left over after the last full component token.
    #[must_use]
    pub fn remainder(&self, layout: DeckLayout) -> &str {
        let consumed = self
            .slots(layout)
            .last()
            .map_or(layout.header_width, |slot| slot.offset + slot.token.len());
        self.0.get(consumed..).unwrap_or_default()
    }

    /// Remove the first occurrence of `token` as a plain substring.
    ///
    /// No alignment check: callers must pass tokens obtained from
    /// [`Deck::components`]. Prefer [`Deck::remove_slot`].
    #[must_use]
    pub fn remove(&self, token: &Token) -> Self {
        if token.is_empty() {
            return self.clone();
        }
        Self(self.0.replacen(token.as_str(), "", 1))
    }

    /// Remove the component at `slot.offset`. Leaves the deck untouched when
    /// the slot does not line up with this deck.
    #[must_use]
    pub fn remove_slot(&self, slot: &Slot) -> Self {
        let end = slot.offset + slot.token.len();
        match self.0.get(slot.offset..end) {
            Some(found) if found == slot.token.as_str() => {
                let mut raw = String::with_capacity(self.0.len() - slot.token.len());
                raw.push_str(&self.0[..slot.offset]);
                raw.push_str(&self.0[end..]);
                Self(raw)
            }
            _ => self.clone(),
        }
    }

    /// Swap the header token, keeping every component.
    #[must_use]
    pub fn replace_header(&self, header: &Token, layout: DeckLayout) -> Self {
        let rest = self.0.get(layout.header_width..).unwrap_or_default();
        Self(format!("{header}{rest}"))
    }

    #[must_use]
    pub fn append_token(&self, token: &Token) -> Self {
        Self(format!("{}{token}", self.0))
    }
}

impl fmt::Display for Deck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Deck {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Deck {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: DeckLayout = DeckLayout {
        header_width: 5,
        token_width: 5,
    };

    #[test]
    fn slices_components_after_header() {
        let deck = Deck::from("AAAAABBBBBCCCCC");
        assert_eq!(deck.header(LAYOUT), Some(Token::from("AAAAA")));
        assert_eq!(
            deck.components(LAYOUT),
            vec![Token::from("BBBBB"), Token::from("CCCCC")]
        );
    }

    #[test]
    fn slots_reconstruct_the_original_hash() {
        let deck = Deck::from("HEROXcard1card2card1zzzzz");
        let mut rebuilt = deck.header(LAYOUT).unwrap().as_str().to_string();
        for slot in deck.slots(LAYOUT) {
            assert_eq!(slot.offset, rebuilt.len());
            rebuilt.push_str(slot.token.as_str());
        }
        assert_eq!(rebuilt, deck.as_str());
        assert_eq!(deck.remainder(LAYOUT), "");
    }

    #[test]
    fn partial_trailing_token_is_remainder() {
        let deck = Deck::from("AAAAABBBBBCC");
        assert_eq!(deck.components(LAYOUT), vec![Token::from("BBBBB")]);
        assert_eq!(deck.remainder(LAYOUT), "CC");
    }

    #[test]
    fn short_or_empty_hashes_have_no_components() {
        assert!(Deck::from("").components(LAYOUT).is_empty());
        assert!(Deck::from("AAA").components(LAYOUT).is_empty());
        assert_eq!(Deck::from("AAA").header(LAYOUT), None);
    }

    #[test]
    fn non_ascii_input_does_not_panic() {
        let deck = Deck::from("AAAAAé€BBBBBB");
        let _ = deck.components(LAYOUT);
        let _ = deck.remainder(LAYOUT);
    }

    #[test]
    fn remove_drops_only_first_occurrence() {
        let deck = Deck::from("AAAAABBBBBCCCCCBBBBB");
        let token = Token::from("BBBBB");
        let removed = deck.remove(&token);
        assert_eq!(removed.as_str(), "AAAAACCCCCBBBBB");
        assert_eq!(removed.len(), deck.len() - token.len());
    }

    #[test]
    fn remove_slot_matches_substring_removal_for_aligned_tokens() {
        let deck = Deck::from("AAAAABBBBBCCCCCBBBBB");
        for slot in deck.slots(LAYOUT) {
            let by_offset = deck.remove_slot(&slot);
            assert_eq!(by_offset.len(), deck.len() - slot.token.len());
            if slot.offset == 5 || slot.offset == 10 {
                assert_eq!(by_offset, deck.remove(&slot.token));
            }
        }
    }

    #[test]
    fn remove_slot_ignores_misaligned_slot() {
        let deck = Deck::from("AAAAABBBBB");
        let slot = Slot {
            offset: 3,
            token: Token::from("BBBBB"),
        };
        assert_eq!(deck.remove_slot(&slot), deck);
    }

    #[test]
    fn replace_header_keeps_components() {
        let deck = Deck::from("AAAAABBBBBCCCCC");
        let swapped = deck.replace_header(&Token::from("ZZZZZ"), LAYOUT);
        assert_eq!(swapped.as_str(), "ZZZZZBBBBBCCCCC");
        assert_eq!(swapped.components(LAYOUT), deck.components(LAYOUT));
    }

    #[test]
    fn append_token_adds_a_trailing_component() {
        let deck = Deck::from("AAAAABBBBB").append_token(&Token::from("DDDDD"));
        assert_eq!(deck.as_str(), "AAAAABBBBBDDDDD");
        assert_eq!(deck.components(LAYOUT).last(), Some(&Token::from("DDDDD")));
    }
}
