//! Phoneme vocabulary of the KittenTTS model.
//!
//! Symbol order is the model's embedding order: pad, punctuation, ASCII
//! letters, IPA letters.  Characters outside the vocabulary are dropped.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

const PAD: char = '$';
const PUNCTUATION: &str = ";:,.!?¡¿—…\u{201C}«»\u{201D}\" ";
const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const IPA_LETTERS: &str =
    "ɑɐɒæɓʙβɔɕçɗɖðʤəɘɚɛɜɝɞɟʄɡɠɢʛɦɧħɥʜɨɪʝɭɬɫɮʟɱɯɰŋɳɲɴøɵɸθœɶʘɹɺɾɻʀʁɽʂʃʈʧʉʊʋⱱʌɣɤʍχʎʏʑʐʒʔʡʕʢǀǁǂǃˈˌːˑʼʴʰʱʲʷˠˤ˞↓↑→↗↘\u{2019}\u{0329}\u{2018}ᵻ";

static SYMBOLS: Lazy<HashMap<char, i64>> = Lazy::new(|| {
    std::iter::once(PAD)
        .chain(PUNCTUATION.chars())
        .chain(LETTERS.chars())
        .chain(IPA_LETTERS.chars())
        .enumerate()
        .map(|(i, c)| (c, i as i64))
        .collect()
});

/// Words and single punctuation marks.
static RE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+|[^\w\s]").unwrap());

pub fn symbol_id(c: char) -> Option<i64> {
    SYMBOLS.get(&c).copied()
}

/// Re-space an IPA string so every punctuation mark stands alone.
pub fn spaced_tokens(ipa: &str) -> String {
    RE_TOKEN.find_iter(ipa).map(|m| m.as_str()).collect::<Vec<_>>().join(" ")
}

/// IPA → model input ids, wrapped in pad tokens.
pub fn phonemes_to_ids(ipa: &str) -> Vec<i64> {
    let spaced = spaced_tokens(ipa);
    let mut ids = Vec::with_capacity(spaced.len() + 2);
    ids.push(0);
    ids.extend(spaced.chars().filter_map(symbol_id));
    ids.push(0);
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_is_zero() {
        assert_eq!(symbol_id('$'), Some(0));
        assert_eq!(symbol_id(';'), Some(1));
    }

    #[test]
    fn test_ids_unique() {
        let mut ids: Vec<i64> = SYMBOLS.values().copied().collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), SYMBOLS.len());
    }

    #[test]
    fn test_unknown_dropped() {
        assert_eq!(symbol_id('中'), None);
        assert_eq!(phonemes_to_ids("中"), vec![0, 0]);
    }

    #[test]
    fn test_spaced_tokens() {
        assert_eq!(spaced_tokens("hɛloʊ, wɜːld!"), "hɛloʊ , wɜːld !");
    }

    #[test]
    fn test_ids_wrapped_in_pads() {
        let ids = phonemes_to_ids("hɛloʊ");
        assert_eq!(ids.first(), Some(&0));
        assert_eq!(ids.last(), Some(&0));
        assert_eq!(ids.len(), 7);
    }
}
