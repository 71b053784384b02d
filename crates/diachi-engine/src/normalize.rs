//! Phase 1 — preprocessing and text normalization.
//!
//! Turns a free-form Vietnamese address into a lowercase ASCII token
//! stream, expanding punctuated administrative abbreviations ("P.", "Q8",
//! "TP HCM"), context-scoped dictionary abbreviations ("HBT" in Hà Nội),
//! and folding diacritics. Every normalized token remembers which raw
//! whitespace token it came from, so Phase 5 can cut matched spans out of
//! the original string.
//!
//! The procedure is pure and deterministic; [`NormalizeCache`] memoizes it
//! on `(raw, province_hint, district_hint)`.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use unicode_normalization::UnicodeNormalization;

/// Full administrative keywords that establish numeric keyword context.
/// Abbreviated forms ("p", "q") are intentionally not counted.
pub const ADMIN_KEYWORDS: [&str; 8] = [
    "phuong", "xa", "quan", "huyen", "thanh", "thi", "tran", "pho",
];

/// Ho Chi Minh district abbreviations. Frozen: applied only when HCM
/// province context is established (hint, or a trailing `q`-prefixed
/// occurrence).
const HCM_DISTRICT_ABBREVS: [(&str, &str); 5] = [
    ("tb", "tan binh"),
    ("gv", "go vap"),
    ("bt", "binh thanh"),
    ("td", "thu duc"),
    ("pn", "phu nhuan"),
];

/// Leading token sequences stripped from caller-supplied hints
/// ("THANH PHO Ha Noi" → "ha noi"). Longer sequences first.
const HINT_PREFIXES: [&[&str]; 8] = [
    &["thanh", "pho"],
    &["thi", "xa"],
    &["thi", "tran"],
    &["tinh"],
    &["quan"],
    &["huyen"],
    &["phuong"],
    &["xa"],
];

/// A whitespace token of the original input, with byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Phase 1 output: the normalized token stream plus its alignment back to
/// the raw whitespace tokens.
#[derive(Debug, Clone)]
pub struct NormalizedAddress {
    pub raw: String,
    pub raw_tokens: Vec<RawToken>,
    /// Normalized tokens, lowercase ASCII `[a-z0-9]`.
    pub tokens: Vec<String>,
    /// `tokens[i]` came from `raw_tokens[origins[i]]`.
    pub origins: Vec<usize>,
}

impl NormalizedAddress {
    /// The normalized whitespace-joined text.
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// True if the token is one of the full administrative keywords.
pub fn is_admin_keyword(token: &str) -> bool {
    ADMIN_KEYWORDS.contains(&token)
}

/// Remove Vietnamese diacritics: NFD, drop combining marks, map `đ → d`.
/// Input is expected lowercase.
pub fn fold_diacritics(text: &str) -> String {
    text.nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .map(|c| if c == 'đ' { 'd' } else { c })
        .collect()
}

/// Keep `[a-z0-9 ]`; map the separator characters to spaces; drop the rest.
fn scrub(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | ' ' => c,
            ',' | '-' | '_' | '/' => ' ',
            _ => '\u{0}',
        })
        .filter(|c| *c != '\u{0}')
        .collect()
}

/// Insert a space at every ASCII letter↔digit boundary ("nhue1" → "nhue 1",
/// "a1b2" → "a 1 b 2").
fn space_letter_digit(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if let Some(p) = prev {
            let boundary = (p.is_ascii_alphabetic() && c.is_ascii_digit())
                || (p.is_ascii_digit() && c.is_ascii_alphabetic());
            if boundary {
                out.push(' ');
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Split a work token into pieces at separator characters, so that
/// patterns like "q.tb," and "660/8" are seen piece by piece.
fn split_pieces(token: &str) -> Vec<&str> {
    token
        .split([',', '-', '_', '/'])
        .filter(|p| !p.is_empty())
        .collect()
}

fn hcm_expansion(key: &str) -> Option<&'static str> {
    HCM_DISTRICT_ABBREVS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, word)| *word)
}

/// Expand a punctuated administrative abbreviation piece, if it is one.
///
/// Returns `None` when the piece is not a recognized pattern; the caller
/// then continues with dictionary expansion and plain folding.
fn expand_admin_patterns(piece: &str, quan_context: bool, hcm_context: bool) -> Option<String> {
    let folded = fold_diacritics(piece);
    let p = folded.as_str();

    match p {
        "p." => return Some("phuong".to_string()),
        "q." => return Some("quan".to_string()),
        "tp." | "tp" => return Some("thanh pho".to_string()),
        "tt." => return Some("thi tran".to_string()),
        _ => {}
    }

    // p<digits> / p.<digits> / q<digits> / q.<digits>
    for (prefix, word) in [("p", "phuong"), ("q", "quan")] {
        if let Some(rest) = p.strip_prefix(prefix) {
            let rest = rest.strip_prefix('.').unwrap_or(rest);
            if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                return Some(format!("{word} {rest}"));
            }
        }
    }

    // f<digits> → phuong, but only when a quan occurs elsewhere in the
    // string; a lone "f4" is more likely a building block.
    if quan_context {
        if let Some(rest) = p.strip_prefix('f') {
            if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                return Some(format!("phuong {rest}"));
            }
        }
    }

    if hcm_context {
        if let Some(word) = hcm_expansion(p) {
            return Some(word.to_string());
        }
        if let Some(rest) = p.strip_prefix('q') {
            let rest = rest.strip_prefix('.').unwrap_or(rest);
            if let Some(word) = hcm_expansion(rest) {
                return Some(format!("quan {word}"));
            }
        }
    }

    None
}

fn is_quan_piece(p: &str) -> bool {
    if p == "quan" {
        return true;
    }
    if let Some(rest) = p.strip_prefix('q') {
        let rest = rest.strip_prefix('.').unwrap_or(rest);
        return !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit());
    }
    false
}

/// Whether the HCM district dictionary applies: province hint is HCM, or
/// the string ends with a dictionary token preceded by `q` / `q.`.
fn detect_hcm_context(pieces: &[String], province_hint: Option<&str>) -> bool {
    if province_hint == Some("ho chi minh") {
        return true;
    }
    let Some(last) = pieces.last() else {
        return false;
    };
    if let Some(rest) = last.strip_prefix('q') {
        let rest = rest.strip_prefix('.').unwrap_or(rest);
        if hcm_expansion(rest).is_some() {
            return true;
        }
    }
    if hcm_expansion(last).is_some() && pieces.len() >= 2 {
        let prev = &pieces[pieces.len() - 2];
        if prev == "q" || prev == "q." {
            return true;
        }
    }
    false
}

/// Normalize an address, producing the aligned token stream.
///
/// `abbreviations` is the scope-merged dictionary for the request's hints
/// (see the reference store); `province_hint` must already be normalized.
pub fn normalize_with_alignment(
    raw: &str,
    abbreviations: &HashMap<String, String>,
    province_hint: Option<&str>,
) -> NormalizedAddress {
    let raw_tokens: Vec<RawToken> = raw
        .split_whitespace()
        .map(|t| {
            // Offsets recovered from pointer arithmetic on the subslice.
            let start = t.as_ptr() as usize - raw.as_ptr() as usize;
            RawToken {
                text: t.to_string(),
                start,
                end: start + t.len(),
            }
        })
        .collect();

    // Unicode NFC + lowercase; whitespace structure is unaffected, so the
    // work tokens align one-to-one with the raw tokens.
    let nfc_lower = raw.nfc().collect::<String>().to_lowercase();
    let work_tokens: Vec<&str> = nfc_lower.split_whitespace().collect();

    // Context flags are computed over the folded pieces of the whole string
    // before any expansion.
    let all_pieces: Vec<String> = work_tokens
        .iter()
        .flat_map(|t| split_pieces(t))
        .map(fold_diacritics)
        .collect();
    let quan_context = all_pieces.iter().any(|p| is_quan_piece(p));
    let hcm_context = detect_hcm_context(&all_pieces, province_hint);

    let mut tokens = Vec::new();
    let mut origins = Vec::new();

    for (index, work) in work_tokens.iter().enumerate() {
        for piece in split_pieces(work) {
            if let Some(expanded) = expand_admin_patterns(piece, quan_context, hcm_context) {
                for word in expanded.split_whitespace() {
                    tokens.push(word.to_string());
                    origins.push(index);
                }
                continue;
            }

            // Dictionary expansion. The key is the folded, scrubbed piece;
            // expansion output is final and not re-eligible.
            let key: String = scrub(&fold_diacritics(piece))
                .chars()
                .filter(|c| *c != ' ')
                .collect();
            if !key.is_empty() {
                if let Some(word) = abbreviations.get(&key) {
                    for w in word.split_whitespace() {
                        tokens.push(w.to_string());
                        origins.push(index);
                    }
                    continue;
                }
            }

            let cleaned = space_letter_digit(&scrub(&fold_diacritics(piece)));
            for w in cleaned.split_whitespace() {
                tokens.push(w.to_string());
                origins.push(index);
            }
        }
    }

    NormalizedAddress {
        raw: raw.to_string(),
        raw_tokens,
        tokens,
        origins,
    }
}

/// Normalize a caller-supplied geographic hint: full normalization without
/// dictionary expansion, then strip one leading administrative prefix
/// ("Quận Ba Đình" → "ba dinh").
pub fn normalize_hint(text: &str) -> String {
    let empty = HashMap::new();
    let normalized = normalize_with_alignment(text, &empty, None);
    let tokens = normalized.tokens;

    for prefix in HINT_PREFIXES {
        if tokens.len() > prefix.len()
            && tokens[..prefix.len()]
                .iter()
                .map(String::as_str)
                .eq(prefix.iter().copied())
        {
            return tokens[prefix.len()..].join(" ");
        }
    }
    tokens.join(" ")
}

/// LRU cache for normalization results, keyed on the raw string and the
/// normalized hints (the hints select the abbreviation scope).
pub struct NormalizeCache {
    inner: Mutex<LruCache<(String, Option<String>, Option<String>), Arc<NormalizedAddress>>>,
}

impl NormalizeCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("non-zero capacity");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Fetch a cached normalization or compute and insert it.
    pub fn get_or_compute(
        &self,
        raw: &str,
        province_hint: Option<&str>,
        district_hint: Option<&str>,
        abbreviations: &HashMap<String, String>,
    ) -> Arc<NormalizedAddress> {
        let key = (
            raw.to_string(),
            province_hint.map(str::to_string),
            district_hint.map(str::to_string),
        );
        if let Some(hit) = self.inner.lock().get(&key) {
            return Arc::clone(hit);
        }
        let computed = Arc::new(normalize_with_alignment(raw, abbreviations, province_hint));
        self.inner.lock().put(key, Arc::clone(&computed));
        computed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(raw: &str) -> String {
        normalize_with_alignment(raw, &HashMap::new(), None).text()
    }

    fn normalize_hcm(raw: &str) -> String {
        normalize_with_alignment(raw, &HashMap::new(), Some("ho chi minh")).text()
    }

    #[test]
    fn folds_vietnamese_diacritics() {
        assert_eq!(fold_diacritics("điện biên phủ"), "dien bien phu");
        assert_eq!(fold_diacritics("hà nội"), "ha noi");
        assert_eq!(fold_diacritics("đường"), "duong");
    }

    #[test]
    fn expands_punctuated_abbreviations() {
        assert_eq!(
            normalize("P. Điện Biên, Q. Ba Đình, HN"),
            "phuong dien bien quan ba dinh hn"
        );
    }

    #[test]
    fn expands_attached_digit_forms() {
        assert_eq!(normalize("P4 Q8"), "phuong 4 quan 8");
        assert_eq!(normalize("p.15 q.10"), "phuong 15 quan 10");
    }

    #[test]
    fn tp_expands_with_and_without_dot() {
        assert_eq!(normalize("TP. HCM"), "thanh pho hcm");
        assert_eq!(normalize("TP Ha Noi"), "thanh pho ha noi");
        assert_eq!(normalize("TT. Van Dien"), "thi tran van dien");
    }

    #[test]
    fn f_digit_requires_quan_context() {
        // A quan elsewhere in the string enables the f-form.
        assert_eq!(normalize("F5 Q3"), "phuong 5 quan 3");
        // Without it, the token stays as written.
        assert_eq!(normalize("F5 Le Loi"), "f 5 le loi");
    }

    #[test]
    fn hcm_dictionary_gated_on_context() {
        // Trailing q-prefixed dictionary token establishes context.
        assert_eq!(normalize("123 le loi q.tb"), "123 le loi quan tan binh");
        // Province hint establishes context for the bare token.
        assert_eq!(normalize_hcm("Q. TB"), "quan tan binh");
        // No context: "tb" is left alone.
        assert_eq!(normalize("ngo tb ha noi"), "ngo tb ha noi");
    }

    #[test]
    fn separators_become_spaces() {
        assert_eq!(normalize("660/8 Pham The Hien"), "660 8 pham the hien");
        assert_eq!(normalize("to 5 - khu 2"), "to 5 khu 2");
    }

    #[test]
    fn letter_digit_boundary_spaced() {
        assert_eq!(normalize("co nhue1"), "co nhue 1");
        assert_eq!(normalize("a1b2"), "a 1 b 2");
    }

    #[test]
    fn strips_remaining_punctuation() {
        assert_eq!(normalize("so 1 (ngach 2)"), "so 1 ngach 2");
    }

    #[test]
    fn dictionary_expansion_uses_scope_map() {
        let mut abbrevs = HashMap::new();
        abbrevs.insert("hbt".to_string(), "hai ba trung".to_string());
        abbrevs.insert("hn".to_string(), "ha noi".to_string());
        let out = normalize_with_alignment("HBT, HN", &abbrevs, None);
        assert_eq!(out.text(), "hai ba trung ha noi");
        // Alignment: all of "hai ba trung" came from raw token 0.
        assert_eq!(out.origins, vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn expansion_output_not_re_eligible() {
        // "bd" expands to a word that itself looks like a key; the output
        // must not be expanded again.
        let mut abbrevs = HashMap::new();
        abbrevs.insert("bd".to_string(), "bt".to_string());
        abbrevs.insert("bt".to_string(), "binh thanh".to_string());
        let out = normalize_with_alignment("bd", &abbrevs, None);
        assert_eq!(out.text(), "bt");
    }

    #[test]
    fn normalization_is_idempotent() {
        let cases = [
            "P. Điện Biên, Q. Ba Đình, HN",
            "660/8 PHAM THE HIEN P4 Q8",
            "14 LO 3A TRUNG YEN 6 KDT TRUNG YEN PHUONG TRUNG HOA CAU GIAY",
            "co nhue1",
        ];
        let empty = HashMap::new();
        for case in cases {
            let once = normalize_with_alignment(case, &empty, None).text();
            let twice = normalize_with_alignment(&once, &empty, None).text();
            assert_eq!(once, twice, "not idempotent for {case:?}");
        }
    }

    #[test]
    fn alignment_tracks_raw_tokens() {
        let out = normalize_with_alignment("660/8 P4", &HashMap::new(), None);
        assert_eq!(out.tokens, vec!["660", "8", "phuong", "4"]);
        assert_eq!(out.origins, vec![0, 0, 1, 1]);
        assert_eq!(out.raw_tokens.len(), 2);
        assert_eq!(out.raw_tokens[0].text, "660/8");
    }

    #[test]
    fn hint_normalization_strips_prefixes() {
        assert_eq!(normalize_hint("THANH PHO Ha Noi"), "ha noi");
        assert_eq!(normalize_hint("Quận Ba Đình"), "ba dinh");
        assert_eq!(normalize_hint("Phuong Dien Bien"), "dien bien");
        assert_eq!(normalize_hint("Quận 8"), "8");
        assert_eq!(normalize_hint("Ho Chi Minh"), "ho chi minh");
        // A bare prefix word is a name, not a prefix.
        assert_eq!(normalize_hint("Xa"), "xa");
    }

    #[test]
    fn empty_and_whitespace_inputs() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        let out = normalize_with_alignment("  ", &HashMap::new(), None);
        assert!(out.is_empty());
        assert!(out.raw_tokens.is_empty());
    }

    #[test]
    fn cache_returns_same_result() {
        let cache = NormalizeCache::new(16);
        let empty = HashMap::new();
        let a = cache.get_or_compute("P4 Q8", None, None, &empty);
        let b = cache.get_or_compute("P4 Q8", None, None, &empty);
        assert_eq!(a.text(), b.text());
        assert_eq!(cache.len(), 1);
        // A different hint is a different cache entry.
        cache.get_or_compute("P4 Q8", Some("ho chi minh"), None, &empty);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn admin_keywords_recognized() {
        assert!(is_admin_keyword("phuong"));
        assert!(is_admin_keyword("quan"));
        assert!(!is_admin_keyword("p"));
        assert!(!is_admin_keyword("ngo"));
    }
}
