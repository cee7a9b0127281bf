//! Position mapping between the reader's internal locations and the wire.
//!
//! Fixed-layout documents (PDF, CBZ) are addressed by page: the wire form is
//! the 1-based page number as a string. Reflowable documents are addressed by
//! an EPUB CFI internally and by a KOReader XPointer on the wire. The two
//! notations are told apart by prefix alone (`epubcfi` vs `/body`), which is
//! what third-party readers do too.
//!
//! Translation between CFI and XPointer needs the rendered content, so it is
//! supplied by the caller through [`PointerTranslator`]. A failed translation
//! never blocks a push or a navigation; it degrades to percentage semantics
//! and is reported back so the caller can log it.

use sync_types::RemoteProgress;
use thiserror::Error;

/// Prefix of canonical (internal) pointers.
pub const CFI_PREFIX: &str = "epubcfi";

/// Prefix of interchange pointers.
pub const XPOINTER_PREFIX: &str = "/body";

/// Document formats that paginate instead of reflowing.
pub const FIXED_LAYOUT_FORMATS: &[&str] = &["PDF", "CBZ"];

/// A pointer could not be converted between notations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pointer translation failed: {0}")]
pub struct TranslationError(pub String);

/// Converts between canonical pointers and the interchange notation.
///
/// Implemented by the renderer for the currently displayed content.
pub trait PointerTranslator {
    /// Canonical pointer to interchange pointer.
    fn to_interchange(&self, canonical: &str) -> Result<String, TranslationError>;

    /// Interchange pointer to canonical pointer.
    fn from_interchange(&self, interchange: &str) -> Result<String, TranslationError>;
}

/// Layout model of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Paginated (PDF, CBZ)
    Fixed,
    /// Reflowable (EPUB and friends)
    Reflowable,
}

impl Layout {
    /// Classify a document format name, case-insensitively.
    pub fn from_format(format: &str) -> Self {
        if FIXED_LAYOUT_FORMATS
            .iter()
            .any(|f| f.eq_ignore_ascii_case(format))
        {
            Layout::Fixed
        } else {
            Layout::Reflowable
        }
    }
}

/// The local reading position.
#[derive(Debug, Clone, PartialEq)]
pub enum Position {
    /// Page of a fixed-layout document.
    FixedPage {
        /// 0-based page index
        index: u32,
        /// Page count, 0 when unknown
        total: u32,
    },
    /// Location in a reflowable document.
    Flowing {
        /// Canonical pointer, when the renderer has one
        pointer: Option<String>,
        /// Completion fraction in `[0, 1]`
        percentage: f64,
    },
}

impl Position {
    /// Fixed-layout position.
    pub fn page(index: u32, total: u32) -> Self {
        Position::FixedPage { index, total }
    }

    /// Reflowable position from the renderer's page info.
    ///
    /// The percentage is `(page + 1) / total`, 0 when the total is unknown.
    pub fn flowing(pointer: Option<String>, page: u32, total: u32) -> Self {
        Position::Flowing {
            pointer,
            percentage: fraction(page, total),
        }
    }

    /// Layout model of this position.
    pub fn layout(&self) -> Layout {
        match self {
            Position::FixedPage { .. } => Layout::Fixed,
            Position::Flowing { .. } => Layout::Reflowable,
        }
    }

    /// Completion fraction.
    pub fn percentage(&self) -> f64 {
        match self {
            Position::FixedPage { index, total } => fraction(*index, *total),
            Position::Flowing { percentage, .. } => *percentage,
        }
    }

    /// Canonical pointer, for reflowable positions that have one.
    pub fn pointer(&self) -> Option<&str> {
        match self {
            Position::FixedPage { .. } => None,
            Position::Flowing { pointer, .. } => pointer.as_deref(),
        }
    }

    /// Page count of a fixed-layout position, 0 otherwise.
    pub fn page_total(&self) -> u32 {
        match self {
            Position::FixedPage { total, .. } => *total,
            Position::Flowing { .. } => 0,
        }
    }
}

fn fraction(index: u32, total: u32) -> f64 {
    if total > 0 {
        (f64::from(index) + 1.0) / f64::from(total)
    } else {
        0.0
    }
}

/// Progress in the form the server stores it.
#[derive(Debug, Clone, PartialEq)]
pub struct WireProgress {
    /// Page number or pointer string
    pub progress: String,
    /// Completion fraction
    pub percentage: f64,
}

/// Result of encoding a local position.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    /// What to send
    pub wire: WireProgress,
    /// Set when the pointer could not be translated and was sent as-is
    pub degradation: Option<TranslationError>,
}

/// Encode a local position for the server.
///
/// When the canonical pointer cannot be translated it is sent unchanged;
/// other readers cannot resolve it and fall back to the percentage.
pub fn encode(position: &Position, translator: Option<&dyn PointerTranslator>) -> Encoded {
    match position {
        Position::FixedPage { index, .. } => Encoded {
            wire: WireProgress {
                progress: (u64::from(*index) + 1).to_string(),
                percentage: position.percentage(),
            },
            degradation: None,
        },
        Position::Flowing {
            pointer,
            percentage,
        } => {
            let (progress, degradation) = match (pointer.as_deref(), translator) {
                (Some(canonical), Some(translator)) => {
                    match translator.to_interchange(canonical) {
                        Ok(interchange) => (interchange, None),
                        Err(err) => (canonical.to_string(), Some(err)),
                    }
                }
                (Some(canonical), None) => (canonical.to_string(), None),
                (None, _) => (String::new(), None),
            };
            Encoded {
                wire: WireProgress {
                    progress,
                    percentage: *percentage,
                },
                degradation,
            }
        }
    }
}

/// Where to take the view for a remote record.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteTarget {
    /// 0-based page of a fixed-layout document
    Page(u32),
    /// Canonical pointer
    Pointer(String),
    /// Completion fraction
    Fraction(f64),
    /// Nothing usable
    None,
}

/// Result of decoding a remote record.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Navigation target
    pub target: RemoteTarget,
    /// Set when an interchange pointer failed to translate
    pub degradation: Option<TranslationError>,
}

impl Decoded {
    fn plain(target: RemoteTarget) -> Self {
        Self {
            target,
            degradation: None,
        }
    }
}

/// Decode a remote record into a navigation target.
///
/// Fixed layout goes to `progress - 1` when the page parses and the page total
/// implied by the remote percentage is within one page of `local_total`;
/// otherwise it goes by fraction. Reflowable pointers are translated back to
/// canonical form, falling back to the fraction on failure.
pub fn decode_remote(
    remote: &RemoteProgress,
    layout: Layout,
    local_total: u32,
    translator: Option<&dyn PointerTranslator>,
) -> Decoded {
    let progress = remote.progress.as_deref().unwrap_or("");
    let by_fraction = || match remote.percentage {
        Some(p) => RemoteTarget::Fraction(p),
        None => RemoteTarget::None,
    };

    match layout {
        Layout::Fixed => match parse_page(progress) {
            Some(page) if page >= 1 && totals_agree(page, remote.percentage, local_total) => {
                Decoded::plain(RemoteTarget::Page(page - 1))
            }
            _ => Decoded::plain(by_fraction()),
        },
        Layout::Reflowable => {
            if is_interchange(progress) {
                match translator {
                    Some(translator) => match translator.from_interchange(progress) {
                        Ok(canonical) => Decoded::plain(RemoteTarget::Pointer(canonical)),
                        Err(err) => Decoded {
                            target: by_fraction(),
                            degradation: Some(err),
                        },
                    },
                    None => Decoded {
                        target: by_fraction(),
                        degradation: Some(TranslationError("no rendered content".into())),
                    },
                }
            } else if is_canonical(progress) {
                Decoded::plain(RemoteTarget::Pointer(progress.to_string()))
            } else {
                Decoded::plain(by_fraction())
            }
        }
    }
}

/// Page total implied by a remote page and percentage.
pub fn estimated_total(page: u32, percentage: f64) -> Option<u32> {
    if percentage > 0.0 {
        Some((f64::from(page) / percentage).round() as u32)
    } else {
        None
    }
}

fn totals_agree(page: u32, percentage: Option<f64>, local_total: u32) -> bool {
    match percentage.and_then(|p| estimated_total(page, p)) {
        Some(remote_total) => remote_total.abs_diff(local_total) <= 1,
        None => true,
    }
}

/// Parse the leading decimal digits of a page string (`"6"`, `" 12 "`).
pub fn parse_page(progress: &str) -> Option<u32> {
    let trimmed = progress.trim_start();
    let digits = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .map_or(trimmed, |end| &trimmed[..end]);
    digits.parse().ok()
}

/// Whether a pointer is in canonical notation.
pub fn is_canonical(pointer: &str) -> bool {
    pointer.starts_with(CFI_PREFIX)
}

/// Whether a pointer is in interchange notation.
pub fn is_interchange(pointer: &str) -> bool {
    pointer.starts_with(XPOINTER_PREFIX)
}

/// Collapse a range CFI `epubcfi(P,S,E)` to its start `epubcfi(PS)`.
///
/// Commas inside `[...]` assertions or escaped with `^` are not separators.
/// Anything that is not a three-part range is returned unchanged.
pub fn collapse_to_start(cfi: &str) -> String {
    let Some(inner) = cfi
        .strip_prefix("epubcfi(")
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        return cfi.to_string();
    };

    let mut parts: Vec<&str> = Vec::with_capacity(3);
    let mut depth = 0usize;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '^' => escaped = true,
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);

    match parts.as_slice() {
        [parent, range_start, _end] => format!("epubcfi({}{})", parent, range_start),
        _ => cfi.to_string(),
    }
}

/// Whether the local position and a remote record denote the same place.
///
/// Same when both are canonical pointers that are equal after collapsing to
/// their start, or when the remote carries a percentage within `tolerance`
/// of the local one.
pub fn positions_equal(local: &Position, remote: &RemoteProgress, tolerance: f64) -> bool {
    if let (Some(local_ptr), Some(remote_ptr)) = (local.pointer(), remote.progress.as_deref()) {
        if is_canonical(local_ptr)
            && is_canonical(remote_ptr)
            && collapse_to_start(local_ptr) == collapse_to_start(remote_ptr)
        {
            return true;
        }
    }
    match remote.percentage {
        Some(remote_pct) => (local.percentage() - remote_pct).abs() < tolerance,
        None => false,
    }
}

fn percent(fraction: f64) -> i64 {
    (fraction * 100.0).round() as i64
}

/// Human preview of the local position for a conflict prompt.
pub fn local_preview(position: &Position, section_label: Option<&str>) -> String {
    match position {
        Position::FixedPage { index, total } if *total > 0 => format!(
            "Page {} of {} ({}%)",
            u64::from(*index) + 1,
            total,
            percent(position.percentage())
        ),
        Position::FixedPage { .. } => "Current position".to_string(),
        Position::Flowing { percentage, .. } => {
            let label = section_label
                .filter(|l| !l.is_empty())
                .unwrap_or("Current position");
            format!("{} ({}%)", label, percent(*percentage))
        }
    }
}

/// Human preview of a remote record for a conflict prompt.
pub fn remote_preview(remote: &RemoteProgress, layout: Layout, local_total: u32) -> String {
    let pct = remote.percentage.unwrap_or(0.0);
    if layout == Layout::Fixed {
        let page = remote.progress.as_deref().and_then(parse_page);
        if let Some((page, remote_total)) =
            page.and_then(|p| estimated_total(p, pct).map(|t| (p, t)))
        {
            let qualifier = if remote_total.abs_diff(local_total) <= 1 {
                "Page"
            } else {
                "Approximately page"
            };
            return format!(
                "{} {} of {} ({}%)",
                qualifier,
                page,
                remote_total,
                percent(pct)
            );
        }
    }
    format!("Approximately {}%", percent(pct))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTranslator;

    impl PointerTranslator for FakeTranslator {
        fn to_interchange(&self, canonical: &str) -> Result<String, TranslationError> {
            match canonical {
                "epubcfi(/6/4!/4/2)" => Ok("/body/DocFragment[2]/body/p[1]".into()),
                _ => Err(TranslationError(format!("unknown: {canonical}"))),
            }
        }

        fn from_interchange(&self, interchange: &str) -> Result<String, TranslationError> {
            match interchange {
                "/body/DocFragment[2]/body/p[1]" => Ok("epubcfi(/6/4!/4/2)".into()),
                _ => Err(TranslationError(format!("unknown: {interchange}"))),
            }
        }
    }

    fn remote(progress: &str, percentage: Option<f64>) -> RemoteProgress {
        RemoteProgress {
            document: Some("d".into()),
            progress: Some(progress.into()),
            percentage,
            timestamp: Some(1_700_000_000),
            ..Default::default()
        }
    }

    // ===========================================
    // Layout
    // ===========================================

    #[test]
    fn fixed_formats_are_case_insensitive() {
        assert_eq!(Layout::from_format("PDF"), Layout::Fixed);
        assert_eq!(Layout::from_format("cbz"), Layout::Fixed);
        assert_eq!(Layout::from_format("EPUB"), Layout::Reflowable);
        assert_eq!(Layout::from_format("MOBI"), Layout::Reflowable);
    }

    // ===========================================
    // Encoding
    // ===========================================

    #[test]
    fn fixed_page_encodes_one_based() {
        let encoded = encode(&Position::page(5, 100), None);
        assert_eq!(encoded.wire.progress, "6");
        assert!((encoded.wire.percentage - 0.06).abs() < 1e-12);
        assert!(encoded.degradation.is_none());
    }

    #[test]
    fn fixed_page_without_total_has_zero_percentage() {
        let encoded = encode(&Position::page(3, 0), None);
        assert_eq!(encoded.wire.progress, "4");
        assert_eq!(encoded.wire.percentage, 0.0);
    }

    #[test]
    fn flowing_pointer_is_translated() {
        let position = Position::flowing(Some("epubcfi(/6/4!/4/2)".into()), 9, 100);
        let encoded = encode(&position, Some(&FakeTranslator));
        assert_eq!(encoded.wire.progress, "/body/DocFragment[2]/body/p[1]");
        assert!((encoded.wire.percentage - 0.10).abs() < 1e-12);
    }

    #[test]
    fn failed_translation_keeps_canonical_and_reports() {
        let position = Position::flowing(Some("epubcfi(/6/8!/4/2)".into()), 0, 10);
        let encoded = encode(&position, Some(&FakeTranslator));
        assert_eq!(encoded.wire.progress, "epubcfi(/6/8!/4/2)");
        assert!(encoded.degradation.is_some());
    }

    #[test]
    fn flowing_without_pointer_sends_empty_progress() {
        let position = Position::flowing(None, 4, 10);
        let encoded = encode(&position, Some(&FakeTranslator));
        assert_eq!(encoded.wire.progress, "");
        assert!((encoded.wire.percentage - 0.5).abs() < 1e-12);
    }

    // ===========================================
    // Decoding
    // ===========================================

    #[test]
    fn fixed_page_round_trips() {
        let decoded = decode_remote(&remote("6", Some(0.06)), Layout::Fixed, 100, None);
        assert_eq!(decoded.target, RemoteTarget::Page(5));

        let decoded = decode_remote(&remote("6", None), Layout::Fixed, 100, None);
        assert_eq!(decoded.target, RemoteTarget::Page(5));
    }

    #[test]
    fn fixed_page_with_disagreeing_totals_goes_by_fraction() {
        // 6 / 0.5 = 12 pages remotely vs 100 locally
        let decoded = decode_remote(&remote("6", Some(0.5)), Layout::Fixed, 100, None);
        assert_eq!(decoded.target, RemoteTarget::Fraction(0.5));
    }

    #[test]
    fn fixed_unparseable_page_goes_by_fraction_or_nowhere() {
        let decoded = decode_remote(&remote("abc", Some(0.3)), Layout::Fixed, 100, None);
        assert_eq!(decoded.target, RemoteTarget::Fraction(0.3));

        let decoded = decode_remote(&remote("abc", None), Layout::Fixed, 100, None);
        assert_eq!(decoded.target, RemoteTarget::None);
    }

    #[test]
    fn interchange_pointer_translates_back() {
        let decoded = decode_remote(
            &remote("/body/DocFragment[2]/body/p[1]", Some(0.2)),
            Layout::Reflowable,
            0,
            Some(&FakeTranslator),
        );
        assert_eq!(
            decoded.target,
            RemoteTarget::Pointer("epubcfi(/6/4!/4/2)".into())
        );
    }

    #[test]
    fn untranslatable_interchange_falls_back_to_fraction() {
        let decoded = decode_remote(
            &remote("/body/DocFragment[9]", Some(0.4)),
            Layout::Reflowable,
            0,
            Some(&FakeTranslator),
        );
        assert_eq!(decoded.target, RemoteTarget::Fraction(0.4));
        assert!(decoded.degradation.is_some());
    }

    #[test]
    fn legacy_canonical_pointer_is_used_directly() {
        let decoded = decode_remote(
            &remote("epubcfi(/6/10!/4/2)", Some(0.4)),
            Layout::Reflowable,
            0,
            None,
        );
        assert_eq!(
            decoded.target,
            RemoteTarget::Pointer("epubcfi(/6/10!/4/2)".into())
        );
    }

    #[test]
    fn unknown_notation_goes_by_fraction() {
        let decoded = decode_remote(&remote("42", Some(0.4)), Layout::Reflowable, 0, None);
        assert_eq!(decoded.target, RemoteTarget::Fraction(0.4));
    }

    #[test]
    fn page_parsing_takes_leading_digits() {
        assert_eq!(parse_page("6"), Some(6));
        assert_eq!(parse_page(" 12abc"), Some(12));
        assert_eq!(parse_page("abc"), None);
        assert_eq!(parse_page(""), None);
    }

    // ===========================================
    // Equality
    // ===========================================

    #[test]
    fn range_cfi_collapses_to_start() {
        assert_eq!(
            collapse_to_start("epubcfi(/6/4!/4/10,/1:0,/3:5)"),
            "epubcfi(/6/4!/4/10/1:0)"
        );
        assert_eq!(
            collapse_to_start("epubcfi(/6/4!/4/10/1:0)"),
            "epubcfi(/6/4!/4/10/1:0)"
        );
    }

    #[test]
    fn assertion_and_escaped_commas_are_not_separators() {
        let cfi = "epubcfi(/6/4[a,b]!/4/2)";
        assert_eq!(collapse_to_start(cfi), cfi);

        let cfi = "epubcfi(/6/4[x^,y]!/4,/1:0,/1:9)";
        assert_eq!(collapse_to_start(cfi), "epubcfi(/6/4[x^,y]!/4/1:0)");
    }

    #[test]
    fn non_cfi_is_unchanged() {
        assert_eq!(collapse_to_start("/body/p[1]"), "/body/p[1]");
    }

    #[test]
    fn equal_canonical_pointers_match() {
        let local = Position::Flowing {
            pointer: Some("epubcfi(/6/4!/4/10,/1:0,/3:5)".into()),
            percentage: 0.1,
        };
        let record = remote("epubcfi(/6/4!/4/10/1:0)", Some(0.9));
        assert!(positions_equal(&local, &record, 1e-4));
    }

    #[test]
    fn percentages_within_tolerance_match() {
        let local = Position::Flowing {
            pointer: Some("epubcfi(/6/4!/4/2)".into()),
            percentage: 0.50001,
        };
        assert!(positions_equal(
            &local,
            &remote("/body/p[3]", Some(0.5)),
            1e-4
        ));
        assert!(!positions_equal(
            &local,
            &remote("/body/p[3]", Some(0.6)),
            1e-4
        ));
    }

    #[test]
    fn difference_equal_to_tolerance_is_not_equal() {
        let local = Position::Flowing {
            pointer: None,
            percentage: 0.5,
        };
        assert!(!positions_equal(&local, &remote("x", Some(0.25)), 0.25));
    }

    #[test]
    fn missing_remote_percentage_is_not_equal() {
        let local = Position::page(5, 100);
        assert!(!positions_equal(&local, &remote("6", None), 1e-4));
    }

    // ===========================================
    // Previews
    // ===========================================

    #[test]
    fn fixed_previews() {
        assert_eq!(
            local_preview(&Position::page(5, 100), None),
            "Page 6 of 100 (6%)"
        );
        assert_eq!(
            local_preview(&Position::page(0, 0), None),
            "Current position"
        );
        assert_eq!(
            remote_preview(&remote("50", Some(0.5)), Layout::Fixed, 100),
            "Page 50 of 100 (50%)"
        );
        assert_eq!(
            remote_preview(&remote("50", Some(0.5)), Layout::Fixed, 300),
            "Approximately page 50 of 100 (50%)"
        );
        assert_eq!(
            remote_preview(&remote("50", None), Layout::Fixed, 100),
            "Approximately 0%"
        );
    }

    #[test]
    fn flowing_previews() {
        let local = Position::flowing(Some("epubcfi(/6/4!/4/2)".into()), 9, 100);
        assert_eq!(local_preview(&local, Some("Chapter 3")), "Chapter 3 (10%)");
        assert_eq!(local_preview(&local, None), "Current position (10%)");
        assert_eq!(
            remote_preview(&remote("/body/p[1]", Some(0.5)), Layout::Reflowable, 0),
            "Approximately 50%"
        );
    }
}
