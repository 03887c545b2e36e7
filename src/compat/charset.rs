//! Body charset resolution on top of `encoding_rs`.

use encoding_rs::{Encoding, UTF_8};

/// A text encoding as resolved by `encoding_rs`.
pub type Charset = &'static Encoding;

/// Resolve a `charset=` label as sent in a `Content-Type` header.
pub fn charset_for_label(label: &str) -> Option<Charset> {
    Encoding::for_label(label.trim().trim_matches('"').as_bytes())
}

/// Decode `bytes` as `charset`, letting a byte-order mark override it.
/// Malformed sequences become U+FFFD.
pub fn decode(charset: Charset, bytes: &[u8]) -> String {
    let (text, _, _) = charset.decode(bytes);
    text.into_owned()
}

/// Strategy used to guess the encoding of a body that did not declare one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharsetDetector {
    /// Byte-order marks, then statistical detection with `chardetng`.
    #[cfg(feature = "charset-sniffing")]
    Sniffing,
    /// Byte-order marks, otherwise UTF-8.
    Plain,
}

impl CharsetDetector {
    pub fn detect(self, bytes: &[u8]) -> Charset {
        if let Some((encoding, _)) = Encoding::for_bom(bytes) {
            return encoding;
        }
        match self {
            #[cfg(feature = "charset-sniffing")]
            CharsetDetector::Sniffing => {
                let mut detector = chardetng::EncodingDetector::new();
                detector.feed(bytes, true);
                detector.guess(None, true)
            }
            CharsetDetector::Plain => UTF_8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_16BE, UTF_16LE, WINDOWS_1252};

    const LATIN1_GREETING: &[u8] = b"Gr\xFC\xDFe aus K\xF6ln und D\xFCsseldorf";

    #[test]
    fn byte_order_marks_win_for_every_detector() {
        for detector in [CharsetDetector::Plain, crate::compat::CHARSET_DETECTOR] {
            assert_eq!(detector.detect(b"\xEF\xBB\xBF[]"), UTF_8);
            assert_eq!(detector.detect(b"\xFF\xFE[\x00]\x00"), UTF_16LE);
            assert_eq!(detector.detect(b"\xFE\xFF\x00[\x00]"), UTF_16BE);
        }
    }

    #[cfg(feature = "charset-sniffing")]
    #[test]
    fn sniffing_recognizes_utf8_and_single_byte_text() {
        let detector = CharsetDetector::Sniffing;
        assert_eq!(detector.detect("Grüße aus Köln".as_bytes()), UTF_8);

        let guessed = detector.detect(LATIN1_GREETING);
        assert_eq!(decode(guessed, LATIN1_GREETING), "Grüße aus Köln und Düsseldorf");
    }

    #[test]
    fn plain_detector_assumes_utf8() {
        let charset = CharsetDetector::Plain.detect(LATIN1_GREETING);
        assert_eq!(charset, UTF_8);
        assert!(decode(charset, LATIN1_GREETING).contains('\u{FFFD}'));
    }

    #[test]
    fn decode_strips_byte_order_marks() {
        assert_eq!(decode(UTF_8, b"\xEF\xBB\xBF[1]"), "[1]");
        assert_eq!(decode(UTF_16LE, b"\xFF\xFE[\x001\x00]\x00"), "[1]");
        assert_eq!(decode(UTF_16BE, b"\x00[\x001\x00]"), "[1]");
        assert_eq!(decode(WINDOWS_1252, b"K\xF6ln"), "Köln");
    }

    #[test]
    fn parses_content_type_labels() {
        assert_eq!(charset_for_label("\"UTF-8\""), Some(UTF_8));
        assert_eq!(charset_for_label("latin1"), Some(WINDOWS_1252));
        assert_eq!(charset_for_label("no-such-charset"), None);
    }
}
