//! Integration tests for the Morse tables: encode/decode round trip and
//! prosign matching.

use keyer_core::morse::{decode, encode, match_prosign, PROSIGNS};

#[test]
fn test_round_trip_letters_digits_punctuation() {
    let charset: Vec<char> = ('A'..='Z').chain('0'..='9').chain(".,?/=-".chars()).collect();

    for &c in &charset {
        let code = encode(c).unwrap_or_else(|| panic!("no encoding for {c}"));
        let pattern = code.pattern_str();
        let back = decode(pattern.as_str());
        assert_eq!(back, Some(c), "round trip failed for {c} via {pattern}");
    }
}

#[test]
fn test_lowercase_round_trip_uppercases() {
    for c in 'a'..='z' {
        let code = encode(c).unwrap();
        let back = decode(code.pattern_str().as_str()).unwrap();
        assert_eq!(back, c.to_ascii_uppercase());
    }
}

#[test]
fn test_known_patterns() {
    assert_eq!(encode('S').unwrap().pattern_str().as_str(), "...");
    assert_eq!(encode('O').unwrap().pattern_str().as_str(), "---");
    assert_eq!(encode('C').unwrap().pattern_str().as_str(), "-.-.");
    assert_eq!(encode('Q').unwrap().pattern_str().as_str(), "--.-");
    assert_eq!(encode('7').unwrap().pattern_str().as_str(), "--...");
    assert_eq!(encode('=').unwrap().pattern_str().as_str(), "-...-");
}

#[test]
fn test_decoder_extras_beyond_encoder() {
    // The decode table covers punctuation the encoder does not emit
    assert_eq!(decode(".----."), Some('\''));
    assert_eq!(decode("-.-.--"), Some('!'));
    assert_eq!(decode(".--.-."), Some('@'));
    assert_eq!(decode("...-..-"), Some('$'));
    assert_eq!(decode("---..."), Some(':'));
}

#[test]
fn test_prosign_surrogates() {
    assert_eq!(decode("...-.-"), Some('*')); // SK
    assert_eq!(decode("-.-.-"), Some('<')); // KA / CT
    assert_eq!(decode("........"), Some('#')); // error signal
}

#[test]
fn test_prosign_table_patterns() {
    let expect = [
        ("<SK>", "...-.-"),
        ("<AR>", ".-.-."),
        ("<BT>", "-...-"),
        ("<KN>", "-.--."),
        ("<AS>", ".-..."),
        ("<SN>", "...-."),
        ("<KA>", "-.-.-"),
    ];

    assert_eq!(PROSIGNS.len(), expect.len());
    for (tag, pattern) in expect {
        let (len, code) = match_prosign(tag).unwrap();
        assert_eq!(len, tag.len());
        assert_eq!(code.pattern_str().as_str(), pattern, "pattern for {tag}");
    }
}

#[test]
fn test_prosign_match_at_text_start_only() {
    assert!(match_prosign("<AR> 73").is_some());
    assert!(match_prosign("73 <AR>").is_none());
    assert!(match_prosign("<ZZ>").is_none());
    assert!(match_prosign("").is_none());
}

#[test]
fn test_space_and_unknown_have_no_encoding() {
    assert!(encode(' ').is_none());
    assert!(encode('\n').is_none());
    assert!(encode('%').is_none());
}
