use gzlines::{DecodingReader, LineRead, LineReader, TextEncoding, ThreadedLineReader};
use proptest::prelude::*;
use std::io::Cursor;

fn buffered(text: &str, capacity: usize) -> LineReader<DecodingReader<Cursor<Vec<u8>>>> {
    let source = DecodingReader::new(Cursor::new(text.as_bytes().to_vec()), TextEncoding::utf8());
    LineReader::with_capacity(source, capacity).unwrap()
}

fn read_all<L: LineRead>(reader: &mut L) -> Vec<String> {
    reader.lines().map(|l| l.unwrap()).collect()
}

/// Text built from a small alphabet so terminators show up often.
fn line_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof!["a", "b", "é", "\r", "\n", "\r\n", " "], 0..200)
        .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn line_count_matches_newlines(text in line_text(), capacity in 1usize..32) {
        let mut reader = buffered(&text, capacity);
        let lines = read_all(&mut reader);
        let newlines = text.matches('\n').count() as u64;
        let trailing = if text.is_empty() || text.ends_with('\n') { 0 } else { 1 };
        prop_assert_eq!(reader.line_number(), newlines + trailing);
        prop_assert_eq!(lines.len() as u64, reader.line_number());
    }

    #[test]
    fn lines_match_reference_split(text in line_text(), capacity in 1usize..32) {
        let mut reader = buffered(&text, capacity);
        let lines = read_all(&mut reader);

        let mut expected: Vec<String> = text
            .split('\n')
            .map(|l| l.to_string())
            .collect();
        // `split` yields a trailing empty piece after a final '\n' (or for empty input).
        if expected.last().map_or(false, |l| l.is_empty()) {
            expected.pop();
        }
        let pieces = expected.len();
        for (i, line) in expected.iter_mut().enumerate() {
            let terminated = i + 1 < pieces || text.ends_with('\n');
            if terminated && line.ends_with('\r') {
                line.pop();
            }
        }
        prop_assert_eq!(lines, expected);
    }

    #[test]
    fn crlf_and_lf_yield_same_lines(
        lines in prop::collection::vec("[a-z\r ]{0,12}", 0..20),
        capacity in 1usize..16,
    ) {
        // Skip lines ending in '\r', where "\r" + "\n" would itself be a CRLF.
        let lines: Vec<String> = lines.into_iter().filter(|l| !l.ends_with('\r')).collect();
        let lf: String = lines.iter().map(|l| format!("{}\n", l)).collect();
        let crlf: String = lines.iter().map(|l| format!("{}\r\n", l)).collect();
        let from_lf = read_all(&mut buffered(&lf, capacity));
        let from_crlf = read_all(&mut buffered(&crlf, capacity));
        prop_assert_eq!(&from_lf, &lines);
        prop_assert_eq!(from_lf, from_crlf);
    }

    #[test]
    fn threaded_matches_buffered(
        text in line_text(),
        capacity in 1usize..32,
        queue_capacity in 1usize..8,
    ) {
        let direct = read_all(&mut buffered(&text, capacity));
        let mut threaded =
            ThreadedLineReader::spawn(buffered(&text, capacity), queue_capacity).unwrap();
        let relayed = read_all(&mut threaded);
        prop_assert_eq!(threaded.line_number(), relayed.len() as u64);
        prop_assert_eq!(relayed, direct);
    }
}
