//! Property tests for separator-priority chunking.

use novel_rag::{Chunker, Document, RecursiveCharacterSplitter};
use proptest::prelude::*;

/// Generate a `(chunk_size, chunk_overlap)` pair with overlap below size.
fn arb_window() -> impl Strategy<Value = (usize, usize)> {
    (1usize..60).prop_flat_map(|size| (Just(size), 0..size))
}

/// **Property: chunk length and overlap**
/// *For any* text and window, every chunk is at most `chunk_size`
/// characters, consecutive chunks share exactly `chunk_overlap` characters,
/// and stripping the overlaps reassembles the original text.
mod prop_chunk_bounds {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_fit_window_and_overlap_exactly(
            text in "[ab \n。，！]{0,300}",
            (size, overlap) in arb_window(),
        ) {
            let splitter = RecursiveCharacterSplitter::new(size, overlap);
            let pieces: Vec<Vec<char>> =
                splitter.split_text(&text).iter().map(|p| p.chars().collect()).collect();

            for piece in &pieces {
                prop_assert!(!piece.is_empty());
                prop_assert!(piece.len() <= size, "chunk of {} chars exceeds {}", piece.len(), size);
            }

            for pair in pieces.windows(2) {
                let tail = &pair[0][pair[0].len() - overlap..];
                prop_assert_eq!(&pair[1][..overlap], tail);
            }

            let mut rebuilt: String = pieces.first().map(|p| p.iter().collect()).unwrap_or_default();
            for piece in pieces.iter().skip(1) {
                rebuilt.extend(&piece[overlap..]);
            }
            prop_assert_eq!(rebuilt, text);
        }

        #[test]
        fn custom_separator_lists_keep_the_same_guarantees(
            text in "[xyz;|]{0,200}",
            (size, overlap) in arb_window(),
        ) {
            let splitter = RecursiveCharacterSplitter::with_separators(size, overlap, &[";", "|"]);
            let pieces: Vec<Vec<char>> =
                splitter.split_text(&text).iter().map(|p| p.chars().collect()).collect();

            prop_assert!(pieces.iter().all(|p| p.len() <= size));
            for pair in pieces.windows(2) {
                prop_assert_eq!(&pair[1][..overlap], &pair[0][pair[0].len() - overlap..]);
            }
        }
    }
}

#[test]
fn text_without_separators_is_cut_into_overlapping_windows() {
    let text = "a".repeat(2000);
    let splitter = RecursiveCharacterSplitter::new(500, 50);

    let pieces = splitter.split_text(&text);
    assert_eq!(pieces.len(), 5);
    assert!(pieces[..4].iter().all(|p| p.chars().count() == 500));
    assert_eq!(pieces[4].chars().count(), 200);
}

#[test]
fn paragraph_breaks_are_preferred_to_sentence_ends() {
    let text = format!("{}\n\n{}. {}", "a".repeat(30), "b".repeat(10), "c".repeat(30));
    let splitter = RecursiveCharacterSplitter::new(50, 5);

    let pieces = splitter.split_text(&text);
    assert_eq!(pieces[0], format!("{}\n\n", "a".repeat(30)));
}

#[test]
fn short_documents_become_one_chunk() {
    let document = Document::from_source("short.txt", "只有一句话。");
    let chunks = RecursiveCharacterSplitter::new(500, 50).chunk(&document);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "只有一句话。");
    assert_eq!(chunks[0].source(), "short.txt");
}
