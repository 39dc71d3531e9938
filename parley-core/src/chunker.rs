//! Splits newly arrived response text into typing-sized reveal chunks.

use rand::Rng;
use thiserror::Error;

const MAX_WORDS_PER_CHUNK: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    /// The authoritative text does not continue what is already on screen.
    #[error("response diverged from revealed text ({revealed} bytes revealed, {received} bytes received)")]
    Diverged { revealed: usize, received: usize },
}

/// Chunks the part of `authoritative` that follows `shown`, using the thread RNG.
pub fn chunk(shown: &str, authoritative: &str) -> Result<Vec<String>, ChunkError> {
    chunk_with_rng(shown, authoritative, &mut rand::rng())
}

/// Chunks the part of `authoritative` that follows `shown`.
///
/// Each chunk holds 1 to 4 words. All chunks but the last end with the space
/// that separated them from the next word, so the chunks concatenate back to
/// the delta exactly.
pub fn chunk_with_rng<R: Rng + ?Sized>(
    shown: &str,
    authoritative: &str,
    rng: &mut R,
) -> Result<Vec<String>, ChunkError> {
    let delta = authoritative
        .strip_prefix(shown)
        .ok_or(ChunkError::Diverged {
            revealed: shown.len(),
            received: authoritative.len(),
        })?;

    if delta.is_empty() {
        return Ok(Vec::new());
    }

    let words: Vec<&str> = delta.split(' ').collect();
    let mut chunks = Vec::new();
    let mut taken = 0;

    while taken < words.len() {
        let count = rng.random_range(1..=MAX_WORDS_PER_CHUNK).min(words.len() - taken);
        let mut piece = words[taken..taken + count].join(" ");
        taken += count;
        if taken < words.len() {
            piece.push(' ');
        }
        chunks.push(piece);
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assert_reassembles(shown: &str, full: &str, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let chunks = chunk_with_rng(shown, full, &mut rng).unwrap();
        assert_eq!(format!("{}{}", shown, chunks.concat()), full, "seed {}", seed);
    }

    #[test]
    fn test_concatenation_reproduces_delta() {
        let cases = [
            ("", "Hello"),
            ("Hello", "Hello there"),
            ("", "one two three four five six seven eight nine ten"),
            ("The answer", "The answer is  spaced   oddly "),
            ("", " leading space"),
            ("", "trailing space "),
            ("Grüße", "Grüße aus Köln, schöne Grüße"),
        ];
        for seed in 0..50 {
            for (shown, full) in cases {
                assert_reassembles(shown, full, seed);
            }
        }
    }

    #[test]
    fn test_empty_delta_gives_no_chunks() {
        assert!(chunk("same text", "same text").unwrap().is_empty());
        assert!(chunk("", "").unwrap().is_empty());
    }

    #[test]
    fn test_non_empty_delta_gives_chunks() {
        assert!(!chunk("Hello", "Hello!").unwrap().is_empty());
        assert!(!chunk("Hello", "Hello ").unwrap().is_empty());
    }

    #[test]
    fn test_chunks_hold_at_most_four_words() {
        let text = "a b c d e f g h i j k l m n o p q r s t u v w x y z";
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let chunks = chunk_with_rng("", text, &mut rng).unwrap();
            for piece in &chunks {
                let words = piece.trim_end_matches(' ').split(' ').count();
                assert!((1..=MAX_WORDS_PER_CHUNK).contains(&words), "{:?}", piece);
            }
            assert!(!chunks.last().unwrap().ends_with(' '));
        }
    }

    #[test]
    fn test_diverged_text_is_rejected() {
        let err = chunk("Hello there", "Hello").unwrap_err();
        assert_eq!(
            err,
            ChunkError::Diverged {
                revealed: 11,
                received: 5
            }
        );
        assert!(chunk("Hello", "Goodbye").is_err());
    }
}
