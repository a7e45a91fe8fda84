//! Manifest digest
//!
//! Salted, block-wise djb2 checksum used to detect hand-edited or corrupted
//! manifests. The result is always 32 lowercase hex characters.
//!
//! Blocks are measured in characters (Unicode scalar values), and each
//! character contributes its scalar value rather than its UTF-8 bytes, so
//! multi-byte text hashes identically regardless of encoding.

/// Characters per salted block
pub const BLOCK_SIZE: usize = 1024;

/// Length of the final digest string
pub const DIGEST_LEN: usize = 32;

const DJB2_SEED: u32 = 5381;

/// djb2 over character codes, rendered as 8 hex digits
fn djb2<I>(chars: I) -> String
where
    I: IntoIterator<Item = char>,
{
    let hash = chars.into_iter().fold(DJB2_SEED, |h, ch| {
        (h << 5).wrapping_add(h).wrapping_add(ch as u32)
    });
    format!("{:08x}", hash)
}

/// Compute the digest of `text` using `salts` cyclically per block.
///
/// # Examples
///
/// ```
/// use iacta_common::digest::digest;
///
/// let salts = vec!["pepper".to_string()];
/// let a = digest("hello", &salts);
/// assert_eq!(a.len(), 32);
/// assert_eq!(a, digest("hello", &salts));
/// assert_ne!(a, digest("hellp", &salts));
/// ```
///
/// `salts` must not be empty; policy validation guarantees this for
/// configured salts, and an empty slice here hashes blocks unsalted.
pub fn digest(text: &str, salts: &[String]) -> String {
    let chars: Vec<char> = text.chars().collect();

    let mut checksum = String::new();
    for (i, block) in chars.chunks(BLOCK_SIZE).enumerate() {
        let salt = if salts.is_empty() {
            ""
        } else {
            salts[i % salts.len()].as_str()
        };
        checksum.push_str(&djb2(salt.chars().chain(block.iter().copied())));
    }

    while checksum.len() < DIGEST_LEN {
        let next = djb2(checksum.chars());
        checksum.push_str(&next);
    }

    // Hex digits are ASCII, so byte slicing lands on char boundaries
    checksum[checksum.len() - DIGEST_LEN..].to_string()
}
