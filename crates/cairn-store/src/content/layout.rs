//! Bucket layout for stored content
//!
//! Files are spread over 26×26×26 directories named by lowercase letters,
//! chosen at random, keeping their original file name.

use rand::Rng;

const LETTERS: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Random relative path `x/y/z/<file_name>`
pub fn bucket_path<R: Rng>(rng: &mut R, file_name: &str) -> String {
    let mut letter = || LETTERS[rng.gen_range(0..LETTERS.len())] as char;
    let (a, b, c) = (letter(), letter(), letter());
    format!("{}/{}/{}/{}", a, b, c, sanitize(file_name))
}

/// Keep the last path component, never an empty or dot name
fn sanitize(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        "content".to_string()
    } else {
        base.to_string()
    }
}
