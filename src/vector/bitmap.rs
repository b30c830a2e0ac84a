//! Mirrored 5x5 identicons traced into a single SVG path.
//!
//! The bitmap is read from the first fifteen digit pairs of an MD5 hex
//! digest. Pair `i` fills row `i / 3`; its column group depends on `i % 3`:
//!
//! ```text
//! i % 3 == 0  ->  columns 0 and 4
//! i % 3 == 1  ->  columns 1 and 3
//! i % 3 == 2  ->  column 2
//! ```
//!
//! so every row is mirrored around the center column. A cell is set when the
//! first digit of its pair rounds to one tenth or more (digit >= 5).

use crate::error::{AvatarError, AvatarResult};
use std::fmt::Write as _;

/// Side length of the identicon grid.
pub const GRID: usize = 5;

/// A row-major identicon grid.
pub type Bitmap = [[bool; GRID]; GRID];

const COLUMN_GROUPS: [&[usize]; 3] = [&[0, 4], &[1, 3], &[2]];

/// The MD5 hex digest of `seed`, which drives the bitmap.
pub fn identity_hash(seed: &str) -> String {
    format!("{:x}", md5::compute(seed.as_bytes()))
}

/// Derives the bitmap from a hex hash of at least 30 digits.
pub fn bitmap_from_hash(hash: &str) -> AvatarResult<Bitmap> {
    let needed = GRID * COLUMN_GROUPS.len() * 2;
    let digits = hash.as_bytes();
    if digits.len() < needed {
        return Err(AvatarError::invalid_seed(
            hash,
            format!("need at least {needed} hex digits"),
        ));
    }

    let mut bitmap = [[false; GRID]; GRID];
    for i in 0..GRID * COLUMN_GROUPS.len() {
        let digit = char::from(digits[i * 2])
            .to_digit(16)
            .ok_or_else(|| AvatarError::invalid_seed(hash, "not hexadecimal"))?;
        let on = digit >= 5;
        for &column in COLUMN_GROUPS[i % 3] {
            bitmap[i / 3][column] = on;
        }
    }
    Ok(bitmap)
}

/// Traces set cells into one path of unit squares, in row-major order.
pub fn trace_path<R: AsRef<[bool]>>(rows: &[R]) -> String {
    let mut path = String::new();
    for (y, row) in rows.iter().enumerate() {
        for (x, &on) in row.as_ref().iter().enumerate() {
            if on {
                let _ = write!(path, "M{x},{y}h1v1h-1v-1");
            }
        }
    }
    path
}

/// Wraps a traced path in an SVG document with a solid background.
pub fn to_svg(path: &str, color: &str, background: &str) -> String {
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {grid} {grid}" shape-rendering="crispEdges">"#,
            r#"<rect width="{grid}" height="{grid}" fill="{background}"/>"#,
            r#"<path fill="{color}" d="{path}"/>"#,
            "</svg>"
        ),
        grid = GRID,
        background = background,
        color = color,
        path = path,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: bool = true;
    const F: bool = false;

    const VECTOR_BITMAP: Bitmap = [
        [T, F, T, F, T],
        [F, F, T, F, F],
        [T, T, F, T, T],
        [T, T, T, T, T],
        [T, T, T, T, T],
    ];

    #[test]
    fn bitmap_from_known_hash() {
        let bitmap = bitmap_from_hash("9737e3144aeeef544da072c45cbaf536").unwrap();
        assert_eq!(bitmap, VECTOR_BITMAP);
    }

    #[test]
    fn trace_known_bitmap() {
        assert_eq!(
            trace_path(&VECTOR_BITMAP),
            "M0,0h1v1h-1v-1M2,0h1v1h-1v-1M4,0h1v1h-1v-1M2,1h1v1h-1v-1M0,2h1v1h-1v-1M1,2h1v1h-1v-1M3,2h1v1h-1v-1M4,2h1v1h-1v-1M0,3h1v1h-1v-1M1,3h1v1h-1v-1M2,3h1v1h-1v-1M3,3h1v1h-1v-1M4,3h1v1h-1v-1M0,4h1v1h-1v-1M1,4h1v1h-1v-1M2,4h1v1h-1v-1M3,4h1v1h-1v-1M4,4h1v1h-1v-1"
        );
    }

    #[test]
    fn rows_are_mirrored() {
        let bitmap = bitmap_from_hash(&identity_hash("someone@example.org")).unwrap();
        for row in bitmap {
            assert_eq!(row[0], row[4]);
            assert_eq!(row[1], row[3]);
        }
    }

    #[test]
    fn empty_bitmap_traces_to_empty_path() {
        assert_eq!(trace_path(&[[false; GRID]; GRID]), "");
    }

    #[test]
    fn short_or_invalid_hash_is_rejected() {
        assert!(bitmap_from_hash("abc").is_err());
        assert!(bitmap_from_hash("zz37e3144aeeef544da072c45cbaf536").is_err());
    }

    #[test]
    fn identity_hash_is_md5() {
        assert_eq!(identity_hash(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn svg_embeds_path_and_colors() {
        let svg = to_svg("M0,0h1v1h-1v-1", "#ff0000", "#eeeeee");
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r##"fill="#eeeeee""##));
        assert!(svg.contains(r##"<path fill="#ff0000" d="M0,0h1v1h-1v-1"/>"##));
    }
}
