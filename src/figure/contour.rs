use ndarray::Array2;

use crate::foundation::core::{BezPath, Point};

/// Outline of a binary mask as axis-aligned segments on pixel edges.
///
/// `mask` is indexed `[row, col]`; pixel `(row, col)` covers `[col, col + 1] x [row, row + 1]`
/// in the returned path's coordinates. Collinear neighbouring edges are merged into one
/// segment, so a filled rectangle yields exactly four segments.
pub fn mask_outline(mask: &Array2<bool>) -> BezPath {
    let (rows, cols) = mask.dim();
    let at = |r: isize, c: isize| -> bool {
        r >= 0
            && c >= 0
            && (r as usize) < rows
            && (c as usize) < cols
            && mask[(r as usize, c as usize)]
    };

    let mut path = BezPath::new();
    let mut seg = |a: (usize, usize), b: (usize, usize)| {
        path.move_to(Point::new(a.0 as f64, a.1 as f64));
        path.line_to(Point::new(b.0 as f64, b.1 as f64));
    };

    // Horizontal edges: top (dr = -1, y = r) and bottom (dr = +1, y = r + 1).
    for (dr, dy) in [(-1isize, 0usize), (1, 1)] {
        for r in 0..rows {
            let mut run: Option<usize> = None;
            for c in 0..=cols {
                let edge = c < cols
                    && at(r as isize, c as isize)
                    && !at(r as isize + dr, c as isize);
                match (edge, run) {
                    (true, None) => run = Some(c),
                    (false, Some(start)) => {
                        seg((start, r + dy), (c, r + dy));
                        run = None;
                    }
                    _ => {}
                }
            }
        }
    }

    // Vertical edges: left (dc = -1, x = c) and right (dc = +1, x = c + 1).
    for (dc, dx) in [(-1isize, 0usize), (1, 1)] {
        for c in 0..cols {
            let mut run: Option<usize> = None;
            for r in 0..=rows {
                let edge = r < rows
                    && at(r as isize, c as isize)
                    && !at(r as isize, c as isize + dc);
                match (edge, run) {
                    (true, None) => run = Some(r),
                    (false, Some(start)) => {
                        seg((c + dx, start), (c + dx, r));
                        run = None;
                    }
                    _ => {}
                }
            }
        }
    }

    path
}

#[cfg(test)]
#[path = "../../tests/unit/figure/contour.rs"]
mod tests;
