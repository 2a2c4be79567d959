//! Connected component labeling

use ndarray::Array2;
use swathflow_core::Connectivity;

/// Result of a labeling pass.
///
/// `labels` holds 0 for background cells and `1..=count` for components;
/// `sizes[k - 1]` is the cell count of component `k`.
#[derive(Debug, Clone)]
pub struct Components {
    pub labels: Array2<u32>,
    pub sizes: Vec<usize>,
}

impl Components {
    /// Number of components found
    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// Cell count of component `label`, 0 for background or unknown labels
    pub fn size_of(&self, label: u32) -> usize {
        match label {
            0 => 0,
            k => self.sizes.get(k as usize - 1).copied().unwrap_or(0),
        }
    }

    /// Mask of the cells whose component has at least `min_size` cells
    pub fn mask_at_least(&self, min_size: usize) -> Array2<bool> {
        self.labels
            .mapv(|label| label != 0 && self.size_of(label) >= min_size)
    }
}

/// Label the true cells of `mask` into connected components.
///
/// Components are numbered in row-major order of their first cell.
pub fn label_components(mask: &Array2<bool>, connectivity: Connectivity) -> Components {
    let (rows, cols) = mask.dim();
    let mut labels = Array2::<u32>::zeros((rows, cols));
    let mut sizes = Vec::new();
    let mut stack = Vec::new();

    for ((row, col), &set) in mask.indexed_iter() {
        if !set || labels[(row, col)] != 0 {
            continue;
        }

        let label = sizes.len() as u32 + 1;
        let mut size = 0usize;
        labels[(row, col)] = label;
        stack.push((row, col));

        while let Some((cr, cc)) = stack.pop() {
            size += 1;
            for (nr, nc) in connectivity.neighbors(cr, cc, rows, cols) {
                if mask[(nr, nc)] && labels[(nr, nc)] == 0 {
                    labels[(nr, nc)] = label;
                    stack.push((nr, nc));
                }
            }
        }

        sizes.push(size);
    }

    Components { labels, sizes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&str]) -> Array2<bool> {
        let h = rows.len();
        let w = rows[0].len();
        Array2::from_shape_fn((h, w), |(r, c)| rows[r].as_bytes()[c] == b'#')
    }

    #[test]
    fn test_diagonal_touch_depends_on_connectivity() {
        let mask = grid(&[
            "#..",
            ".#.",
            "..#",
        ]);

        let eight = label_components(&mask, Connectivity::Eight);
        assert_eq!(eight.count(), 1);
        assert_eq!(eight.sizes, vec![3]);

        let four = label_components(&mask, Connectivity::Four);
        assert_eq!(four.count(), 3);
        assert_eq!(four.sizes, vec![1, 1, 1]);
    }

    #[test]
    fn test_labels_and_sizes() {
        let mask = grid(&[
            "##..#",
            "#...#",
            "....#",
            "##...",
        ]);
        let comps = label_components(&mask, Connectivity::Four);
        assert_eq!(comps.sizes, vec![3, 3, 2]);
        assert_eq!(comps.labels[(0, 0)], 1);
        assert_eq!(comps.labels[(2, 4)], 2);
        assert_eq!(comps.labels[(3, 1)], 3);
        assert_eq!(comps.labels[(1, 2)], 0);

        let big = comps.mask_at_least(3);
        assert!(big[(1, 0)]);
        assert!(big[(0, 4)]);
        assert!(!big[(3, 0)], "two-cell component is below the threshold");
    }

    #[test]
    fn test_empty_mask() {
        let comps = label_components(&Array2::from_elem((3, 3), false), Connectivity::Eight);
        assert_eq!(comps.count(), 0);
        assert!(comps.mask_at_least(0).iter().all(|&m| !m));
    }
}
