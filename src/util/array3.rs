/// Flat-storage 3D array indexed by `[x, y, z]`.
///
/// Backs the per-chunk corner-density cache, where every grid corner starts
/// at a fill value and is written at most once.
#[derive(Debug, Clone)]
pub struct Array3<T> {
    data: Vec<T>,
    size: [usize; 3],
}

impl<T: Clone> Array3<T> {
    /// Create an array of the given dimensions, every element set to `fill`.
    pub fn new(size: [usize; 3], fill: T) -> Self {
        let total = size[0] * size[1] * size[2];
        Self {
            data: vec![fill; total],
            size,
        }
    }

    /// Create a cubic array of side `side`.
    pub fn cubic(side: usize, fill: T) -> Self {
        Self::new([side, side, side], fill)
    }

    /// Reset every element back to `fill` without reallocating.
    pub fn reset(&mut self, fill: T) {
        self.data.fill(fill);
    }
}

impl<T> Array3<T> {
    #[inline]
    fn flat_index(&self, index: [usize; 3]) -> usize {
        debug_assert!(
            index[0] < self.size[0] && index[1] < self.size[1] && index[2] < self.size[2],
            "index {:?} out of bounds for size {:?}",
            index,
            self.size
        );
        index[0] * self.size[1] * self.size[2] + index[1] * self.size[2] + index[2]
    }

    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }
}

impl<T> std::ops::Index<[usize; 3]> for Array3<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: [usize; 3]) -> &T {
        &self.data[self.flat_index(index)]
    }
}

impl<T> std::ops::IndexMut<[usize; 3]> for Array3<T> {
    #[inline]
    fn index_mut(&mut self, index: [usize; 3]) -> &mut T {
        let flat = self.flat_index(index);
        &mut self.data[flat]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexing_round_trip() {
        let mut arr = Array3::new([3, 4, 5], 0i32);
        arr[[2, 3, 4]] = 42;
        arr[[0, 0, 0]] = 7;
        assert_eq!(arr[[2, 3, 4]], 42);
        assert_eq!(arr[[0, 0, 0]], 7);
        assert_eq!(arr.len(), 60);
    }

    #[test]
    fn test_distinct_cells_do_not_alias() {
        let side = 4;
        let mut arr = Array3::cubic(side, 0usize);
        let mut counter = 0;
        for x in 0..side {
            for y in 0..side {
                for z in 0..side {
                    arr[[x, y, z]] = counter;
                    counter += 1;
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        for v in arr.iter() {
            assert!(seen.insert(*v), "value {} stored twice", v);
        }
    }

    #[test]
    fn test_reset() {
        let mut arr = Array3::cubic(2, 1.0f64);
        arr[[1, 1, 1]] = 5.0;
        arr.reset(0.0);
        assert!(arr.iter().all(|v| *v == 0.0));
    }
}
