use std::ops::Range;

/// Visits the tiles which partition an N-dimensional index space.
///
/// Each dimension is split into chunks of `block` indices, with a shorter
/// final chunk if the size is not a multiple of `block`. Tiles are yielded
/// with dimension 0 varying fastest.
///
/// This is a lending iterator: [`next_tile`](Tiles::next_tile) returns a
/// borrowed slice containing one index range per dimension, which is only
/// valid until the next call.
#[derive(Clone, Debug)]
pub struct Tiles {
    shape: Vec<usize>,
    block: usize,
    tile: Vec<Range<usize>>,
    started: bool,
    done: bool,
}

impl Tiles {
    /// Create an iterator over the tiles of `shape` with edge length `block`.
    ///
    /// A shape with no dimensions has a single, empty tile. A shape with a
    /// zero-sized dimension has no tiles.
    ///
    /// Panics if `block` is zero.
    pub fn new(shape: &[usize], block: usize) -> Tiles {
        assert!(block > 0, "tile size must be non-zero");
        Tiles {
            shape: shape.to_vec(),
            block,
            tile: shape.iter().map(|&size| 0..block.min(size)).collect(),
            started: false,
            done: shape.contains(&0),
        }
    }

    /// Return the total number of tiles.
    pub fn count_tiles(&self) -> usize {
        self.shape
            .iter()
            .map(|size| size.div_ceil(self.block))
            .product()
    }

    /// Advance to the next tile and return its index range in each dimension.
    pub fn next_tile(&mut self) -> Option<&[Range<usize>]> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(&self.tile);
        }

        for (range, &size) in self.tile.iter_mut().zip(&self.shape) {
            if range.end < size {
                *range = range.end..(range.end + self.block).min(size);
                return Some(&self.tile);
            }
            *range = 0..self.block.min(size);
        }

        self.done = true;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::Tiles;

    fn collect_tiles(shape: &[usize], block: usize) -> Vec<Vec<std::ops::Range<usize>>> {
        let mut tiles = Tiles::new(shape, block);
        let mut out = Vec::new();
        while let Some(tile) = tiles.next_tile() {
            out.push(tile.to_vec());
        }
        out
    }

    #[test]
    fn test_tiles_2d() {
        let tiles = collect_tiles(&[3, 4], 2);
        assert_eq!(
            tiles,
            [
                vec![0..2, 0..2],
                vec![2..3, 0..2],
                vec![0..2, 2..4],
                vec![2..3, 2..4],
            ]
        );
        assert_eq!(Tiles::new(&[3, 4], 2).count_tiles(), 4);
    }

    #[test]
    fn test_tiles_cover_every_index_once() {
        let shape = [5, 3, 7];
        let mut visited = vec![0; shape.iter().product()];
        for tile in collect_tiles(&shape, 3) {
            for i0 in tile[0].clone() {
                for i1 in tile[1].clone() {
                    for i2 in tile[2].clone() {
                        visited[i0 + i1 * 5 + i2 * 15] += 1;
                    }
                }
            }
        }
        assert!(visited.iter().all(|&count| count == 1));
    }

    #[test]
    fn test_tiles_scalar_and_empty() {
        assert_eq!(collect_tiles(&[], 4), [Vec::new()]);
        assert!(collect_tiles(&[3, 0], 4).is_empty());
    }
}
