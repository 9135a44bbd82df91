use ndarray::Array2;

/// One board axis: width, height or a position along it.
pub type Coord = u8;

/// Tile totals and per-owner counters.
pub type CellCount = u16;

/// Board position `(x, y)`.
pub type Coord2 = (Coord, Coord);

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Coord2 {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.0.into(), self.1.into()]
    }
}

pub const fn mult(a: Coord, b: Coord) -> CellCount {
    (a as CellCount).saturating_mul(b as CellCount)
}

pub const fn percent_of(total: CellCount, percent: u8) -> CellCount {
    let percent = if percent > 100 { 100 } else { percent };
    let scaled = total as u32 * percent as u32 + 50;
    (scaled / 100) as CellCount
}

pub fn array_size<T>(array: &Array2<T>) -> Coord2 {
    let (x, y) = array.dim();
    (
        Coord::try_from(x).unwrap_or(Coord::MAX),
        Coord::try_from(y).unwrap_or(Coord::MAX),
    )
}

pub trait NeighborIterExt {
    fn iter_neighbors(&self, index: Coord2) -> NeighborIter;

    fn iter_area(&self, index: Coord2) -> NeighborIter;
}

impl<T> NeighborIterExt for Array2<T> {
    fn iter_neighbors(&self, index: Coord2) -> NeighborIter {
        NeighborIter::new(index, array_size(self), false)
    }

    fn iter_area(&self, index: Coord2) -> NeighborIter {
        NeighborIter::new(index, array_size(self), true)
    }
}

const OFFSETS: [(i8, i8); 9] = [
    (0, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Walks the offsets around `origin`, skipping positions outside `limit`.
#[derive(Debug, Clone)]
pub struct NeighborIter {
    origin: Coord2,
    limit: Coord2,
    cursor: usize,
}

impl NeighborIter {
    pub fn new(origin: Coord2, limit: Coord2, include_origin: bool) -> Self {
        Self {
            origin,
            limit,
            cursor: usize::from(!include_origin),
        }
    }

    fn offset(&self, (dx, dy): (i8, i8)) -> Option<Coord2> {
        let x = self.origin.0.checked_add_signed(dx)?;
        let y = self.origin.1.checked_add_signed(dy)?;
        (x < self.limit.0 && y < self.limit.1).then_some((x, y))
    }
}

impl Iterator for NeighborIter {
    type Item = Coord2;

    fn next(&mut self) -> Option<Coord2> {
        while let Some(&delta) = OFFSETS.get(self.cursor) {
            self.cursor += 1;
            if let Some(pos) = self.offset(delta) {
                return Some(pos);
            }
        }
        None
    }
}
