use bit_set::BitSet;
use fnv::FnvHashMap;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;

use crate::cells::{Cartesian2DCoordinate, CellMark, DIRECTIONS};
use crate::grid::{Grid, IndexType};
use crate::observers::MazeObserver;

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum SolveError {
    /// The grid has no entrance and exit yet, generation never finalized.
    SolveBeforeFinalized,
    /// No route from entrance to exit - the grid is not the spanning tree
    /// generation promises, so something corrupted it.
    DisconnectedGraph,
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SolveError::SolveBeforeFinalized => {
                write!(f, "cannot solve before maze generation has finalized the grid")
            }
            SolveError::DisconnectedGraph => {
                write!(f, "no route between the maze entrance and exit, the grid is corrupt")
            }
        }
    }
}
impl Error for SolveError {}

/// Find the route from the maze entrance to the maze exit and paint it onto
/// the grid, reporting each painted cell to the observer.
///
/// On a freshly generated grid the passages form a spanning tree, so the one
/// existing route is also the shortest. Solving the same finalized grid again
/// retraces the identical path.
pub fn solve<GridIndexType, O>(grid: &mut Grid<GridIndexType>,
                               observer: &mut O)
                               -> Result<Vec<Cartesian2DCoordinate>, SolveError>
    where GridIndexType: IndexType,
          O: MazeObserver
{
    let (start, _) = grid.entrance().ok_or(SolveError::SolveBeforeFinalized)?;
    let (end, _) = grid.exit().ok_or(SolveError::SolveBeforeFinalized)?;

    let mut painter = SolutionPainter::new(shortest_path(grid, start, end)?);
    painter.run(grid, observer);
    Ok(painter.into_path())
}

/// Breadth first search for the shortest passage route between two cells.
///
/// The search floods from `end` back towards `start` so that following the
/// parent references from `start` afterwards reads out the path in
/// start-to-end order with no reversal step.
pub fn shortest_path<GridIndexType>(grid: &Grid<GridIndexType>,
                                    start: Cartesian2DCoordinate,
                                    end: Cartesian2DCoordinate)
                                    -> Result<Vec<Cartesian2DCoordinate>, SolveError>
    where GridIndexType: IndexType
{
    let cells_count = grid.size();
    let mut visited = BitSet::with_capacity(cells_count);
    // Parent back references live only for this one search.
    let mut parents: FnvHashMap<Cartesian2DCoordinate, Cartesian2DCoordinate> =
        FnvHashMap::with_capacity_and_hasher(cells_count, Default::default());
    let mut frontier = VecDeque::with_capacity(cells_count / 2 + 1);

    visited.insert(cell_index(grid, end));
    frontier.push_back(end);

    let mut routed = false;
    while let Some(current) = frontier.pop_front() {
        if current == start {
            // The rest of the frontier is of no interest.
            routed = true;
            break;
        }
        for &direction in &DIRECTIONS {
            if let Some(neighbour) = grid.neighbour_at_direction(current, direction) {
                let neighbour_index = cell_index(grid, neighbour);
                if grid.is_linked(current, neighbour) && !visited.contains(neighbour_index) {
                    visited.insert(neighbour_index);
                    parents.insert(neighbour, current);
                    frontier.push_back(neighbour);
                }
            }
        }
    }
    if !routed {
        return Err(SolveError::DisconnectedGraph);
    }

    let mut path = vec![start];
    let mut current = start;
    while let Some(&towards_end) = parents.get(&current) {
        path.push(towards_end);
        current = towards_end;
    }
    debug_assert_eq!(*path.last().expect("the path always holds the start cell"), end);

    Ok(path)
}

/// Paints a solved route onto the grid one cell per step, so a host can show
/// the path growing. The entrance and exit corners keep their own marks.
pub struct SolutionPainter {
    path: Vec<Cartesian2DCoordinate>,
    cursor: usize,
}

impl SolutionPainter {
    pub fn new(path: Vec<Cartesian2DCoordinate>) -> SolutionPainter {
        SolutionPainter { path, cursor: 0 }
    }

    #[inline]
    pub fn path(&self) -> &[Cartesian2DCoordinate] {
        &self.path
    }

    pub fn into_path(self) -> Vec<Cartesian2DCoordinate> {
        self.path
    }

    /// Paint the next path cell. Returns true once the whole path is painted.
    pub fn step<GridIndexType, O>(&mut self,
                                  grid: &mut Grid<GridIndexType>,
                                  observer: &mut O)
                                  -> bool
        where GridIndexType: IndexType,
              O: MazeObserver
    {
        if self.cursor < self.path.len() {
            let coord = self.path[self.cursor];
            self.cursor += 1;
            match grid.mark_of(coord) {
                Some(CellMark::Start) | Some(CellMark::End) => {}
                _ => {
                    grid.mark(coord, CellMark::Solution);
                    observer.cell_marked(coord, CellMark::Solution);
                }
            }
        }
        self.cursor >= self.path.len()
    }

    pub fn run<GridIndexType, O>(&mut self, grid: &mut Grid<GridIndexType>, observer: &mut O)
        where GridIndexType: IndexType,
              O: MazeObserver
    {
        while !self.step(grid, observer) {}
    }
}

fn cell_index<GridIndexType: IndexType>(grid: &Grid<GridIndexType>,
                                        coord: Cartesian2DCoordinate)
                                        -> usize {
    grid.grid_coordinate_to_index(coord)
        .expect("searching only visits in bounds cells")
}
