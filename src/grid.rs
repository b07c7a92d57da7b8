use itertools::Itertools;
use petgraph::graph;
pub use petgraph::graph::IndexType;
use petgraph::{Graph, Undirected};
use rand::Rng;
use std::error::Error;
use std::fmt;
use std::iter;

use crate::cells::{Cartesian2DCoordinate, CellMark, CompassPrimary, CoordinateSmallVec, DIRECTIONS};
use crate::units::{EdgesCount, Height, NodesCount, Width};

pub type SmallGrid = Grid<u8>;
pub type MediumGrid = Grid<u16>;
pub type LargeGrid = Grid<u32>;

/// A rectangular grid of cells with every wall initially present.
///
/// A passage between two adjacent cells is one undirected graph edge, so the
/// two facing wall halves can only ever be removed together - there is no
/// one-sided wall state to keep consistent.
pub struct Grid<GridIndexType: IndexType> {
    graph: Graph<(), (), Undirected, GridIndexType>,
    width: Width,
    height: Height,
    marks: Vec<CellMark>,
    entrance: Option<(Cartesian2DCoordinate, CompassPrimary)>,
    exit: Option<(Cartesian2DCoordinate, CompassPrimary)>,
}

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum GridError {
    /// Zero cell rows or columns, rejected before any allocation.
    InvalidDimension(Width, Height),
    /// The cell count does not fit the grid's graph index type.
    TooManyCells(Width, Height),
}

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum CellLinkError {
    InvalidGridCoordinate,
    SelfLink,
    NotNeighbours,
}

/// Wall state of one cell as seen from that cell, `true` = wall present.
/// Derived from the passage graph and any boundary opening.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct CellWalls {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GridError::InvalidDimension(Width(w), Height(h)) => {
                write!(f, "invalid grid dimension {}x{}, width and height must be at least 1", w, h)
            }
            GridError::TooManyCells(Width(w), Height(h)) => {
                write!(f, "{}x{} cells do not fit the grid's index type", w, h)
            }
        }
    }
}
impl Error for GridError {}

impl<GridIndexType: IndexType> fmt::Debug for Grid<GridIndexType> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
               "Grid :: width: {:?}, height: {:?}, passages: {:?}",
               self.width,
               self.height,
               self.links_count())
    }
}

impl<GridIndexType: IndexType> Grid<GridIndexType> {
    pub fn new(width: Width, height: Height) -> Result<Grid<GridIndexType>, GridError> {

        if width.0 < 1 || height.0 < 1 {
            return Err(GridError::InvalidDimension(width, height));
        }
        let cells_count = width.0 * height.0;
        if cells_count > <GridIndexType as IndexType>::max().index() {
            return Err(GridError::TooManyCells(width, height));
        }

        // A perfect maze carves exactly cells_count - 1 passages.
        let (NodesCount(nodes), EdgesCount(edges)) = (NodesCount(cells_count),
                                                      EdgesCount(cells_count - 1));
        let mut grid = Grid {
            graph: Graph::with_capacity(nodes, edges),
            width,
            height,
            marks: vec![CellMark::Untouched; cells_count],
            entrance: None,
            exit: None,
        };
        for _ in 0..nodes {
            let _ = grid.graph.add_node(());
        }

        Ok(grid)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.width.0 * self.height.0
    }

    #[inline]
    pub fn width(&self) -> Width {
        self.width
    }

    #[inline]
    pub fn height(&self) -> Height {
        self.height
    }

    #[inline]
    pub fn links_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn random_cell<R: Rng>(&self, rng: &mut R) -> Cartesian2DCoordinate {
        let index = rng.gen::<usize>() % self.size();
        Cartesian2DCoordinate::from_row_major_index(index, self.width)
    }

    /// Open the passage between two adjacent cells.
    ///
    /// The wall between the cells is removed from both sides in this one
    /// update, the single graph edge being the only wall state there is.
    pub fn link(&mut self,
                a: Cartesian2DCoordinate,
                b: Cartesian2DCoordinate)
                -> Result<(), CellLinkError> {
        if a == b {
            return Err(CellLinkError::SelfLink);
        }
        match (self.grid_coordinate_graph_index(a), self.grid_coordinate_graph_index(b)) {
            (Some(a_index), Some(b_index)) => {
                if !self.is_neighbour(a, b) {
                    return Err(CellLinkError::NotNeighbours);
                }
                let _ = self.graph.update_edge(a_index, b_index, ());
                Ok(())
            }
            _ => Err(CellLinkError::InvalidGridCoordinate),
        }
    }

    /// Close the passage between two cells, if there is one.
    /// Returns true if an unlink occurred.
    pub fn unlink(&mut self, a: Cartesian2DCoordinate, b: Cartesian2DCoordinate) -> bool {
        if let (Some(a_index), Some(b_index)) =
            (self.grid_coordinate_graph_index(a), self.grid_coordinate_graph_index(b)) {

            if let Some(edge_index) = self.graph.find_edge(a_index, b_index) {
                // This will invalidate the last edge index in the graph, which is fine as we
                // are not storing them for any reason.
                self.graph.remove_edge(edge_index);
                return true;
            }
        }

        false
    }

    /// Cells connected to a particular cell by an open passage.
    pub fn links(&self, coord: Cartesian2DCoordinate) -> Option<CoordinateSmallVec> {
        self.grid_coordinate_graph_index(coord)
            .map(|graph_node_index| {
                self.graph
                    .neighbors(graph_node_index)
                    .map(|node_index| {
                        Cartesian2DCoordinate::from_row_major_index(node_index.index(), self.width)
                    })
                    .collect()
            })
    }

    /// Cells adjacent to a particular cell, whether or not a passage is open.
    pub fn neighbours(&self, coord: Cartesian2DCoordinate) -> CoordinateSmallVec {
        DIRECTIONS.iter()
                  .filter_map(|&dir| self.neighbour_at_direction(coord, dir))
                  .collect()
    }

    pub fn neighbour_at_direction(&self,
                                  coord: Cartesian2DCoordinate,
                                  direction: CompassPrimary)
                                  -> Option<Cartesian2DCoordinate> {
        coord.offset(direction)
             .filter(|&neighbour_coord| self.is_valid_coordinate(neighbour_coord))
    }

    /// Is there an open passage between the two cells?
    /// Non-adjacent cells can never be linked.
    pub fn is_linked(&self, a: Cartesian2DCoordinate, b: Cartesian2DCoordinate) -> bool {
        if let (Some(a_index), Some(b_index)) =
            (self.grid_coordinate_graph_index(a), self.grid_coordinate_graph_index(b)) {
            self.graph.find_edge(a_index, b_index).is_some()
        } else {
            false
        }
    }

    pub fn is_neighbour_linked(&self,
                               coord: Cartesian2DCoordinate,
                               direction: CompassPrimary)
                               -> bool {
        self.neighbour_at_direction(coord, direction)
            .map_or(false, |neighbour_coord| self.is_linked(coord, neighbour_coord))
    }

    pub fn mark(&mut self, coord: Cartesian2DCoordinate, mark: CellMark) -> bool {
        if let Some(index) = self.grid_coordinate_to_index(coord) {
            self.marks[index] = mark;
            true
        } else {
            false
        }
    }

    pub fn mark_of(&self, coord: Cartesian2DCoordinate) -> Option<CellMark> {
        self.grid_coordinate_to_index(coord).map(|index| self.marks[index])
    }

    /// Record the maze entrance as an opening in the outer boundary.
    /// The direction must lead out of the grid. Returns true when recorded.
    pub fn open_entrance(&mut self, coord: Cartesian2DCoordinate, direction: CompassPrimary) -> bool {
        if self.is_boundary_wall(coord, direction) {
            self.entrance = Some((coord, direction));
            true
        } else {
            false
        }
    }

    /// Record the maze exit as an opening in the outer boundary.
    pub fn open_exit(&mut self, coord: Cartesian2DCoordinate, direction: CompassPrimary) -> bool {
        if self.is_boundary_wall(coord, direction) {
            self.exit = Some((coord, direction));
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn entrance(&self) -> Option<(Cartesian2DCoordinate, CompassPrimary)> {
        self.entrance
    }

    #[inline]
    pub fn exit(&self) -> Option<(Cartesian2DCoordinate, CompassPrimary)> {
        self.exit
    }

    /// The four wall states of one cell. None for an invalid coordinate.
    pub fn walls(&self, coord: Cartesian2DCoordinate) -> Option<CellWalls> {
        if !self.is_valid_coordinate(coord) {
            return None;
        }
        let closed = |direction| match self.neighbour_at_direction(coord, direction) {
            Some(neighbour_coord) => !self.is_linked(coord, neighbour_coord),
            None => !self.is_boundary_open(coord, direction),
        };
        Some(CellWalls {
            north: closed(CompassPrimary::North),
            south: closed(CompassPrimary::South),
            east: closed(CompassPrimary::East),
            west: closed(CompassPrimary::West),
        })
    }

    /// Convert a grid coordinate to a one dimensional index in the range 0...grid.size().
    /// Returns None if the grid coordinate is invalid.
    #[inline]
    pub fn grid_coordinate_to_index(&self, coord: Cartesian2DCoordinate) -> Option<usize> {
        if self.is_valid_coordinate(coord) {
            Some(coord.y as usize * self.width.0 + coord.x as usize)
        } else {
            None
        }
    }

    /// Is the grid coordinate valid for this grid - within the grid's dimensions.
    #[inline]
    pub fn is_valid_coordinate(&self, coord: Cartesian2DCoordinate) -> bool {
        (coord.x as usize) < self.width.0 && (coord.y as usize) < self.height.0
    }

    pub fn iter(&self) -> CellIter {
        CellIter {
            current_cell_number: 0,
            cells_count: self.size(),
            width: self.width,
        }
    }

    fn is_neighbour(&self, a: Cartesian2DCoordinate, b: Cartesian2DCoordinate) -> bool {
        self.neighbours(a).iter().any(|&coord| coord == b)
    }

    fn is_boundary_wall(&self, coord: Cartesian2DCoordinate, direction: CompassPrimary) -> bool {
        self.is_valid_coordinate(coord) && self.neighbour_at_direction(coord, direction).is_none()
    }

    fn is_boundary_open(&self, coord: Cartesian2DCoordinate, direction: CompassPrimary) -> bool {
        self.entrance == Some((coord, direction)) || self.exit == Some((coord, direction))
    }

    /// Convert a grid coordinate into a petgraph node index.
    /// Returns None if the grid coordinate is invalid (out of the grid's dimensions).
    #[inline]
    fn grid_coordinate_graph_index(&self,
                                   coord: Cartesian2DCoordinate)
                                   -> Option<graph::NodeIndex<GridIndexType>> {
        self.grid_coordinate_to_index(coord).map(graph::NodeIndex::<GridIndexType>::new)
    }
}

fn cell_body(mark: Option<CellMark>) -> &'static str {
    match mark {
        Some(CellMark::Start) => " S ",
        Some(CellMark::End) => " E ",
        Some(CellMark::Solution) => " . ",
        Some(CellMark::Current) => " * ",
        _ => "   ",
    }
}

impl<GridIndexType: IndexType> fmt::Display for Grid<GridIndexType> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {

        let Width(columns_count) = self.width;
        let Height(rows_count) = self.height;

        // The north most boundary is always fully walled, every other wall is
        // read from the cell that owns it as its west/east/south side.
        let top = format!("+{}+", iter::repeat("---").take(columns_count).join("+"));
        writeln!(f, "{}", top)?;

        for y in 0..rows_count {
            let mut row_middle_section_render = String::new();
            let mut row_bottom_section_render = String::from("+");

            for x in 0..columns_count {
                let coord = Cartesian2DCoordinate::new(x as u32, y as u32);
                let walls = self.walls(coord).expect("display only visits in bounds cells");

                row_middle_section_render.push(if walls.west { '|' } else { ' ' });
                row_middle_section_render.push_str(cell_body(self.mark_of(coord)));
                if x == columns_count - 1 {
                    row_middle_section_render.push(if walls.east { '|' } else { ' ' });
                }
                row_bottom_section_render.push_str(if walls.south { "---+" } else { "   +" });
            }

            writeln!(f, "{}", row_middle_section_render)?;
            writeln!(f, "{}", row_bottom_section_render)?;
        }

        Ok(())
    }
}

#[derive(Debug, Copy, Clone)]
pub struct CellIter {
    current_cell_number: usize,
    cells_count: usize,
    width: Width,
}
impl Iterator for CellIter {
    type Item = Cartesian2DCoordinate;
    fn next(&mut self) -> Option<Self::Item> {
        if self.current_cell_number < self.cells_count {
            let coord = Cartesian2DCoordinate::from_row_major_index(self.current_cell_number,
                                                                    self.width);
            self.current_cell_number += 1;
            Some(coord)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let lower_bound = self.cells_count - self.current_cell_number;
        let upper_bound = lower_bound;
        (lower_bound, Some(upper_bound))
    }
}
impl ExactSizeIterator for CellIter {} // default impl using size_hint()

impl<'a, GridIndexType: IndexType> IntoIterator for &'a Grid<GridIndexType> {
    type Item = Cartesian2DCoordinate;
    type IntoIter = CellIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
