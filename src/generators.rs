use bit_set::BitSet;
use rand::Rng;
use smallvec::SmallVec;

use crate::cells::{Cartesian2DCoordinate, CellMark, CompassPrimary, DIRECTIONS};
use crate::grid::{Grid, IndexType};
use crate::observers::MazeObserver;

/// Progress of one maze carving run over a grid.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum GenerationState {
    NotStarted,
    InProgress,
    Finalized,
}

/// Randomized depth first search carving, one step per call.
///
/// The grid is handed to each `step` rather than borrowed for the whole run so
/// a host can render or poll input between steps. Always pass the same grid -
/// abandoning a run means dropping both the backtracker and the grid.
/// `run` drives the same step function straight to `Finalized`, so the carved
/// cell graph only depends on the random draws, never on the stepping.
pub struct RecursiveBacktracker {
    stack: Vec<Cartesian2DCoordinate>,
    visited: BitSet,
    completed: BitSet,
    state: GenerationState,
}

impl RecursiveBacktracker {
    pub fn new() -> RecursiveBacktracker {
        RecursiveBacktracker {
            stack: Vec::new(),
            visited: BitSet::new(),
            completed: BitSet::new(),
            state: GenerationState::NotStarted,
        }
    }

    #[inline]
    pub fn state(&self) -> GenerationState {
        self.state
    }

    /// Carve one unit of work: visit a new cell or backtrack out of a dead end.
    pub fn step<GridIndexType, R, O>(&mut self,
                                     grid: &mut Grid<GridIndexType>,
                                     rng: &mut R,
                                     observer: &mut O)
                                     -> GenerationState
        where GridIndexType: IndexType,
              R: Rng,
              O: MazeObserver
    {
        match self.state {
            GenerationState::NotStarted => {
                let start = grid.random_cell(rng);
                self.stack = Vec::with_capacity(grid.size());
                self.visited = BitSet::with_capacity(grid.size());
                self.completed = BitSet::with_capacity(grid.size());
                self.visit(start, grid, observer);
                self.state = GenerationState::InProgress;
            }
            GenerationState::InProgress => {
                let current = *self.stack
                                   .last()
                                   .expect("the path stack is never empty while carving");

                // Neighbours never pushed before, i.e. neither completed nor
                // somewhere down the path stack.
                let candidates = DIRECTIONS.iter()
                    .filter_map(|&dir| {
                        grid.neighbour_at_direction(current, dir).map(|coord| (dir, coord))
                    })
                    .filter(|&(_, coord)| !self.visited.contains(self.cell_index(coord, grid)))
                    .collect::<SmallVec<[(CompassPrimary, Cartesian2DCoordinate); 4]>>();

                if candidates.is_empty() {
                    // Dead end - backtrack.
                    let done = self.stack.pop().expect("the path stack cannot underflow");
                    let done_index = self.cell_index(done, grid);
                    self.completed.insert(done_index);
                    grid.mark(done, CellMark::Completed);
                    observer.cell_marked(done, CellMark::Completed);

                    if self.completed.len() == grid.size() {
                        finalise(grid, observer);
                        self.state = GenerationState::Finalized;
                    }
                } else {
                    let (direction, chosen) = candidates[rng.gen::<usize>() % candidates.len()];
                    grid.link(current, chosen).expect("carving only links adjacent cells");
                    observer.wall_opened(current, direction);
                    self.visit(chosen, grid, observer);
                }
            }
            GenerationState::Finalized => {}
        }

        self.state
    }

    /// Drive `step` to completion without yielding between steps.
    pub fn run<GridIndexType, R, O>(&mut self,
                                    grid: &mut Grid<GridIndexType>,
                                    rng: &mut R,
                                    observer: &mut O)
        where GridIndexType: IndexType,
              R: Rng,
              O: MazeObserver
    {
        while self.step(grid, rng, observer) != GenerationState::Finalized {}
    }

    fn visit<GridIndexType, O>(&mut self,
                               coord: Cartesian2DCoordinate,
                               grid: &mut Grid<GridIndexType>,
                               observer: &mut O)
        where GridIndexType: IndexType,
              O: MazeObserver
    {
        let index = self.cell_index(coord, grid);
        self.visited.insert(index);
        self.stack.push(coord);
        grid.mark(coord, CellMark::Current);
        observer.cell_marked(coord, CellMark::Current);
    }

    fn cell_index<GridIndexType: IndexType>(&self,
                                            coord: Cartesian2DCoordinate,
                                            grid: &Grid<GridIndexType>)
                                            -> usize {
        grid.grid_coordinate_to_index(coord)
            .expect("carving only visits in bounds cells")
    }
}

/// Carve a perfect maze into the grid with the recursive backtracking
/// algorithm, immediately, then fix the entrance and exit openings.
pub fn recursive_backtracker<GridIndexType, R, O>(grid: &mut Grid<GridIndexType>,
                                                  rng: &mut R,
                                                  observer: &mut O)
    where GridIndexType: IndexType,
          R: Rng,
          O: MazeObserver
{
    RecursiveBacktracker::new().run(grid, rng, observer);
}

// Entrance and exit are fixed by convention: a west opening at the top left
// corner and an east opening at the bottom right corner.
fn finalise<GridIndexType, O>(grid: &mut Grid<GridIndexType>, observer: &mut O)
    where GridIndexType: IndexType,
          O: MazeObserver
{
    let start = Cartesian2DCoordinate::new(0, 0);
    let end = Cartesian2DCoordinate::new(grid.width().0 as u32 - 1, grid.height().0 as u32 - 1);

    grid.open_entrance(start, CompassPrimary::West);
    observer.wall_opened(start, CompassPrimary::West);
    grid.mark(start, CellMark::Start);
    observer.cell_marked(start, CellMark::Start);

    grid.open_exit(end, CompassPrimary::East);
    observer.wall_opened(end, CompassPrimary::East);
    grid.mark(end, CellMark::End);
    observer.cell_marked(end, CellMark::End);
}

#[cfg(test)]
mod tests {

    use bit_set::BitSet;
    use quickcheck::{quickcheck, TestResult};
    use rand::{Error, RngCore, SeedableRng};
    use rand_xorshift::XorShiftRng;

    use super::*;
    use crate::grid::MediumGrid;
    use crate::observers::{EventRecorder, MazeEvent};
    use crate::units::{Height, Width};

    fn medium_grid(w: usize, h: usize) -> MediumGrid {
        MediumGrid::new(Width(w), Height(h)).expect("grid dimensions should be valid")
    }

    /// Replays a fixed list of draws, for pinning down exact carve decisions.
    struct ScriptedRng {
        draws: Vec<u64>,
        next: usize,
    }
    impl ScriptedRng {
        fn new(draws: &[u64]) -> ScriptedRng {
            ScriptedRng { draws: draws.to_vec(), next: 0 }
        }
    }
    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            self.next_u64() as u32
        }
        fn next_u64(&mut self) -> u64 {
            let draw = *self.draws.get(self.next).expect("scripted rng ran out of draws");
            self.next += 1;
            draw
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for byte in dest.iter_mut() {
                *byte = self.next_u64() as u8;
            }
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn is_spanning_tree(g: &MediumGrid) -> bool {
        // A connected graph on n nodes with n - 1 edges is a tree.
        if g.links_count() != g.size() - 1 {
            return false;
        }
        let mut seen = BitSet::with_capacity(g.size());
        let mut frontier = vec![Cartesian2DCoordinate::new(0, 0)];
        seen.insert(0);
        while let Some(coord) = frontier.pop() {
            for linked in g.links(coord).expect("flood fill stays in bounds").iter() {
                let index = g.grid_coordinate_to_index(*linked).unwrap();
                if seen.insert(index) {
                    frontier.push(*linked);
                }
            }
        }
        seen.len() == g.size()
    }

    fn has_fixed_openings(g: &MediumGrid) -> bool {
        let gc = |x, y| Cartesian2DCoordinate::new(x, y);
        let far_corner = gc(g.width().0 as u32 - 1, g.height().0 as u32 - 1);
        !g.walls(gc(0, 0)).unwrap().west && !g.walls(far_corner).unwrap().east &&
        g.entrance() == Some((gc(0, 0), CompassPrimary::West)) &&
        g.exit() == Some((far_corner, CompassPrimary::East))
    }

    #[test]
    fn scripted_2x2_carve_is_pinned_down() {
        let gc = |x, y| Cartesian2DCoordinate::new(x, y);
        let mut g = medium_grid(2, 2);
        // Draw 0: start cell index 0 = (0,0).
        // Draw 1: candidates of (0,0) in N,S,E,W order are [S, E], pick E = (1,0).
        // Draw 0: only candidate of (1,0) is S = (1,1).
        // Draw 0: only candidate of (1,1) is W = (0,1).
        // (0,1) is a dead end, then the whole stack unwinds without drawing.
        let mut rng = ScriptedRng::new(&[0, 1, 0, 0]);
        recursive_backtracker(&mut g, &mut rng, &mut ());

        assert_eq!(g.links_count(), 3);
        assert!(g.is_linked(gc(0, 0), gc(1, 0)));
        assert!(g.is_linked(gc(1, 0), gc(1, 1)));
        assert!(g.is_linked(gc(1, 1), gc(0, 1)));
        assert!(!g.is_linked(gc(0, 0), gc(0, 1)));

        assert!(has_fixed_openings(&g));
        assert_eq!(g.mark_of(gc(0, 0)), Some(CellMark::Start));
        assert_eq!(g.mark_of(gc(1, 1)), Some(CellMark::End));
        assert_eq!(g.mark_of(gc(1, 0)), Some(CellMark::Completed));
        assert_eq!(g.mark_of(gc(0, 1)), Some(CellMark::Completed));

        // This carve leaves exactly one route between the corners.
        let path = crate::pathing::solve(&mut g, &mut ()).expect("solve failed");
        assert_eq!(path, vec![gc(0, 0), gc(1, 0), gc(1, 1)]);
    }

    #[test]
    fn scripted_2x2_event_stream() {
        let gc = |x, y| Cartesian2DCoordinate::new(x, y);
        let mut g = medium_grid(2, 2);
        let mut rng = ScriptedRng::new(&[0, 1, 0, 0]);
        let mut recorder = EventRecorder::new();
        recursive_backtracker(&mut g, &mut rng, &mut recorder);

        use self::MazeEvent::{CellMarked, WallOpened};
        let expected = vec![CellMarked(gc(0, 0), CellMark::Current),
                            WallOpened(gc(0, 0), CompassPrimary::East),
                            CellMarked(gc(1, 0), CellMark::Current),
                            WallOpened(gc(1, 0), CompassPrimary::South),
                            CellMarked(gc(1, 1), CellMark::Current),
                            WallOpened(gc(1, 1), CompassPrimary::West),
                            CellMarked(gc(0, 1), CellMark::Current),
                            CellMarked(gc(0, 1), CellMark::Completed),
                            CellMarked(gc(1, 1), CellMark::Completed),
                            CellMarked(gc(1, 0), CellMark::Completed),
                            CellMarked(gc(0, 0), CellMark::Completed),
                            WallOpened(gc(0, 0), CompassPrimary::West),
                            CellMarked(gc(0, 0), CellMark::Start),
                            WallOpened(gc(1, 1), CompassPrimary::East),
                            CellMarked(gc(1, 1), CellMark::End)];
        assert_eq!(recorder.events, expected);
    }

    #[test]
    fn generation_state_transitions() {
        let mut g = medium_grid(3, 3);
        let mut rng = XorShiftRng::seed_from_u64(99);
        let mut backtracker = RecursiveBacktracker::new();
        assert_eq!(backtracker.state(), GenerationState::NotStarted);

        assert_eq!(backtracker.step(&mut g, &mut rng, &mut ()),
                   GenerationState::InProgress);

        backtracker.run(&mut g, &mut rng, &mut ());
        assert_eq!(backtracker.state(), GenerationState::Finalized);
        assert!(is_spanning_tree(&g));

        // Stepping a finalized run is a no-op.
        let links_before = g.links_count();
        assert_eq!(backtracker.step(&mut g, &mut rng, &mut ()),
                   GenerationState::Finalized);
        assert_eq!(g.links_count(), links_before);
    }

    #[test]
    fn typical_boundary_sizes_carve_spanning_trees() {
        for &(w, h, seed) in &[(5, 5, 1u64), (30, 30, 2u64)] {
            let mut g = medium_grid(w, h);
            let mut rng = XorShiftRng::seed_from_u64(seed);
            recursive_backtracker(&mut g, &mut rng, &mut ());
            assert!(is_spanning_tree(&g), "{}x{} maze is not a spanning tree", w, h);
            assert!(has_fixed_openings(&g), "{}x{} maze openings are wrong", w, h);
        }
    }

    #[test]
    fn single_cell_grid_generates() {
        let mut g = medium_grid(1, 1);
        let mut rng = XorShiftRng::seed_from_u64(3);
        recursive_backtracker(&mut g, &mut rng, &mut ());
        assert_eq!(g.links_count(), 0);
        assert!(has_fixed_openings(&g));
        // Entrance and exit share the only cell, the start mark is applied
        // first and then overwritten by the end mark.
        assert_eq!(g.mark_of(Cartesian2DCoordinate::new(0, 0)), Some(CellMark::End));
    }

    #[test]
    fn stepwise_and_immediate_runs_carve_the_same_maze() {
        let seed = 12345;

        let mut immediate = medium_grid(8, 6);
        let mut rng = XorShiftRng::seed_from_u64(seed);
        recursive_backtracker(&mut immediate, &mut rng, &mut ());

        let mut suspended = medium_grid(8, 6);
        let mut rng = XorShiftRng::seed_from_u64(seed);
        let mut backtracker = RecursiveBacktracker::new();
        while backtracker.step(&mut suspended, &mut rng, &mut ()) != GenerationState::Finalized {}

        for coord in immediate.iter() {
            for &dir in &DIRECTIONS {
                assert_eq!(immediate.is_neighbour_linked(coord, dir),
                           suspended.is_neighbour_linked(coord, dir));
            }
        }
        assert_eq!(immediate.entrance(), suspended.entrance());
        assert_eq!(immediate.exit(), suspended.exit());
    }

    #[test]
    fn every_carve_emits_one_wall_event() {
        let mut g = medium_grid(4, 4);
        let mut rng = XorShiftRng::seed_from_u64(42);
        let mut recorder = EventRecorder::new();
        recursive_backtracker(&mut g, &mut rng, &mut recorder);

        let wall_events = recorder.events
            .iter()
            .filter(|event| match event {
                MazeEvent::WallOpened(..) => true,
                _ => false,
            })
            .count();
        // One per carved passage plus the entrance and exit openings.
        assert_eq!(wall_events, g.size() - 1 + 2);
        assert!(match recorder.events.first() {
            Some(MazeEvent::CellMarked(_, CellMark::Current)) => true,
            _ => false,
        });
    }

    #[test]
    fn quickcheck_generated_mazes_are_spanning_trees() {
        fn prop(width: u8, height: u8, seed: u64) -> TestResult {
            if width < 1 || width > 16 || height < 1 || height > 16 {
                return TestResult::discard();
            }
            let mut g = medium_grid(width as usize, height as usize);
            let mut rng = XorShiftRng::seed_from_u64(seed);
            recursive_backtracker(&mut g, &mut rng, &mut ());
            TestResult::from_bool(is_spanning_tree(&g) && has_fixed_openings(&g))
        }
        quickcheck(prop as fn(u8, u8, u64) -> TestResult);
    }
}
