use docopt::Docopt;
use mazecarve::{
    cells::{Cartesian2DCoordinate, CellMark, CompassPrimary},
    generators,
    generators::GenerationState,
    grid::MediumGrid,
    observers::MazeObserver,
    pathing,
    units::{Height, Width},
};
use rand::{FromEntropy, SeedableRng};
use rand_xorshift::XorShiftRng;
use serde_derive::Deserialize;
use std::{fs::File, io, io::prelude::*};

const USAGE: &str = "Mazecarve

Usage:
    mazecarve_driver -h | --help
    mazecarve_driver [--grid-width=<w> --grid-height=<h>] [--stepwise] [--solve] [--seed=<n>] [--trace] [--text-out=<path>]

Options:
    -h --help          Show this screen.
    --grid-width=<w>   The grid width in a w*h grid [default: 20].
    --grid-height=<h>  The grid height in a w*h grid [default: 20].
    --stepwise         Carve through the suspendable step interface instead of running to completion in one call.
    --solve            Find the entrance to exit route and paint it into the rendering.
    --seed=<n>         Seed for the random generator, drawn from entropy when not given.
    --trace            Print every cell mark and wall removal event as it happens.
    --text-out=<path>  Output file path for the textual rendering of the maze.
";

#[derive(Debug, Deserialize)]
struct CarveArgs {
    flag_grid_width: usize,
    flag_grid_height: usize,
    flag_stepwise: bool,
    flag_solve: bool,
    flag_seed: Option<u64>,
    flag_trace: bool,
    flag_text_out: String,
}

// We'll put our errors in an `errors` module, and other modules in
// this crate will `use errors::*;` to get access to everything
// `error_chain!` creates.
mod errors {
    use error_chain::*;
    error_chain! {

        foreign_links {
            DocOptFailure(::docopt::Error);
            GridFailure(::mazecarve::grid::GridError);
            SolveFailure(::mazecarve::pathing::SolveError);
            Io(::std::io::Error);
        }
    }
}
use crate::errors::*;

/// Writes the event stream to stdout when enabled, otherwise stays quiet.
struct TraceObserver {
    enabled: bool,
}

impl MazeObserver for TraceObserver {
    fn cell_marked(&mut self, coord: Cartesian2DCoordinate, mark: CellMark) {
        if self.enabled {
            println!("cell ({}, {}) marked {:?}", coord.x, coord.y, mark);
        }
    }

    fn wall_opened(&mut self, coord: Cartesian2DCoordinate, direction: CompassPrimary) {
        if self.enabled {
            println!("wall ({}, {}) {:?} opened", coord.x, coord.y, direction);
        }
    }
}

fn main() -> Result<()> {

    let args: CarveArgs = Docopt::new(USAGE).and_then(|d| d.deserialize())?;

    let mut rng = match args.flag_seed {
        Some(seed) => XorShiftRng::seed_from_u64(seed),
        None => XorShiftRng::from_entropy(),
    };
    let mut observer = TraceObserver { enabled: args.flag_trace };

    let mut maze_grid = MediumGrid::new(Width(args.flag_grid_width),
                                        Height(args.flag_grid_height))?;

    if args.flag_stepwise {
        // One unit of carving per call - a host embedding this would render
        // or poll input between the calls.
        let mut backtracker = generators::RecursiveBacktracker::new();
        while backtracker.step(&mut maze_grid, &mut rng, &mut observer) !=
              GenerationState::Finalized {}
    } else {
        generators::recursive_backtracker(&mut maze_grid, &mut rng, &mut observer);
    }

    if args.flag_solve {
        let path = pathing::solve(&mut maze_grid, &mut observer)?;
        println!("solved in {} cells from the entrance to the exit", path.len());
    }

    if args.flag_text_out.is_empty() {
        println!("{}", maze_grid);
    } else {
        write_text_to_file(&format!("{}", maze_grid), &args.flag_text_out)
            .chain_err(|| format!("Failed to write maze to text file {}", args.flag_text_out))?;
    }

    Ok(())
}

fn write_text_to_file(data: &str, file_name: &str) -> io::Result<()> {
    let mut f = File::create(file_name)?;
    f.write_all(data.as_bytes())?;
    Ok(())
}
