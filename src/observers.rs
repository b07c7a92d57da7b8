use crate::cells::{Cartesian2DCoordinate, CellMark, CompassPrimary};

/// Presentation side of the core: carving and solving report every cell mark
/// change and wall removal here. Observers read state changes, they never
/// write back into the grid.
pub trait MazeObserver {
    fn cell_marked(&mut self, _: Cartesian2DCoordinate, _: CellMark) {}
    fn wall_opened(&mut self, _: Cartesian2DCoordinate, _: CompassPrimary) {}
}

/// Hosts that do not watch pass `&mut ()`.
impl MazeObserver for () {}

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum MazeEvent {
    CellMarked(Cartesian2DCoordinate, CellMark),
    WallOpened(Cartesian2DCoordinate, CompassPrimary),
}

/// Collects the emitted event stream in order, mostly for tests and
/// replay style hosts.
#[derive(Debug, Default)]
pub struct EventRecorder {
    pub events: Vec<MazeEvent>,
}

impl EventRecorder {
    pub fn new() -> EventRecorder {
        EventRecorder { events: Vec::new() }
    }
}

impl MazeObserver for EventRecorder {
    fn cell_marked(&mut self, coord: Cartesian2DCoordinate, mark: CellMark) {
        self.events.push(MazeEvent::CellMarked(coord, mark));
    }

    fn wall_opened(&mut self, coord: Cartesian2DCoordinate, direction: CompassPrimary) {
        self.events.push(MazeEvent::WallOpened(coord, direction));
    }
}
