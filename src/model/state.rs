use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    Live,
    Inactive,
    Debris,
}

impl CellState {
    pub fn from_gates(dead: bool, cell: bool) -> Self {
        match (dead, cell) {
            (false, true) => CellState::Live,
            (true, true) => CellState::Inactive,
            (_, false) => CellState::Debris,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CellState::Live => "live",
            CellState::Inactive => "inactive",
            CellState::Debris => "debris",
        }
    }
}

pub fn state_order() -> &'static [CellState] {
    &[CellState::Live, CellState::Inactive, CellState::Debris]
}
