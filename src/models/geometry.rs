use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of integers per record in the flat geometry protocol:
/// `(engine_code, left, top, right, bottom)`.
pub const RECORD_WIDTH: usize = 5;

/// Logical overlay controls whose hit rectangles the engine tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlId {
    Rotate,
    Zoom,
    DataOnly,
    Xfunc,
    SkipMisc,
    ProofreadEnd,
    ExtendBranch,
    JumpAndReport,
    Xfunc2,
    Cursor,
}

/// Fixed join table between layout controls and engine geometry codes.
///
/// The engine indexes geometry both by position and by code, so the order
/// and the codes here are part of the wire contract.
pub const HIT_RECT_TABLE: [(ControlId, i32); 10] = [
    (ControlId::Rotate, 101),
    (ControlId::Zoom, 102),
    (ControlId::DataOnly, 103),
    (ControlId::Xfunc, 104),
    (ControlId::SkipMisc, 105),
    (ControlId::ProofreadEnd, 106),
    (ControlId::ExtendBranch, 107),
    (ControlId::JumpAndReport, 108),
    (ControlId::Xfunc2, 109),
    (ControlId::Cursor, 201),
];

impl ControlId {
    /// Engine code for this control, from [`HIT_RECT_TABLE`].
    pub fn engine_code(self) -> i32 {
        HIT_RECT_TABLE
            .iter()
            .find(|(id, _)| *id == self)
            .map(|(_, code)| *code)
            .unwrap_or_default()
    }

    /// Reverse lookup of an engine code.
    pub fn from_engine_code(code: i32) -> Option<Self> {
        HIT_RECT_TABLE
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(id, _)| *id)
    }

    /// All tracked controls in table order.
    pub fn all() -> impl Iterator<Item = ControlId> {
        HIT_RECT_TABLE.iter().map(|(id, _)| *id)
    }
}

/// Rectangle in device pixels. All-zero means "control absent".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Hit test in the same coordinate space touches are delivered in.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

/// One entry of a geometry report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryRecord {
    pub engine_code: i32,
    pub rect: Rect,
}

/// Errors decoding a flat geometry array on the engine side.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GeometryError {
    #[error("geometry array length {0} is not a multiple of {RECORD_WIDTH}")]
    Misaligned(usize),
}

/// Full geometry table sent to the engine after one layout pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeometryBatch {
    records: Vec<GeometryRecord>,
}

impl GeometryBatch {
    pub fn new(records: Vec<GeometryRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[GeometryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rectangle reported for an engine code, if the code is in the batch.
    pub fn rect_for(&self, engine_code: i32) -> Option<Rect> {
        self.records
            .iter()
            .find(|r| r.engine_code == engine_code)
            .map(|r| r.rect)
    }

    /// Encode as the flat wire array, five integers per record.
    pub fn to_flat(&self) -> Vec<i32> {
        let mut data = Vec::with_capacity(self.records.len() * RECORD_WIDTH);
        for record in &self.records {
            data.extend_from_slice(&[
                record.engine_code,
                record.rect.left,
                record.rect.top,
                record.rect.right,
                record.rect.bottom,
            ]);
        }
        data
    }

    /// Decode a flat wire array, as the engine does when it replaces its table.
    pub fn from_flat(data: &[i32]) -> Result<Self, GeometryError> {
        if data.len() % RECORD_WIDTH != 0 {
            return Err(GeometryError::Misaligned(data.len()));
        }
        let records = data
            .chunks_exact(RECORD_WIDTH)
            .map(|c| GeometryRecord {
                engine_code: c[0],
                rect: Rect::new(c[1], c[2], c[3], c[4]),
            })
            .collect();
        Ok(Self { records })
    }
}

/// Display widgets an overlay layout may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayId {
    RepoTitle,
    OpeningProgress,
    ModelProgress,
    ImageProgress,
    PrimaryValue,
    SecondaryValue,
}

impl DisplayId {
    pub const ALL: [DisplayId; 6] = [
        DisplayId::RepoTitle,
        DisplayId::OpeningProgress,
        DisplayId::ModelProgress,
        DisplayId::ImageProgress,
        DisplayId::PrimaryValue,
        DisplayId::SecondaryValue,
    ];
}

/// The inflated overlay view tree: hit rectangles of the controls present
/// and the set of display widgets present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayLayout {
    pub controls: IndexMap<ControlId, Rect>,
    pub displays: Vec<DisplayId>,
}

impl OverlayLayout {
    /// Standard landscape layout: a column of buttons along the right edge,
    /// the cursor pad bottom-left, every display widget present.
    pub fn standard(width: i32, height: i32) -> Self {
        let button = (height / 10).max(1);
        let margin = button / 4;
        let left = width - button - margin;

        let mut controls = IndexMap::new();
        let column = [
            ControlId::Rotate,
            ControlId::Zoom,
            ControlId::DataOnly,
            ControlId::Xfunc,
            ControlId::SkipMisc,
            ControlId::ProofreadEnd,
            ControlId::ExtendBranch,
            ControlId::JumpAndReport,
            ControlId::Xfunc2,
        ];
        for (row, id) in column.into_iter().enumerate() {
            let top = margin + row as i32 * button;
            controls.insert(id, Rect::new(left, top, left + button, top + button));
        }
        let pad = button * 2;
        controls.insert(
            ControlId::Cursor,
            Rect::new(margin, height - pad - margin, margin + pad, height - margin),
        );

        Self {
            controls,
            displays: DisplayId::ALL.to_vec(),
        }
    }

    /// Hit rectangle of a control, `None` when the layout lacks it.
    pub fn hit_rect(&self, id: ControlId) -> Option<Rect> {
        self.controls.get(&id).copied()
    }

    pub fn has_display(&self, id: DisplayId) -> bool {
        self.displays.contains(&id)
    }

    pub fn without_control(mut self, id: ControlId) -> Self {
        self.controls.shift_remove(&id);
        self
    }

    pub fn without_display(mut self, id: DisplayId) -> Self {
        self.displays.retain(|d| *d != id);
        self
    }
}
