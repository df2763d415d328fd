//! Movement log — append-only audit trail of location changes
//!
//! One row per successful location update:
//!
//! ```text
//! key,previous_locations,new_locations,timestamp
//! OBEN001,"Room A,Room B",Room C,2026-03-14 09:26:53
//! ```
//!
//! Rows are only ever appended. The header goes in when the write position
//! is zero, so a file that exists but is empty still gets one.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{finish, row_writer};
use crate::config::Config;
use crate::error::{ShelfError, ShelfResult};
use crate::platform_durability::durable_sync;
use crate::record::join_locations;

/// Column names of the movement file, in order
pub const MOVEMENT_HEADER: [&str; 4] = ["key", "previous_locations", "new_locations", "timestamp"];

/// Timestamp layout, local wall clock, second precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One audited location change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Product key at the time of the move; not checked against the catalog
    pub key: String,
    /// Locations before the move, comma-joined
    pub previous_locations: String,
    /// Locations after the move, comma-joined
    pub new_locations: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
}

impl Movement {
    /// Parsed timestamp, `None` if the cell was edited into another shape.
    pub fn recorded_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT).ok()
    }
}

/// Append-only movement audit file.
#[derive(Debug, Clone)]
pub struct MovementLog {
    path: PathBuf,
    durable: bool,
}

impl MovementLog {
    /// Log at `path` with durable appends.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            durable: true,
        }
    }

    /// Log described by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            path: config.movements_path(),
            durable: config.durable_writes,
        }
    }

    /// Turn durable sync on or off.
    pub fn with_durability(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    /// Movement file path (for diagnostics)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one movement row stamped with `now`.
    ///
    /// The header is written first iff the write position is zero.
    pub fn record_move(
        &self,
        key: &str,
        previous_locations: &[String],
        new_locations: &[String],
        now: NaiveDateTime,
    ) -> ShelfResult<Movement> {
        let movement = Movement {
            key: key.to_string(),
            previous_locations: join_locations(previous_locations),
            new_locations: join_locations(new_locations),
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ShelfError::io(&self.path, "failed to open movement log", e))?;

        let position = file
            .seek(SeekFrom::End(0))
            .map_err(|e| ShelfError::io(&self.path, "failed to seek movement log", e))?;

        let mut writer = row_writer(file);
        if position == 0 {
            writer
                .write_record(MOVEMENT_HEADER)
                .map_err(|e| ShelfError::csv(&self.path, e))?;
        }
        writer
            .serialize(&movement)
            .map_err(|e| ShelfError::csv(&self.path, e))?;

        let file = finish(writer, &self.path)?;
        if self.durable {
            durable_sync(&file)
                .map_err(|e| ShelfError::io(&self.path, "movement log durable_sync failed", e))?;
        }

        info!(
            target: "shelfstore::movement",
            key,
            from = %movement.previous_locations,
            to = %movement.new_locations,
            "movement recorded"
        );
        Ok(movement)
    }

    /// Every movement in write order. A missing file is an empty log.
    pub fn read_all(&self) -> ShelfResult<Vec<Movement>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ShelfError::io(&self.path, "failed to open movement log", e)),
        };

        csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(BufReader::new(file))
            .deserialize::<Movement>()
            .map(|row| row.map_err(|e| ShelfError::csv(&self.path, e)))
            .collect()
    }

    /// Movements of one product, oldest first.
    pub fn history(&self, key: &str) -> ShelfResult<Vec<Movement>> {
        let mut movements = self.read_all()?;
        movements.retain(|m| m.key == key);
        Ok(movements)
    }
}
