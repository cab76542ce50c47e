use crate::beacon::{EntropyBeacon, SimulatedBeacon};
use crate::error::Result;
use crate::storage::{from_sql_int, read_meta_u64, to_sql_int, write_meta, Storage};
use crate::types::Hash32;
use rusqlite::{params, Transaction};
use std::collections::BTreeMap;

const TIP: &str = "beacon_tip";
const RETENTION: &str = "beacon_retention";

pub struct BeaconStore<'a> {
    storage: &'a Storage,
}

impl<'a> BeaconStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_beacon(&self, beacon: &SimulatedBeacon) -> Result<()> {
        self.storage
            .write_atomically(|tx| Self::write_beacon(tx, beacon))
            .await
    }

    /// Replace the stored beacon inside a transaction owned by the caller.
    pub fn write_beacon(tx: &Transaction<'_>, beacon: &SimulatedBeacon) -> Result<()> {
        tx.execute("DELETE FROM beacon_samples", [])?;
        for (checkpoint, sample) in beacon.retained() {
            tx.execute(
                "INSERT INTO beacon_samples (checkpoint, sample) VALUES (?1, ?2)",
                params![to_sql_int(checkpoint)?, sample.to_string()],
            )?;
        }
        write_meta(tx, TIP, &beacon.tip().to_string())?;
        write_meta(tx, RETENTION, &beacon.retention().to_string())
    }

    /// Restore the beacon, or `None` if none was ever saved.
    pub async fn load_beacon(&self) -> Result<Option<SimulatedBeacon>> {
        let conn = self.storage.get_connection().await;

        let (Some(tip), Some(retention)) = (
            read_meta_u64(&conn, TIP)?,
            read_meta_u64(&conn, RETENTION)?,
        ) else {
            return Ok(None);
        };

        let mut stmt = conn.prepare("SELECT checkpoint, sample FROM beacon_samples")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut samples = BTreeMap::new();
        for row in rows {
            let (checkpoint, sample) = row?;
            samples.insert(from_sql_int(checkpoint)?, sample.parse::<Hash32>()?);
        }

        Ok(Some(SimulatedBeacon::from_samples(retention, tip, samples)))
    }
}
