//! Normalized routine definition storage.
//!
//! Definitions live in `routine_definitions`, their items in `routine_items`.
//! A stored row whose schedule, slot, status or classification no longer
//! decodes fails the whole load with a deserialization error.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{RoutineError, RoutineResult};
use crate::routines::schedule::{Schedule, ScheduleConfig, ScheduleRecord};
use crate::routines::types::{
    DayOfWeek, DefinitionStatus, RoutineDefinition, RoutineItem, TimeOfDay,
};
use crate::storage::database::DatabaseError;
use crate::storage::rows;

/// Outcome of an upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Store for an owner's routine definitions.
pub struct RoutineStore<'a> {
    conn: &'a Connection,
}

impl<'a> RoutineStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// All definitions of the owner, oldest first.
    pub fn list_definitions(&self, owner_id: &str) -> RoutineResult<Vec<RoutineDefinition>> {
        load_definitions(self.conn, owner_id)
    }

    /// One of the owner's definitions, if it exists.
    pub fn get_definition(&self, owner_id: &str, id: Uuid) -> RoutineResult<Option<RoutineDefinition>> {
        find_definition(self.conn, owner_id, id)
    }

    /// Active definitions of the owner, oldest first.
    pub fn list_active(&self, owner_id: &str) -> RoutineResult<Vec<RoutineDefinition>> {
        Ok(self
            .list_definitions(owner_id)?
            .into_iter()
            .filter(RoutineDefinition::is_active)
            .collect())
    }

    /// Latest change to any of the owner's definitions.
    pub fn last_modified(&self, owner_id: &str) -> RoutineResult<Option<DateTime<Utc>>> {
        let raw: Option<String> = self.conn.query_row(
            "SELECT MAX(updated_at) FROM routine_definitions WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )?;

        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| RoutineError::Store(DatabaseError::DeserializationError(e.to_string())))
        })
        .transpose()
    }

    /// Merge definitions into the owner's set.
    ///
    /// A definition is the same commitment as a stored, non-archived one when
    /// schedule and time of day agree. Matches take the incoming status and
    /// merge items by name; anything else is inserted. Applying the same
    /// payload twice leaves the store as applying it once.
    pub fn upsert_definitions(
        &self,
        owner_id: &str,
        definitions: &[RoutineDefinition],
    ) -> RoutineResult<UpsertSummary> {
        for definition in definitions {
            definition.validate()?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut existing: Vec<RoutineDefinition> = load_definitions(&tx, owner_id)?
            .into_iter()
            .filter(|d| d.status != DefinitionStatus::Archived)
            .collect();
        let mut summary = UpsertSummary::default();
        let now = Utc::now();

        for incoming in definitions {
            let key = incoming.schedule.canonical_key();
            let matched = existing
                .iter()
                .position(|d| d.schedule.canonical_key() == key && d.time_of_day == incoming.time_of_day)
                .or_else(|| existing.iter().position(|d| d.id == incoming.id));

            match matched {
                Some(index) => {
                    let target = &mut existing[index];
                    tx.execute(
                        "UPDATE routine_definitions
                         SET schedule_type = ?1, schedule_config = ?2, time_of_day = ?3,
                             status = ?4, updated_at = ?5
                         WHERE id = ?6",
                        params![
                            incoming.schedule.kind(),
                            schedule_config_json(&incoming.schedule)?,
                            incoming.time_of_day.map(|t| t.as_str()),
                            incoming.status.as_str(),
                            rows::format_timestamp(&now),
                            target.id.to_string(),
                        ],
                    )?;
                    merge_items(&tx, target.id, &incoming.items)?;

                    target.schedule = incoming.schedule.clone();
                    target.time_of_day = incoming.time_of_day;
                    target.status = incoming.status;
                    summary.updated += 1;
                }
                None => {
                    let mut definition = incoming.clone();
                    if id_taken(&tx, definition.id)? {
                        definition.id = Uuid::new_v4();
                    }
                    definition.owner_id = owner_id.to_string();
                    definition.created_at = now;
                    definition.updated_at = now;
                    insert_definition(&tx, &definition)?;
                    existing.push(definition);
                    summary.inserted += 1;
                }
            }
        }

        tx.commit()?;
        tracing::info!(
            owner_id,
            inserted = summary.inserted,
            updated = summary.updated,
            "Upserted routine definitions"
        );
        Ok(summary)
    }

    /// Archive one of the owner's definitions.
    pub fn archive_definition(&self, owner_id: &str, id: Uuid) -> RoutineResult<()> {
        let archived = self.conn.execute(
            "UPDATE routine_definitions SET status = 'archived', updated_at = ?1
             WHERE id = ?2 AND owner_id = ?3",
            params![rows::format_timestamp(&Utc::now()), id.to_string(), owner_id],
        )?;

        if archived == 0 {
            return Err(RoutineError::NotFound(format!("routine definition {id}")));
        }
        Ok(())
    }

    /// Remove an item from the owner's routine on one weekday and slot.
    ///
    /// Only active weekly definitions are addressed by weekday. A definition
    /// spanning several days loses this day, which moves to a new single-day
    /// definition without the item.
    pub fn delete_item(
        &self,
        owner_id: &str,
        day: DayOfWeek,
        time_of_day: TimeOfDay,
        item_name: &str,
    ) -> RoutineResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let now = Utc::now();

        let targets: Vec<RoutineDefinition> = load_definitions(&tx, owner_id)?
            .into_iter()
            .filter(|d| d.is_active() && d.time_of_day == Some(time_of_day))
            .filter(|d| matches!(&d.schedule, Schedule::Weekly { days_of_week } if days_of_week.contains(&day.index())))
            .filter(|d| d.items.iter().any(|item| item.same_name(item_name)))
            .collect();

        if targets.is_empty() {
            return Err(RoutineError::NotFound(format!(
                "no '{item_name}' item on {day} {time_of_day}"
            )));
        }

        for definition in targets {
            let Schedule::Weekly { days_of_week } = &definition.schedule else {
                continue;
            };

            if days_of_week.len() == 1 {
                for (row_id, _) in item_rows(&tx, definition.id)?
                    .into_iter()
                    .filter(|(_, name)| name.trim().eq_ignore_ascii_case(item_name.trim()))
                {
                    tx.execute("DELETE FROM routine_items WHERE id = ?1", params![row_id])?;
                }
                tx.execute(
                    "UPDATE routine_definitions SET updated_at = ?1 WHERE id = ?2",
                    params![rows::format_timestamp(&now), definition.id.to_string()],
                )?;
            } else {
                let remaining = Schedule::weekly(days_of_week.iter().copied().filter(|d| *d != day.index()));
                tx.execute(
                    "UPDATE routine_definitions SET schedule_config = ?1, updated_at = ?2 WHERE id = ?3",
                    params![
                        schedule_config_json(&remaining)?,
                        rows::format_timestamp(&now),
                        definition.id.to_string()
                    ],
                )?;

                let mut split = RoutineDefinition::new(owner_id, Schedule::weekly([day.index()]), Some(time_of_day));
                split.status = definition.status;
                split.items = definition
                    .items
                    .iter()
                    .filter(|item| !item.same_name(item_name))
                    .cloned()
                    .collect();
                split.created_at = now;
                split.updated_at = now;
                insert_definition(&tx, &split)?;
            }
        }

        tx.commit()?;
        tracing::info!(owner_id, %day, %time_of_day, item_name, "Deleted routine item");
        Ok(())
    }
}

fn schedule_config_json(schedule: &Schedule) -> RoutineResult<String> {
    serde_json::to_string(&schedule.to_record().schedule_config)
        .map_err(|e| RoutineError::Store(DatabaseError::SerializationError(e.to_string())))
}

/// Whether any definition row, of any owner or status, already uses `id`.
fn id_taken(conn: &Connection, id: Uuid) -> RoutineResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM routine_definitions WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn insert_definition(conn: &Connection, definition: &RoutineDefinition) -> RoutineResult<()> {
    conn.execute(
        "INSERT INTO routine_definitions
         (id, owner_id, schedule_type, schedule_config, time_of_day, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            definition.id.to_string(),
            definition.owner_id,
            definition.schedule.kind(),
            schedule_config_json(&definition.schedule)?,
            definition.time_of_day.map(|t| t.as_str()),
            definition.status.as_str(),
            rows::format_timestamp(&definition.created_at),
            rows::format_timestamp(&definition.updated_at),
        ],
    )?;

    for item in &definition.items {
        insert_item(conn, definition.id, item)?;
    }
    Ok(())
}

fn insert_item(conn: &Connection, definition_id: Uuid, item: &RoutineItem) -> RoutineResult<i64> {
    conn.execute(
        "INSERT INTO routine_items
         (definition_id, name, item_type, classification, duration_minutes, sets, reps,
          weight_kg, distance_km, calories, is_optional, item_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            definition_id.to_string(),
            item.name.trim(),
            item.item_type,
            item.classification.as_str(),
            item.duration_minutes,
            item.sets,
            item.reps,
            item.weight_kg,
            item.distance_km,
            item.calories,
            item.is_optional,
            item.order,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Row id and name of each item of a definition.
fn item_rows(conn: &Connection, definition_id: Uuid) -> RoutineResult<Vec<(i64, String)>> {
    let mut stmt = conn.prepare("SELECT id, name FROM routine_items WHERE definition_id = ?1")?;
    let rows = stmt.query_map(params![definition_id.to_string()], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(RoutineError::from)
}

/// Update items whose name is already present, append the rest.
fn merge_items(conn: &Connection, definition_id: Uuid, incoming: &[RoutineItem]) -> RoutineResult<()> {
    let mut known = item_rows(conn, definition_id)?;

    for item in incoming {
        let existing = known
            .iter()
            .find(|(_, name)| item.same_name(name))
            .map(|(row_id, _)| *row_id);

        match existing {
            Some(row_id) => {
                conn.execute(
                    "UPDATE routine_items
                     SET item_type = ?1, classification = ?2, duration_minutes = ?3, sets = ?4,
                         reps = ?5, weight_kg = ?6, distance_km = ?7, calories = ?8,
                         is_optional = ?9, item_order = ?10
                     WHERE id = ?11",
                    params![
                        item.item_type,
                        item.classification.as_str(),
                        item.duration_minutes,
                        item.sets,
                        item.reps,
                        item.weight_kg,
                        item.distance_km,
                        item.calories,
                        item.is_optional,
                        item.order,
                        row_id,
                    ],
                )?;
            }
            None => {
                let row_id = insert_item(conn, definition_id, item)?;
                known.push((row_id, item.name.trim().to_string()));
            }
        }
    }
    Ok(())
}

/// Raw definition columns before decoding.
struct DefinitionRow {
    id: Uuid,
    owner_id: String,
    schedule_type: String,
    schedule_config: String,
    time_of_day: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DefinitionRow {
    /// Decode the loose columns; `Err` carries the reason they don't decode.
    fn into_definition(self, items: Vec<RoutineItem>) -> Result<RoutineDefinition, String> {
        let schedule_config: ScheduleConfig =
            serde_json::from_str(&self.schedule_config).map_err(|e| e.to_string())?;
        let schedule = Schedule::try_from(ScheduleRecord {
            schedule_type: self.schedule_type,
            schedule_config,
        })
        .map_err(|e| e.to_string())?;
        let time_of_day = self
            .time_of_day
            .map(|t| t.parse::<TimeOfDay>())
            .transpose()
            .map_err(|e| e.to_string())?;
        let status = self.status.parse::<DefinitionStatus>().map_err(|e| e.to_string())?;

        Ok(RoutineDefinition {
            id: self.id,
            owner_id: self.owner_id,
            schedule,
            time_of_day,
            status,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn load_definitions(conn: &Connection, owner_id: &str) -> RoutineResult<Vec<RoutineDefinition>> {
    let mut items = load_items(conn, owner_id)?;

    let mut stmt = conn.prepare(
        "SELECT id, owner_id, schedule_type, schedule_config, time_of_day, status,
                created_at, updated_at
         FROM routine_definitions
         WHERE owner_id = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;

    let rows = stmt.query_map(params![owner_id], |row| {
        Ok(DefinitionRow {
            id: rows::uuid(row, 0)?,
            owner_id: row.get(1)?,
            schedule_type: row.get(2)?,
            schedule_config: row.get(3)?,
            time_of_day: row.get(4)?,
            status: row.get(5)?,
            created_at: rows::timestamp(row, 6)?,
            updated_at: rows::timestamp(row, 7)?,
        })
    })?;

    let mut definitions = Vec::new();
    for row in rows {
        let row = row?;
        let id = row.id;
        let definition_items = items.remove(&id).unwrap_or_default();
        let definition = row.into_definition(definition_items).map_err(|reason| {
            tracing::error!(owner_id, %id, %reason, "Undecodable routine definition");
            RoutineError::Store(DatabaseError::DeserializationError(format!(
                "routine definition {id}: {reason}"
            )))
        })?;
        definitions.push(definition);
    }

    Ok(definitions)
}

fn load_items(conn: &Connection, owner_id: &str) -> RoutineResult<HashMap<Uuid, Vec<RoutineItem>>> {
    let mut stmt = conn.prepare(
        "SELECT i.definition_id, i.name, i.item_type, i.classification, i.duration_minutes,
                i.sets, i.reps, i.weight_kg, i.distance_km, i.calories, i.is_optional, i.item_order
         FROM routine_items i
         JOIN routine_definitions d ON d.id = i.definition_id
         WHERE d.owner_id = ?1
         ORDER BY i.item_order ASC, i.id ASC",
    )?;

    let rows = stmt.query_map(params![owner_id], |row| {
        let definition_id = rows::uuid(row, 0)?;
        let item = RoutineItem {
            name: row.get(1)?,
            item_type: row.get(2)?,
            classification: rows::parsed(row, 3)?,
            duration_minutes: row.get(4)?,
            sets: row.get(5)?,
            reps: row.get(6)?,
            weight_kg: row.get(7)?,
            distance_km: row.get(8)?,
            calories: row.get(9)?,
            is_optional: row.get(10)?,
            order: row.get(11)?,
        };
        Ok((definition_id, item))
    })?;

    let mut grouped: HashMap<Uuid, Vec<RoutineItem>> = HashMap::new();
    for row in rows {
        let (definition_id, item) = row?;
        grouped.entry(definition_id).or_default().push(item);
    }
    Ok(grouped)
}

fn find_definition(
    conn: &Connection,
    owner_id: &str,
    id: Uuid,
) -> RoutineResult<Option<RoutineDefinition>> {
    let exists: Option<String> = conn
        .query_row(
            "SELECT id FROM routine_definitions WHERE id = ?1 AND owner_id = ?2",
            params![id.to_string(), owner_id],
            |row| row.get(0),
        )
        .optional()?;

    match exists {
        Some(_) => Ok(load_definitions(conn, owner_id)?.into_iter().find(|d| d.id == id)),
        None => Ok(None),
    }
}
