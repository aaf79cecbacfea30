use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use super::{BackendError, BackendResult, RsvpQuery, SortOrder};
use crate::domain::rsvp::{RsvpFields, RsvpId, RsvpRecord};

const SELECT_COLUMNS: &str = r#"
    SELECT id, guest_name, email, phone, attendee_count, attendance,
           gender_prediction, dietary_restrictions, special_message,
           created_at, updated_at
    FROM rsvp_responses
"#;

#[derive(Clone)]
pub struct RsvpRepository {
    pool: Arc<SqlitePool>,
}

impl RsvpRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        fields: &RsvpFields,
        created_at: DateTime<Utc>,
    ) -> BackendResult<RsvpRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO rsvp_responses (
                guest_name, email, phone, attendee_count, attendance,
                gender_prediction, dietary_restrictions, special_message, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fields.guest_name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(i64::from(fields.attendee_count))
        .bind(fields.attendance.as_str())
        .bind(fields.gender_prediction.as_str())
        .bind(&fields.dietary_restrictions)
        .bind(&fields.special_message)
        .bind(format_timestamp(created_at))
        .execute(&*self.pool)
        .await?;

        let id = result.last_insert_rowid();
        // Read back so the caller sees exactly what was stored
        self.get(id).await?.ok_or(BackendError::NotFound(id))
    }

    pub async fn update(
        &self,
        id: RsvpId,
        fields: &RsvpFields,
        updated_at: DateTime<Utc>,
    ) -> BackendResult<RsvpRecord> {
        let result = sqlx::query(
            r#"
            UPDATE rsvp_responses SET
                guest_name = ?, email = ?, phone = ?, attendee_count = ?,
                attendance = ?, gender_prediction = ?, dietary_restrictions = ?,
                special_message = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&fields.guest_name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(i64::from(fields.attendee_count))
        .bind(fields.attendance.as_str())
        .bind(fields.gender_prediction.as_str())
        .bind(&fields.dietary_restrictions)
        .bind(&fields.special_message)
        .bind(format_timestamp(updated_at))
        .bind(id)
        .execute(&*self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound(id));
        }

        self.get(id).await?.ok_or(BackendError::NotFound(id))
    }

    pub async fn get(&self, id: RsvpId) -> BackendResult<Option<RsvpRecord>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;

        row.map(row_to_record).transpose()
    }

    pub async fn delete(&self, id: RsvpId) -> BackendResult<()> {
        let result = sqlx::query("DELETE FROM rsvp_responses WHERE id = ?")
            .bind(id)
            .execute(&*self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound(id));
        }
        Ok(())
    }

    pub async fn list(&self, query: &RsvpQuery) -> BackendResult<Vec<RsvpRecord>> {
        let mut sql = format!("{} WHERE 1=1", SELECT_COLUMNS);

        // Enum wire names are fixed literals, safe to inline
        if let Some(attendance) = &query.attendance {
            sql.push_str(&format!(" AND attendance = '{}'", attendance.as_str()));
        }
        if let Some(prediction) = &query.gender_prediction {
            sql.push_str(&format!(" AND gender_prediction = '{}'", prediction.as_str()));
        }

        match query.order {
            SortOrder::Ascending => sql.push_str(" ORDER BY created_at ASC, id ASC"),
            SortOrder::Descending => sql.push_str(" ORDER BY created_at DESC, id DESC"),
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let rows = sqlx::query(&sql).fetch_all(&*self.pool).await?;
        rows.into_iter().map(row_to_record).collect()
    }

    pub async fn count(&self) -> BackendResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rsvp_responses")
            .fetch_one(&*self.pool)
            .await?;
        Ok(count)
    }
}

/// Fixed precision keeps lexical order equal to chronological order.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> BackendResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BackendError::Rejected(format!("invalid timestamp {:?}: {}", raw, e)))
}

fn row_to_record(row: SqliteRow) -> BackendResult<RsvpRecord> {
    let id: RsvpId = row.try_get("id")?;

    // Legacy rows without a head count count as one guest
    let raw_count: Option<i64> = row.try_get("attendee_count")?;
    let attendee_count = u8::try_from(raw_count.unwrap_or(1)).map_err(|_| {
        BackendError::Rejected(format!("record {} has an invalid attendee count", id))
    })?;

    let attendance = row
        .try_get::<String, _>("attendance")?
        .parse()
        .map_err(|e| BackendError::Rejected(format!("record {}: {}", id, e)))?;
    let gender_prediction = row
        .try_get::<String, _>("gender_prediction")?
        .parse()
        .map_err(|e| BackendError::Rejected(format!("record {}: {}", id, e)))?;

    let created_at = parse_timestamp(&row.try_get::<String, _>("created_at")?)?;
    let updated_at = row
        .try_get::<Option<String>, _>("updated_at")?
        .map(|raw| parse_timestamp(&raw))
        .transpose()?;

    Ok(RsvpRecord {
        id,
        guest_name: row.try_get("guest_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        attendee_count,
        attendance,
        gender_prediction,
        dietary_restrictions: row.try_get("dietary_restrictions")?,
        special_message: row.try_get("special_message")?,
        created_at,
        updated_at,
    })
}
