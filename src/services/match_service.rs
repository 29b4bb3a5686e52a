use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::models::pupil::{NewPupil, Pupil};
use crate::models::pupil_tutor_match::PupilTutorMatch;
use crate::models::request_for_tutor::RequestForTutor;
use crate::models::subject::Subject;
use crate::models::tutor::{NewTutor, Tutor};
use crate::utils::time::now;

/// Subjects, pupils, tutors and the matches between them.
#[derive(Clone)]
pub struct MatchService {
    pool: SqlitePool,
}

impl MatchService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_subject(&self, name: &str) -> Result<Subject> {
        let subject = sqlx::query_as::<_, Subject>(
            r#"
            INSERT INTO subjects (name)
            VALUES (?)
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::from)
        .map_err(|e| {
            if e.is_unique_violation() {
                Error::Conflict(format!("Subject {:?} already exists", name))
            } else {
                e
            }
        })?;

        Ok(subject)
    }

    pub async fn create_pupil(&self, new: NewPupil) -> Result<Pupil> {
        let mut tx = self.pool.begin().await?;

        let pupil = sqlx::query_as::<_, Pupil>(
            r#"
            INSERT INTO pupils (name, surname, email, contact_number, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&new.name)
        .bind(&new.surname)
        .bind(&new.email)
        .bind(&new.contact_number)
        .bind(now())
        .fetch_one(&mut *tx)
        .await?;

        for subject_id in &new.subject_ids {
            sqlx::query("INSERT OR IGNORE INTO pupil_subjects (pupil_id, subject_id) VALUES (?, ?)")
                .bind(pupil.id)
                .bind(subject_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(pupil_id = pupil.id, subjects = new.subject_ids.len(), "pupil created");
        Ok(pupil)
    }

    pub async fn create_tutor(&self, new: NewTutor) -> Result<Tutor> {
        let mut tx = self.pool.begin().await?;

        let tutor = sqlx::query_as::<_, Tutor>(
            r#"
            INSERT INTO tutors (name, surname, email, mobile, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&new.name)
        .bind(&new.surname)
        .bind(&new.email)
        .bind(&new.mobile)
        .bind(new.status.as_deref().unwrap_or("pending"))
        .bind(now())
        .fetch_one(&mut *tx)
        .await?;

        for subject_id in &new.subject_ids {
            sqlx::query("INSERT OR IGNORE INTO tutor_subjects (tutor_id, subject_id) VALUES (?, ?)")
                .bind(tutor.id)
                .bind(subject_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(tutor_id = tutor.id, subjects = new.subject_ids.len(), "tutor registered");
        Ok(tutor)
    }

    pub async fn get_pupil(&self, id: i64) -> Result<Pupil> {
        sqlx::query_as::<_, Pupil>("SELECT * FROM pupils WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Pupil {} not found", id)))
    }

    pub async fn get_tutor(&self, id: i64) -> Result<Tutor> {
        sqlx::query_as::<_, Tutor>("SELECT * FROM tutors WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Tutor {} not found", id)))
    }

    pub async fn tutor_subjects(&self, tutor_id: i64) -> Result<Vec<Subject>> {
        let subjects = sqlx::query_as::<_, Subject>(
            r#"
            SELECT s.id, s.name
            FROM subjects s
            JOIN tutor_subjects ts ON ts.subject_id = s.id
            WHERE ts.tutor_id = ?
            ORDER BY s.id
            "#,
        )
        .bind(tutor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(subjects)
    }

    /// Subjects the pupil needs that no tutor has been matched to yet.
    pub async fn unmatched_subjects(&self, pupil_id: i64) -> Result<Vec<Subject>> {
        let subjects = sqlx::query_as::<_, Subject>(
            r#"
            SELECT s.id, s.name
            FROM subjects s
            JOIN pupil_subjects ps ON ps.subject_id = s.id
            WHERE ps.pupil_id = ?
              AND NOT EXISTS (
                  SELECT 1 FROM pupil_tutor_matches m
                  WHERE m.pupil_id = ps.pupil_id AND m.subject_id = ps.subject_id
              )
            ORDER BY s.id
            "#,
        )
        .bind(pupil_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(subjects)
    }

    pub async fn pupils_with_unmatched_subjects(&self) -> Result<Vec<Pupil>> {
        let pupils = sqlx::query_as::<_, Pupil>(
            r#"
            SELECT p.* FROM pupils p
            WHERE EXISTS (
                SELECT 1 FROM pupil_subjects ps
                WHERE ps.pupil_id = p.id
                  AND NOT EXISTS (
                      SELECT 1 FROM pupil_tutor_matches m
                      WHERE m.pupil_id = ps.pupil_id AND m.subject_id = ps.subject_id
                  )
            )
            ORDER BY p.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(pupils)
    }

    pub async fn pupils_fully_matched(&self) -> Result<Vec<Pupil>> {
        let pupils = sqlx::query_as::<_, Pupil>(
            r#"
            SELECT p.* FROM pupils p
            WHERE EXISTS (SELECT 1 FROM pupil_subjects ps WHERE ps.pupil_id = p.id)
              AND NOT EXISTS (
                  SELECT 1 FROM pupil_subjects ps
                  WHERE ps.pupil_id = p.id
                    AND NOT EXISTS (
                        SELECT 1 FROM pupil_tutor_matches m
                        WHERE m.pupil_id = ps.pupil_id AND m.subject_id = ps.subject_id
                    )
              )
            ORDER BY p.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(pupils)
    }

    pub async fn create_match(
        &self,
        pupil_id: i64,
        tutor_id: i64,
        subject_id: i64,
        start_date: NaiveDate,
    ) -> Result<PupilTutorMatch> {
        let created = sqlx::query_as::<_, PupilTutorMatch>(
            r#"
            INSERT INTO pupil_tutor_matches (pupil_id, tutor_id, subject_id, start_date)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(pupil_id)
        .bind(tutor_id)
        .bind(subject_id)
        .bind(start_date)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::from)
        .map_err(|e| {
            if e.is_unique_violation() {
                Error::Conflict(format!(
                    "Subject {} is already matched for pupil {}",
                    subject_id, pupil_id
                ))
            } else if e.is_foreign_key_violation() {
                Error::NotFound(format!(
                    "Pupil {}, tutor {} or subject {} not found",
                    pupil_id, tutor_id, subject_id
                ))
            } else {
                e
            }
        })?;

        tracing::info!(pupil_id, tutor_id, subject_id, "pupil matched with tutor");
        Ok(created)
    }

    /// Turns an accepted request into a match for the request's pupil and subject.
    pub async fn confirm_request(
        &self,
        request_id: i64,
        tutor_id: i64,
        start_date: NaiveDate,
    ) -> Result<PupilTutorMatch> {
        let request = sqlx::query_as::<_, RequestForTutor>(
            "SELECT * FROM requests_for_tutor WHERE id = ?",
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Request {} not found", request_id)))?;

        self.get_tutor(tutor_id).await?;

        let already_matched: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM pupil_tutor_matches WHERE pupil_id = ? AND subject_id = ?)",
        )
        .bind(request.pupil_id)
        .bind(request.subject_id)
        .fetch_one(&self.pool)
        .await?;
        if already_matched {
            return Err(Error::Conflict(format!(
                "Subject {} is already matched for pupil {}",
                request.subject_id, request.pupil_id
            )));
        }

        self.create_match(request.pupil_id, tutor_id, request.subject_id, start_date)
            .await
    }
}
