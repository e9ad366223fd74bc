//! [`SqliteStore`]: the SQLite implementation of the onboarding collaborator
//! traits.

use std::path::Path;

use chrono::Utc;
use mandi_core::{
  fragment::Fragment,
  membership::{CategoryId, CategoryMembership, SubcategoryId},
  participant::{IdentityPatch, NewParticipant, Participant},
  role::{AppTier, Role},
  store::{
    Backend, EmailUniquenessChecker, FragmentStore, MembershipStore,
    ParticipantStore, SubcategoryCatalog,
  },
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    FRAGMENT_COLUMNS, PARTICIPANT_COLUMNS, RawFragment, RawMembership,
    RawParticipant, encode_dt, encode_uuid,
  },
  schema::{PRAGMAS, SCHEMA, SCHEMA_VERSION},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A mandi store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a throwaway in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Apply connection pragmas, then the schema if the database is behind
  /// [`SCHEMA_VERSION`]. Returns whether the schema batch ran.
  pub(crate) async fn init_schema(&self) -> Result<bool> {
    let migrated = self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        let version: i64 =
          conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version >= SCHEMA_VERSION {
          return Ok(false);
        }
        conn.execute_batch(SCHEMA)?;
        Ok(true)
      })
      .await?;
    if migrated {
      tracing::debug!(version = SCHEMA_VERSION, "schema initialised");
    }
    Ok(migrated)
  }

  /// Register or re-parent a catalog subcategory.
  pub async fn upsert_subcategory(
    &self,
    subcategory_id: SubcategoryId,
    category_id: CategoryId,
    name: Option<String>,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subcategories (subcategory_id, category_id, name)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(subcategory_id) DO UPDATE SET
             category_id = excluded.category_id,
             name        = COALESCE(excluded.name, subcategories.name)",
          rusqlite::params![subcategory_id.0, category_id.0, name],
        )?;
        Ok(())
      })
      .await?;
    tracing::debug!(%subcategory_id, %category_id, "catalog entry upserted");
    Ok(())
  }

  /// Run an `UPDATE` against one participant row, failing if it is absent.
  async fn update_participant(
    &self,
    id: Uuid,
    sql: &'static str,
    params: Vec<Option<String>>,
  ) -> Result<()> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        let mut values: Vec<&dyn rusqlite::ToSql> = vec![&id_str];
        values.extend(params.iter().map(|p| p as &dyn rusqlite::ToSql));
        Ok(conn.execute(sql, values.as_slice())?)
      })
      .await?;
    if changed == 0 {
      return Err(Error::ParticipantNotFound(id));
    }
    Ok(())
  }
}

impl Backend for SqliteStore {
  type Error = Error;
}

// ─── Participants ────────────────────────────────────────────────────────────

impl ParticipantStore for SqliteStore {
  async fn create_participant(&self, input: NewParticipant) -> Result<Participant> {
    let participant = Participant {
      participant_id: Uuid::new_v4(),
      name:           input.name,
      email:          input.email,
      role:           Role::Unregistered,
      app_tier:       input.app_tier,
      active:         true,
      created_at:     Utc::now(),
    };

    let id_str   = encode_uuid(participant.participant_id);
    let name     = participant.name.clone();
    let email    = participant.email.clone();
    let role     = participant.role.code();
    let tier     = participant.app_tier.code();
    let at_str   = encode_dt(participant.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO participants
             (participant_id, name, email, role, app_tier, active, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
          rusqlite::params![id_str, name, email, role, tier, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(participant)
  }

  async fn get_participant(&self, id: Uuid) -> Result<Option<Participant>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawParticipant> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE participant_id = ?1"
            ),
            rusqlite::params![id_str],
            RawParticipant::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawParticipant::into_participant).transpose()
  }

  async fn upsert_identity(&self, id: Uuid, patch: IdentityPatch) -> Result<()> {
    let name = patch.name().map(str::to_owned);
    let email = patch.email().map(str::to_owned);
    self
      .update_participant(
        id,
        "UPDATE participants
         SET name   = COALESCE(?2, name),
             email  = COALESCE(?3, email),
             active = 1
         WHERE participant_id = ?1",
        vec![name, email],
      )
      .await
  }

  async fn set_role(&self, id: Uuid, role: Role, tier: AppTier) -> Result<()> {
    self
      .update_participant(
        id,
        "UPDATE participants SET role = ?2, app_tier = ?3 WHERE participant_id = ?1",
        vec![Some(role.code().to_owned()), Some(tier.code().to_owned())],
      )
      .await
  }

  async fn soft_delete(&self, id: Uuid) -> Result<()> {
    self
      .update_participant(
        id,
        "UPDATE participants SET active = 0, role = ?2 WHERE participant_id = ?1",
        vec![Some(Role::Unregistered.code().to_owned())],
      )
      .await
  }
}

// ─── Fragments ───────────────────────────────────────────────────────────────

impl FragmentStore for SqliteStore {
  async fn get_fragment(&self, participant_id: Uuid) -> Result<Option<Fragment>> {
    let id_str = encode_uuid(participant_id);

    let raw: Option<RawFragment> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {FRAGMENT_COLUMNS} FROM fragments WHERE participant_id = ?1"),
            rusqlite::params![id_str],
            RawFragment::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawFragment::into_fragment).transpose()
  }

  async fn create_fragment(&self, fragment: Fragment) -> Result<Fragment> {
    let raw = RawFragment::encode(&fragment)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO fragments ({FRAGMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
          ),
          rusqlite::params![
            raw.fragment_id,
            raw.participant_id,
            raw.kind,
            raw.shop_type,
            raw.legal_name,
            raw.address,
            raw.contact_number,
            raw.identity_document_url,
            raw.details_json,
            raw.approval_status,
            raw.rejection_reason,
            raw.application_submitted_at,
            raw.review_initiated_at,
            raw.documents_verified_at,
            raw.active,
            raw.created_at,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(fragment)
  }

  async fn update_fragment(&self, fragment: Fragment) -> Result<()> {
    let raw = RawFragment::encode(&fragment)?;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE fragments SET
             shop_type                = ?2,
             legal_name               = ?3,
             address                  = ?4,
             contact_number           = ?5,
             identity_document_url    = ?6,
             details_json             = ?7,
             approval_status          = ?8,
             rejection_reason         = ?9,
             application_submitted_at = ?10,
             review_initiated_at      = ?11,
             documents_verified_at    = ?12,
             active                   = ?13
           WHERE fragment_id = ?1",
          rusqlite::params![
            raw.fragment_id,
            raw.shop_type,
            raw.legal_name,
            raw.address,
            raw.contact_number,
            raw.identity_document_url,
            raw.details_json,
            raw.approval_status,
            raw.rejection_reason,
            raw.application_submitted_at,
            raw.review_initiated_at,
            raw.documents_verified_at,
            raw.active,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::FragmentNotFound(fragment.fragment_id));
    }
    Ok(())
  }
}

// ─── Category membership ─────────────────────────────────────────────────────

impl MembershipStore for SqliteStore {
  async fn get_membership(&self, participant_id: Uuid) -> Result<Option<CategoryMembership>> {
    let id_str = encode_uuid(participant_id);

    let raw: Option<RawMembership> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT subcategories_json, categories_json
             FROM memberships WHERE participant_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawMembership {
                subcategories_json: row.get(0)?,
                categories_json:    row.get(1)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawMembership::into_membership).transpose()
  }

  async fn save_membership(
    &self,
    participant_id: Uuid,
    membership: CategoryMembership,
  ) -> Result<()> {
    let raw = RawMembership::encode(&membership)?;
    let id_str = encode_uuid(participant_id);
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO memberships
             (participant_id, subcategories_json, categories_json, updated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(participant_id) DO UPDATE SET
             subcategories_json = excluded.subcategories_json,
             categories_json    = excluded.categories_json,
             updated_at         = excluded.updated_at",
          rusqlite::params![id_str, raw.subcategories_json, raw.categories_json, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

impl SubcategoryCatalog for SqliteStore {
  async fn resolve_parent_category(
    &self,
    subcategory_id: SubcategoryId,
  ) -> Result<Option<CategoryId>> {
    let parent: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT category_id FROM subcategories WHERE subcategory_id = ?1",
            rusqlite::params![subcategory_id.0],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;
    Ok(parent.map(CategoryId))
  }
}

// ─── Side channels ───────────────────────────────────────────────────────────

impl EmailUniquenessChecker for SqliteStore {
  async fn is_taken_by_other(&self, email: String, excluding: Uuid) -> Result<bool> {
    let id_str = encode_uuid(excluding);

    let taken = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT 1 FROM participants
             WHERE email = ?1 COLLATE NOCASE
               AND active = 1
               AND participant_id != ?2
             LIMIT 1",
            rusqlite::params![email, id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false))
      })
      .await?;
    Ok(taken)
  }
}
